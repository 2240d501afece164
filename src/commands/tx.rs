// Copyright (c) 2025 Fundtrack Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use chrono::{Local, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::calendar::{confirmation_date, effective_date};
use crate::db;
use crate::format::format_transaction;
use crate::models::{Transaction, TxKind};
use crate::portfolio::project;
use crate::utils::{
    maybe_print_json, parse_date, parse_fee_rate, parse_nonnegative_decimal,
    parse_positive_decimal, pretty_table,
};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("buy", sub)) => buy(conn, sub)?,
        Some(("sell", sub)) => sell(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("revoke", sub)) => revoke(conn, sub)?,
        Some(("clear", sub)) => clear(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn order_date(sub: &clap::ArgMatches) -> Result<NaiveDate> {
    match sub.get_one::<String>("date") {
        Some(raw) => parse_date(raw.trim()),
        None => Ok(Local::now().date_naive()),
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_default()
}

fn buy(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let code = sub
        .get_one::<String>("code")
        .map(|s| s.trim().to_string())
        .unwrap();
    let name = sub
        .get_one::<String>("name")
        .map(|s| s.trim().to_string());
    let gross = parse_nonnegative_decimal(sub.get_one::<String>("amount").unwrap().trim())?;
    let fee_rate = parse_fee_rate(sub.get_one::<String>("fee-rate").unwrap().trim())?;
    let nav = parse_positive_decimal(sub.get_one::<String>("nav").unwrap().trim())?;
    let date = order_date(sub)?;
    let after_cutoff = sub.get_flag("after-cutoff");
    let settle_days = *sub.get_one::<u32>("settle-days").unwrap();

    let fee = gross * fee_rate / Decimal::ONE_HUNDRED;
    let net = gross - fee;
    let shares = net / nav;
    let effective = effective_date(date, after_cutoff);
    let confirmation = confirmation_date(effective, settle_days);

    let tx = Transaction {
        id: 0,
        kind: TxKind::Buy,
        fund_code: code.clone(),
        name: name.clone(),
        time: midnight(date),
        confirmation_time: Some(midnight(confirmation)),
        amount: Some(net),
        shares: Some(shares),
        cost: Some(gross),
        nav_at_buy: Some(nav),
        share_ratio: None,
        redeem_amount: None,
        nav_at_sell: None,
    };
    let id = db::append_transaction(conn, &tx)?;
    if sub.get_flag("watch") {
        db::add_watchlist_entry(conn, &code, name.as_deref().unwrap_or(&code))?;
    }
    println!(
        "Recorded buy #{}: {} ¥{:.2} gross (fee ¥{:.2}, {:.2} shares @ {}), effective {}, confirms {}",
        id, code, gross, fee, shares, nav, effective, confirmation
    );
    Ok(())
}

fn sell(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let code = sub
        .get_one::<String>("code")
        .map(|s| s.trim().to_string())
        .unwrap();
    let shares_sold = parse_nonnegative_decimal(sub.get_one::<String>("shares").unwrap().trim())?;
    let nav = parse_positive_decimal(sub.get_one::<String>("nav").unwrap().trim())?;
    let date = order_date(sub)?;
    let after_cutoff = sub.get_flag("after-cutoff");
    let settle_days = *sub.get_one::<u32>("settle-days").unwrap();

    // The cost-basis ratio is taken from the holding as it stands when
    // the order is placed, not at settlement.
    let ledger = db::load_transactions(conn)?;
    let holdings = project(&ledger, Local::now().naive_local());
    let holding = holdings.iter().find(|h| h.code == code);
    let name = holding.and_then(|h| h.name.clone());
    let total_shares = match holding {
        Some(h) if h.shares > Decimal::ZERO => h.shares,
        // Legacy position without share tracking: estimate from value.
        Some(h) => h.amount / nav,
        None => Decimal::ZERO,
    };
    let ratio = if total_shares > Decimal::ZERO {
        shares_sold / total_shares
    } else {
        Decimal::ZERO
    };
    let gross = shares_sold * nav;
    let effective = effective_date(date, after_cutoff);
    let confirmation = confirmation_date(effective, settle_days);

    let tx = Transaction {
        id: 0,
        kind: TxKind::Sell,
        fund_code: code.clone(),
        name: name.clone(),
        time: midnight(date),
        confirmation_time: Some(midnight(confirmation)),
        amount: None,
        shares: Some(shares_sold),
        cost: None,
        nav_at_buy: None,
        share_ratio: Some(ratio),
        redeem_amount: Some(gross),
        nav_at_sell: Some(nav),
    };
    let id = db::append_transaction(conn, &tx)?;
    if sub.get_flag("watch") {
        db::add_watchlist_entry(conn, &code, name.as_deref().unwrap_or(&code))?;
    }
    println!(
        "Recorded sell #{}: {} {:.2} shares @ {} (≈ ¥{:.2}, {:.4} of cost basis), effective {}, confirms {}",
        id, code, shares_sold, nav, gross, ratio, effective, confirmation
    );
    Ok(())
}

#[derive(Serialize)]
pub struct TxRow {
    pub id: i64,
    pub date: String,
    pub confirmation: String,
    pub code: String,
    pub name: String,
    pub kind: String,
    pub main: String,
    pub sub: String,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TxRow>> {
    let code_filter = sub.get_one::<String>("code").map(|s| s.trim().to_string());
    let limit = sub.get_one::<usize>("limit").copied();

    let mut ledger = db::load_transactions(conn)?;
    if let Some(code) = &code_filter {
        ledger.retain(|tx| &tx.fund_code == code);
    }
    // Most recent orders first.
    ledger.sort_by(|a, b| b.time.cmp(&a.time).then(b.id.cmp(&a.id)));
    if let Some(limit) = limit {
        ledger.truncate(limit);
    }

    Ok(ledger
        .iter()
        .map(|tx| {
            let display = format_transaction(tx);
            TxRow {
                id: tx.id,
                date: tx.time.format("%Y-%m-%d").to_string(),
                confirmation: tx
                    .confirmation_time
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                code: tx.fund_code.clone(),
                name: tx.name.clone().unwrap_or_default(),
                kind: display.type_label.to_string(),
                main: display.main,
                sub: display.sub.unwrap_or_default(),
            }
        })
        .collect())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.clone(),
                    r.confirmation.clone(),
                    r.code.clone(),
                    r.name.clone(),
                    r.kind.clone(),
                    r.main.clone(),
                    r.sub.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Date", "Confirms", "Code", "Name", "Type", "Value", "Detail"],
                rows,
            )
        );
    }
    Ok(())
}

fn revoke(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    if !db::delete_transaction(conn, id)? {
        bail!("Transaction {} not found", id);
    }
    println!("Revoked transaction {}", id);
    Ok(())
}

fn clear(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let code = sub
        .get_one::<String>("code")
        .map(|s| s.trim().to_string())
        .unwrap();
    let n = db::delete_fund_transactions(conn, &code)?;
    println!("Removed {} transactions for {}", n, code);
    Ok(())
}
