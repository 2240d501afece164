// Copyright (c) 2025 Fundtrack Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::Local;
use rusqlite::Connection;

use crate::db;
use crate::format::{signed_percent, signed_yuan, yuan};
use crate::portfolio::project;
use crate::quotes::fetch_quote;
use crate::utils::{http_client, maybe_print_json, pretty_table};
use crate::valuation::{PortfolioView, QuoteStore, merge};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("holdings", sub)) => holdings(conn, sub)?,
        Some(("summary", sub)) => summary(conn, sub)?,
        _ => {}
    }
    Ok(())
}

pub fn collect_view(conn: &Connection, live: bool) -> Result<PortfolioView> {
    let ledger = db::load_transactions(conn)?;
    let snapshot = project(&ledger, Local::now().naive_local());
    let mut store = QuoteStore::new();
    if live {
        let client = http_client()?;
        for holding in &snapshot {
            let seq = store.begin_request();
            if let Some(quote) = fetch_quote(&client, &holding.code) {
                store.complete(&holding.code, seq, quote);
            }
        }
    }
    Ok(merge(&snapshot, &store))
}

fn holdings(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let view = collect_view(conn, sub.get_flag("live"))?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &view.rows)? {
        return Ok(());
    }

    let rows: Vec<Vec<String>> = view
        .rows
        .iter()
        .map(|r| {
            let mut code = r.code.clone();
            if r.clamped {
                // Over-redeemed at some point in its history.
                code.push('*');
            }
            vec![
                code,
                r.name.clone().unwrap_or_default(),
                if r.has_quote {
                    signed_percent(r.change_pct)
                } else {
                    "--".to_string()
                },
                signed_yuan(r.day_profit),
                yuan(r.current_valuation),
                signed_yuan(r.total_profit),
                signed_percent(r.total_profit_rate),
                format!("{:.2}", r.shares),
                yuan(r.cost),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Code", "Name", "Est%", "Day P/L", "Value", "Total P/L", "Rate", "Shares", "Cost"],
            rows,
        )
    );
    print_summary(&view);
    Ok(())
}

fn summary(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let view = collect_view(conn, sub.get_flag("live"))?;
    if maybe_print_json(sub.get_flag("json"), false, &view.summary)? {
        return Ok(());
    }
    print_summary(&view);
    Ok(())
}

fn print_summary(view: &PortfolioView) {
    let s = &view.summary;
    println!(
        "Total {}  Cost {}  Day {} ({})  Overall {} ({})",
        yuan(s.total_amount),
        yuan(s.total_cost),
        signed_yuan(s.day_profit),
        signed_percent(s.day_profit_rate),
        signed_yuan(s.total_profit),
        signed_percent(s.total_profit_rate),
    );
}
