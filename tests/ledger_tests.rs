// Copyright (c) 2025 Fundtrack Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use fundtrack::{cli, commands::tx, db};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::str::FromStr;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

fn run_tx(conn: &Connection, args: &[&str]) {
    let mut argv = vec!["fundtrack", "tx"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    let Some(("tx", tx_m)) = matches.subcommand() else {
        panic!("no tx subcommand");
    };
    tx::handle(conn, tx_m).unwrap();
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[test]
fn buy_records_net_amount_shares_and_confirmation() {
    let conn = setup();
    run_tx(
        &conn,
        &[
            "buy",
            "--code",
            "000001",
            "--name",
            "测试基金",
            "--amount",
            "1000",
            "--fee-rate",
            "0",
            "--nav",
            "1.0",
            "--date",
            "2023-10-23",
        ],
    );

    let txs = db::load_transactions(&conn).unwrap();
    assert_eq!(txs.len(), 1);
    let tx = &txs[0];
    assert_eq!(tx.fund_code, "000001");
    assert_eq!(tx.amount, Some(dec("1000")));
    assert_eq!(tx.cost, Some(dec("1000")));
    assert_eq!(tx.shares, Some(dec("1000")));
    assert_eq!(tx.nav_at_buy, Some(dec("1.0")));
    assert_eq!(tx.time.date(), NaiveDate::from_ymd_opt(2023, 10, 23).unwrap());
    // Monday before the cutoff settles T+1 on Tuesday.
    assert_eq!(
        tx.confirmation_time.map(|t| t.date()),
        NaiveDate::from_ymd_opt(2023, 10, 24)
    );
}

#[test]
fn buy_fee_reduces_net_amount_but_not_cost() {
    let conn = setup();
    run_tx(
        &conn,
        &[
            "buy", "--code", "000001", "--amount", "1000", "--fee-rate", "1.5", "--nav", "2.0",
            "--date", "2023-10-23",
        ],
    );
    let tx = &db::load_transactions(&conn).unwrap()[0];
    assert_eq!(tx.amount, Some(dec("985")));
    assert_eq!(tx.cost, Some(dec("1000")));
    assert_eq!(tx.shares, Some(dec("492.5")));
}

#[test]
fn friday_buy_after_cutoff_confirms_tuesday() {
    let conn = setup();
    run_tx(
        &conn,
        &[
            "buy",
            "--code",
            "000001",
            "--amount",
            "100",
            "--nav",
            "1.0",
            "--date",
            "2023-10-27",
            "--after-cutoff",
        ],
    );
    let tx = &db::load_transactions(&conn).unwrap()[0];
    // Effective Monday 10-30, confirmed Tuesday 10-31.
    assert_eq!(
        tx.confirmation_time.map(|t| t.date()),
        NaiveDate::from_ymd_opt(2023, 10, 31)
    );
}

#[test]
fn sell_derives_ratio_from_presale_holding() {
    let conn = setup();
    run_tx(
        &conn,
        &[
            "buy", "--code", "000001", "--amount", "1000", "--fee-rate", "0", "--nav", "1.0",
            "--date", "2023-10-23",
        ],
    );
    run_tx(
        &conn,
        &[
            "sell", "--code", "000001", "--shares", "250", "--nav", "1.2", "--date", "2023-11-06",
        ],
    );

    let txs = db::load_transactions(&conn).unwrap();
    assert_eq!(txs.len(), 2);
    let sell = &txs[1];
    assert_eq!(sell.shares, Some(dec("250")));
    assert_eq!(sell.share_ratio, Some(dec("0.25")));
    assert_eq!(sell.redeem_amount, Some(dec("300.0")));
    assert_eq!(sell.nav_at_sell, Some(dec("1.2")));
}

#[test]
fn sell_against_unknown_fund_records_zero_ratio() {
    let conn = setup();
    run_tx(
        &conn,
        &[
            "sell", "--code", "999999", "--shares", "10", "--nav", "1.0", "--date", "2023-11-06",
        ],
    );
    let sell = &db::load_transactions(&conn).unwrap()[0];
    assert_eq!(sell.share_ratio, Some(Decimal::ZERO));
}

#[test]
fn revoke_deletes_one_entry_and_rejects_unknown_ids() {
    let conn = setup();
    run_tx(
        &conn,
        &[
            "buy", "--code", "000001", "--amount", "100", "--nav", "1.0", "--date", "2023-10-23",
        ],
    );
    let id = db::load_transactions(&conn).unwrap()[0].id;

    assert!(db::delete_transaction(&conn, id).unwrap());
    assert!(db::load_transactions(&conn).unwrap().is_empty());
    assert!(!db::delete_transaction(&conn, id).unwrap());
}

#[test]
fn clear_removes_only_the_requested_fund() {
    let conn = setup();
    for code in ["000001", "000001", "000002"] {
        run_tx(
            &conn,
            &[
                "buy", "--code", code, "--amount", "100", "--nav", "1.0", "--date", "2023-10-23",
            ],
        );
    }
    let removed = db::delete_fund_transactions(&conn, "000001").unwrap();
    assert_eq!(removed, 2);
    let remaining = db::load_transactions(&conn).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].fund_code, "000002");
}

#[test]
fn list_respects_code_filter_and_limit() {
    let conn = setup();
    for (code, date) in [
        ("000001", "2023-10-23"),
        ("000002", "2023-10-24"),
        ("000001", "2023-10-25"),
    ] {
        run_tx(
            &conn,
            &[
                "buy", "--code", code, "--amount", "100", "--nav", "1.0", "--date", date,
            ],
        );
    }

    let matches = cli::build_cli().get_matches_from([
        "fundtrack", "tx", "list", "--code", "000001", "--limit", "1",
    ]);
    let Some(("tx", tx_m)) = matches.subcommand() else {
        panic!("no tx subcommand");
    };
    let Some(("list", list_m)) = tx_m.subcommand() else {
        panic!("no list subcommand");
    };
    let rows = tx::query_rows(&conn, list_m).unwrap();
    assert_eq!(rows.len(), 1);
    // Most recent order first.
    assert_eq!(rows[0].date, "2023-10-25");
    assert_eq!(rows[0].code, "000001");
    assert_eq!(rows[0].kind, "买入");
    assert_eq!(rows[0].main, "¥100.00");
}

#[test]
fn buy_with_watch_flag_syncs_watchlist_idempotently() {
    let conn = setup();
    for _ in 0..2 {
        run_tx(
            &conn,
            &[
                "buy", "--code", "000001", "--name", "测试基金", "--amount", "100", "--nav",
                "1.0", "--date", "2023-10-23", "--watch",
            ],
        );
    }
    let watchlist = db::load_watchlist(&conn).unwrap();
    assert_eq!(watchlist.len(), 1);
    assert_eq!(watchlist[0].code, "000001");
    assert_eq!(watchlist[0].name, "测试基金");
}

#[test]
fn watchlist_add_and_remove_round_trip() {
    let conn = setup();
    db::add_watchlist_entry(&conn, "000001", "A").unwrap();
    db::add_watchlist_entry(&conn, "000001", "B").unwrap();
    assert!(db::watchlist_contains(&conn, "000001").unwrap());
    let entries = db::load_watchlist(&conn).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "B");

    assert!(db::remove_watchlist_entry(&conn, "000001").unwrap());
    assert!(!db::remove_watchlist_entry(&conn, "000001").unwrap());
}

#[test]
fn ledger_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fundtrack.sqlite");

    let conn = Connection::open(&path).unwrap();
    db::init_schema(&conn).unwrap();
    run_tx(
        &conn,
        &[
            "buy", "--code", "000001", "--amount", "100", "--nav", "1.0", "--date", "2023-10-23",
        ],
    );
    drop(conn);

    let reopened = Connection::open(&path).unwrap();
    db::init_schema(&reopened).unwrap();
    let txs = db::load_transactions(&reopened).unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].fund_code, "000001");
}

#[test]
fn malformed_stored_numeric_loads_as_absent() {
    let conn = setup();
    conn.execute(
        "INSERT INTO transactions(kind, fund_code, time, amount, shares)
         VALUES ('buy', '000001', '2023-10-23 00:00:00', 'garbage', '10')",
        [],
    )
    .unwrap();
    let txs = db::load_transactions(&conn).unwrap();
    assert_eq!(txs.len(), 1);
    assert!(txs[0].amount.is_none());
    assert_eq!(txs[0].shares, Some(dec("10")));
}
