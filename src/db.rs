// Copyright (c) 2025 Fundtrack Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Ledger persistence boundary. The core only requires that reads
//! reflect the most recent writes from the same session; here that is a
//! local SQLite file under the platform data directory.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

use crate::models::{Transaction, TxKind, WatchEntry};
use crate::utils::{format_datetime, parse_datetime};

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("io.fundtrack", "Fundtrack", "fundtrack"));

pub fn db_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("FUNDTRACK_DB") {
        return Ok(PathBuf::from(path));
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("fundtrack.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL CHECK(kind IN ('buy','sell')),
        fund_code TEXT NOT NULL,
        name TEXT,
        time TEXT NOT NULL,
        confirmation_time TEXT,
        amount TEXT,
        shares TEXT,
        cost TEXT,
        nav_at_buy TEXT,
        share_ratio TEXT,
        redeem_amount TEXT,
        nav_at_sell TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_fund ON transactions(fund_code);
    CREATE INDEX IF NOT EXISTS idx_transactions_time ON transactions(time);

    CREATE TABLE IF NOT EXISTS watchlist(
        code TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    "#,
    )?;
    Ok(())
}

// Stored numerics are TEXT; a row predating share tracking may hold NULL,
// and a hand-edited row may hold garbage. Both fold as "absent" rather
// than poisoning the projection.
fn read_decimal(raw: Option<String>, column: &str, id: i64) -> Option<Decimal> {
    let raw = raw?;
    match Decimal::from_str(&raw) {
        Ok(d) => Some(d),
        Err(_) => {
            warn!(id, column, raw = %raw, "unparseable stored numeric treated as absent");
            None
        }
    }
}

pub fn load_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, kind, fund_code, name, time, confirmation_time,
                amount, shares, cost, nav_at_buy, share_ratio, redeem_amount, nav_at_sell
         FROM transactions ORDER BY time ASC, id ASC",
    )?;
    let mut rows = stmt.query([])?;
    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let kind: String = r.get(1)?;
        let time_s: String = r.get(4)?;
        let confirmation_s: Option<String> = r.get(5)?;
        let time = parse_datetime(&time_s)
            .with_context(|| format!("Invalid time for transaction {}", id))?;
        let confirmation_time = match confirmation_s {
            Some(s) => Some(
                parse_datetime(&s)
                    .with_context(|| format!("Invalid confirmation time for transaction {}", id))?,
            ),
            None => None,
        };
        data.push(Transaction {
            id,
            kind: TxKind::from_str(&kind)?,
            fund_code: r.get(2)?,
            name: r.get(3)?,
            time,
            confirmation_time,
            amount: read_decimal(r.get(6)?, "amount", id),
            shares: read_decimal(r.get(7)?, "shares", id),
            cost: read_decimal(r.get(8)?, "cost", id),
            nav_at_buy: read_decimal(r.get(9)?, "nav_at_buy", id),
            share_ratio: read_decimal(r.get(10)?, "share_ratio", id),
            redeem_amount: read_decimal(r.get(11)?, "redeem_amount", id),
            nav_at_sell: read_decimal(r.get(12)?, "nav_at_sell", id),
        });
    }
    Ok(data)
}

/// Insert a new ledger entry; the id on `tx` is ignored and the assigned
/// rowid returned.
pub fn append_transaction(conn: &Connection, tx: &Transaction) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions(kind, fund_code, name, time, confirmation_time,
             amount, shares, cost, nav_at_buy, share_ratio, redeem_amount, nav_at_sell)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
        params![
            tx.kind.as_str(),
            tx.fund_code,
            tx.name,
            format_datetime(tx.time),
            tx.confirmation_time.map(format_datetime),
            tx.amount.map(|d| d.to_string()),
            tx.shares.map(|d| d.to_string()),
            tx.cost.map(|d| d.to_string()),
            tx.nav_at_buy.map(|d| d.to_string()),
            tx.share_ratio.map(|d| d.to_string()),
            tx.redeem_amount.map(|d| d.to_string()),
            tx.nav_at_sell.map(|d| d.to_string()),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_transaction(conn: &Connection, id: i64) -> Result<bool> {
    let n = conn.execute("DELETE FROM transactions WHERE id=?1", params![id])?;
    Ok(n > 0)
}

pub fn delete_fund_transactions(conn: &Connection, code: &str) -> Result<usize> {
    let n = conn.execute(
        "DELETE FROM transactions WHERE fund_code=?1",
        params![code],
    )?;
    Ok(n)
}

pub fn load_watchlist(conn: &Connection) -> Result<Vec<WatchEntry>> {
    let mut stmt = conn.prepare("SELECT code, name FROM watchlist ORDER BY code")?;
    let rows = stmt.query_map([], |r| {
        Ok(WatchEntry {
            code: r.get(0)?,
            name: r.get(1)?,
        })
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    Ok(data)
}

/// Idempotent per code: re-adding a watched fund refreshes its name.
pub fn add_watchlist_entry(conn: &Connection, code: &str, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO watchlist(code, name) VALUES(?1, ?2)
         ON CONFLICT(code) DO UPDATE SET name=excluded.name",
        params![code, name],
    )?;
    Ok(())
}

pub fn remove_watchlist_entry(conn: &Connection, code: &str) -> Result<bool> {
    let n = conn.execute("DELETE FROM watchlist WHERE code=?1", params![code])?;
    Ok(n > 0)
}

pub fn watchlist_contains(conn: &Connection, code: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT code FROM watchlist WHERE code=?1",
            params![code],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}
