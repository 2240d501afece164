// Copyright (c) 2025 Fundtrack Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use rusqlite::Connection;

use crate::db;
use crate::format::signed_percent;
use crate::quotes::fetch_quote;
use crate::utils::{http_client, maybe_print_json, pretty_table};
use crate::valuation::QuoteStore;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("remove", sub)) => remove(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let code = sub
        .get_one::<String>("code")
        .map(|s| s.trim().to_string())
        .unwrap();
    let name = sub
        .get_one::<String>("name")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| code.clone());
    if db::watchlist_contains(conn, &code)? {
        println!("{} is already on the watchlist", code);
        return Ok(());
    }
    db::add_watchlist_entry(conn, &code, &name)?;
    println!("Watching {} ({})", code, name);
    Ok(())
}

fn remove(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let code = sub
        .get_one::<String>("code")
        .map(|s| s.trim().to_string())
        .unwrap();
    if !db::remove_watchlist_entry(conn, &code)? {
        bail!("{} is not on the watchlist", code);
    }
    println!("Stopped watching {}", code);
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let entries = db::load_watchlist(conn)?;
    if maybe_print_json(sub.get_flag("json"), false, &entries)? {
        return Ok(());
    }

    if !sub.get_flag("live") {
        let rows = entries
            .into_iter()
            .map(|e| vec![e.code, e.name])
            .collect();
        println!("{}", pretty_table(&["Code", "Name"], rows));
        return Ok(());
    }

    let client = http_client()?;
    let mut store = QuoteStore::new();
    for entry in &entries {
        let seq = store.begin_request();
        if let Some(quote) = fetch_quote(&client, &entry.code) {
            store.complete(&entry.code, seq, quote);
        }
    }
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| match store.get(&e.code) {
            Some(q) => vec![
                e.code.clone(),
                q.name.clone().unwrap_or_else(|| e.name.clone()),
                q.nav.map(|d| format!("{:.4}", d)).unwrap_or_default(),
                q.gsz.map(|d| format!("{:.4}", d)).unwrap_or_default(),
                q.gszzl.map(signed_percent).unwrap_or_default(),
                q.gztime.clone().unwrap_or_default(),
            ],
            None => vec![
                e.code.clone(),
                e.name.clone(),
                String::new(),
                String::new(),
                "--".to_string(),
                String::new(),
            ],
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Code", "Name", "NAV", "Est", "Est%", "As Of"], rows)
    );
    Ok(())
}
