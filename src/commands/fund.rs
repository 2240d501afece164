// Copyright (c) 2025 Fundtrack Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::DateTime;

use crate::quotes::{fetch_chart_series, fetch_nav_history, search_funds};
use crate::utils::{http_client, maybe_print_json, pretty_table};

pub fn handle(m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("search", sub)) => search(sub)?,
        Some(("history", sub)) => history(sub)?,
        Some(("chart", sub)) => chart(sub)?,
        _ => {}
    }
    Ok(())
}

fn search(sub: &clap::ArgMatches) -> Result<()> {
    let keyword = sub.get_one::<String>("KEYWORD").unwrap();
    let client = http_client()?;
    let funds = search_funds(&client, keyword)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &funds)? {
        return Ok(());
    }
    let rows = funds
        .into_iter()
        .map(|f| vec![f.code, f.abbr, f.name, f.category])
        .collect();
    println!("{}", pretty_table(&["Code", "Abbr", "Name", "Category"], rows));
    Ok(())
}

fn history(sub: &clap::ArgMatches) -> Result<()> {
    let code = sub.get_one::<String>("code").unwrap().trim();
    let page = *sub.get_one::<u32>("page").unwrap();
    let page_size = *sub.get_one::<u32>("page-size").unwrap();
    let client = http_client()?;
    let history = fetch_nav_history(&client, code, page, page_size)?;
    if maybe_print_json(sub.get_flag("json"), false, &history)? {
        return Ok(());
    }
    let rows: Vec<Vec<String>> = history
        .records
        .iter()
        .map(|r| {
            vec![
                r.date.to_string(),
                r.nav.map(|d| format!("{:.4}", d)).unwrap_or_default(),
                r.cumulative_nav
                    .map(|d| format!("{:.4}", d))
                    .unwrap_or_default(),
                r.daily_change_pct
                    .map(|d| format!("{:.2}%", d))
                    .unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Date", "NAV", "Cumulative", "Change"], rows)
    );
    println!(
        "Page {} ({} rows) of {} records total",
        page,
        history.records.len(),
        history.total
    );
    Ok(())
}

fn chart(sub: &clap::ArgMatches) -> Result<()> {
    let code = sub.get_one::<String>("code").unwrap().trim();
    let limit = *sub.get_one::<usize>("limit").unwrap();
    let client = http_client()?;
    let series = fetch_chart_series(&client, code)?;
    if maybe_print_json(sub.get_flag("json"), false, &series)? {
        return Ok(());
    }
    let start = series.points.len().saturating_sub(limit);
    let rows: Vec<Vec<String>> = series.points[start..]
        .iter()
        .map(|(ts, nav)| {
            let date = DateTime::from_timestamp_millis(*ts)
                .map(|dt| dt.date_naive().to_string())
                .unwrap_or_else(|| ts.to_string());
            vec![date, format!("{:.4}", nav)]
        })
        .collect();
    println!("{} ({} points)", series.name, series.points.len());
    println!("{}", pretty_table(&["Date", "NAV"], rows));
    Ok(())
}
