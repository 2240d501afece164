// Copyright (c) 2025 Fundtrack Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! External market-data collaborators: live estimated valuations, the
//! fund directory, chart series, and paginated NAV history. The upstream
//! feeds wrap their payloads in JS (`jsonpgz(...)`, `var r = ...`), so
//! parsing is split out as pure functions with their own tests.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

use crate::models::{ChartSeries, FundInfo, NavHistoryPage, NavRecord, Quote};

const VALUATION_ENDPOINT: &str = "http://fundgz.1234567.com.cn/js";
const DIRECTORY_ENDPOINT: &str = "http://fund.eastmoney.com/js/fundcode_search.js";
const CHART_ENDPOINT: &str = "http://fund.eastmoney.com/pingzhongdata";
const HISTORY_ENDPOINT: &str = "http://api.fund.eastmoney.com/f10/lsjz";

const SEARCH_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not a jsonpgz callback")]
    NotJsonp,
    #[error("payload is not a fund directory script")]
    NotDirectory,
    #[error("invalid payload JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct QuoteWire {
    fundcode: String,
    name: Option<String>,
    /// NAV date.
    jzrq: Option<String>,
    /// Prior-day settled NAV.
    dwjz: Option<String>,
    /// Live estimated NAV.
    gsz: Option<String>,
    /// Live estimated percent change.
    gszzl: Option<String>,
    /// Estimate timestamp.
    gztime: Option<String>,
}

fn wire_decimal(raw: &Option<String>) -> Option<Decimal> {
    raw.as_deref().and_then(|s| Decimal::from_str(s).ok())
}

static JSONP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)jsonpgz\((.*)\)").unwrap());

/// Parse a `jsonpgz({...});` valuation payload. An empty callback
/// (`jsonpgz();`) is a valid "no data" response.
pub fn parse_quote_payload(text: &str) -> Result<Option<Quote>, PayloadError> {
    let captures = JSONP_RE.captures(text).ok_or(PayloadError::NotJsonp)?;
    let body = captures[1].trim();
    if body.is_empty() {
        return Ok(None);
    }
    let wire: QuoteWire = serde_json::from_str(body)?;
    let nav_date = wire
        .jzrq
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
    Ok(Some(Quote {
        nav: wire_decimal(&wire.dwjz),
        gsz: wire_decimal(&wire.gsz),
        gszzl: wire_decimal(&wire.gszzl),
        code: wire.fundcode,
        name: wire.name,
        nav_date,
        gztime: wire.gztime,
    }))
}

/// Current estimated valuation for one fund. Transient failures are a
/// tolerated outcome, not an error: the caller simply has no quote for
/// that code until the next poll.
pub fn fetch_quote(client: &Client, code: &str) -> Option<Quote> {
    match try_fetch_quote(client, code) {
        Ok(quote) => quote,
        Err(err) => {
            warn!(code, error = %err, "quote fetch failed");
            None
        }
    }
}

fn try_fetch_quote(client: &Client, code: &str) -> Result<Option<Quote>> {
    let url = format!("{}/{}.js", VALUATION_ENDPOINT, code);
    let text = client.get(url).send()?.error_for_status()?.text()?;
    Ok(parse_quote_payload(&text)?)
}

static DIRECTORY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)var\s+r\s*=\s*(\[.*\])\s*;?\s*$").unwrap());

/// Parse the `var r = [["code","abbr","name","type","pinyin"],...];`
/// directory script.
pub fn parse_directory_payload(text: &str) -> Result<Vec<FundInfo>, PayloadError> {
    let captures = DIRECTORY_RE
        .captures(text.trim())
        .ok_or(PayloadError::NotDirectory)?;
    let rows: Vec<Vec<String>> = serde_json::from_str(&captures[1])?;
    Ok(rows
        .into_iter()
        .filter(|row| !row.is_empty())
        .map(|mut row| {
            let mut field = |i: usize| {
                if i < row.len() {
                    std::mem::take(&mut row[i])
                } else {
                    String::new()
                }
            };
            FundInfo {
                code: field(0),
                abbr: field(1),
                name: field(2),
                category: field(3),
                pinyin: field(4),
            }
        })
        .collect())
}

static DIRECTORY: OnceCell<Vec<FundInfo>> = OnceCell::new();

/// The full fund directory, fetched once per process.
pub fn directory(client: &Client) -> Result<&'static [FundInfo]> {
    let funds = DIRECTORY.get_or_try_init(|| -> Result<Vec<FundInfo>> {
        let text = client
            .get(DIRECTORY_ENDPOINT)
            .send()?
            .error_for_status()?
            .text()?;
        parse_directory_payload(&text).context("Fund directory payload")
    })?;
    Ok(funds.as_slice())
}

/// Fuzzy search over the directory: code, name, abbreviation, and
/// phonetic key all match, capped at 20 rows.
pub fn search_funds(client: &Client, keyword: &str) -> Result<Vec<FundInfo>> {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return Ok(Vec::new());
    }
    let funds = directory(client)?;
    Ok(search_directory(funds, &keyword))
}

fn search_directory(funds: &[FundInfo], lower_keyword: &str) -> Vec<FundInfo> {
    funds
        .iter()
        .filter(|f| {
            f.code.contains(lower_keyword)
                || f.name.contains(lower_keyword)
                || f.abbr.to_lowercase().contains(lower_keyword)
                || f.pinyin.to_lowercase().contains(lower_keyword)
        })
        .take(SEARCH_LIMIT)
        .cloned()
        .collect()
}

static CHART_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"var\s+fS_name\s*=\s*"([^"]*)""#).unwrap());
static CHART_TREND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)var\s+Data_netWorthTrend\s*=\s*(\[.*?\])\s*;").unwrap());

#[derive(Debug, Deserialize)]
struct TrendPoint {
    x: i64,
    y: f64,
}

/// Extract the fund name and NAV series from the full-history script.
pub fn parse_chart_payload(code: &str, text: &str) -> Result<ChartSeries, PayloadError> {
    let name = CHART_NAME_RE
        .captures(text)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| code.to_string());
    let points = match CHART_TREND_RE.captures(text) {
        Some(captures) => {
            let raw: Vec<TrendPoint> = serde_json::from_str(&captures[1])?;
            raw.into_iter()
                .filter_map(|p| Decimal::from_f64(p.y).map(|nav| (p.x, nav)))
                .collect()
        }
        None => Vec::new(),
    };
    Ok(ChartSeries { name, points })
}

pub fn fetch_chart_series(client: &Client, code: &str) -> Result<ChartSeries> {
    let url = format!("{}/{}.js", CHART_ENDPOINT, code);
    let text = client
        .get(url)
        .send()?
        .error_for_status()?
        .text()
        .with_context(|| format!("Chart payload for fund {}", code))?;
    Ok(parse_chart_payload(code, &text)?)
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(rename = "Data")]
    data: Option<HistoryData>,
    #[serde(rename = "TotalCount")]
    total_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct HistoryData {
    #[serde(rename = "LSJZList")]
    list: Vec<HistoryRow>,
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    #[serde(rename = "FSRQ")]
    date: String,
    #[serde(rename = "DWJZ")]
    nav: Option<String>,
    #[serde(rename = "LJJZ")]
    cumulative_nav: Option<String>,
    #[serde(rename = "JZZZL")]
    daily_change_pct: Option<String>,
}

/// One page of historical settled NAVs.
pub fn fetch_nav_history(
    client: &Client,
    code: &str,
    page: u32,
    page_size: u32,
) -> Result<NavHistoryPage> {
    let resp: HistoryResponse = client
        .get(HISTORY_ENDPOINT)
        .query(&[
            ("fundCode", code),
            ("pageIndex", &page.to_string()),
            ("pageSize", &page_size.to_string()),
        ])
        .send()?
        .error_for_status()?
        .json()
        .with_context(|| format!("NAV history for fund {}", code))?;

    let records = resp
        .data
        .map(|d| d.list)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|row| {
            let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").ok()?;
            Some(NavRecord {
                date,
                nav: wire_decimal(&row.nav),
                cumulative_nav: wire_decimal(&row.cumulative_nav),
                daily_change_pct: wire_decimal(&row.daily_change_pct),
            })
        })
        .collect();
    Ok(NavHistoryPage {
        records,
        total: resp.total_count.unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_payload_round_trips_wire_fields() {
        let text = r#"jsonpgz({"fundcode":"110011","name":"易方达优质精选混合(QDII)","jzrq":"2024-05-29","dwjz":"5.7663","gsz":"5.7288","gszzl":"-0.65","gztime":"2024-05-30 15:00"});"#;
        let quote = parse_quote_payload(text).unwrap().unwrap();
        assert_eq!(quote.code, "110011");
        assert_eq!(quote.nav, Some(Decimal::from_str("5.7663").unwrap()));
        assert_eq!(quote.gsz, Some(Decimal::from_str("5.7288").unwrap()));
        assert_eq!(quote.gszzl, Some(Decimal::from_str("-0.65").unwrap()));
        assert_eq!(
            quote.nav_date,
            NaiveDate::from_ymd_opt(2024, 5, 29)
        );
        assert_eq!(quote.gztime.as_deref(), Some("2024-05-30 15:00"));
    }

    #[test]
    fn empty_jsonp_callback_means_no_data() {
        assert!(parse_quote_payload("jsonpgz();").unwrap().is_none());
    }

    #[test]
    fn non_jsonp_payload_is_an_error() {
        assert!(matches!(
            parse_quote_payload("<html>gateway timeout</html>"),
            Err(PayloadError::NotJsonp)
        ));
    }

    #[test]
    fn unparseable_numeric_fields_become_absent() {
        let text = r#"jsonpgz({"fundcode":"110011","dwjz":"--","gsz":"","gszzl":"n/a"});"#;
        let quote = parse_quote_payload(text).unwrap().unwrap();
        assert!(quote.nav.is_none());
        assert!(quote.gsz.is_none());
        assert!(quote.gszzl.is_none());
    }

    #[test]
    fn directory_payload_parses_rows() {
        let text = r#"var r = [["000001","HXCZ","华夏成长混合","混合型","HUAXIACHENGZHANG"],["110011","YFDZL","易方达优质精选","混合型","YIFANGDAYOUZHI"]];"#;
        let funds = parse_directory_payload(text).unwrap();
        assert_eq!(funds.len(), 2);
        assert_eq!(funds[0].code, "000001");
        assert_eq!(funds[1].pinyin, "YIFANGDAYOUZHI");
    }

    #[test]
    fn directory_search_matches_code_name_abbr_pinyin() {
        let text = r#"var r = [["000001","HXCZ","华夏成长混合","混合型","HUAXIACHENGZHANG"],["110011","YFDZL","易方达优质精选","混合型","YIFANGDAYOUZHI"]];"#;
        let funds = parse_directory_payload(text).unwrap();
        assert_eq!(search_directory(&funds, "110011").len(), 1);
        assert_eq!(search_directory(&funds, "华夏").len(), 1);
        assert_eq!(search_directory(&funds, "yfdzl").len(), 1);
        assert_eq!(search_directory(&funds, "huaxia").len(), 1);
        assert!(search_directory(&funds, "nomatch").is_empty());
    }

    #[test]
    fn chart_payload_extracts_name_and_series() {
        let text = r#"var fS_name = "测试基金";var fS_code = "000001";var Data_netWorthTrend = [{"x":1698019200000,"y":1.1,"equityReturn":0.5,"unitMoney":""},{"x":1698105600000,"y":1.12,"equityReturn":1.8,"unitMoney":""}];var Data_ACWorthTrend = [];"#;
        let series = parse_chart_payload("000001", text).unwrap();
        assert_eq!(series.name, "测试基金");
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[0].0, 1698019200000);
        assert_eq!(series.points[1].1, Decimal::from_str("1.12").unwrap());
    }

    #[test]
    fn chart_payload_without_trend_yields_code_and_empty_series() {
        let series = parse_chart_payload("000001", "var fS_code = \"000001\";").unwrap();
        assert_eq!(series.name, "000001");
        assert!(series.points.is_empty());
    }
}
