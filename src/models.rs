// Copyright (c) 2025 Fundtrack Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::bail;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Buy,
    Sell,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Buy => "buy",
            TxKind::Sell => "sell",
        }
    }
}

impl std::str::FromStr for TxKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(TxKind::Buy),
            "sell" => Ok(TxKind::Sell),
            other => bail!("Unknown transaction kind '{}'", other),
        }
    }
}

/// One ledger entry. Immutable once recorded; the ledger is append-only
/// apart from revoking an entry by id or clearing a fund outright.
///
/// `time` is the order date, `confirmation_time` the settlement date on
/// which the entry becomes economically effective. Monetary fields are
/// optional because legacy records predate share tracking; absent fields
/// fold as zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub kind: TxKind,
    pub fund_code: String,
    pub name: Option<String>,
    pub time: NaiveDateTime,
    pub confirmation_time: Option<NaiveDateTime>,
    /// Buy: net cash deployed after fees. Sell: legacy fallback for the
    /// redeemed value.
    pub amount: Option<Decimal>,
    pub shares: Option<Decimal>,
    /// Buy: gross principal contributed (amount + fee).
    pub cost: Option<Decimal>,
    pub nav_at_buy: Option<Decimal>,
    /// Sell: fraction of the pre-sale holding's cost basis being removed.
    pub share_ratio: Option<Decimal>,
    /// Sell: gross cash value of the shares sold.
    pub redeem_amount: Option<Decimal>,
    pub nav_at_sell: Option<Decimal>,
}

/// Derived position in one fund. Never stored; recomputed from the ledger
/// on every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub code: String,
    pub name: Option<String>,
    pub amount: Decimal,
    pub shares: Decimal,
    pub cost: Decimal,
    /// True when an over-redeeming sell was clamped to zero while folding
    /// this holding. Surfaced for auditability, not an error.
    pub clamped: bool,
}

impl Holding {
    pub fn new(code: &str, name: Option<String>) -> Self {
        Holding {
            code: code.to_string(),
            name,
            amount: Decimal::ZERO,
            shares: Decimal::ZERO,
            cost: Decimal::ZERO,
            clamped: false,
        }
    }
}

/// Live estimated valuation for one fund. Ephemeral, refreshed per poll,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub code: String,
    pub name: Option<String>,
    /// Prior-day settled NAV.
    pub nav: Option<Decimal>,
    pub nav_date: Option<NaiveDate>,
    /// Live estimated NAV.
    pub gsz: Option<Decimal>,
    /// Live estimated percent change.
    pub gszzl: Option<Decimal>,
    /// Estimate timestamp, as reported by the feed.
    pub gztime: Option<String>,
}

/// Directory row used for fund search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundInfo {
    pub code: String,
    pub abbr: String,
    pub name: String,
    pub category: String,
    pub pinyin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchEntry {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavRecord {
    pub date: NaiveDate,
    pub nav: Option<Decimal>,
    pub cumulative_nav: Option<Decimal>,
    pub daily_change_pct: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavHistoryPage {
    pub records: Vec<NavRecord>,
    pub total: u64,
}

/// Full NAV series for charting: (millisecond timestamp, nav).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<(i64, Decimal)>,
}
