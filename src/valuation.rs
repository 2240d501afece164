// Copyright (c) 2025 Fundtrack Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Merges a holdings snapshot with live quotes into display metrics, and
//! keeps the per-code quote book with a staleness guard.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{Holding, Quote};
use crate::portfolio::closed_position_epsilon;

/// Per-code quote book. Each fetch result is an independent idempotent
/// upsert; a response carrying an older request sequence than the newest
/// completed one for its code is discarded, so a slow stale response can
/// never overwrite fresher data.
#[derive(Debug, Default)]
pub struct QuoteStore {
    entries: HashMap<String, (u64, Quote)>,
    next_seq: u64,
}

impl QuoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticket for an outgoing fetch; pass it back to [`complete`].
    ///
    /// [`complete`]: QuoteStore::complete
    pub fn begin_request(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Record a fetch result. Returns false when the response lost the
    /// race against a newer completion for the same code.
    pub fn complete(&mut self, code: &str, seq: u64, quote: Quote) -> bool {
        if let Some((newest, _)) = self.entries.get(code) {
            if *newest > seq {
                warn!(code, seq, newest, "discarding stale quote response");
                return false;
            }
        }
        debug!(code, seq, "quote updated");
        self.entries.insert(code.to_string(), (seq, quote));
        true
    }

    /// Upsert without a prior ticket, for strictly sequential callers.
    pub fn upsert(&mut self, quote: Quote) {
        let seq = self.begin_request();
        let code = quote.code.clone();
        self.complete(&code, seq, quote);
    }

    pub fn get(&self, code: &str) -> Option<&Quote> {
        self.entries.get(code).map(|(_, q)| q)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Price used for valuation, by explicit priority: live estimate, then
/// prior-day NAV, then 1 (no data yet; yields a zero-change display).
pub fn current_price(quote: &Quote) -> Decimal {
    quote.gsz.or(quote.nav).unwrap_or(Decimal::ONE)
}

/// Estimated percent change, zero when absent or unparseable upstream.
pub fn change_percent(quote: &Quote) -> Decimal {
    quote.gszzl.unwrap_or(Decimal::ZERO)
}

#[derive(Debug, Clone, Serialize)]
pub struct HoldingView {
    pub code: String,
    pub name: Option<String>,
    pub amount: Decimal,
    pub shares: Decimal,
    pub cost: Decimal,
    pub has_quote: bool,
    pub change_pct: Decimal,
    pub current_valuation: Decimal,
    pub day_profit: Decimal,
    pub total_profit: Decimal,
    pub total_profit_rate: Decimal,
    pub clamped: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PortfolioSummary {
    pub total_amount: Decimal,
    pub total_cost: Decimal,
    pub day_profit: Decimal,
    pub day_profit_rate: Decimal,
    pub total_profit: Decimal,
    pub total_profit_rate: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioView {
    pub rows: Vec<HoldingView>,
    pub summary: PortfolioSummary,
}

pub fn merge_holding(holding: &Holding, quote: Option<&Quote>) -> HoldingView {
    let eps = closed_position_epsilon();
    let (current_valuation, day_profit, change_pct) = match quote {
        Some(q) => {
            let change_pct = change_percent(q);
            let growth = Decimal::ONE + change_pct / Decimal::ONE_HUNDRED;
            let current = if holding.shares > Decimal::ZERO {
                holding.shares * current_price(q)
            } else {
                // Legacy position without share tracking: back an implied
                // value out of the percent change alone.
                holding.amount * growth
            };
            let yesterday = if growth.is_zero() {
                current
            } else {
                current / growth
            };
            (current, current - yesterday, change_pct)
        }
        // No quote yet: raw amount, zero day change, never excluded.
        None => (holding.amount, Decimal::ZERO, Decimal::ZERO),
    };
    let total_profit = current_valuation - holding.cost;
    let total_profit_rate = if holding.cost > eps {
        total_profit / holding.cost * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };
    HoldingView {
        code: holding.code.clone(),
        name: holding.name.clone(),
        amount: holding.amount,
        shares: holding.shares,
        cost: holding.cost,
        has_quote: quote.is_some(),
        change_pct,
        current_valuation,
        day_profit,
        total_profit,
        total_profit_rate,
        clamped: holding.clamped,
    }
}

pub fn merge(holdings: &[Holding], quotes: &QuoteStore) -> PortfolioView {
    let eps = closed_position_epsilon();
    let rows: Vec<HoldingView> = holdings
        .iter()
        .map(|h| merge_holding(h, quotes.get(&h.code)))
        .collect();

    let mut summary = PortfolioSummary::default();
    for row in &rows {
        summary.total_amount += row.current_valuation;
        summary.total_cost += row.cost;
        summary.day_profit += row.day_profit;
    }
    summary.total_profit = summary.total_amount - summary.total_cost;
    summary.total_profit_rate = if summary.total_cost > eps {
        summary.total_profit / summary.total_cost * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };
    let start_of_day = summary.total_amount - summary.day_profit;
    summary.day_profit_rate = if start_of_day > eps {
        summary.day_profit / start_of_day * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    PortfolioView { rows, summary }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn holding(code: &str, amount: &str, shares: &str, cost: &str) -> Holding {
        Holding {
            code: code.to_string(),
            name: Some(format!("Fund {}", code)),
            amount: dec(amount),
            shares: dec(shares),
            cost: dec(cost),
            clamped: false,
        }
    }

    fn quote(code: &str, nav: &str, gsz: Option<&str>, gszzl: Option<&str>) -> Quote {
        Quote {
            code: code.to_string(),
            name: None,
            nav: Some(dec(nav)),
            nav_date: None,
            gsz: gsz.map(dec),
            gszzl: gszzl.map(dec),
            gztime: None,
        }
    }

    #[test]
    fn price_prefers_live_estimate_then_nav_then_one() {
        assert_eq!(
            current_price(&quote("1", "1.5", Some("1.6"), None)),
            dec("1.6")
        );
        assert_eq!(current_price(&quote("1", "1.5", None, None)), dec("1.5"));
        let bare = Quote {
            code: "1".into(),
            name: None,
            nav: None,
            nav_date: None,
            gsz: None,
            gszzl: None,
            gztime: None,
        };
        assert_eq!(current_price(&bare), Decimal::ONE);
    }

    #[test]
    fn share_holding_values_at_current_price() {
        let h = holding("000001", "1000", "1000", "1000");
        let q = quote("000001", "1.00", Some("1.10"), Some("10"));
        let view = merge_holding(&h, Some(&q));
        assert_eq!(view.current_valuation, dec("1100"));
        assert_eq!(view.day_profit, dec("100"));
        assert_eq!(view.total_profit, dec("100"));
        assert_eq!(view.total_profit_rate, dec("10"));
    }

    #[test]
    fn legacy_holding_backs_value_out_of_percent_change() {
        let h = holding("000001", "1000", "0", "1000");
        let q = quote("000001", "1.00", Some("1.10"), Some("2"));
        let view = merge_holding(&h, Some(&q));
        assert_eq!(view.current_valuation, dec("1020"));
        assert_eq!(view.day_profit, dec("20"));
    }

    #[test]
    fn day_profit_matches_yesterday_valuation_identity() {
        let h = holding("000001", "1000", "814.3", "1000");
        let q = quote("000001", "1.2275", Some("1.2391"), Some("0.94"));
        let view = merge_holding(&h, Some(&q));
        let current = view.current_valuation;
        let growth = Decimal::ONE + dec("0.94") / Decimal::ONE_HUNDRED;
        let alt = current - current / growth;
        let diff = (view.day_profit - alt).abs();
        assert!(diff < dec("0.000001"), "diff {}", diff);
    }

    #[test]
    fn pathological_minus_hundred_percent_treated_as_flat() {
        let h = holding("000001", "1000", "1000", "1000");
        let q = quote("000001", "1.00", Some("0"), Some("-100"));
        let view = merge_holding(&h, Some(&q));
        assert_eq!(view.day_profit, Decimal::ZERO);
    }

    #[test]
    fn missing_quote_contributes_raw_amount_with_zero_change() {
        let holdings = vec![
            holding("000001", "1000", "1000", "900"),
            holding("000002", "500", "500", "600"),
        ];
        let mut store = QuoteStore::new();
        store.upsert(quote("000001", "1.00", Some("1.10"), Some("10")));

        let view = merge(&holdings, &store);
        assert_eq!(view.rows.len(), 2);
        let degraded = &view.rows[1];
        assert!(!degraded.has_quote);
        assert_eq!(degraded.current_valuation, dec("500"));
        assert_eq!(degraded.day_profit, Decimal::ZERO);

        assert_eq!(view.summary.total_amount, dec("1600"));
        assert_eq!(view.summary.total_cost, dec("1500"));
        assert_eq!(view.summary.day_profit, dec("100"));
        assert_eq!(view.summary.total_profit, dec("100"));
    }

    #[test]
    fn day_profit_rate_uses_start_of_day_denominator() {
        let holdings = vec![holding("000001", "1000", "1000", "1000")];
        let mut store = QuoteStore::new();
        store.upsert(quote("000001", "1.00", Some("1.10"), Some("10")));
        let view = merge(&holdings, &store);
        // 100 profit over a 1000 start-of-day value.
        assert_eq!(view.summary.day_profit_rate, dec("10"));
    }

    #[test]
    fn empty_portfolio_summary_is_all_zero() {
        let view = merge(&[], &QuoteStore::new());
        assert!(view.rows.is_empty());
        assert_eq!(view.summary.total_amount, Decimal::ZERO);
        assert_eq!(view.summary.day_profit_rate, Decimal::ZERO);
        assert_eq!(view.summary.total_profit_rate, Decimal::ZERO);
    }

    #[test]
    fn stale_quote_response_is_rejected() {
        let mut store = QuoteStore::new();
        let slow = store.begin_request();
        let fast = store.begin_request();
        assert!(store.complete("000001", fast, quote("000001", "1.20", None, None)));
        // The earlier request finishes last; it must not win.
        assert!(!store.complete("000001", slow, quote("000001", "1.10", None, None)));
        assert_eq!(store.get("000001").unwrap().nav, Some(dec("1.20")));
    }

    #[test]
    fn repeated_upserts_are_last_write_wins() {
        let mut store = QuoteStore::new();
        store.upsert(quote("000001", "1.10", None, None));
        store.upsert(quote("000001", "1.20", None, None));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("000001").unwrap().nav, Some(dec("1.20")));
    }
}
