// Copyright (c) 2025 Fundtrack Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Pure fold from the transaction ledger to a point-in-time holdings
//! snapshot. No I/O, no shared state; safe to call from anywhere.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::models::{Holding, Transaction, TxKind};

/// Positions whose folded amount falls at or below this value are
/// considered fully exited and dropped from the snapshot.
pub fn closed_position_epsilon() -> Decimal {
    Decimal::new(1, 2)
}

/// The instant a transaction becomes part of holdings: its settlement
/// date when recorded, otherwise the order date.
pub fn effective_instant(tx: &Transaction) -> NaiveDateTime {
    tx.confirmation_time.unwrap_or(tx.time)
}

/// Fold the ledger into holdings as of `as_of`.
///
/// Entries whose effective instant is strictly after `as_of` are pending
/// and excluded. Included entries fold in ascending order-date order
/// (ties broken by id): a sell's `share_ratio` was computed against the
/// holding as it stood when the sell was placed, so settlement order must
/// not reshuffle the fold.
pub fn project(transactions: &[Transaction], as_of: NaiveDateTime) -> Vec<Holding> {
    let mut included: Vec<&Transaction> = transactions
        .iter()
        .filter(|tx| effective_instant(tx) <= as_of)
        .collect();
    included.sort_by(|a, b| a.time.cmp(&b.time).then(a.id.cmp(&b.id)));

    let mut book: HashMap<&str, Holding> = HashMap::new();
    for tx in included {
        let holding = book
            .entry(tx.fund_code.as_str())
            .or_insert_with(|| Holding::new(&tx.fund_code, tx.name.clone()));
        apply(holding, tx);
    }

    let eps = closed_position_epsilon();
    let mut holdings: Vec<Holding> = book.into_values().filter(|h| h.amount > eps).collect();
    holdings.sort_by(|a, b| a.code.cmp(&b.code));
    holdings
}

fn apply(h: &mut Holding, tx: &Transaction) {
    match tx.kind {
        TxKind::Buy => {
            h.amount += tx.amount.unwrap_or(Decimal::ZERO);
            h.cost += tx.cost.unwrap_or(Decimal::ZERO);
            h.shares += tx.shares.unwrap_or(Decimal::ZERO);
            if tx.name.is_some() {
                h.name = tx.name.clone();
            }
        }
        TxKind::Sell => {
            if let Some(shares) = tx.shares {
                if shares > Decimal::ZERO {
                    h.shares -= shares;
                }
            }
            // Fallback tiers for the redeemed value: redeem_amount,
            // then the legacy amount field, then zero.
            let redeemed = tx.redeem_amount.or(tx.amount).unwrap_or(Decimal::ZERO);
            h.amount -= redeemed;
            match tx.share_ratio {
                Some(ratio) => h.cost -= h.cost * ratio,
                None => h.cost -= redeemed,
            }
        }
    }
    clamp(h);
}

// Over-redemption is silently corrected to an empty position rather than
// rejected; the clamped flag keeps the correction auditable.
fn clamp(h: &mut Holding) {
    if h.amount < Decimal::ZERO {
        h.amount = Decimal::ZERO;
        h.clamped = true;
    }
    if h.shares < Decimal::ZERO {
        h.shares = Decimal::ZERO;
        h.clamped = true;
    }
    if h.cost < Decimal::ZERO {
        h.cost = Decimal::ZERO;
        h.clamped = true;
    }
}
