// Copyright (c) 2025 Fundtrack Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Human-readable rendering of single ledger entries. Pure and stateless;
//! the sell branches encode the legacy fallback rules and are tested as
//! their own unit.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Transaction, TxKind};

#[derive(Debug, Clone, Serialize)]
pub struct TxDisplay {
    pub is_buy: bool,
    pub type_label: &'static str,
    pub main: String,
    pub sub: Option<String>,
}

pub fn yuan(value: Decimal) -> String {
    format!("¥{:.2}", value)
}

/// Profit-style rendering: sign up front, magnitude after the ¥.
pub fn signed_yuan(value: Decimal) -> String {
    if value > Decimal::ZERO {
        format!("+¥{:.2}", value)
    } else if value < Decimal::ZERO {
        format!("-¥{:.2}", value.abs())
    } else {
        "¥0.00".to_string()
    }
}

pub fn signed_percent(value: Decimal) -> String {
    if value > Decimal::ZERO {
        format!("+{:.2}%", value)
    } else {
        format!("{:.2}%", value)
    }
}

pub fn format_transaction(tx: &Transaction) -> TxDisplay {
    if tx.kind == TxKind::Buy {
        return TxDisplay {
            is_buy: true,
            type_label: "买入",
            main: yuan(tx.amount.unwrap_or(Decimal::ZERO)),
            sub: None,
        };
    }

    // Zero shares count as absent, matching legacy records.
    let shares = tx.shares.filter(|s| !s.is_zero());
    match shares {
        Some(shares) => {
            // Redeemed value tiers: shares x nav at sell, then the stored
            // gross redeem value, then the legacy amount field, then 0.
            let value = match tx.nav_at_sell {
                Some(nav) => shares * nav,
                None => tx.redeem_amount.or(tx.amount).unwrap_or(Decimal::ZERO),
            };
            TxDisplay {
                is_buy: false,
                type_label: "卖出",
                main: format!("{:.2}份", shares),
                sub: Some(format!("≈ {}", yuan(value))),
            }
        }
        None => TxDisplay {
            is_buy: false,
            type_label: "卖出",
            main: yuan(tx.redeem_amount.or(tx.amount).unwrap_or(Decimal::ZERO)),
            sub: None,
        },
    }
}
