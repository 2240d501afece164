// Copyright (c) 2025 Fundtrack Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Trading-day arithmetic for order effectiveness and T+N settlement.
//!
//! A trading day is Monday through Friday. Market holidays are not
//! modelled; without a holiday calendar this module only rolls weekends
//! forward, never backward.

use chrono::{Datelike, Days, NaiveDate, Weekday};

pub fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn add_days(date: NaiveDate, n: u64) -> NaiveDate {
    // Saturates at the calendar boundary instead of panicking.
    date.checked_add_days(Days::new(n)).unwrap_or(date)
}

/// Smallest trading day >= `date`. A date that already is a trading day
/// is returned unchanged.
pub fn next_trading_day(date: NaiveDate) -> NaiveDate {
    let mut current = date;
    while !is_trading_day(current) {
        current = add_days(current, 1);
    }
    current
}

/// The date an order placed on `selected` is effectively submitted.
///
/// Orders landing on a non-trading day count as placed at the start of
/// the next trading day, so the cutoff flag is ignored in that branch.
/// On a trading day, an order after the late-afternoon cutoff counts as
/// the next trading day strictly after `selected`.
pub fn effective_date(selected: NaiveDate, after_cutoff: bool) -> NaiveDate {
    if !is_trading_day(selected) {
        return next_trading_day(selected);
    }
    if after_cutoff {
        return next_trading_day(add_days(selected, 1));
    }
    selected
}

/// The n-th trading day strictly after `effective` (T+N, default use is
/// n = 1 for T+1 settlement).
pub fn confirmation_date(effective: NaiveDate, n: u32) -> NaiveDate {
    let mut current = effective;
    let mut counted = 0;
    while counted < n {
        current = add_days(current, 1);
        if is_trading_day(current) {
            counted += 1;
        }
    }
    current
}
