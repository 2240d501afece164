// Copyright (c) 2025 Fundtrack Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod calendar;
pub mod cli;
pub mod commands;
pub mod db;
pub mod format;
pub mod models;
pub mod portfolio;
pub mod quotes;
pub mod utils;
pub mod valuation;
