// Copyright (c) 2025 Fundtrack Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod fund;
pub mod portfolio;
pub mod tx;
pub mod watchlist;
