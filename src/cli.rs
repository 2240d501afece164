// Copyright (c) 2025 Fundtrack Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Command, arg, command, value_parser};

pub fn build_cli() -> Command {
    command!()
        .about("Personal mutual-fund ledger, valuation, and watchlist")
        .subcommand(Command::new("init").about("Initialize the local database"))
        .subcommand(tx_cmd())
        .subcommand(portfolio_cmd())
        .subcommand(watchlist_cmd())
        .subcommand(fund_cmd())
}

fn tx_cmd() -> Command {
    Command::new("tx")
        .about("Record and maintain ledger transactions")
        .subcommand(
            Command::new("buy")
                .about("Record a buy order")
                .arg(arg!(--code <CODE> "Fund code").required(true))
                .arg(arg!(--name [NAME] "Fund display name"))
                .arg(arg!(--amount <AMOUNT> "Gross cash amount, fees included").required(true))
                .arg(arg!(--"fee-rate" [RATE] "Subscription fee rate in percent").default_value("0"))
                .arg(arg!(--nav <NAV> "NAV used for the order").required(true))
                .arg(arg!(--date [DATE] "Order date, YYYY-MM-DD (default today)"))
                .arg(arg!(--"after-cutoff" "Order placed after the 15:00 cutoff"))
                .arg(
                    arg!(--"settle-days" [N] "Trading days until confirmation")
                        .value_parser(value_parser!(u32))
                        .default_value("1"),
                )
                .arg(arg!(--watch "Also add the fund to the watchlist")),
        )
        .subcommand(
            Command::new("sell")
                .about("Record a sell order")
                .arg(arg!(--code <CODE> "Fund code").required(true))
                .arg(arg!(--shares <SHARES> "Units to redeem").required(true))
                .arg(arg!(--nav <NAV> "NAV used for the order").required(true))
                .arg(arg!(--date [DATE] "Order date, YYYY-MM-DD (default today)"))
                .arg(arg!(--"after-cutoff" "Order placed after the 15:00 cutoff"))
                .arg(
                    arg!(--"settle-days" [N] "Trading days until confirmation")
                        .value_parser(value_parser!(u32))
                        .default_value("1"),
                )
                .arg(arg!(--watch "Also add the fund to the watchlist")),
        )
        .subcommand(
            Command::new("list")
                .about("List recorded transactions")
                .arg(arg!(--code [CODE] "Only this fund"))
                .arg(arg!(--limit [N] "Max rows").value_parser(value_parser!(usize)))
                .arg(arg!(--json "Output JSON"))
                .arg(arg!(--jsonl "Output JSON lines")),
        )
        .subcommand(
            Command::new("revoke")
                .about("Delete one transaction by id")
                .arg(arg!(--id <ID> "Transaction id").value_parser(value_parser!(i64)).required(true)),
        )
        .subcommand(
            Command::new("clear")
                .about("Delete all transactions for a fund")
                .arg(arg!(--code <CODE> "Fund code").required(true)),
        )
}

fn portfolio_cmd() -> Command {
    Command::new("portfolio")
        .about("Current holdings and valuation")
        .subcommand(
            Command::new("holdings")
                .about("Holdings snapshot merged with quotes")
                .arg(arg!(--live "Fetch live quotes before merging"))
                .arg(arg!(--json "Output JSON"))
                .arg(arg!(--jsonl "Output JSON lines")),
        )
        .subcommand(
            Command::new("summary")
                .about("Aggregate portfolio metrics")
                .arg(arg!(--live "Fetch live quotes before merging"))
                .arg(arg!(--json "Output JSON")),
        )
}

fn watchlist_cmd() -> Command {
    Command::new("watchlist")
        .about("Funds followed without a position")
        .subcommand(
            Command::new("add")
                .about("Follow a fund")
                .arg(arg!(--code <CODE> "Fund code").required(true))
                .arg(arg!(--name [NAME] "Fund display name")),
        )
        .subcommand(
            Command::new("remove")
                .about("Stop following a fund")
                .arg(arg!(--code <CODE> "Fund code").required(true)),
        )
        .subcommand(
            Command::new("list")
                .about("List followed funds")
                .arg(arg!(--live "Fetch live quotes"))
                .arg(arg!(--json "Output JSON")),
        )
}

fn fund_cmd() -> Command {
    Command::new("fund")
        .about("Fund directory and history lookups")
        .subcommand(
            Command::new("search")
                .about("Search the fund directory")
                .arg(arg!(<KEYWORD> "Code, name, abbreviation, or pinyin"))
                .arg(arg!(--json "Output JSON"))
                .arg(arg!(--jsonl "Output JSON lines")),
        )
        .subcommand(
            Command::new("history")
                .about("Paginated historical NAVs")
                .arg(arg!(--code <CODE> "Fund code").required(true))
                .arg(
                    arg!(--page [N] "Page index, 1-based")
                        .value_parser(value_parser!(u32))
                        .default_value("1"),
                )
                .arg(
                    arg!(--"page-size" [N] "Rows per page")
                        .value_parser(value_parser!(u32))
                        .default_value("20"),
                )
                .arg(arg!(--json "Output JSON")),
        )
        .subcommand(
            Command::new("chart")
                .about("Full NAV series for charting")
                .arg(arg!(--code <CODE> "Fund code").required(true))
                .arg(
                    arg!(--limit [N] "Show only the trailing N points")
                        .value_parser(value_parser!(usize))
                        .default_value("30"),
                )
                .arg(arg!(--json "Output the full series as JSON")),
        )
}
