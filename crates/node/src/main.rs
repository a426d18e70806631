// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0
use clap::{Parser, Subcommand};
use log::error;
use std::path::PathBuf;

use pokerchain_core::crypto::Address;
use pokerchain_node::{Command, Config};

#[derive(Debug, Parser)]
struct Cli {
    /// The database path, defaults to the user data directory.
    #[clap(long)]
    db: Option<PathBuf>,
    /// The bridge address allowed to mint deposits.
    #[clap(long)]
    bridge: Option<String>,
    #[clap(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Replay a table events file and print the final table state.
    Replay {
        /// The replay JSON file.
        file: PathBuf,
    },
    /// Print an account balance and nonce.
    Account {
        /// The account address.
        address: String,
    },
    /// Print the latest applied transactions.
    History {
        /// Only show transactions sent or received by this address.
        address: Option<String>,
        /// Number of transactions.
        #[clap(long, short, default_value_t = 20, value_parser = clap::value_parser!(u16).range(1..=1000))]
        count: u16,
    },
}

#[tokio::main]
async fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let db_path = match cli.db {
        Some(path) => path,
        None => match Config::default_db_path() {
            Ok(path) => path,
            Err(e) => {
                error!("{e}");
                return;
            }
        },
    };

    let command = match cli.command {
        CliCommand::Replay { file } => Command::Replay { file },
        CliCommand::Account { address } => Command::Account {
            address: Address::new(address),
        },
        CliCommand::History { address, count } => Command::History {
            address: address.map(Address::new),
            count: count as usize,
        },
    };

    let config = Config {
        db_path,
        bridge: cli.bridge.map(Address::new),
        command,
    };

    if let Err(e) = pokerchain_node::run(config).await {
        error!("{e}");
    }
}
