// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Pokerchain node.
//!
//! A deterministic Texas Hold'em table engine, the mempool that admits signed
//! transactions and the account ledger they settle into.
#![warn(clippy::all, rust_2018_idioms, missing_docs)]
use anyhow::Result;
use log::info;
use std::{fs, path::Path};

use pokerchain_core::crypto::Address;

pub mod config;
pub use config::{Command, Config};
pub mod db;
pub mod errors;
pub mod game;
pub mod ledger;
pub mod mempool;
pub mod node;
pub mod replay;
pub mod table;

use db::Db;
use ledger::AccountLedger;
use replay::ReplayFile;

/// Runs a node command.
pub async fn run(config: Config) -> Result<()> {
    match config.command {
        Command::Replay { file } => {
            let file = ReplayFile::load(&file)?;
            info!(
                "Replaying {} events for table {}",
                file.events.len(),
                file.address
            );

            let engine = file.replay()?;
            let dto = engine.to_dto(None);
            println!("{}", serde_json::to_string_pretty(&dto)?);
        }
        Command::Account { address } => {
            let ledger = open_ledger(&config.db_path, config.bridge)?;
            let account = ledger.get_account(&address).await?;
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
        Command::History { address, count } => {
            let ledger = open_ledger(&config.db_path, config.bridge)?;
            let txs = match address {
                Some(address) => ledger.account_transactions(&address, count).await?,
                None => ledger.recent_transactions(count).await?,
            };

            for tx in txs {
                println!("{}", serde_json::to_string(&tx)?);
            }
        }
    }

    Ok(())
}

fn open_ledger(path: &Path, bridge: Option<Address>) -> Result<AccountLedger> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    info!("Opening database {}", path.display());
    let db = Db::open(path)?;
    Ok(AccountLedger::new(db, bridge))
}
