// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Node configuration.
use anyhow::{Result, anyhow};
use directories::ProjectDirs;
use std::path::PathBuf;

use pokerchain_core::crypto::Address;

/// The node configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The database path.
    pub db_path: PathBuf,
    /// The bridge address allowed to mint deposits.
    pub bridge: Option<Address>,
    /// The command to run.
    pub command: Command,
}

/// A node command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replays a table events file and prints the final table state.
    Replay {
        /// The replay file.
        file: PathBuf,
    },
    /// Prints an account state.
    Account {
        /// The account address.
        address: Address,
    },
    /// Prints the latest transactions.
    History {
        /// Only show the transactions involving this address.
        address: Option<Address>,
        /// Number of transactions.
        count: usize,
    },
}

impl Config {
    /// The default database path in the user data directory.
    pub fn default_db_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "pokerchain")
            .ok_or_else(|| anyhow!("Cannot find the user home directory"))?;
        Ok(dirs.data_dir().join("pokerchain.db"))
    }
}
