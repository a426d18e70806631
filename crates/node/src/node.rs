// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Node service.
use ahash::AHashMap;
use anyhow::Result;
use log::{error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;

use pokerchain_core::{
    crypto::{Address, SigningKey},
    poker::Chips,
    transaction::{Transaction, TxHash, TxKind},
};

use crate::{
    db::Db,
    game::{GameEngine, TableConfig},
    ledger::{Account, AccountLedger, LedgerError},
    mempool::{Mempool, MempoolError},
    table::Table,
};

/// A transaction dropped from the mempool at commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    /// The transaction hash.
    pub hash: TxHash,
    /// Why the ledger rejected it.
    pub reason: String,
}

/// The outcome of a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Number of transactions applied to the ledger.
    pub applied: usize,
    /// Transactions rejected by the ledger.
    pub rejected: Vec<Rejected>,
}

/// The node services.
#[derive(Debug)]
pub struct Node {
    sk: Arc<SigningKey>,
    db: Db,
    ledger: AccountLedger,
    mempool: Mempool,
    tables: Mutex<AHashMap<Address, Table>>,
}

impl Node {
    /// Creates a node.
    pub fn new(sk: SigningKey, db: Db, ledger: AccountLedger, mempool: Mempool) -> Self {
        info!("Node {} started", sk.address());

        Self {
            sk: Arc::new(sk),
            db,
            ledger,
            mempool,
            tables: Mutex::new(AHashMap::default()),
        }
    }

    /// The node accounts ledger.
    pub fn ledger(&self) -> &AccountLedger {
        &self.ledger
    }

    /// Adds a transaction to the mempool.
    pub fn submit(&self, tx: Transaction) -> Result<TxHash, MempoolError> {
        self.mempool
            .add(tx)
            .inspect_err(|e| warn!("Rejected transaction: {e}"))
    }

    /// Returns the pending transactions.
    pub fn mempool(&self) -> Vec<Transaction> {
        self.mempool.transactions()
    }

    /// Applies the pending transactions to the ledger.
    ///
    /// The pending set is applied as one batch, a transaction the ledger
    /// rejects is dropped and the rest of the set is applied again. Storage
    /// errors leave the mempool untouched.
    pub async fn commit_pending(&self) -> Result<CommitReport, LedgerError> {
        let mut report = CommitReport::default();

        loop {
            let txs = self.mempool.transactions();
            if txs.is_empty() {
                break;
            }

            match self.ledger.apply_transactions(txs.clone()).await {
                Ok(()) => {
                    let hashes = txs.iter().map(Transaction::hash).collect::<Vec<_>>();
                    self.mempool.remove(&hashes);
                    report.applied += txs.len();

                    self.seat_joins(&txs).await;
                    break;
                }
                Err(LedgerError::BatchFailed { index, source }) if !source.is_retryable() => {
                    let hash = txs[index].hash();
                    warn!("Rejected transaction {hash}: {source}");

                    self.mempool.remove(&[hash]);
                    report.rejected.push(Rejected {
                        hash,
                        reason: source.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Committed {} transactions, rejected {}",
            report.applied,
            report.rejected.len()
        );

        Ok(report)
    }

    /// Seats the players of applied join transactions, their buy-in is already
    /// in the table account.
    async fn seat_joins(&self, txs: &[Transaction]) {
        for tx in txs {
            let TxKind::Join { seat } = tx.kind() else {
                continue;
            };

            match (self.table(tx.to()), Chips::try_from(tx.value())) {
                (Some(table), Ok(buy_in)) => {
                    // The table refunds the buy-in if the player cannot be seated.
                    if let Err(e) = table.seat_paid(tx.from(), buy_in, seat).await {
                        warn!("Join {} from {} failed: {e}", tx.hash(), tx.from());
                    }
                }
                _ => {
                    warn!("Join {} for unknown table {}", tx.hash(), tx.to());

                    let res = self
                        .ledger
                        .transfer(tx.to(), tx.from(), tx.value().clone())
                        .await;
                    if let Err(e) = res {
                        error!("Join {} refund failed: {e}", tx.hash());
                    }
                }
            }
        }
    }

    /// Gets an account state.
    pub async fn account(&self, address: &Address) -> Result<Account, LedgerError> {
        self.ledger.get_account(address).await
    }

    /// Opens a table, restoring its saved state if there is one.
    pub async fn open_table(&self, address: Address, config: TableConfig) -> Result<Table> {
        if let Some(table) = self.table(&address) {
            return Ok(table);
        }

        let engine = match self.db.load_table(address.clone()).await? {
            Some(state) => {
                info!("Restoring table {address}");
                GameEngine::from_json(&state)?
            }
            None => GameEngine::new(address.clone(), config)?,
        };

        let mut tables = self.tables.lock();
        let table = tables.entry(address).or_insert_with(|| {
            Table::new(
                engine,
                self.sk.clone(),
                self.ledger.clone(),
                self.db.clone(),
            )
        });

        Ok(table.clone())
    }

    /// Gets an open table.
    pub fn table(&self, address: &Address) -> Option<Table> {
        self.tables.lock().get(address).cloned()
    }
}
