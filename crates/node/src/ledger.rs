// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Account balances and nonces.
use log::{info, warn};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinError;

use pokerchain_core::{
    amount::{Amount, parse_amount, serde_decimal},
    crypto::Address,
    transaction::{Transaction, TxError, TxKind},
};

use crate::db::{self, AccountRow, Db};

/// Ledger errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// An amount string is not a non negative decimal number.
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),
    /// The account balance is lower than the amount to debit.
    #[error("insufficient funds for {address}: balance {balance}, needed {needed}")]
    InsufficientFunds {
        /// The debited account.
        address: Address,
        /// The account balance.
        balance: Amount,
        /// The amount to debit.
        needed: Amount,
    },
    /// The transaction nonce is not the next account nonce.
    #[error("invalid nonce for {address}: expected {expected}, got {got}")]
    InvalidNonce {
        /// The sender account.
        address: Address,
        /// The expected nonce.
        expected: u64,
        /// The transaction nonce.
        got: u64,
    },
    /// The transaction signature or content is not valid.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(#[from] TxError),
    /// Only the bridge can mint.
    #[error("{0} is not allowed to mint")]
    Unauthorized(Address),
    /// A database error.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    /// A blocking task failed.
    #[error("task error: {0}")]
    Task(#[from] JoinError),
    /// A batch transaction failed and the batch was rolled back.
    #[error("transaction {index} failed: {source}")]
    BatchFailed {
        /// The index of the failed transaction in the batch.
        index: usize,
        /// The transaction error.
        source: Box<LedgerError>,
    },
}

impl LedgerError {
    /// Checks if the error is caused by storage and the operation can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::Storage(_) | LedgerError::Task(_) => true,
            LedgerError::BatchFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// An account state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// The account address.
    pub address: Address,
    /// The account balance.
    #[serde(with = "serde_decimal")]
    pub balance: Amount,
    /// The nonce of the last applied transaction.
    pub nonce: u64,
}

/// The accounts ledger.
///
/// Every update runs in a single SQLite transaction so a failure leaves all
/// balances and nonces unchanged. The bridge address is where deposits come
/// from and its balance is not tracked.
#[derive(Debug, Clone)]
pub struct AccountLedger {
    db: Db,
    bridge: Option<Address>,
}

impl AccountLedger {
    /// Creates a ledger.
    pub fn new(db: Db, bridge: Option<Address>) -> Self {
        Self { db, bridge }
    }

    /// The bridge address.
    pub fn bridge(&self) -> Option<&Address> {
        self.bridge.as_ref()
    }

    /// Gets an account, unknown accounts have zero balance and nonce.
    pub async fn get_account(&self, address: &Address) -> Result<Account, LedgerError> {
        let address = address.clone();
        self.db
            .blocking(move |conn| {
                let row = read(conn, &address)?;
                Ok(Account {
                    address,
                    balance: row.balance,
                    nonce: row.nonce,
                })
            })
            .await
    }

    /// Adds to an account balance.
    pub async fn increment_balance(
        &self,
        address: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let address = address.clone();
        let bridge = self.bridge.clone();
        self.db
            .blocking(move |conn| {
                let tx = conn.transaction()?;
                credit(&tx, bridge.as_ref(), &address, &amount)?;
                tx.commit()?;
                Ok(())
            })
            .await
    }

    /// Subtracts from an account balance, the balance is unchanged on failure.
    pub async fn decrement_balance(
        &self,
        address: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let address = address.clone();
        let bridge = self.bridge.clone();
        self.db
            .blocking(move |conn| {
                let tx = conn.transaction()?;
                debit(&tx, bridge.as_ref(), &address, &amount)?;
                tx.commit()?;
                Ok(())
            })
            .await
    }

    /// Moves funds between two accounts without touching nonces.
    ///
    /// Used to settle buy-ins and cash-outs with a table escrow address.
    pub async fn transfer(
        &self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let (from, to) = (from.clone(), to.clone());
        let bridge = self.bridge.clone();
        self.db
            .blocking(move |conn| {
                let tx = conn.transaction()?;
                debit(&tx, bridge.as_ref(), &from, &amount)?;
                credit(&tx, bridge.as_ref(), &to, &amount)?;
                tx.commit()?;
                Ok(())
            })
            .await
    }

    /// Applies a signed transaction.
    pub async fn apply_transaction(&self, tx: Transaction) -> Result<(), LedgerError> {
        self.apply_transactions(vec![tx])
            .await
            .map_err(|e| match e {
                LedgerError::BatchFailed { source, .. } => *source,
                e => e,
            })
    }

    /// Applies a batch of signed transactions atomically.
    ///
    /// The first failing transaction rolls back the whole batch.
    pub async fn apply_transactions(&self, txs: Vec<Transaction>) -> Result<(), LedgerError> {
        let bridge = self.bridge.clone();
        let count = txs.len();
        self.db
            .blocking(move |conn| {
                let db_tx = conn.transaction()?;
                for (index, tx) in txs.iter().enumerate() {
                    apply(&db_tx, bridge.as_ref(), tx).map_err(|e| LedgerError::BatchFailed {
                        index,
                        source: Box::new(e),
                    })?;
                }
                db_tx.commit()?;
                Ok(())
            })
            .await
            .inspect_err(|e: &LedgerError| warn!("Ledger batch rejected: {e}"))?;

        info!("Ledger applied {count} transactions");
        Ok(())
    }

    /// Returns the latest applied transactions.
    pub async fn recent_transactions(&self, count: usize) -> Result<Vec<Transaction>, LedgerError> {
        self.db
            .blocking(move |conn| Ok(db::query_transactions(conn, None, count)?))
            .await
    }

    /// Returns the latest applied transactions sent or received by an account.
    pub async fn account_transactions(
        &self,
        address: &Address,
        count: usize,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let address = address.clone();
        self.db
            .blocking(move |conn| Ok(db::query_transactions(conn, Some(&address), count)?))
            .await
    }

    /// Parses a decimal amount.
    pub fn parse_amount(s: &str) -> Result<Amount, LedgerError> {
        parse_amount(s).map_err(|e| LedgerError::InvalidAmount(e.0))
    }
}

fn read(conn: &Connection, address: &Address) -> Result<AccountRow, LedgerError> {
    Ok(db::load_account(conn, address)?.unwrap_or(AccountRow {
        balance: Amount::default(),
        nonce: 0,
    }))
}

fn is_bridge(bridge: Option<&Address>, address: &Address) -> bool {
    bridge == Some(address)
}

fn credit(
    conn: &Connection,
    bridge: Option<&Address>,
    address: &Address,
    amount: &Amount,
) -> Result<(), LedgerError> {
    if is_bridge(bridge, address) {
        return Ok(());
    }

    let mut row = read(conn, address)?;
    row.balance += amount;
    db::store_account(conn, address, &row)?;
    Ok(())
}

fn debit(
    conn: &Connection,
    bridge: Option<&Address>,
    address: &Address,
    amount: &Amount,
) -> Result<(), LedgerError> {
    if is_bridge(bridge, address) {
        return Ok(());
    }

    let mut row = read(conn, address)?;
    if row.balance < *amount {
        return Err(LedgerError::InsufficientFunds {
            address: address.clone(),
            balance: row.balance,
            needed: amount.clone(),
        });
    }

    row.balance -= amount;
    db::store_account(conn, address, &row)?;
    Ok(())
}

fn apply(conn: &Connection, bridge: Option<&Address>, tx: &Transaction) -> Result<(), LedgerError> {
    tx.verify()?;

    if let TxKind::Mint { .. } = tx.kind() {
        if !is_bridge(bridge, tx.from()) {
            return Err(LedgerError::Unauthorized(tx.from().clone()));
        }
    }

    let sender = read(conn, tx.from())?;
    let expected = sender.nonce + 1;
    if tx.nonce() != expected {
        return Err(LedgerError::InvalidNonce {
            address: tx.from().clone(),
            expected,
            got: tx.nonce(),
        });
    }

    debit(conn, bridge, tx.from(), tx.value())?;
    credit(conn, bridge, tx.to(), tx.value())?;

    // The balance may have changed with the debit.
    let mut sender = read(conn, tx.from())?;
    sender.nonce = expected;
    db::store_account(conn, tx.from(), &sender)?;

    db::insert_transaction(conn, tx)?;
    Ok(())
}
