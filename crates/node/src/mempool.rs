// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Pending transactions pool.
use ahash::AHashSet;
use log::debug;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

use pokerchain_core::transaction::{Transaction, TxError, TxHash};

/// Mempool error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MempoolErrorKind {
    /// The transaction is already pending.
    Duplicate,
    /// The transaction failed verification.
    Validation,
}

/// Mempool errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MempoolError {
    /// A transaction with the same hash is pending.
    #[error("duplicate transaction {0}")]
    Duplicate(TxHash),
    /// The transaction signature is invalid.
    #[error("invalid signature")]
    InvalidSignature,
    /// The transaction is malformed.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
}

impl MempoolError {
    /// The error category.
    pub fn kind(&self) -> MempoolErrorKind {
        match self {
            MempoolError::Duplicate(_) => MempoolErrorKind::Duplicate,
            MempoolError::InvalidSignature | MempoolError::InvalidTransaction(_) => {
                MempoolErrorKind::Validation
            }
        }
    }
}

impl From<TxError> for MempoolError {
    fn from(e: TxError) -> Self {
        match e {
            TxError::InvalidSignature => MempoolError::InvalidSignature,
            TxError::InvalidTransaction(msg) => MempoolError::InvalidTransaction(msg),
        }
    }
}

/// Verified transactions waiting to be applied to the ledger, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct Mempool(Arc<Mutex<Pending>>);

#[derive(Debug, Default)]
struct Pending {
    order: Vec<Transaction>,
    hashes: AHashSet<TxHash>,
}

impl Mempool {
    /// Creates an empty mempool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifies and appends a transaction.
    pub fn add(&self, tx: Transaction) -> Result<TxHash, MempoolError> {
        let mut pending = self.0.lock();

        let hash = tx.hash();
        if pending.hashes.contains(&hash) {
            return Err(MempoolError::Duplicate(hash));
        }

        tx.verify()?;

        debug!("Mempool add {hash} from {} nonce {}", tx.from(), tx.nonce());

        pending.hashes.insert(hash);
        pending.order.push(tx);

        Ok(hash)
    }

    /// Checks if a transaction is pending.
    pub fn contains(&self, hash: &TxHash) -> bool {
        self.0.lock().hashes.contains(hash)
    }

    /// Returns the pending transactions in arrival order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.0.lock().order.clone()
    }

    /// Removes the given transactions, returns how many were removed.
    pub fn remove(&self, hashes: &[TxHash]) -> usize {
        let mut pending = self.0.lock();

        let before = pending.order.len();
        let Pending { order, hashes: set } = &mut *pending;
        order.retain(|tx| {
            let keep = !hashes.contains(&tx.hash());
            if !keep {
                set.remove(&tx.hash());
            }
            keep
        });

        before - order.len()
    }

    /// Drops all pending transactions.
    pub fn clear(&self) {
        let mut pending = self.0.lock();
        pending.order.clear();
        pending.hashes.clear();
    }

    /// The number of pending transactions.
    pub fn len(&self) -> usize {
        self.0.lock().order.len()
    }

    /// Checks if there are no pending transactions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
