// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Database types for persisting accounts, transactions and tables.
use anyhow::Result;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params, types::Type};
use std::{path::Path, sync::Arc};
use tokio::task::JoinError;

use pokerchain_core::{amount::Amount, crypto::Address, transaction::Transaction};

/// A database account row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRow {
    /// The account balance.
    pub balance: Amount,
    /// The number of transactions applied for this account.
    pub nonce: u64,
}

/// Database for persisting ledger and tables state.
#[derive(Debug, Clone)]
pub struct Db {
    db: Arc<Mutex<Connection>>,
}

impl Db {
    /// Open a database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open a database in memory.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS accounts (
               address TEXT PRIMARY KEY,
               balance TEXT NOT NULL,
               nonce INTEGER NOT NULL,
               last_update DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS transactions (
               id INTEGER PRIMARY KEY AUTOINCREMENT,
               hash TEXT NOT NULL UNIQUE,
               sender TEXT NOT NULL,
               recipient TEXT NOT NULL,
               value TEXT NOT NULL,
               nonce INTEGER NOT NULL,
               body TEXT NOT NULL,
               created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS transactions_sender ON transactions (sender);
            CREATE INDEX IF NOT EXISTS transactions_recipient ON transactions (recipient);
            CREATE TABLE IF NOT EXISTS tables (
               address TEXT PRIMARY KEY,
               state TEXT NOT NULL,
               last_update DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS request_nonces (
               table_address TEXT NOT NULL,
               player TEXT NOT NULL,
               nonce INTEGER NOT NULL,
               PRIMARY KEY (table_address, player)
            );",
        )?;

        Ok(Db {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs a closure with the connection locked on the blocking thread pool.
    pub(crate) async fn blocking<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut Connection) -> Result<R, E> + Send + 'static,
        R: Send + 'static,
        E: From<JoinError> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = db.lock();
            f(&mut conn)
        })
        .await?
    }

    /// Saves a table state.
    pub async fn save_table(&self, address: Address, state: String) -> Result<()> {
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO tables (address, state, last_update)
                 VALUES (?1, ?2, CURRENT_TIMESTAMP)
                 ON CONFLICT(address) DO UPDATE SET
                   state = excluded.state,
                   last_update = CURRENT_TIMESTAMP",
                params![address.as_str(), state],
            )?;

            Ok(())
        })
        .await
    }

    /// Loads a table state.
    pub async fn load_table(&self, address: Address) -> Result<Option<String>> {
        self.blocking(move |conn| {
            let state = conn
                .query_row(
                    "SELECT state FROM tables WHERE address = ?1",
                    params![address.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            Ok(state)
        })
        .await
    }

    /// Saves the last request nonce of a player at a table.
    pub async fn save_nonce(&self, table: Address, player: Address, nonce: u64) -> Result<()> {
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO request_nonces (table_address, player, nonce)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(table_address, player) DO UPDATE SET
                   nonce = excluded.nonce",
                params![table.as_str(), player.as_str(), nonce as i64],
            )?;

            Ok(())
        })
        .await
    }

    /// Loads the last request nonces of the players at a table.
    pub async fn load_nonces(&self, table: Address) -> Result<Vec<(Address, u64)>> {
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT player, nonce FROM request_nonces WHERE table_address = ?1",
            )?;

            let rows = stmt.query_map(params![table.as_str()], |row| {
                Ok((
                    Address::new(row.get::<_, String>(0)?),
                    row.get::<_, i64>(1)? as u64,
                ))
            })?;

            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }
}

/// Reads an account row.
pub(crate) fn load_account(
    conn: &Connection,
    address: &Address,
) -> rusqlite::Result<Option<AccountRow>> {
    conn.query_row(
        "SELECT balance, nonce FROM accounts WHERE address = ?1",
        params![address.as_str()],
        |row| {
            let balance = row.get::<_, String>(0)?;
            let balance = Amount::parse_bytes(balance.as_bytes(), 10).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(0, Type::Text, "invalid balance".into())
            })?;

            Ok(AccountRow {
                balance,
                nonce: row.get::<_, i64>(1)? as u64,
            })
        },
    )
    .optional()
}

/// Writes an account row.
pub(crate) fn store_account(
    conn: &Connection,
    address: &Address,
    account: &AccountRow,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO accounts (address, balance, nonce, last_update)
         VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
         ON CONFLICT(address) DO UPDATE SET
           balance = excluded.balance,
           nonce = excluded.nonce,
           last_update = CURRENT_TIMESTAMP",
        params![
            address.as_str(),
            account.balance.to_str_radix(10),
            account.nonce as i64
        ],
    )?;

    Ok(())
}

/// Appends a transaction to the history.
pub(crate) fn insert_transaction(conn: &Connection, tx: &Transaction) -> rusqlite::Result<()> {
    let body = serde_json::to_string(tx).expect("Should serialize transaction");

    conn.execute(
        "INSERT INTO transactions (hash, sender, recipient, value, nonce, body)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            tx.hash().to_string(),
            tx.from().as_str(),
            tx.to().as_str(),
            tx.value().to_str_radix(10),
            tx.nonce() as i64,
            body
        ],
    )?;

    Ok(())
}

/// Reads the latest transactions, optionally only those involving an address.
pub(crate) fn query_transactions(
    conn: &Connection,
    address: Option<&Address>,
    count: usize,
) -> rusqlite::Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT body FROM transactions
         WHERE ?1 IS NULL OR sender = ?1 OR recipient = ?1
         ORDER BY id DESC
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(
        params![address.map(|a| a.as_str()), count as i64],
        |row| {
            let body = row.get::<_, String>(0)?;
            serde_json::from_str(&body)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
        },
    )?;

    rows.collect()
}
