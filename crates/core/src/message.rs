// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Type definitions for requests sent by players to a table.
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

use crate::{
    crypto::{Address, Signature, SigningKey, VerifyingKey},
    poker::Chips,
};

/// A request from a player to a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Join a table with a buy-in.
    Join {
        /// The table address.
        table: Address,
        /// The chips to bring to the table.
        buy_in: Chips,
        /// The requested seat, or the first free seat.
        seat: Option<u8>,
    },
    /// Leave a table.
    Leave {
        /// The table address.
        table: Address,
    },
    /// Play an action.
    Action {
        /// The table address.
        table: Address,
        /// The player action.
        action: PlayerAction,
        /// The chips for this action (only used for bet, raise and call).
        amount: Option<Chips>,
    },
    /// Deal a new hand.
    Deal {
        /// The table address.
        table: Address,
        /// The deck seed.
        seed: Vec<u8>,
    },
}

impl Request {
    /// The table this request is for.
    pub fn table(&self) -> &Address {
        match self {
            Request::Join { table, .. }
            | Request::Leave { table }
            | Request::Action { table, .. }
            | Request::Deal { table, .. } => table,
        }
    }
}

/// A Player action.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayerAction {
    /// Player posts the small blind.
    SmallBlind,
    /// Player posts the big blind.
    BigBlind,
    /// Player folds.
    Fold,
    /// Player checks.
    Check,
    /// Player bets.
    Bet,
    /// Player calls.
    Call,
    /// Player raises.
    Raise,
    /// Player bets the whole stack.
    AllIn,
}

impl PlayerAction {
    /// All the actions in the order they are offered to a player.
    pub const ALL: [PlayerAction; 8] = [
        PlayerAction::SmallBlind,
        PlayerAction::BigBlind,
        PlayerAction::Fold,
        PlayerAction::Check,
        PlayerAction::Bet,
        PlayerAction::Call,
        PlayerAction::Raise,
        PlayerAction::AllIn,
    ];

    /// The action label.
    pub fn label(&self) -> &'static str {
        match self {
            PlayerAction::SmallBlind => "post small blind",
            PlayerAction::BigBlind => "post big blind",
            PlayerAction::Fold => "fold",
            PlayerAction::Check => "check",
            PlayerAction::Bet => "bet",
            PlayerAction::Call => "call",
            PlayerAction::Raise => "raise",
            PlayerAction::AllIn => "all-in",
        }
    }

    /// Checks if this action posts a blind.
    pub fn is_blind(&self) -> bool {
        matches!(self, PlayerAction::SmallBlind | PlayerAction::BigBlind)
    }
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A signed request.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// Clonable payload for passing to table tasks.
    payload: Arc<Payload>,
}

/// Private signed request payload.
#[derive(Debug, Serialize, Deserialize)]
struct Payload {
    req: Request,
    nonce: u64,
    sig: Signature,
    vk: VerifyingKey,
}

/// The signed part of a request.
#[derive(Serialize)]
struct Body<'a> {
    req: &'a Request,
    nonce: u64,
}

impl SignedRequest {
    /// Creates a new signed request.
    pub fn new(sk: &SigningKey, req: Request, nonce: u64) -> Self {
        let sig = sk.sign(&Body { req: &req, nonce });
        Self {
            payload: Arc::new(Payload {
                req,
                nonce,
                sig,
                vk: sk.verifying_key(),
            }),
        }
    }

    /// Deserializes this request and verifies its signature.
    pub fn deserialize_and_verify(buf: &[u8]) -> Result<Self> {
        let sr = Self {
            payload: Arc::new(bincode::deserialize::<Payload>(buf)?),
        };

        if !sr.verify() {
            bail!("Invalid signature");
        }

        Ok(sr)
    }

    /// Checks the request signature.
    pub fn verify(&self) -> bool {
        let body = Body {
            req: &self.payload.req,
            nonce: self.payload.nonce,
        };

        self.payload.vk.verify(&body, &self.payload.sig)
    }

    /// Serializes this request.
    pub fn serialize(&self) -> Vec<u8> {
        bincode::serialize(self.payload.as_ref()).expect("Should serialize signed request")
    }

    /// Returns the address of the player who sent this request.
    pub fn sender(&self) -> Address {
        self.payload.vk.address()
    }

    /// The request nonce.
    pub fn nonce(&self) -> u64 {
        self.payload.nonce
    }

    /// Extracts the signed request.
    pub fn request(&self) -> &Request {
        &self.payload.req
    }
}
