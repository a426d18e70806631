// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Table engine errors.
use thiserror::Error;

use pokerchain_core::{crypto::Address, message::PlayerAction, poker::Chips};

/// Error categories used by callers to decide how to react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request is not legal now, the table state is unchanged.
    Validation,
    /// An unknown player or seat.
    NotFound,
    /// The table is not in a state that allows the request.
    State,
    /// The table state is inconsistent and must be restored.
    Fatal,
}

/// A table engine error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// The table configuration is invalid.
    #[error("invalid table config: {0}")]
    InvalidConfig(String),
    /// All seats are taken.
    #[error("table full")]
    TableFull,
    /// The player is already seated at this table.
    #[error("player {0} already joined")]
    AlreadyJoined(Address),
    /// The requested seat is occupied.
    #[error("seat {0} is taken")]
    SeatTaken(u8),
    /// The requested seat does not exist.
    #[error("invalid seat {0}")]
    InvalidSeat(u8),
    /// The buy-in is outside the table limits.
    #[error("invalid buy-in {0}")]
    InvalidBuyIn(Chips),
    /// The player is not seated at this table.
    #[error("player {0} not found")]
    PlayerNotFound(Address),
    /// A hand is being played.
    #[error("hand in progress")]
    HandInProgress,
    /// There are not enough players to play a hand.
    #[error("not enough players")]
    NotEnoughPlayers,
    /// The action request is malformed.
    #[error("invalid action: {0}")]
    InvalidAction(String),
    /// The action is not legal now.
    #[error("illegal {action}: {reason}")]
    IllegalAction {
        /// The rejected action.
        action: PlayerAction,
        /// Why the action was rejected.
        reason: String,
    },
    /// A table snapshot could not be decoded.
    #[error("invalid snapshot: {0}")]
    Snapshot(String),
    /// An internal invariant was broken while changing state.
    #[error("invariant violation: {0}")]
    Invariant(String),
    /// A previous invariant violation left the table unusable.
    #[error("table state is corrupted")]
    Corrupted,
}

impl GameError {
    /// The error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::InvalidConfig(_)
            | GameError::InvalidSeat(_)
            | GameError::InvalidBuyIn(_)
            | GameError::InvalidAction(_)
            | GameError::IllegalAction { .. }
            | GameError::Snapshot(_) => ErrorKind::Validation,
            GameError::PlayerNotFound(_) => ErrorKind::NotFound,
            GameError::TableFull
            | GameError::AlreadyJoined(_)
            | GameError::SeatTaken(_)
            | GameError::HandInProgress
            | GameError::NotEnoughPlayers => ErrorKind::State,
            GameError::Invariant(_) | GameError::Corrupted => ErrorKind::Fatal,
        }
    }

    pub(crate) fn illegal(action: PlayerAction, reason: impl Into<String>) -> Self {
        GameError::IllegalAction {
            action,
            reason: reason.into(),
        }
    }
}
