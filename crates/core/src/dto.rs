// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Table snapshots sent to clients.
//!
//! Field names are camel case and chip amounts are decimal strings so that
//! clients written in any language can read them without precision loss.
use serde::{Deserialize, Serialize};

use crate::{
    crypto::{Address, Signature, SigningKey, VerifyingKey},
    message::PlayerAction,
    poker::{Chips, PlayerStatus, Round},
};

/// A snapshot of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStateDto {
    /// The table address.
    pub address: Address,
    /// The small blind amount.
    pub small_blind: String,
    /// The big blind amount.
    pub big_blind: String,
    /// The small blind seat.
    pub small_blind_position: Option<u8>,
    /// The big blind seat.
    pub big_blind_position: Option<u8>,
    /// The dealer seat.
    pub dealer: u8,
    /// The seated players in seat order.
    pub players: Vec<PlayerDto>,
    /// The board cards numbers.
    pub community_cards: Vec<u8>,
    /// The main pot followed by the side pots.
    pub pots: Vec<PotDto>,
    /// The seat of the player who should act next.
    pub next_to_act: Option<u8>,
    /// The current round.
    pub round: Round,
    /// The winners of the last showdown.
    pub winners: Vec<WinnerDto>,
    /// The table signature over this snapshot.
    pub signature: String,
}

/// A player snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
    /// The player address.
    pub address: Address,
    /// The player seat.
    pub seat: u8,
    /// The player chips.
    pub stack: String,
    /// The player posts the small blind this hand.
    pub is_small_blind: bool,
    /// The player posts the big blind this hand.
    pub is_big_blind: bool,
    /// The player has the button.
    pub is_dealer: bool,
    /// The hole cards numbers, only present for the viewer or at showdown.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hole_cards: Option<Vec<u8>>,
    /// The player status.
    pub status: PlayerStatus,
    /// The last action of this player in the hand.
    pub last_action: Option<PlayerAction>,
    /// The actions the player can take now.
    pub legal_actions: Vec<LegalActionDto>,
    /// Seconds the player has to act.
    pub timeout: u64,
    /// The table signature over this player entry.
    pub signature: String,
}

/// A legal action with its amount range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalActionDto {
    /// The action.
    pub action: PlayerAction,
    /// The minimum amount.
    pub min: String,
    /// The maximum amount.
    pub max: String,
}

impl LegalActionDto {
    /// Creates a legal action entry.
    pub fn new(action: PlayerAction, min: Chips, max: Chips) -> Self {
        Self {
            action,
            min: min.to_string(),
            max: max.to_string(),
        }
    }
}

/// A pot and the players that can win it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PotDto {
    /// The pot amount.
    pub amount: String,
    /// The players eligible for this pot.
    pub players: Vec<Address>,
}

/// A showdown winner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerDto {
    /// The winner address.
    pub address: Address,
    /// The chips won.
    pub amount: String,
}

impl TableStateDto {
    /// Signs every player entry and then the whole snapshot.
    pub fn signed(mut self, sk: &SigningKey) -> Self {
        for player in &mut self.players {
            player.signature.clear();
            player.signature = sk.sign(&*player).to_hex();
        }

        self.signature.clear();
        self.signature = sk.sign(&self).to_hex();
        self
    }

    /// Checks the snapshot signature.
    pub fn verify(&self, vk: &VerifyingKey) -> bool {
        let Some(signature) = Signature::from_hex(&self.signature) else {
            return false;
        };

        let mut unsigned = self.clone();
        unsigned.signature.clear();
        vk.verify(&unsigned, &signature)
    }

    /// Finds a player by address.
    pub fn player(&self, address: &Address) -> Option<&PlayerDto> {
        self.players.iter().find(|p| &p.address == address)
    }
}
