// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Per hand action log.
use serde::{Deserialize, Serialize};

use pokerchain_core::{
    crypto::Address,
    message::PlayerAction,
    poker::{Chips, Round},
};

/// An action played by a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    /// The player seat.
    pub seat: u8,
    /// The player address.
    pub address: Address,
    /// The action.
    pub action: PlayerAction,
    /// The chips the player put in the pot with this action.
    pub amount: Chips,
}

/// Append only log of the turns of a hand, indexed by round.
///
/// Blinds are logged under the preflop round even when posted before the deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandLog {
    rounds: Vec<Vec<Turn>>,
}

impl Default for HandLog {
    fn default() -> Self {
        Self {
            rounds: vec![Vec::new(); Round::ALL.len()],
        }
    }
}

impl HandLog {
    /// Appends a turn to a round.
    pub fn push(&mut self, round: Round, turn: Turn) {
        let round = if turn.action.is_blind() {
            Round::Preflop
        } else {
            round
        };

        self.rounds[round.index()].push(turn);
    }

    /// Checks that the log has one entry per round, a deserialized log may not.
    pub fn is_valid(&self) -> bool {
        self.rounds.len() == Round::ALL.len()
    }

    /// The turns of a round.
    pub fn round(&self, round: Round) -> &[Turn] {
        &self.rounds[round.index()]
    }

    /// All the turns of the hand in round order.
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.rounds.iter().flatten()
    }

    /// The sum of all the chips put in the pot this hand.
    pub fn total(&self) -> Chips {
        self.turns().map(|t| t.amount).sum()
    }

    /// The chips a player put in the pot this hand.
    pub fn contribution(&self, address: &Address) -> Chips {
        self.turns()
            .filter(|t| &t.address == address)
            .map(|t| t.amount)
            .sum()
    }

    /// The chips a player put in the pot in a round.
    pub fn round_contribution(&self, round: Round, address: &Address) -> Chips {
        self.round(round)
            .iter()
            .filter(|t| &t.address == address)
            .map(|t| t.amount)
            .sum()
    }

    /// Total contribution of every player this hand, in first action order.
    pub fn contributions(&self) -> Vec<(Address, Chips)> {
        totals_by_player(self.turns())
    }

    /// Round contribution of every player, in first action order.
    pub fn round_contributions(&self, round: Round) -> Vec<(Address, Chips)> {
        totals_by_player(self.round(round).iter())
    }

    /// The largest round contribution.
    pub fn largest_bet(&self, round: Round) -> Chips {
        self.round_contributions(round)
            .into_iter()
            .map(|(_, c)| c)
            .max()
            .unwrap_or_default()
    }

    /// The size of the last increase of the largest bet in a round.
    pub fn last_raise(&self, round: Round) -> Chips {
        let mut totals: Vec<(&Address, Chips)> = Vec::new();
        let mut largest = Chips::ZERO;
        let mut last_raise = Chips::ZERO;

        for turn in self.round(round) {
            let total = match totals.iter_mut().find(|(a, _)| *a == &turn.address) {
                Some((_, total)) => {
                    *total += turn.amount;
                    *total
                }
                None => {
                    totals.push((&turn.address, turn.amount));
                    turn.amount
                }
            };

            if total > largest {
                last_raise = total - largest;
                largest = total;
            }
        }

        last_raise
    }

    /// Checks if a blind has been posted this hand.
    pub fn has_posted(&self, blind: PlayerAction) -> bool {
        self.round(Round::Preflop).iter().any(|t| t.action == blind)
    }

    /// The last action of a player this hand.
    pub fn last_action(&self, address: &Address) -> Option<PlayerAction> {
        self.rounds
            .iter()
            .rev()
            .flat_map(|turns| turns.iter().rev())
            .find(|t| &t.address == address)
            .map(|t| t.action)
    }
}

fn totals_by_player<'a>(turns: impl Iterator<Item = &'a Turn>) -> Vec<(Address, Chips)> {
    let mut totals: Vec<(Address, Chips)> = Vec::new();
    for turn in turns {
        match totals.iter_mut().find(|(a, _)| a == &turn.address) {
            Some((_, total)) => *total += turn.amount,
            None => totals.push((turn.address.clone(), turn.amount)),
        }
    }

    totals
}
