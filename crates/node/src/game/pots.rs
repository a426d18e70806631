// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Pots split and showdown.
use log::info;
use serde::{Deserialize, Serialize};

use pokerchain_core::{
    crypto::Address,
    poker::{Chips, HandRank, HandValue},
};

use super::GameEngine;
use crate::errors::GameError;

/// A showdown winner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    /// The winner seat.
    pub seat: u8,
    /// The winner address.
    pub address: Address,
    /// The chips won.
    pub amount: Chips,
    /// The winning hand, none if everybody else folded.
    pub hand_rank: Option<HandRank>,
}

/// A pot and the seats that can win it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pot {
    /// The pot amount.
    pub amount: Chips,
    /// The eligible seats.
    pub seats: Vec<u8>,
}

impl GameEngine {
    /// Splits the chips in the pot into a main pot and the side pots.
    ///
    /// Pots are cut at every all-in cap, a player is eligible for the pots up
    /// to its cap and players who are not all-in for every pot.
    pub fn pots(&self) -> Vec<Pot> {
        let total = self.pot();
        let contenders = self.contenders();

        let mut tiers = self
            .side_pots
            .values()
            .copied()
            .filter(|cap| *cap < total)
            .collect::<Vec<_>>();
        tiers.sort();
        tiers.dedup();
        tiers.push(total);

        let mut pots = Vec::new();
        let mut paid = Chips::ZERO;
        for tier in tiers {
            if tier <= paid {
                continue;
            }

            let mut seats = contenders
                .iter()
                .copied()
                .filter(|seat| self.cap(*seat).is_none_or(|cap| cap >= tier))
                .collect::<Vec<_>>();
            if seats.is_empty() {
                seats = contenders.clone();
            }

            pots.push(Pot {
                amount: tier - paid,
                seats,
            });
            paid = tier;
        }

        pots
    }

    /// Pays the pots to the best hands.
    ///
    /// Tied hands split a pot evenly, the odd chips go one each to the winners
    /// closest to the left of the dealer.
    pub(super) fn calculate_winner(&mut self) -> Result<(), GameError> {
        self.winners.clear();

        let contenders = self.contenders();
        match contenders.as_slice() {
            [] if self.pot().is_zero() => return Ok(()),
            [] => {
                return Err(GameError::Invariant(format!(
                    "no players left for a pot of {}",
                    self.pot()
                )));
            }
            [seat] => {
                let pot = self.pot();
                self.pay(*seat, pot, None)?;
            }
            _ => {
                let mut values = Vec::with_capacity(contenders.len());
                for seat in &contenders {
                    values.push((*seat, self.hand_value(*seat)?));
                }

                for pot in self.pots() {
                    let best = values
                        .iter()
                        .filter(|(seat, _)| pot.seats.contains(seat))
                        .map(|(_, value)| value)
                        .max()
                        .cloned();
                    let Some(best) = best else {
                        continue;
                    };

                    let mut winners = values
                        .iter()
                        .filter(|(seat, value)| pot.seats.contains(seat) && *value == best)
                        .map(|(seat, _)| *seat)
                        .collect::<Vec<_>>();
                    winners.sort_by_key(|seat| self.left_of_dealer(*seat));

                    let count = winners.len() as u128;
                    let share = pot.amount / count;
                    let odd = (pot.amount % count).amount();
                    for (idx, seat) in winners.into_iter().enumerate() {
                        let extra = Chips::new(u128::from((idx as u128) < odd));
                        self.pay(seat, share + extra, Some(best.rank()))?;
                    }
                }
            }
        }

        for winner in &self.winners {
            info!(
                "Table {} hand {} {} wins {}",
                self.address, self.hand_number, winner.address, winner.amount
            );
        }

        Ok(())
    }

    /// Seats still in the hand.
    pub(super) fn contenders(&self) -> Vec<u8> {
        self.seats
            .occupied()
            .filter(|(_, p)| p.status.in_hand())
            .map(|(seat, _)| seat)
            .collect()
    }

    fn cap(&self, seat: u8) -> Option<Chips> {
        self.seats
            .get(seat)
            .and_then(|p| self.side_pots.get(&p.address))
            .copied()
    }

    /// Distance of a seat from the dealer going clockwise, starting at 0.
    fn left_of_dealer(&self, seat: u8) -> usize {
        let n = self.seats.len();
        let dealer = self.dealer.unwrap_or(0) as usize;
        (seat as usize + n - dealer - 1) % n
    }

    fn hand_value(&self, seat: u8) -> Result<HandValue, GameError> {
        let player = self
            .seats
            .get(seat)
            .ok_or_else(|| GameError::Invariant(format!("no player at seat {seat}")))?;

        if player.hole_cards.len() != 2 || self.community_cards.len() != 5 {
            return Err(GameError::Invariant(format!(
                "seat {seat} has {} hole cards with {} on the board",
                player.hole_cards.len(),
                self.community_cards.len()
            )));
        }

        let cards = player
            .hole_cards
            .iter()
            .chain(&self.community_cards)
            .copied()
            .collect::<Vec<_>>();

        Ok(HandValue::eval(&cards))
    }

    fn pay(&mut self, seat: u8, amount: Chips, hand_rank: Option<HandRank>) -> Result<(), GameError> {
        let player = self
            .seats
            .get_mut(seat)
            .ok_or_else(|| GameError::Invariant(format!("no player at seat {seat}")))?;
        player.chips += amount;

        match self.winners.iter_mut().find(|w| w.seat == seat) {
            Some(winner) => winner.amount += amount,
            None => self.winners.push(Winner {
                seat,
                address: player.address.clone(),
                amount,
                hand_rank,
            }),
        }

        Ok(())
    }
}
