// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Table player types.
use serde::{Deserialize, Serialize};

use pokerchain_core::{
    crypto::Address,
    poker::{Card, Chips, PlayerStatus},
};

/// A table player state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// The player address.
    pub address: Address,
    /// This player chips.
    pub chips: Chips,
    /// This player private cards, empty or two cards.
    pub hole_cards: Vec<Card>,
    /// The player status in the hand.
    pub status: PlayerStatus,
}

impl Player {
    /// Creates a new player.
    pub fn new(address: Address, chips: Chips) -> Self {
        Self {
            address,
            chips,
            hole_cards: Vec::new(),
            status: PlayerStatus::NotActed,
        }
    }

    /// Takes chips from this player stack.
    ///
    /// Returns `None` if the stack is too short, the player goes all-in when the
    /// stack is emptied.
    pub(crate) fn deduct(&mut self, amount: Chips) -> Option<Chips> {
        if amount > self.chips {
            return None;
        }

        self.chips -= amount;
        if self.chips.is_zero() {
            self.status = PlayerStatus::AllIn;
        }

        Some(amount)
    }

    /// Reset state for a new hand.
    pub(crate) fn start_hand(&mut self) {
        self.hole_cards.clear();
        self.status = if self.chips.is_zero() {
            PlayerStatus::SittingOut
        } else {
            PlayerStatus::NotActed
        };
    }
}

/// The table seats, seat numbers go from 1 to the number of seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seats {
    seats: Vec<Option<Player>>,
}

impl Seats {
    /// Creates empty seats.
    pub fn new(count: usize) -> Self {
        Self {
            seats: vec![None; count],
        }
    }

    /// The number of seats.
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    /// Checks if there are no seats.
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// The player at a seat.
    pub fn get(&self, seat: u8) -> Option<&Player> {
        Self::index(seat).and_then(|idx| self.seats.get(idx)?.as_ref())
    }

    /// The player at a seat.
    pub fn get_mut(&mut self, seat: u8) -> Option<&mut Player> {
        Self::index(seat).and_then(|idx| self.seats.get_mut(idx)?.as_mut())
    }

    /// Checks if a seat number exists.
    pub fn is_valid(&self, seat: u8) -> bool {
        (1..=self.seats.len()).contains(&(seat as usize))
    }

    /// Returns the seat of the player with the given address.
    pub fn seat_of(&self, address: &Address) -> Option<u8> {
        self.occupied()
            .find(|(_, p)| &p.address == address)
            .map(|(seat, _)| seat)
    }

    /// Returns the first free seat.
    pub fn free_seat(&self) -> Option<u8> {
        self.seats
            .iter()
            .position(Option::is_none)
            .map(|idx| idx as u8 + 1)
    }

    /// Seats a player, the seat must be empty.
    pub fn insert(&mut self, seat: u8, player: Player) {
        if let Some(slot) = Self::index(seat).and_then(|idx| self.seats.get_mut(idx)) {
            debug_assert!(slot.is_none());
            *slot = Some(player);
        }
    }

    /// Frees a seat.
    pub fn remove(&mut self, seat: u8) -> Option<Player> {
        Self::index(seat).and_then(|idx| self.seats.get_mut(idx)?.take())
    }

    /// Returns an iterator to the occupied seats in seat order.
    pub fn occupied(&self) -> impl Iterator<Item = (u8, &Player)> {
        self.seats
            .iter()
            .enumerate()
            .filter_map(|(idx, p)| p.as_ref().map(|p| (idx as u8 + 1, p)))
    }

    /// Returns a mutable iterator to the occupied seats in seat order.
    pub fn occupied_mut(&mut self) -> impl Iterator<Item = (u8, &mut Player)> {
        self.seats
            .iter_mut()
            .enumerate()
            .filter_map(|(idx, p)| p.as_mut().map(|p| (idx as u8 + 1, p)))
    }

    /// Returns the number of seated players.
    pub fn count(&self) -> usize {
        self.seats.iter().filter(|p| p.is_some()).count()
    }

    /// Returns the number of players with the given status.
    pub fn count_where(&self, f: impl Fn(&Player) -> bool) -> usize {
        self.occupied().filter(|(_, p)| f(p)).count()
    }

    /// Returns the first seat after `seat`, wrapping around, whose player
    /// matches the predicate. The scan ends on `seat` itself.
    pub fn next_after(&self, seat: u8, f: impl Fn(&Player) -> bool) -> Option<u8> {
        let n = self.seats.len();
        if n == 0 {
            return None;
        }

        let start = (seat as usize).min(n);
        (1..=n)
            .map(|offset| ((start + offset - 1) % n) as u8 + 1)
            .find(|s| self.get(*s).is_some_and(&f))
    }

    /// Returns the last seat before `seat`, wrapping around, whose player
    /// matches the predicate.
    pub fn prev_before(&self, seat: u8, f: impl Fn(&Player) -> bool) -> Option<u8> {
        let n = self.seats.len();
        if n == 0 {
            return None;
        }

        let start = (seat as usize).clamp(1, n);
        (1..=n)
            .map(|offset| ((start + n - offset - 1) % n) as u8 + 1)
            .find(|s| self.get(*s).is_some_and(&f))
    }

    fn index(seat: u8) -> Option<usize> {
        (seat as usize).checked_sub(1)
    }
}
