// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Types used in a Poker game.
use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{fmt, iter, ops};

pub use pokerchain_cards::{Card, Deck, Rank, Suit};
pub use pokerchain_eval::{HandRank, HandValue};

/// Chips amount.
///
/// Human readable formats encode chips as a number when they fit in a u64 and
/// as a decimal string otherwise, so that they work inside serde buffered
/// types like internally tagged enums.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Chips(u128);

impl Chips {
    /// The zero chips.
    pub const ZERO: Chips = Chips(0);

    /// Creates chips with the given value.
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// The integer amount.
    pub fn amount(&self) -> u128 {
        self.0
    }

    /// Checks if this is zero chips.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u128> for Chips {
    fn from(val: u128) -> Self {
        Chips(val)
    }
}

impl From<Chips> for u128 {
    fn from(val: Chips) -> Self {
        val.0
    }
}

impl From<Chips> for BigUint {
    fn from(val: Chips) -> Self {
        BigUint::from(val.0)
    }
}

impl TryFrom<&BigUint> for Chips {
    type Error = num_bigint::TryFromBigIntError<()>;

    fn try_from(val: &BigUint) -> Result<Self, Self::Error> {
        u128::try_from(val).map(Chips)
    }
}

impl ops::Add for Chips {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Chips(self.0 + rhs.0)
    }
}

impl ops::AddAssign for Chips {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl ops::Sub<Chips> for Chips {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl ops::SubAssign for Chips {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

impl ops::Div<u128> for Chips {
    type Output = Self;

    fn div(self, rhs: u128) -> Self::Output {
        Self(self.0 / rhs)
    }
}

impl ops::Rem<u128> for Chips {
    type Output = Self;

    fn rem(self, rhs: u128) -> Self::Output {
        Self(self.0 % rhs)
    }
}

impl iter::Sum for Chips {
    fn sum<I: Iterator<Item = Chips>>(iter: I) -> Self {
        iter.fold(Chips::ZERO, |acc, c| acc + c)
    }
}

impl fmt::Display for Chips {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Chips {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !serializer.is_human_readable() {
            return serializer.serialize_u128(self.0);
        }

        match u64::try_from(self.0) {
            Ok(value) => serializer.serialize_u64(value),
            Err(_) => serializer.serialize_str(&self.0.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Chips {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ChipsVisitor;

        impl de::Visitor<'_> for ChipsVisitor {
            type Value = Chips;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non negative chips amount")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Chips, E> {
                Ok(Chips(v as u128))
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<Chips, E> {
                Ok(Chips(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Chips, E> {
                u128::try_from(v)
                    .map(Chips)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Chips, E> {
                v.parse::<u128>()
                    .map(Chips)
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_any(ChipsVisitor)
        } else {
            deserializer.deserialize_u128(ChipsVisitor)
        }
    }
}

/// A hand betting round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Round {
    /// Waiting for players and blinds.
    #[default]
    Ante,
    /// Hole cards dealt.
    Preflop,
    /// Three community cards dealt.
    Flop,
    /// Fourth community card dealt.
    Turn,
    /// Fifth community card dealt.
    River,
    /// Hands compared and pots paid.
    Showdown,
}

impl Round {
    /// All rounds in hand order.
    pub const ALL: [Round; 6] = [
        Round::Ante,
        Round::Preflop,
        Round::Flop,
        Round::Turn,
        Round::River,
        Round::Showdown,
    ];

    /// The round that follows this one, showdown wraps to the next hand ante.
    pub fn next(self) -> Round {
        match self {
            Round::Ante => Round::Preflop,
            Round::Preflop => Round::Flop,
            Round::Flop => Round::Turn,
            Round::Turn => Round::River,
            Round::River => Round::Showdown,
            Round::Showdown => Round::Ante,
        }
    }

    /// The position of this round in a hand.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Number of community cards on the board during this round.
    pub fn board_size(self) -> usize {
        match self {
            Round::Ante | Round::Preflop => 0,
            Round::Flop => 3,
            Round::Turn => 4,
            Round::River | Round::Showdown => 5,
        }
    }

    /// Checks if this is a round where players bet.
    pub fn is_betting(self) -> bool {
        matches!(
            self,
            Round::Preflop | Round::Flop | Round::Turn | Round::River
        )
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Round::Ante => "ante",
            Round::Preflop => "preflop",
            Round::Flop => "flop",
            Round::Turn => "turn",
            Round::River => "river",
            Round::Showdown => "showdown",
        };

        write!(f, "{label}")
    }
}

/// A player status in the current hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayerStatus {
    /// In the hand and has not acted this round.
    #[default]
    NotActed,
    /// In the hand and has acted this round.
    Active,
    /// Folded this hand.
    Folded,
    /// Has no chips left to bet this hand.
    AllIn,
    /// Seated but not playing this hand.
    SittingOut,
}

impl PlayerStatus {
    /// Checks if a player with this status can still act this round.
    pub fn can_act(self) -> bool {
        matches!(self, PlayerStatus::NotActed | PlayerStatus::Active)
    }

    /// Checks if a player with this status still competes for the pot.
    pub fn in_hand(self) -> bool {
        matches!(
            self,
            PlayerStatus::NotActed | PlayerStatus::Active | PlayerStatus::AllIn
        )
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlayerStatus::NotActed => "not-acted",
            PlayerStatus::Active => "active",
            PlayerStatus::Folded => "folded",
            PlayerStatus::AllIn => "all-in",
            PlayerStatus::SittingOut => "sitting-out",
        };

        write!(f, "{label}")
    }
}
