// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Pokerchain cards types.
//!
//! This crate defines the cards used at a table:
//!
//! ```
//! # use pokerchain_cards::{Card, Rank, Suit};
//! let ah = Card::new(Rank::Ace, Suit::Hearts);
//! assert_eq!(ah.to_string(), "AH");
//! ```
//!
//! and a [Deck] whose shuffle is a pure function of a seed, so that every node
//! that replays a hand with the same seed deals the same cards:
//!
//! ```
//! # use pokerchain_cards::Deck;
//! let mut d1 = Deck::shuffled(&[1, 2, 3]);
//! let mut d2 = Deck::shuffled(&[1, 2, 3]);
//! assert_eq!(d1.deal_n(5), d2.deal_n(5));
//! ```
#![warn(clippy::all, rust_2018_idioms, missing_docs)]
mod deck;
pub use deck::{Card, Deck, ParseCardError, Rank, Suit};
