// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Pokerchain hand evaluator.
//!
//! Evaluates 5, 6 and 7 cards hands. The table engine treats this crate as a
//! black box: it only needs [HandValue]s to be totally ordered so that the best
//! hands at showdown can be found and tied hands compared equal.
//!
//! ```
//! # use pokerchain_eval::*;
//! let cards = ["AH", "KH", "QH", "JH", "TH"].map(|c| c.parse::<Card>().unwrap());
//! let royal = HandValue::eval(&cards);
//! assert_eq!(royal.rank(), HandRank::StraightFlush);
//!
//! let cards = ["AH", "AD", "2C", "7S", "9D"].map(|c| c.parse::<Card>().unwrap());
//! assert!(royal > HandValue::eval(&cards));
//! ```
#![warn(clippy::all, rust_2018_idioms, missing_docs)]
pub mod eval;
pub use eval::{HandRank, HandValue};

// Reexport cards types.
pub use pokerchain_cards::{Card, Deck, Rank, Suit};
