// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Poker cards and deck definitions.
use blake2::{Blake2s256, Digest};
use rand::{SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// A Poker card.
///
/// A card is encoded as a single byte `suit * 13 + rank`, the same value is
/// used as the card number in table snapshots.
#[derive(Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Card(u8);

impl Card {
    /// Create a card given a rank and a suit.
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Self(suit as u8 * 13 + rank as u8)
    }

    /// Creates a card from its number in `0..52`.
    pub fn from_value(value: u8) -> Option<Card> {
        (value < Deck::SIZE as u8).then_some(Card(value))
    }

    /// The card number in `0..52`.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Returns the card suit.
    pub fn suit(&self) -> Suit {
        Suit::suits()
            .nth((self.0 / 13) as usize)
            .expect("card value is below 52")
    }

    /// Returns the card rank.
    pub fn rank(&self) -> Rank {
        Rank::ranks()
            .nth((self.0 % 13) as usize)
            .expect("rank index is below 13")
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank(), self.suit())
    }
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Card({}{})", self.rank(), self.suit())
    }
}

/// Error returned when parsing a card mnemonic like `"AS"` fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid card {0:?}")]
pub struct ParseCardError(String);

impl FromStr for Card {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCardError(s.to_string());
        let mut chars = s.chars();
        let (Some(r), Some(c), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(err());
        };

        let rank = Rank::ranks()
            .find(|rank| rank.symbol() == r.to_ascii_uppercase())
            .ok_or_else(err)?;
        let suit = Suit::suits()
            .find(|suit| suit.symbol() == c.to_ascii_uppercase())
            .ok_or_else(err)?;

        Ok(Card::new(rank, suit))
    }
}

impl From<Card> for String {
    fn from(card: Card) -> Self {
        card.to_string()
    }
}

impl TryFrom<String> for Card {
    type Error = ParseCardError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Card rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    /// Deuce
    Deuce = 0,
    /// Trey
    Trey,
    /// Four
    Four,
    /// Five
    Five,
    /// Six
    Six,
    /// Seven
    Seven,
    /// Eight
    Eight,
    /// Nine
    Nine,
    /// Ten
    Ten,
    /// Jack
    Jack,
    /// Queen
    Queen,
    /// King
    King,
    /// Ace
    Ace,
}

impl Rank {
    /// Returns all ranks.
    pub fn ranks() -> impl DoubleEndedIterator<Item = Rank> {
        use Rank::*;
        [
            Deuce, Trey, Four, Five, Six, Seven, Eight, Nine, Ten, Jack, Queen, King, Ace,
        ]
        .into_iter()
    }

    fn symbol(&self) -> char {
        match self {
            Rank::Deuce => '2',
            Rank::Trey => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ace => 'A',
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Card suit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suit {
    /// Clubs suit.
    Clubs = 0,
    /// Diamonds suit.
    Diamonds,
    /// Hearts suit.
    Hearts,
    /// Spades suit.
    Spades,
}

impl Suit {
    /// Returns all suits.
    pub fn suits() -> impl DoubleEndedIterator<Item = Suit> {
        [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades].into_iter()
    }

    fn symbol(&self) -> char {
        match self {
            Suit::Clubs => 'C',
            Suit::Diamonds => 'D',
            Suit::Hearts => 'H',
            Suit::Spades => 'S',
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A cards deck.
///
/// Cards are dealt from the front of the deck, the `next` index separates the
/// dealt prefix from the cards still in the deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Card>,
    next: usize,
}

impl Deck {
    /// The number of cards in the deck.
    pub const SIZE: usize = 52;

    /// Creates a deck shuffled with the given seed.
    ///
    /// The seed bytes are hashed into a ChaCha20 key, the shuffle is a pure
    /// function of the seed.
    pub fn shuffled(seed: &[u8]) -> Self {
        let key: [u8; 32] = Blake2s256::digest(seed).into();
        let mut rng = ChaCha20Rng::from_seed(key);

        let mut deck = Self::default();
        deck.cards.shuffle(&mut rng);
        deck
    }

    /// Deals a card from the deck.
    pub fn deal(&mut self) -> Option<Card> {
        let card = self.cards.get(self.next).copied()?;
        self.next += 1;
        Some(card)
    }

    /// Deals up to `n` cards from the deck.
    pub fn deal_n(&mut self, n: usize) -> Vec<Card> {
        (0..n).map_while(|_| self.deal()).collect()
    }

    /// Checks if the deck is empty.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Number of cards still in the deck.
    pub fn remaining(&self) -> usize {
        self.cards.len().saturating_sub(self.next)
    }

    /// Checks that the deck holds each card once and that the dealt prefix is
    /// within the deck, a deserialized deck may not.
    pub fn is_valid(&self) -> bool {
        let mut seen = [false; Self::SIZE];
        let unique = self.cards.iter().all(|c| {
            let idx = c.value() as usize;
            idx < Self::SIZE && !std::mem::replace(&mut seen[idx], true)
        });

        unique && self.cards.len() == Self::SIZE && self.next <= self.cards.len()
    }
}

impl Default for Deck {
    fn default() -> Self {
        let cards = Suit::suits()
            .flat_map(|s| Rank::ranks().map(move |r| Card::new(r, s)))
            .collect::<Vec<_>>();
        Self { cards, next: 0 }
    }
}

impl IntoIterator for Deck {
    type Item = Card;
    type IntoIter = std::iter::Skip<std::vec::IntoIter<Card>>;

    fn into_iter(self) -> Self::IntoIter {
        self.cards.into_iter().skip(self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::HashSet;

    #[test]
    fn card_encoding() {
        let mut cards = HashSet::default();
        for card in Deck::default() {
            assert_eq!(Card::new(card.rank(), card.suit()), card);
            assert_eq!(Card::from_value(card.value()), Some(card));
            cards.insert(card.value());
        }

        assert_eq!(cards.len(), Deck::SIZE);
        assert_eq!(Card::from_value(52), None);
    }

    #[test]
    fn card_to_string() {
        let c = Card::new(Rank::King, Suit::Diamonds);
        assert_eq!(c.to_string(), "KD");

        let c = Card::new(Rank::Five, Suit::Spades);
        assert_eq!(c.to_string(), "5S");

        let c = Card::new(Rank::Ten, Suit::Hearts);
        assert_eq!(c.to_string(), "TH");

        assert_eq!("ah".parse::<Card>(), Ok(Card::new(Rank::Ace, Suit::Hearts)));
        assert!("1H".parse::<Card>().is_err());
        assert!("AHS".parse::<Card>().is_err());
    }

    #[test]
    fn card_serde() {
        let c = Card::new(Rank::Jack, Suit::Clubs);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"JC\"");
        assert_eq!(serde_json::from_str::<Card>(&json).unwrap(), c);
    }

    #[test]
    fn seeded_shuffle_is_deterministic() {
        let d1 = Deck::shuffled(b"hand-1");
        let d2 = Deck::shuffled(b"hand-1");
        let d3 = Deck::shuffled(b"hand-2");

        assert_eq!(d1, d2);
        assert_ne!(d1, d3);
        assert_ne!(d1, Deck::default());
    }

    #[test]
    fn deal_without_repetition() {
        let mut deck = Deck::shuffled(&[7, 7, 7]);
        let mut seen = HashSet::default();

        let hole = deck.deal_n(2);
        assert_eq!(hole.len(), 2);
        assert_eq!(deck.remaining(), 50);
        seen.extend(hole);

        while let Some(card) = deck.deal() {
            assert!(seen.insert(card));
        }

        assert!(deck.is_empty());
        assert_eq!(seen.len(), Deck::SIZE);
        assert!(deck.deal_n(3).is_empty());
    }

    #[test]
    fn deserialized_decks_are_checked() {
        let deck = Deck::shuffled(b"seed");
        assert!(deck.is_valid());

        let mut json = serde_json::to_value(&deck).unwrap();
        json["next"] = 60.into();
        let past_end = serde_json::from_value::<Deck>(json).unwrap();
        assert!(!past_end.is_valid());
        assert_eq!(past_end.remaining(), 0);

        let mut json = serde_json::to_value(&deck).unwrap();
        json["cards"][1] = json["cards"][0].clone();
        assert!(!serde_json::from_value::<Deck>(json).unwrap().is_valid());

        let mut json = serde_json::to_value(&deck).unwrap();
        json["cards"].as_array_mut().unwrap().pop();
        assert!(!serde_json::from_value::<Deck>(json).unwrap().is_valid());

        assert_eq!(
            "ZZ".parse::<Card>().unwrap_err().to_string(),
            "invalid card \"ZZ\""
        );
    }
}
