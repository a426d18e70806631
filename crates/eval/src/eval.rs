// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Poker hand evaluator.
//!
//! A hand of 5 to 7 cards is evaluated by ranking every 5 cards subset and
//! keeping the best one. The resulting [HandValue] orders first by category and
//! then by the ranks that break ties inside the category.
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

use pokerchain_cards::{Card, Rank};

/// The hand category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HandRank {
    /// No pairs.
    HighCard,
    /// One pair.
    OnePair,
    /// Two pairs.
    TwoPair,
    /// Three of a kind.
    ThreeOfAKind,
    /// Five consecutive ranks.
    Straight,
    /// Five cards of the same suit.
    Flush,
    /// Three of a kind and a pair.
    FullHouse,
    /// Four of a kind.
    FourOfAKind,
    /// Straight of the same suit.
    StraightFlush,
}

impl fmt::Display for HandRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HandRank::HighCard => "High Card",
            HandRank::OnePair => "One Pair",
            HandRank::TwoPair => "Two Pair",
            HandRank::ThreeOfAKind => "Three of a Kind",
            HandRank::Straight => "Straight",
            HandRank::Flush => "Flush",
            HandRank::FullHouse => "Full House",
            HandRank::FourOfAKind => "Four of a Kind",
            HandRank::StraightFlush => "Straight Flush",
        };

        write!(f, "{label}")
    }
}

/// The value of a hand, higher values win.
#[derive(Debug, Clone)]
pub struct HandValue {
    rank: HandRank,
    /// Ranks compared in order to break ties between hands of the same category.
    tiebreak: Vec<Rank>,
    /// The five cards making this hand.
    hand: [Card; 5],
}

impl HandValue {
    /// Evaluates a 5, 6, or 7 cards hand.
    ///
    /// Panics if the number of cards is not 5 <= n <= 7.
    pub fn eval(cards: &[Card]) -> HandValue {
        let n = cards.len();
        assert!((5..=7).contains(&n), "5 <= cards <= 7");

        let mut best: Option<HandValue> = None;
        for c1 in 0..n {
            for c2 in (c1 + 1)..n {
                for c3 in (c2 + 1)..n {
                    for c4 in (c3 + 1)..n {
                        for c5 in (c4 + 1)..n {
                            let hand = [cards[c1], cards[c2], cards[c3], cards[c4], cards[c5]];
                            let value = Self::eval5(hand);
                            if best.as_ref().is_none_or(|b| value > *b) {
                                best = Some(value);
                            }
                        }
                    }
                }
            }
        }

        best.expect("at least one 5 cards hand")
    }

    /// The hand category.
    pub fn rank(&self) -> HandRank {
        self.rank
    }

    /// The five cards that make this hand.
    pub fn hand(&self) -> &[Card] {
        &self.hand
    }

    fn eval5(hand: [Card; 5]) -> HandValue {
        let mut counts = [0u8; 13];
        for card in &hand {
            counts[card.rank() as usize] += 1;
        }

        // Rank groups ordered by size and then by rank, both descending.
        let mut groups = Rank::ranks()
            .filter(|r| counts[*r as usize] > 0)
            .map(|r| (counts[r as usize], r))
            .collect::<Vec<_>>();
        groups.sort_by(|a, b| b.cmp(a));

        let is_flush = hand.iter().all(|c| c.suit() == hand[0].suit());
        let straight_high = Self::straight_high(&groups);

        let (rank, tiebreak) = match (straight_high, is_flush) {
            (Some(high), true) => (HandRank::StraightFlush, vec![high]),
            (Some(high), false) => (HandRank::Straight, vec![high]),
            _ => {
                let tiebreak = groups.iter().map(|(_, r)| *r).collect::<Vec<_>>();
                let rank = match (groups[0].0, groups.get(1).map(|g| g.0)) {
                    (4, _) => HandRank::FourOfAKind,
                    (3, Some(2)) => HandRank::FullHouse,
                    _ if is_flush => HandRank::Flush,
                    (3, _) => HandRank::ThreeOfAKind,
                    (2, Some(2)) => HandRank::TwoPair,
                    (2, _) => HandRank::OnePair,
                    _ => HandRank::HighCard,
                };
                (rank, tiebreak)
            }
        };

        HandValue {
            rank,
            tiebreak,
            hand,
        }
    }

    /// Returns the high card of a straight, the wheel A-2-3-4-5 is five high.
    fn straight_high(groups: &[(u8, Rank)]) -> Option<Rank> {
        if groups.len() != 5 {
            return None;
        }

        let high = groups[0].1;
        let low = groups[4].1;
        if high as u8 - low as u8 == 4 {
            Some(high)
        } else if high == Rank::Ace && groups[1].1 == Rank::Five {
            Some(Rank::Five)
        } else {
            None
        }
    }
}

impl PartialEq for HandValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HandValue {}

impl PartialOrd for HandValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HandValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.tiebreak.cmp(&other.tiebreak))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(s: &str) -> Vec<Card> {
        s.split_whitespace().map(|c| c.parse().unwrap()).collect()
    }

    fn eval(s: &str) -> HandValue {
        HandValue::eval(&cards(s))
    }

    #[test]
    fn categories() {
        assert_eq!(eval("AH KH QH JH TH").rank(), HandRank::StraightFlush);
        assert_eq!(eval("9C 9D 9H 9S 2D").rank(), HandRank::FourOfAKind);
        assert_eq!(eval("9C 9D 9H 2S 2D").rank(), HandRank::FullHouse);
        assert_eq!(eval("2H 7H 9H JH KH").rank(), HandRank::Flush);
        assert_eq!(eval("5C 6D 7H 8S 9D").rank(), HandRank::Straight);
        assert_eq!(eval("AC 2D 3H 4S 5D").rank(), HandRank::Straight);
        assert_eq!(eval("9C 9D 9H 2S 3D").rank(), HandRank::ThreeOfAKind);
        assert_eq!(eval("9C 9D 2H 2S 3D").rank(), HandRank::TwoPair);
        assert_eq!(eval("9C 9D 2H 4S 3D").rank(), HandRank::OnePair);
        assert_eq!(eval("9C JD 2H 4S 3D").rank(), HandRank::HighCard);
    }

    #[test]
    fn wheel_is_lowest_straight() {
        assert!(eval("AC 2D 3H 4S 5D") < eval("2C 3D 4H 5S 6D"));
        assert!(eval("TC JD QH KS AD") > eval("9C TD JH QS KD"));
    }

    #[test]
    fn kickers_break_ties() {
        assert!(eval("AC AD KH 4S 3D") > eval("AH AS QH 4C 3C"));
        assert!(eval("9C 9D 2H 2S AD") > eval("9H 9S 2C 2D KD"));
        assert_eq!(eval("9C 9D 2H 2S AD"), eval("9H 9S 2C 2D AS"));
    }

    #[test]
    fn best_of_seven() {
        // Seven cards with both a straight and a flush, the flush is best.
        let v = eval("4H 9H 5C 6D 7H 8H KH");
        assert_eq!(v.rank(), HandRank::Flush);
        assert_eq!(v.hand().len(), 5);

        // Both players play the board.
        let board = "TC JD QH KS AD";
        assert_eq!(eval(&format!("2C 3D {board}")), eval(&format!("4C 5D {board}")));
    }
}
