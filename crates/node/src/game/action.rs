// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Player actions rules.
use std::ops::RangeInclusive;

use pokerchain_core::{
    message::PlayerAction,
    poker::{Chips, PlayerStatus, Round},
};

use super::{GameEngine, Player};
use crate::errors::GameError;

/// An action a player can take now and the chips it can put in the pot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegalAction {
    /// The action.
    pub action: PlayerAction,
    /// The minimum amount.
    pub min: Chips,
    /// The maximum amount.
    pub max: Chips,
}

/// The rules of an action.
pub trait Action {
    /// Checks if the player at `seat` can take this action and returns the
    /// amounts it can put in the pot.
    fn verify(&self, game: &GameEngine, seat: u8) -> Result<RangeInclusive<Chips>, GameError>;

    /// Applies a verified action returning the chips put in the pot.
    fn execute(&self, game: &mut GameEngine, seat: u8, amount: Chips) -> Result<Chips, GameError>;

    /// Checks if the player must choose the amount.
    fn requires_amount(&self) -> bool;
}

impl Action for PlayerAction {
    fn verify(&self, game: &GameEngine, seat: u8) -> Result<RangeInclusive<Chips>, GameError> {
        let player = game.seats.get(seat).ok_or(GameError::InvalidSeat(seat))?;

        if self.is_blind() {
            verify_blind(*self, game, seat, player)
        } else {
            verify_bet(*self, game, seat, player)
        }
    }

    fn execute(&self, game: &mut GameEngine, seat: u8, amount: Chips) -> Result<Chips, GameError> {
        let player = game
            .seats
            .get_mut(seat)
            .ok_or_else(|| GameError::Invariant(format!("no player at seat {seat}")))?;

        match self {
            PlayerAction::Fold => {
                player.status = PlayerStatus::Folded;
                Ok(Chips::ZERO)
            }
            PlayerAction::Check => {
                player.status = PlayerStatus::Active;
                Ok(Chips::ZERO)
            }
            action => {
                let stack = player.chips;
                let paid = player.deduct(amount).ok_or_else(|| {
                    GameError::Invariant(format!("{action} of {amount} with a stack of {stack}"))
                })?;

                // Blinds do not count as acting in the round.
                if !action.is_blind() && player.status != PlayerStatus::AllIn {
                    player.status = PlayerStatus::Active;
                }

                Ok(paid)
            }
        }
    }

    fn requires_amount(&self) -> bool {
        matches!(self, PlayerAction::Bet | PlayerAction::Raise)
    }
}

fn verify_blind(
    action: PlayerAction,
    game: &GameEngine,
    seat: u8,
    player: &Player,
) -> Result<RangeInclusive<Chips>, GameError> {
    if !matches!(game.round, Round::Ante | Round::Preflop) {
        return Err(GameError::illegal(action, "blinds are posted before the flop"));
    }

    if !player.status.can_act() {
        return Err(GameError::illegal(action, format!("player is {}", player.status)));
    }

    let (blind_seat, blind) = if action == PlayerAction::SmallBlind {
        (game.small_blind_seat, game.config.small_blind)
    } else {
        (game.big_blind_seat, game.config.big_blind)
    };

    if blind_seat != Some(seat) {
        return Err(GameError::illegal(action, "not the blind seat"));
    }

    if game.log.has_posted(action) {
        return Err(GameError::illegal(action, "already posted"));
    }

    if action == PlayerAction::BigBlind && !game.log.has_posted(PlayerAction::SmallBlind) {
        return Err(GameError::illegal(action, "small blind not posted"));
    }

    if player.chips.is_zero() {
        return Err(GameError::illegal(action, "no chips"));
    }

    let amount = blind.min(player.chips);
    Ok(amount..=amount)
}

fn verify_bet(
    action: PlayerAction,
    game: &GameEngine,
    seat: u8,
    player: &Player,
) -> Result<RangeInclusive<Chips>, GameError> {
    let round = game.round;
    if !round.is_betting() {
        return Err(GameError::illegal(action, format!("no betting in {round}")));
    }

    if !player.status.can_act() {
        return Err(GameError::illegal(action, format!("player is {}", player.status)));
    }

    if game.find_next_player_to_act() != Some(seat) {
        return Err(GameError::illegal(action, "not the player turn"));
    }

    let contribution = game.log.round_contribution(round, &player.address);
    let largest = game.log.largest_bet(round);
    let big_blind = game.config.big_blind;
    let stack = player.chips;

    match action {
        PlayerAction::Fold => Ok(Chips::ZERO..=Chips::ZERO),
        PlayerAction::Check => {
            if contribution < largest {
                return Err(GameError::illegal(action, "there is a bet to call"));
            }

            Ok(Chips::ZERO..=Chips::ZERO)
        }
        PlayerAction::Call => {
            if contribution >= largest {
                return Err(GameError::illegal(action, "nothing to call"));
            }

            if stack.is_zero() {
                return Err(GameError::illegal(action, "no chips"));
            }

            let amount = (largest - contribution).min(stack);
            Ok(amount..=amount)
        }
        PlayerAction::Bet => {
            if contribution < largest {
                return Err(GameError::illegal(action, "there is a bet to call"));
            }

            if stack.is_zero() {
                return Err(GameError::illegal(action, "no chips"));
            }

            if round == Round::Preflop
                && game.config.policy.no_bet_after_preflop_limp
                && limped(game)
            {
                return Err(GameError::illegal(action, "check or raise after a limp"));
            }

            Ok(big_blind.min(stack)..=stack)
        }
        PlayerAction::Raise => {
            if largest.is_zero() {
                return Err(GameError::illegal(action, "no bet to raise"));
            }

            let increment = game.log.last_raise(round).max(big_blind);
            let min = largest + increment - contribution;
            if stack < min {
                return Err(GameError::illegal(
                    action,
                    format!("raise needs {min} chips, stack is {stack}"),
                ));
            }

            Ok(min..=stack)
        }
        PlayerAction::AllIn => {
            if stack.is_zero() {
                return Err(GameError::illegal(action, "no chips"));
            }

            Ok(stack..=stack)
        }
        PlayerAction::SmallBlind | PlayerAction::BigBlind => {
            Err(GameError::illegal(action, "not a betting action"))
        }
    }
}

/// Every live player put exactly the big blind in the pot preflop.
fn limped(game: &GameEngine) -> bool {
    let live = game
        .seats
        .occupied()
        .filter(|(_, p)| p.status.in_hand())
        .map(|(_, p)| game.log.round_contribution(Round::Preflop, &p.address))
        .collect::<Vec<_>>();

    live.len() >= 2 && live.iter().all(|c| *c == game.config.big_blind)
}
