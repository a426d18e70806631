// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Texas Hold'em table engine.
//!
//! A [GameEngine] is the single authority over one table: it seats players,
//! validates and applies their actions, moves the hand through its rounds and
//! pays the pots at showdown. Given the same inputs in the same order the engine
//! always produces the same states, so every node replaying a table agrees on
//! stacks and winners.
use blake2::{Blake2s256, Digest};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use pokerchain_core::{
    crypto::Address,
    message::PlayerAction,
    poker::{Card, Chips, Deck, PlayerStatus, Round},
};

use crate::errors::{ErrorKind, GameError};

mod action;
pub use action::{Action, LegalAction};

mod history;
pub use history::{HandLog, Turn};

mod player;
pub use player::{Player, Seats};

mod pots;
pub use pots::{Pot, Winner};

mod snapshot;

/// Betting rules that differ between tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BettingPolicy {
    /// Disallow bets preflop once every live player has put exactly the big
    /// blind in the pot, players must check or raise instead.
    pub no_bet_after_preflop_limp: bool,
}

impl Default for BettingPolicy {
    fn default() -> Self {
        Self {
            no_bet_after_preflop_limp: true,
        }
    }
}

/// Table configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableConfig {
    /// The small blind.
    pub small_blind: Chips,
    /// The big blind.
    pub big_blind: Chips,
    /// The minimum buy-in.
    pub min_buy_in: Chips,
    /// The maximum buy-in.
    pub max_buy_in: Chips,
    /// Players needed to start a hand.
    pub min_players: usize,
    /// Number of seats.
    pub max_players: usize,
    /// Seconds a player has to act, enforced by the gateway.
    pub action_timeout: u64,
    /// Betting rules.
    pub policy: BettingPolicy,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            small_blind: Chips::new(10),
            big_blind: Chips::new(20),
            min_buy_in: Chips::new(200),
            max_buy_in: Chips::new(2_000),
            min_players: 2,
            max_players: 9,
            action_timeout: 30,
            policy: BettingPolicy::default(),
        }
    }
}

impl TableConfig {
    /// The most seats a table can have.
    pub const MAX_SEATS: usize = 9;

    fn validate(&self) -> Result<(), GameError> {
        let invalid = |msg: &str| Err(GameError::InvalidConfig(msg.to_string()));

        if self.small_blind.is_zero() || self.big_blind.is_zero() {
            return invalid("blinds must be positive");
        }

        if self.small_blind > self.big_blind {
            return invalid("small blind is larger than big blind");
        }

        if self.min_players < 2 || self.min_players > self.max_players {
            return invalid("min players must be between 2 and max players");
        }

        if self.max_players > Self::MAX_SEATS {
            return invalid("too many seats");
        }

        if self.min_buy_in.is_zero() || self.min_buy_in > self.max_buy_in {
            return invalid("buy-in limits are invalid");
        }

        Ok(())
    }
}

/// The state of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEngine {
    address: Address,
    config: TableConfig,
    seats: Seats,
    round: Round,
    dealer: Option<u8>,
    small_blind_seat: Option<u8>,
    big_blind_seat: Option<u8>,
    /// The seat of the last player who acted, 0 before anyone acted.
    last_acted_seat: u8,
    community_cards: Vec<Card>,
    deck: Deck,
    hand_number: u64,
    log: HandLog,
    /// Pot cap of each player who went all-in this hand.
    side_pots: BTreeMap<Address, Chips>,
    winners: Vec<Winner>,
    /// Private bytes mixed into the automatic deal seeds.
    #[serde(default)]
    deal_secret: Vec<u8>,
    corrupted: bool,
}

impl GameEngine {
    /// Creates an empty table.
    pub fn new(address: Address, config: TableConfig) -> Result<Self, GameError> {
        config.validate()?;

        Ok(Self {
            address,
            seats: Seats::new(config.max_players),
            config,
            round: Round::Ante,
            dealer: None,
            small_blind_seat: None,
            big_blind_seat: None,
            last_acted_seat: 0,
            community_cards: Vec::new(),
            deck: Deck::default(),
            hand_number: 0,
            log: HandLog::default(),
            side_pots: BTreeMap::new(),
            winners: Vec::new(),
            deal_secret: Vec::new(),
            corrupted: false,
        })
    }

    /// Sets the private bytes mixed into the seeds of the automatic deals.
    ///
    /// Without a secret an automatic deal seed only depends on public table
    /// state and anybody can compute the hole cards.
    pub fn set_deal_secret(&mut self, secret: &[u8]) {
        self.deal_secret = secret.to_vec();
    }

    /// Checks if the automatic deals use a secret.
    pub fn has_deal_secret(&self) -> bool {
        !self.deal_secret.is_empty()
    }

    /// The table address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The table configuration.
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// The current round.
    pub fn round(&self) -> Round {
        self.round
    }

    /// The chips put in the pot this hand.
    pub fn pot(&self) -> Chips {
        self.log.total()
    }

    /// The board cards.
    pub fn community_cards(&self) -> &[Card] {
        &self.community_cards
    }

    /// The dealer seat.
    pub fn dealer(&self) -> Option<u8> {
        self.dealer
    }

    /// The small blind seat.
    pub fn small_blind_seat(&self) -> Option<u8> {
        self.small_blind_seat
    }

    /// The big blind seat.
    pub fn big_blind_seat(&self) -> Option<u8> {
        self.big_blind_seat
    }

    /// The seat of the last player who acted.
    pub fn last_acted_seat(&self) -> u8 {
        self.last_acted_seat
    }

    /// The hand counter.
    pub fn hand_number(&self) -> u64 {
        self.hand_number
    }

    /// The table seats.
    pub fn seats(&self) -> &Seats {
        &self.seats
    }

    /// The player with the given address.
    pub fn player(&self, address: &Address) -> Option<&Player> {
        self.seats
            .seat_of(address)
            .and_then(|seat| self.seats.get(seat))
    }

    /// The current hand log.
    pub fn log(&self) -> &HandLog {
        &self.log
    }

    /// The all-in players pot caps.
    pub fn side_pots(&self) -> &BTreeMap<Address, Chips> {
        &self.side_pots
    }

    /// The winners of the last showdown.
    pub fn winners(&self) -> &[Winner] {
        &self.winners
    }

    /// Checks if an invariant violation made this table unusable.
    pub fn is_corrupted(&self) -> bool {
        self.corrupted
    }

    /// Seats a player at the first free seat.
    ///
    /// Returns the player seat.
    pub fn join(&mut self, player: Player) -> Result<u8, GameError> {
        self.check_usable()?;

        if self.seats.seat_of(&player.address).is_some() {
            return Err(GameError::AlreadyJoined(player.address));
        }

        let seat = self.seats.free_seat().ok_or(GameError::TableFull)?;
        self.join_at_seat(player, seat)
    }

    /// Seats a player at the given seat.
    ///
    /// Before the first deal the first two players post the blinds, and the hand
    /// is dealt as soon as enough players are seated. Players who join while a
    /// hand is played sit out until the next hand.
    pub fn join_at_seat(&mut self, mut player: Player, seat: u8) -> Result<u8, GameError> {
        self.check_usable()?;

        if !self.seats.is_valid(seat) {
            return Err(GameError::InvalidSeat(seat));
        }

        if self.seats.seat_of(&player.address).is_some() {
            return Err(GameError::AlreadyJoined(player.address));
        }

        if self.seats.get(seat).is_some() {
            return Err(GameError::SeatTaken(seat));
        }

        if player.chips < self.config.min_buy_in || player.chips > self.config.max_buy_in {
            return Err(GameError::InvalidBuyIn(player.chips));
        }

        player.hole_cards.clear();
        player.status = if self.round == Round::Ante {
            PlayerStatus::NotActed
        } else {
            PlayerStatus::SittingOut
        };

        info!(
            "Player {} joined table {} at seat {seat}",
            player.address, self.address
        );

        self.seats.insert(seat, player);

        if self.round == Round::Ante {
            let res = self.post_join_blind(seat).and_then(|_| self.maybe_start());
            self.guard(res)?;
        }

        Ok(seat)
    }

    /// Removes a player from the table, the player folds if in a hand.
    ///
    /// Returns the player so that its chips can be settled.
    pub fn leave(&mut self, address: &Address) -> Result<Player, GameError> {
        self.check_usable()?;

        let seat = self
            .seats
            .seat_of(address)
            .ok_or_else(|| GameError::PlayerNotFound(address.clone()))?;

        let res = self.leave_seat(seat);
        self.guard(res)
    }

    /// Deals a new hand shuffling the deck with the given seed.
    pub fn deal(&mut self, seed: &[u8]) -> Result<(), GameError> {
        self.check_usable()?;

        if !matches!(self.round, Round::Ante | Round::Showdown) {
            return Err(GameError::HandInProgress);
        }

        if self.count_ready() < self.config.min_players {
            return Err(GameError::NotEnoughPlayers);
        }

        let res = self.start_deal(seed);
        self.guard(res)
    }

    /// Plays an action for a player.
    ///
    /// The amount is the chips the player puts in the pot with this action, it
    /// is required for bets and raises and defaults to the only legal amount
    /// for the other actions.
    pub fn perform_action(
        &mut self,
        address: &Address,
        action: PlayerAction,
        amount: Option<Chips>,
    ) -> Result<(), GameError> {
        self.check_usable()?;

        let seat = self
            .seats
            .seat_of(address)
            .ok_or_else(|| GameError::PlayerNotFound(address.clone()))?;

        if self.round == Round::Ante
            && !action.is_blind()
            && self.count_ready() < self.config.min_players
        {
            return Err(GameError::NotEnoughPlayers);
        }

        let range = action.verify(self, seat)?;
        let amount = match amount {
            Some(amount) => amount,
            None if action.requires_amount() => {
                return Err(GameError::InvalidAction(format!(
                    "{action} requires an amount"
                )));
            }
            None => *range.start(),
        };

        if !range.contains(&amount) {
            return Err(GameError::illegal(
                action,
                format!(
                    "amount {amount} outside {}..={}",
                    range.start(),
                    range.end()
                ),
            ));
        }

        let res = self.apply(seat, action, amount).and_then(|_| {
            if self.round == Round::Ante {
                self.maybe_start()
            } else {
                self.progress()
            }
        });

        self.guard(res)
    }

    /// Returns the actions a player can take now with their amount ranges.
    pub fn valid_actions(&self, address: &Address) -> Vec<LegalAction> {
        let Some(seat) = self.seats.seat_of(address) else {
            return Vec::new();
        };

        if self.corrupted {
            return Vec::new();
        }

        PlayerAction::ALL
            .iter()
            .filter_map(|action| {
                action.verify(self, seat).ok().map(|range| LegalAction {
                    action: *action,
                    min: *range.start(),
                    max: *range.end(),
                })
            })
            .collect()
    }

    /// Returns the seat of the player who should act next.
    pub fn find_next_player_to_act(&self) -> Option<u8> {
        self.seats
            .next_after(self.last_acted_seat, |p| p.status.can_act())
    }

    /// Records the pot cap of every player who went all-in this hand.
    pub fn calculate_side_pots(&mut self) {
        let contributions = self.log.contributions();

        let caps = self
            .seats
            .occupied()
            .filter(|(_, p)| p.status == PlayerStatus::AllIn)
            .filter(|(_, p)| !self.side_pots.contains_key(&p.address))
            .map(|(_, p)| {
                let all_in = self.log.contribution(&p.address);
                let cap = contributions
                    .iter()
                    .map(|(_, c)| (*c).min(all_in))
                    .sum::<Chips>();
                (p.address.clone(), cap)
            })
            .collect::<Vec<_>>();

        for (address, cap) in caps {
            debug!("Table {} side pot for {address} capped at {cap}", self.address);
            self.side_pots.insert(address, cap);
        }
    }

    /// Serializes the full table state.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("Should serialize table state")
    }

    /// Restores a table from a serialized state.
    ///
    /// The structure of the restored state is checked so that a tampered or
    /// truncated snapshot fails here instead of during play.
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let engine = serde_json::from_str::<Self>(json)
            .map_err(|e| GameError::Snapshot(e.to_string()))?;
        engine.check_snapshot()?;
        Ok(engine)
    }

    fn check_snapshot(&self) -> Result<(), GameError> {
        let broken = |msg: &str| Err(GameError::Invariant(format!("snapshot {msg}")));

        self.config.validate()?;

        if self.seats.len() != self.config.max_players {
            return broken("seats do not match the table config");
        }

        if !self.deck.is_valid() {
            return broken("deck is not a valid deck");
        }

        if !self.log.is_valid() {
            return broken("hand log has missing rounds");
        }

        if self.community_cards.len() > 5 {
            return broken("has too many community cards");
        }

        let seats = [self.dealer, self.small_blind_seat, self.big_blind_seat];
        if seats
            .into_iter()
            .flatten()
            .any(|seat| !self.seats.is_valid(seat))
        {
            return broken("button seats are not table seats");
        }

        Ok(())
    }

    fn check_usable(&self) -> Result<(), GameError> {
        if self.corrupted {
            Err(GameError::Corrupted)
        } else {
            Ok(())
        }
    }

    /// Poisons the table on invariant violations.
    fn guard<T>(&mut self, res: Result<T, GameError>) -> Result<T, GameError> {
        if let Err(e) = &res {
            if e.kind() == ErrorKind::Fatal {
                error!("Table {} {e}", self.address);
                self.corrupted = true;
            }
        }

        res
    }

    /// Players that can play the next hand.
    fn count_ready(&self) -> usize {
        self.seats.count_where(|p| match self.round {
            Round::Ante => {
                p.status != PlayerStatus::SittingOut
                    && (!p.chips.is_zero() || p.status == PlayerStatus::AllIn)
            }
            _ => !p.chips.is_zero(),
        })
    }

    /// Executes a verified action and logs it.
    fn apply(&mut self, seat: u8, action: PlayerAction, amount: Chips) -> Result<(), GameError> {
        let amount = action.execute(self, seat, amount)?;

        let address = self
            .seats
            .get(seat)
            .map(|p| p.address.clone())
            .ok_or_else(|| GameError::Invariant(format!("no player at seat {seat}")))?;

        debug!("Table {} seat {seat} {address} {action} {amount}", self.address);

        self.log.push(
            self.round,
            Turn {
                seat,
                address,
                action,
                amount,
            },
        );
        self.last_acted_seat = seat;

        Ok(())
    }

    /// Posts a blind on behalf of a player.
    fn post_blind(&mut self, seat: u8, blind: PlayerAction) -> Result<(), GameError> {
        let range = blind
            .verify(self, seat)
            .map_err(|e| GameError::Invariant(format!("forced {blind} failed: {e}")))?;

        self.apply(seat, blind, *range.end())
    }

    /// The first two players to join before the first deal post the blinds.
    fn post_join_blind(&mut self, seat: u8) -> Result<(), GameError> {
        if self.small_blind_seat.is_none() {
            self.small_blind_seat = Some(seat);
            self.post_blind(seat, PlayerAction::SmallBlind)
        } else if self.big_blind_seat.is_none() {
            self.big_blind_seat = Some(seat);
            self.post_blind(seat, PlayerAction::BigBlind)
        } else {
            Ok(())
        }
    }

    /// Deals the first hand once enough players are seated.
    fn maybe_start(&mut self) -> Result<(), GameError> {
        if self.round == Round::Ante && self.count_ready() >= self.config.min_players {
            let seed = self.hand_seed();
            self.start_deal(&seed)?;
        }

        Ok(())
    }

    /// A deck seed derived from the deal secret and the table state.
    fn hand_seed(&self) -> Vec<u8> {
        let mut hasher = Blake2s256::new();
        hasher.update(&self.deal_secret);
        hasher.update(self.address.as_str());
        hasher.update(self.hand_number.to_le_bytes());
        for (seat, p) in self.seats.occupied() {
            hasher.update([seat]);
            hasher.update(p.address.as_str());
        }

        hasher.finalize().to_vec()
    }

    fn start_deal(&mut self, seed: &[u8]) -> Result<(), GameError> {
        if self.round == Round::Showdown {
            self.next_hand()?;
        }

        if self.dealer.is_none() {
            self.assign_first_button();
        }

        // Force any blind that has not been posted yet.
        for blind in [PlayerAction::SmallBlind, PlayerAction::BigBlind] {
            let seat = match blind {
                PlayerAction::SmallBlind => self.small_blind_seat,
                _ => self.big_blind_seat,
            };

            if let Some(seat) = seat {
                if !self.log.has_posted(blind) {
                    self.post_blind(seat, blind)?;
                }
            }
        }

        self.deck = Deck::shuffled(seed);
        for (seat, player) in self.seats.occupied_mut() {
            if player.status.in_hand() {
                player.hole_cards = self.deck.deal_n(2);
                if player.hole_cards.len() != 2 {
                    return Err(GameError::Invariant(format!(
                        "no hole cards left for seat {seat}"
                    )));
                }
            }
        }

        info!(
            "Table {} dealing hand {} dealer {:?}",
            self.address, self.hand_number, self.dealer
        );

        self.next_hand()?;
        self.progress()
    }

    /// Places the button for the first hand.
    fn assign_first_button(&mut self) {
        let ready = |p: &Player| p.status.in_hand();

        if self.small_blind_seat.is_none() {
            self.small_blind_seat = self.seats.next_after(0, ready);
        }

        if self.big_blind_seat.is_none() {
            self.big_blind_seat = self
                .small_blind_seat
                .and_then(|sb| self.seats.next_after(sb, ready));
        }

        // Heads up the small blind has the button.
        self.dealer = if self.seats.count_where(ready) == 2 {
            self.small_blind_seat
        } else {
            self.small_blind_seat
                .and_then(|sb| self.seats.prev_before(sb, ready))
        };
    }

    /// Moves the button and the blinds to the next players with chips.
    fn rotate_button(&mut self) {
        let has_chips = |p: &Player| !p.chips.is_zero();

        let count = self.seats.count_where(has_chips);
        if count < 2 {
            self.small_blind_seat = None;
            self.big_blind_seat = None;
            return;
        }

        let dealer = self.seats.next_after(self.dealer.unwrap_or(0), has_chips);
        let small_blind = if count == 2 {
            dealer
        } else {
            dealer.and_then(|d| self.seats.next_after(d, has_chips))
        };
        let big_blind = small_blind.and_then(|sb| self.seats.next_after(sb, has_chips));

        self.dealer = dealer;
        self.small_blind_seat = small_blind;
        self.big_blind_seat = big_blind;
    }

    fn leave_seat(&mut self, seat: u8) -> Result<Player, GameError> {
        let round = self.round;
        match round {
            Round::Ante => {
                // Give back any posted blind and let the remaining players post again.
                self.refund_blinds();

                let player = self.remove_seat(seat)?;
                let seats = self.seats.occupied().map(|(s, _)| s).collect::<Vec<_>>();
                for seat in seats {
                    self.post_join_blind(seat)?;
                }

                Ok(player)
            }
            Round::Showdown => self.remove_seat(seat),
            _ => {
                let folded = match self.seats.get_mut(seat) {
                    Some(p) if p.status.in_hand() => {
                        p.status = PlayerStatus::Folded;
                        Some(p.address.clone())
                    }
                    _ => None,
                };

                if let Some(address) = folded {
                    self.log.push(
                        round,
                        Turn {
                            seat,
                            address,
                            action: PlayerAction::Fold,
                            amount: Chips::ZERO,
                        },
                    );
                }

                let player = self.remove_seat(seat)?;
                self.progress()?;
                Ok(player)
            }
        }
    }

    fn remove_seat(&mut self, seat: u8) -> Result<Player, GameError> {
        let player = self
            .seats
            .remove(seat)
            .ok_or_else(|| GameError::Invariant(format!("no player at seat {seat}")))?;

        info!(
            "Player {} left table {} from seat {seat}",
            player.address, self.address
        );

        Ok(player)
    }

    fn refund_blinds(&mut self) {
        for turn in self.log.turns() {
            if let Some(p) = self.seats.get_mut(turn.seat) {
                if p.address == turn.address {
                    p.chips += turn.amount;
                    p.status = PlayerStatus::NotActed;
                }
            }
        }

        self.log = HandLog::default();
        self.small_blind_seat = None;
        self.big_blind_seat = None;
        self.last_acted_seat = 0;
    }

    /// Advances the hand while no player needs to act.
    fn progress(&mut self) -> Result<(), GameError> {
        while self.round.is_betting() && self.is_round_complete() {
            self.next_hand()?;
        }

        Ok(())
    }

    /// Checks if all players in the hand have acted and matched the largest bet.
    fn is_round_complete(&self) -> bool {
        let in_hand = self.seats.count_where(|p| p.status.in_hand());
        if in_hand < 2 {
            return true;
        }

        let largest = self.log.largest_bet(self.round);
        let matched = |p: &Player| self.log.round_contribution(self.round, &p.address) >= largest;

        let can_act = self
            .seats
            .occupied()
            .filter(|(_, p)| p.status.can_act())
            .map(|(_, p)| p)
            .collect::<Vec<_>>();

        match can_act.as_slice() {
            [] => true,
            // Everybody else is all-in.
            [p] => matched(p),
            players => players
                .iter()
                .all(|p| p.status == PlayerStatus::Active && matched(p)),
        }
    }

    /// Moves the hand to the next round.
    fn next_hand(&mut self) -> Result<(), GameError> {
        self.calculate_side_pots();

        match self.round {
            Round::Ante => {
                self.round = Round::Preflop;
                self.last_acted_seat = self.big_blind_seat.unwrap_or(0);
            }
            Round::Preflop => {
                self.deal_board(3)?;
                self.start_round(Round::Flop);
            }
            Round::Flop => {
                self.deal_board(1)?;
                self.start_round(Round::Turn);
            }
            Round::Turn => {
                self.deal_board(1)?;
                self.start_round(Round::River);
            }
            Round::River => {
                self.round = Round::Showdown;
                self.calculate_winner()?;
            }
            Round::Showdown => self.start_hand(),
        }

        Ok(())
    }

    fn deal_board(&mut self, count: usize) -> Result<(), GameError> {
        for _ in 0..count {
            let card = self
                .deck
                .deal()
                .ok_or_else(|| GameError::Invariant("deck is empty".to_string()))?;
            self.community_cards.push(card);
        }

        Ok(())
    }

    fn start_round(&mut self, round: Round) {
        self.round = round;

        for (_, player) in self.seats.occupied_mut() {
            if player.status == PlayerStatus::Active {
                player.status = PlayerStatus::NotActed;
            }
        }

        self.last_acted_seat = self.dealer.unwrap_or(0);
    }

    /// Resets the table for a new hand.
    fn start_hand(&mut self) {
        self.round = Round::Ante;
        self.hand_number += 1;
        self.log = HandLog::default();
        self.community_cards.clear();
        self.side_pots.clear();
        self.winners.clear();
        self.deck = Deck::default();

        for (_, player) in self.seats.occupied_mut() {
            player.start_hand();
        }

        self.rotate_button();
        self.last_acted_seat = self.big_blind_seat.unwrap_or(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(super) fn addr(name: &str) -> Address {
        Address::new(name)
    }

    fn config() -> TableConfig {
        TableConfig {
            small_blind: Chips::new(10),
            big_blind: Chips::new(20),
            min_buy_in: Chips::new(100),
            max_buy_in: Chips::new(2_000),
            ..TableConfig::default()
        }
    }

    fn table(min_players: usize) -> GameEngine {
        let config = TableConfig {
            min_players,
            ..config()
        };
        GameEngine::new(addr("table-1"), config).unwrap()
    }

    fn join(engine: &mut GameEngine, name: &str, chips: u128) -> u8 {
        engine
            .join(Player::new(addr(name), Chips::new(chips)))
            .unwrap()
    }

    fn act(engine: &mut GameEngine, name: &str, action: PlayerAction) {
        engine.perform_action(&addr(name), action, None).unwrap();
    }

    fn chips(engine: &GameEngine, name: &str) -> Chips {
        engine.player(&addr(name)).unwrap().chips
    }

    fn total_chips(engine: &GameEngine) -> Chips {
        engine.seats().occupied().map(|(_, p)| p.chips).sum()
    }

    fn assert_pot_is_turns_sum(engine: &GameEngine) {
        let turns = engine.log().turns().map(|t| t.amount).sum::<Chips>();
        assert_eq!(engine.pot(), turns);
    }

    fn assert_board(engine: &GameEngine) {
        assert_eq!(
            engine.community_cards().len(),
            engine.round().board_size(),
            "{}",
            engine.round()
        );
    }

    #[test]
    fn invalid_config() {
        let bad = [
            TableConfig {
                small_blind: Chips::ZERO,
                ..config()
            },
            TableConfig {
                small_blind: Chips::new(30),
                ..config()
            },
            TableConfig {
                min_players: 1,
                ..config()
            },
            TableConfig {
                max_players: 10,
                ..config()
            },
            TableConfig {
                min_buy_in: Chips::new(3_000),
                ..config()
            },
        ];

        for config in bad {
            let res = GameEngine::new(addr("t"), config);
            assert!(matches!(res, Err(GameError::InvalidConfig(_))));
        }
    }

    #[test]
    fn join_posts_blinds_and_deals() {
        let mut engine = table(2);

        assert_eq!(join(&mut engine, "alice", 1_000), 1);
        assert_eq!(chips(&engine, "alice"), Chips::new(990));
        assert_eq!(engine.round(), Round::Ante);
        assert_eq!(engine.last_acted_seat(), 1);

        assert_eq!(join(&mut engine, "bob", 1_000), 2);
        assert_eq!(chips(&engine, "bob"), Chips::new(980));

        assert_eq!(engine.round(), Round::Preflop);
        assert_eq!(engine.pot(), Chips::new(30));
        assert_eq!(engine.small_blind_seat(), Some(1));
        assert_eq!(engine.big_blind_seat(), Some(2));
        assert_board(&engine);
        assert_pot_is_turns_sum(&engine);

        for (_, p) in engine.seats().occupied() {
            assert_eq!(p.hole_cards.len(), 2);
        }

        // Small blind acts first heads up.
        assert_eq!(engine.find_next_player_to_act(), Some(1));
    }

    #[test]
    fn join_errors() {
        let mut engine = table(3);
        join(&mut engine, "alice", 1_000);

        let res = engine.join(Player::new(addr("alice"), Chips::new(1_000)));
        assert_eq!(res, Err(GameError::AlreadyJoined(addr("alice"))));

        let res = engine.join_at_seat(Player::new(addr("bob"), Chips::new(1_000)), 1);
        assert_eq!(res, Err(GameError::SeatTaken(1)));

        let res = engine.join_at_seat(Player::new(addr("bob"), Chips::new(1_000)), 10);
        assert_eq!(res, Err(GameError::InvalidSeat(10)));

        let res = engine.join(Player::new(addr("bob"), Chips::new(5_000)));
        assert_eq!(res, Err(GameError::InvalidBuyIn(Chips::new(5_000))));

        let mut engine = GameEngine::new(
            addr("t"),
            TableConfig {
                max_players: 2,
                min_players: 2,
                ..config()
            },
        )
        .unwrap();
        join(&mut engine, "alice", 1_000);
        join(&mut engine, "bob", 1_000);
        let res = engine.join(Player::new(addr("carol"), Chips::new(1_000)));
        assert_eq!(res, Err(GameError::TableFull));
    }

    #[test]
    fn valid_actions_after_flop_bet() {
        let mut engine = table(2);
        join(&mut engine, "alice", 1_000);
        join(&mut engine, "bob", 1_000);

        act(&mut engine, "alice", PlayerAction::Call);
        act(&mut engine, "bob", PlayerAction::Check);
        assert_eq!(engine.round(), Round::Flop);
        assert_board(&engine);

        // Big blind acts first after the flop heads up.
        act(&mut engine, "bob", PlayerAction::Check);
        engine
            .perform_action(&addr("alice"), PlayerAction::Bet, Some(Chips::new(50)))
            .unwrap();

        let actions = engine.valid_actions(&addr("bob"));
        let find = |a| actions.iter().find(|la| la.action == a).copied();

        let call = find(PlayerAction::Call).unwrap();
        assert_eq!((call.min, call.max), (Chips::new(50), Chips::new(50)));

        let raise = find(PlayerAction::Raise).unwrap();
        assert_eq!((raise.min, raise.max), (Chips::new(100), Chips::new(980)));

        assert!(find(PlayerAction::Bet).is_none());
        assert!(find(PlayerAction::Check).is_none());
        assert!(find(PlayerAction::Fold).is_some());
        assert!(find(PlayerAction::AllIn).is_some());

        // Alice cannot act out of turn.
        assert!(engine.valid_actions(&addr("alice")).is_empty());
        assert_pot_is_turns_sum(&engine);
    }

    #[test]
    fn invalid_actions_leave_state_unchanged() {
        let mut engine = table(2);
        join(&mut engine, "alice", 1_000);
        join(&mut engine, "bob", 1_000);

        let before = engine.clone();

        for action in PlayerAction::ALL {
            for who in ["alice", "bob"] {
                let legal = engine
                    .valid_actions(&addr(who))
                    .iter()
                    .any(|la| la.action == action);
                if legal {
                    continue;
                }

                let err = engine
                    .perform_action(&addr(who), action, Some(Chips::new(20)))
                    .unwrap_err();
                assert_eq!(err.kind(), ErrorKind::Validation, "{who} {action}");
                assert_eq!(engine, before);
            }
        }

        // Out of range and missing amounts.
        let err = engine
            .perform_action(&addr("alice"), PlayerAction::Raise, Some(Chips::new(5)))
            .unwrap_err();
        assert!(matches!(err, GameError::IllegalAction { .. }));

        let err = engine
            .perform_action(&addr("alice"), PlayerAction::Raise, None)
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidAction(_)));

        let err = engine
            .perform_action(&addr("nobody"), PlayerAction::Fold, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert_eq!(engine, before);
    }

    #[test]
    fn preflop_limp_closes_betting() {
        let mut engine = table(3);
        join(&mut engine, "alice", 1_000);
        join(&mut engine, "bob", 1_000);
        join(&mut engine, "carol", 1_000);
        assert_eq!(engine.round(), Round::Preflop);
        assert_eq!(engine.dealer(), Some(3));

        act(&mut engine, "carol", PlayerAction::Call);
        act(&mut engine, "alice", PlayerAction::Call);

        // Everybody put the big blind in, bob has to check or raise.
        let actions = engine.valid_actions(&addr("bob"));
        assert!(!actions.iter().any(|la| la.action == PlayerAction::Bet));
        assert!(actions.iter().any(|la| la.action == PlayerAction::Check));
        assert!(actions.iter().any(|la| la.action == PlayerAction::Raise));

        // Without the policy the big blind may bet.
        let mut open = engine.clone();
        open.config.policy.no_bet_after_preflop_limp = false;
        let actions = open.valid_actions(&addr("bob"));
        assert!(actions.iter().any(|la| la.action == PlayerAction::Bet));
    }

    #[test]
    fn rounds_follow_the_hand() {
        let mut engine = table(2);
        join(&mut engine, "alice", 1_000);
        join(&mut engine, "bob", 1_000);

        let mut rounds = vec![engine.round()];
        act(&mut engine, "alice", PlayerAction::Call);
        act(&mut engine, "bob", PlayerAction::Check);

        while engine.round() != Round::Showdown {
            assert_board(&engine);
            assert_pot_is_turns_sum(&engine);
            if rounds.last() != Some(&engine.round()) {
                rounds.push(engine.round());
            }

            let seat = engine.find_next_player_to_act().unwrap();
            let who = engine.seats().get(seat).unwrap().address.clone();
            engine
                .perform_action(&who, PlayerAction::Check, None)
                .unwrap();
        }

        rounds.push(engine.round());
        assert_board(&engine);
        assert_eq!(
            rounds,
            vec![
                Round::Preflop,
                Round::Flop,
                Round::Turn,
                Round::River,
                Round::Showdown
            ]
        );

        // Chips are conserved and the pot is paid.
        assert_eq!(total_chips(&engine), Chips::new(2_000));
        let paid = engine.winners().iter().map(|w| w.amount).sum::<Chips>();
        assert_eq!(paid, Chips::new(40));

        // Next hand rotates the button and resets the board.
        engine.deal(b"hand-2").unwrap();
        assert_eq!(engine.round(), Round::Preflop);
        assert_eq!(engine.hand_number(), 1);
        assert_eq!(engine.dealer(), Some(2));
        assert_eq!(engine.small_blind_seat(), Some(2));
        assert_eq!(engine.big_blind_seat(), Some(1));
        assert_eq!(engine.pot(), Chips::new(30));
        assert!(engine.winners().is_empty());
        assert_board(&engine);
    }

    #[test]
    fn fold_ends_the_hand() {
        let mut engine = table(2);
        join(&mut engine, "alice", 1_000);
        join(&mut engine, "bob", 1_000);

        act(&mut engine, "alice", PlayerAction::Fold);
        assert_eq!(engine.round(), Round::Showdown);
        assert_board(&engine);
        assert_eq!(chips(&engine, "bob"), Chips::new(1_010));
        assert_eq!(chips(&engine, "alice"), Chips::new(990));
        assert_eq!(engine.winners().len(), 1);

        assert_eq!(engine.deal(b"x"), Ok(()));
        assert_eq!(
            engine.deal(b"y"),
            Err(GameError::HandInProgress),
            "cannot deal during a hand"
        );
    }

    #[test]
    fn deal_needs_players() {
        let mut engine = table(2);
        assert_eq!(engine.deal(b"seed"), Err(GameError::NotEnoughPlayers));

        join(&mut engine, "alice", 1_000);
        assert_eq!(engine.deal(b"seed"), Err(GameError::NotEnoughPlayers));

        let err = engine
            .perform_action(&addr("alice"), PlayerAction::Check, None)
            .unwrap_err();
        assert_eq!(err, GameError::NotEnoughPlayers);
    }

    #[test]
    fn same_seed_same_cards() {
        let play = || {
            let mut engine = table(2);
            join(&mut engine, "alice", 1_000);
            join(&mut engine, "bob", 1_000);
            act(&mut engine, "alice", PlayerAction::Fold);
            engine.deal(&[1, 2, 3]).unwrap();
            engine
        };

        let (e1, e2) = (play(), play());
        assert_eq!(e1.to_json(), e2.to_json());
        assert_eq!(
            e1.player(&addr("alice")).unwrap().hole_cards,
            e2.player(&addr("alice")).unwrap().hole_cards
        );
    }

    #[test]
    fn leave_before_deal_refunds_blinds() {
        let mut engine = table(3);
        join(&mut engine, "alice", 1_000);
        join(&mut engine, "bob", 1_000);

        let alice = engine.leave(&addr("alice")).unwrap();
        assert_eq!(alice.chips, Chips::new(1_000));

        // Bob now posts the small blind.
        assert_eq!(chips(&engine, "bob"), Chips::new(990));
        assert_eq!(engine.small_blind_seat(), Some(2));
        assert_eq!(engine.big_blind_seat(), None);
        assert_eq!(engine.pot(), Chips::new(10));
        assert_pot_is_turns_sum(&engine);
    }

    #[test]
    fn leave_during_hand_folds() {
        let mut engine = table(2);
        join(&mut engine, "alice", 1_000);
        join(&mut engine, "bob", 1_000);

        let bob = engine.leave(&addr("bob")).unwrap();
        assert_eq!(bob.chips, Chips::new(980));
        assert_eq!(engine.round(), Round::Showdown);
        assert_eq!(chips(&engine, "alice"), Chips::new(1_020));
        assert_pot_is_turns_sum(&engine);

        // A late joiner sits out until the next hand.
        join(&mut engine, "carol", 500);
        assert_eq!(
            engine.player(&addr("carol")).unwrap().status,
            PlayerStatus::SittingOut
        );

        engine.deal(b"next").unwrap();
        assert_eq!(engine.round(), Round::Preflop);
        assert_eq!(engine.player(&addr("carol")).unwrap().hole_cards.len(), 2);
    }

    #[test]
    fn next_player_skips_inactive_seats() {
        let mut engine = table(2);
        for (seat, status) in [
            (1, PlayerStatus::Folded),
            (3, PlayerStatus::AllIn),
            (4, PlayerStatus::Active),
            (7, PlayerStatus::NotActed),
        ] {
            let mut p = Player::new(addr(&format!("p{seat}")), Chips::new(100));
            p.status = status;
            engine.seats.insert(seat, p);
        }

        for last in 0..=9 {
            engine.last_acted_seat = last;
            let next = engine.find_next_player_to_act().unwrap();
            assert!(next == 4 || next == 7, "{last} -> {next}");
        }

        engine.last_acted_seat = 4;
        assert_eq!(engine.find_next_player_to_act(), Some(7));
        engine.last_acted_seat = 7;
        assert_eq!(engine.find_next_player_to_act(), Some(4));

        // A single eligible seat is found from itself.
        engine.seats.get_mut(7).unwrap().status = PlayerStatus::Folded;
        engine.last_acted_seat = 4;
        assert_eq!(engine.find_next_player_to_act(), Some(4));

        engine.seats.get_mut(4).unwrap().status = PlayerStatus::AllIn;
        assert_eq!(engine.find_next_player_to_act(), None);
    }

    #[test]
    fn json_round_trip() {
        let mut engine = table(2);
        join(&mut engine, "alice", 1_000);
        join(&mut engine, "bob", 1_000);
        act(&mut engine, "alice", PlayerAction::Call);

        let json = engine.to_json();
        let restored = GameEngine::from_json(&json).unwrap();
        assert_eq!(restored, engine);
        assert_eq!(restored.pot(), Chips::new(40));
        assert_eq!(restored.find_next_player_to_act(), Some(2));

        assert!(matches!(
            GameEngine::from_json("{}"),
            Err(GameError::Snapshot(_))
        ));
    }

    #[test]
    fn deal_secret_seeds_automatic_deals() {
        let play = |secret: &[u8]| {
            let mut engine = table(2);
            engine.set_deal_secret(secret);
            join(&mut engine, "alice", 1_000);
            join(&mut engine, "bob", 1_000);
            assert_eq!(engine.round(), Round::Preflop);
            engine
        };

        let (e1, e2) = (play(b"one"), play(b"one"));
        assert_eq!(e1.deck, e2.deck);
        assert!(e1.has_deal_secret());

        let public = play(&[]);
        assert!(!public.has_deal_secret());
        assert_ne!(e1.deck, play(b"two").deck);
        assert_ne!(e1.deck, public.deck);

        // The secret survives a restore.
        let restored = GameEngine::from_json(&e1.to_json()).unwrap();
        assert_eq!(restored.deal_secret, b"one".to_vec());
    }

    #[test]
    fn broken_snapshots_are_rejected() {
        let mut engine = table(2);
        join(&mut engine, "alice", 1_000);
        join(&mut engine, "bob", 1_000);
        let json = serde_json::to_value(&engine).unwrap();

        let restore = |edit: &dyn Fn(&mut serde_json::Value)| {
            let mut json = json.clone();
            edit(&mut json);
            GameEngine::from_json(&json.to_string())
        };

        assert!(restore(&|_| {}).is_ok());

        let err = restore(&|json| json["deck"]["next"] = 60.into()).unwrap_err();
        assert!(matches!(err, GameError::Invariant(_)));
        assert_eq!(err.kind(), ErrorKind::Fatal);

        let err = restore(&|json| {
            json["log"]["rounds"].as_array_mut().unwrap().truncate(2);
        })
        .unwrap_err();
        assert!(matches!(err, GameError::Invariant(_)));

        let err = restore(&|json| {
            json["seats"]["seats"].as_array_mut().unwrap().pop();
        })
        .unwrap_err();
        assert!(matches!(err, GameError::Invariant(_)));

        let err = restore(&|json| json["dealer"] = 12.into()).unwrap_err();
        assert!(matches!(err, GameError::Invariant(_)));
    }

    #[test]
    fn invariant_violation_poisons_table() {
        let mut engine = table(2);
        join(&mut engine, "alice", 1_000);
        join(&mut engine, "bob", 1_000);

        // Empty the deck so the flop cannot be dealt.
        while engine.deck.deal().is_some() {}

        act(&mut engine, "alice", PlayerAction::Call);
        let err = engine
            .perform_action(&addr("bob"), PlayerAction::Check, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert!(engine.is_corrupted());

        let err = engine
            .perform_action(&addr("bob"), PlayerAction::Check, None)
            .unwrap_err();
        assert_eq!(err, GameError::Corrupted);
        assert!(engine.valid_actions(&addr("bob")).is_empty());
    }
}
