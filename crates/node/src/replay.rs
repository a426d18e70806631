// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Table replay from a recorded list of events.
//!
//! Replaying the events of a table rebuilds the exact same state the table had
//! when the events were recorded, which is used to audit hands and settle
//! disputes.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error;

use pokerchain_core::{crypto::Address, message::PlayerAction, poker::Chips};

use crate::{
    errors::GameError,
    game::{GameEngine, Player, TableConfig},
};

/// A recorded table input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// A player joined.
    Join {
        /// The player address.
        address: Address,
        /// The player buy-in.
        chips: Chips,
        /// The requested seat.
        #[serde(default)]
        seat: Option<u8>,
    },
    /// A player left.
    Leave {
        /// The player address.
        address: Address,
    },
    /// A hand was dealt.
    Deal {
        /// The deck seed.
        seed: Vec<u8>,
    },
    /// A player acted.
    Action {
        /// The player address.
        address: Address,
        /// The action.
        action: PlayerAction,
        /// The action amount.
        #[serde(default)]
        amount: Option<Chips>,
    },
}

/// A replay file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayFile {
    /// The table address.
    pub address: Address,
    /// The table configuration.
    #[serde(default)]
    pub config: TableConfig,
    /// The table deal secret, needed to replay hands dealt by the table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deal_secret: Vec<u8>,
    /// The table events in order.
    pub events: Vec<Event>,
}

impl ReplayFile {
    /// Loads a replay file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Rebuilds the table recorded in this file.
    pub fn replay(&self) -> Result<GameEngine, ReplayError> {
        replay_with_secret(
            self.address.clone(),
            self.config.clone(),
            &self.deal_secret,
            &self.events,
        )
    }
}

/// An event failed while replaying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event {index} failed: {source}")]
pub struct ReplayError {
    /// The index of the failed event, an invalid configuration fails at zero.
    pub index: usize,
    /// The engine error.
    pub source: GameError,
}

/// Rebuilds a table by applying the events in order.
pub fn replay(
    address: Address,
    config: TableConfig,
    events: &[Event],
) -> Result<GameEngine, ReplayError> {
    replay_with_secret(address, config, &[], events)
}

fn replay_with_secret(
    address: Address,
    config: TableConfig,
    deal_secret: &[u8],
    events: &[Event],
) -> Result<GameEngine, ReplayError> {
    let mut engine =
        GameEngine::new(address, config).map_err(|source| ReplayError { index: 0, source })?;
    if !deal_secret.is_empty() {
        engine.set_deal_secret(deal_secret);
    }

    for (index, event) in events.iter().enumerate() {
        apply(&mut engine, event).map_err(|source| ReplayError { index, source })?;
    }

    Ok(engine)
}

fn apply(engine: &mut GameEngine, event: &Event) -> Result<(), GameError> {
    match event {
        Event::Join {
            address,
            chips,
            seat,
        } => {
            let player = Player::new(address.clone(), *chips);
            match seat {
                Some(seat) => engine.join_at_seat(player, *seat)?,
                None => engine.join(player)?,
            };
        }
        Event::Leave { address } => {
            engine.leave(address)?;
        }
        Event::Deal { seed } => engine.deal(seed)?,
        Event::Action {
            address,
            action,
            amount,
        } => engine.perform_action(address, *action, *amount)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pokerchain_core::poker::Round;

    fn events() -> Vec<Event> {
        let join = |name: &str| Event::Join {
            address: Address::new(name),
            chips: Chips::new(1_000),
            seat: None,
        };
        let action = |name: &str, action| Event::Action {
            address: Address::new(name),
            action,
            amount: None,
        };

        vec![
            join("alice"),
            join("bob"),
            action("alice", PlayerAction::Call),
            action("bob", PlayerAction::Check),
            action("bob", PlayerAction::Check),
            Event::Action {
                address: Address::new("alice"),
                action: PlayerAction::Bet,
                amount: Some(Chips::new(40)),
            },
            action("bob", PlayerAction::Fold),
            Event::Deal { seed: vec![1, 2, 3] },
        ]
    }

    #[test]
    fn replay_is_deterministic() {
        let address = Address::new("table-1");
        let e1 = replay(address.clone(), TableConfig::default(), &events()).unwrap();
        let e2 = replay(address, TableConfig::default(), &events()).unwrap();

        assert_eq!(e1.to_json(), e2.to_json());
        assert_eq!(e1.round(), Round::Preflop);
        assert_eq!(e1.hand_number(), 1);
    }

    #[test]
    fn replay_reports_failed_event() {
        let mut events = events();
        events.insert(
            3,
            Event::Action {
                address: Address::new("alice"),
                action: PlayerAction::Check,
                amount: None,
            },
        );

        let err = replay(Address::new("t"), TableConfig::default(), &events).unwrap_err();
        assert_eq!(err.index, 3);
        assert!(matches!(err.source, GameError::IllegalAction { .. }));
    }

    #[test]
    fn file_format() {
        let json = r#"{
            "address": "table-1",
            "config": { "smallBlind": 5, "bigBlind": 10 },
            "events": [
                { "type": "join", "address": "alice", "chips": 500 },
                { "type": "join", "address": "bob", "chips": 500, "seat": 4 },
                { "type": "action", "address": "alice", "action": "all-in" },
                { "type": "action", "address": "bob", "action": "call" }
            ]
        }"#;

        let file = serde_json::from_str::<ReplayFile>(json).unwrap();
        assert_eq!(file.config.big_blind, Chips::new(10));
        assert_eq!(file.config.max_players, 9);

        let engine = file.replay().unwrap();
        assert_eq!(engine.round(), Round::Showdown);
        assert_eq!(engine.seats().get(4).unwrap().address, Address::new("bob"));

        let chips = engine
            .seats()
            .occupied()
            .map(|(_, p)| p.chips)
            .sum::<Chips>();
        assert_eq!(chips, Chips::new(1_000));
    }

    #[test]
    fn recorded_files_replay() {
        let mut file = ReplayFile {
            address: Address::new("table-1"),
            config: TableConfig::default(),
            deal_secret: vec![9; 64],
            events: events(),
        };
        file.events.truncate(3);
        file.events.push(Event::Action {
            address: Address::new("bob"),
            action: PlayerAction::Raise,
            amount: Some(Chips::new(60)),
        });

        let json = serde_json::to_string(&file).unwrap();
        assert!(json.contains(r#""type":"join""#));
        assert!(json.contains(r#""amount":60"#));

        let parsed = serde_json::from_str::<ReplayFile>(&json).unwrap();
        assert_eq!(parsed, file);

        let engine = parsed.replay().unwrap();
        assert!(engine.has_deal_secret());
        assert_eq!(engine.round(), Round::Preflop);

        // The secret changes the cards of automatic deals.
        let public = replay(file.address.clone(), file.config.clone(), &file.events).unwrap();
        assert!(!public.has_deal_secret());
        assert_ne!(engine.to_json(), public.to_json());
    }
}
