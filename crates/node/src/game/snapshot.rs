// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Table snapshots for clients.
use pokerchain_core::{
    crypto::Address,
    dto::{LegalActionDto, PlayerDto, PotDto, TableStateDto, WinnerDto},
    poker::Round,
};

use super::GameEngine;

impl GameEngine {
    /// Builds an unsigned snapshot of this table as seen by `viewer`.
    ///
    /// Hole cards are only visible to their owner, and to everybody for the
    /// players that reached a contested showdown.
    pub fn to_dto(&self, viewer: Option<&Address>) -> TableStateDto {
        let showdown = self.round == Round::Showdown && self.contenders().len() > 1;

        let players = self
            .seats
            .occupied()
            .map(|(seat, p)| {
                let visible = viewer == Some(&p.address) || (showdown && p.status.in_hand());
                let hole_cards = (visible && !p.hole_cards.is_empty())
                    .then(|| p.hole_cards.iter().map(|c| c.value()).collect());

                PlayerDto {
                    address: p.address.clone(),
                    seat,
                    stack: p.chips.to_string(),
                    is_small_blind: self.small_blind_seat == Some(seat),
                    is_big_blind: self.big_blind_seat == Some(seat),
                    is_dealer: self.dealer == Some(seat),
                    hole_cards,
                    status: p.status,
                    last_action: self.log.last_action(&p.address),
                    legal_actions: self
                        .valid_actions(&p.address)
                        .into_iter()
                        .map(|la| LegalActionDto::new(la.action, la.min, la.max))
                        .collect(),
                    timeout: self.config.action_timeout,
                    signature: String::new(),
                }
            })
            .collect();

        let pots = self
            .pots()
            .into_iter()
            .map(|pot| PotDto {
                amount: pot.amount.to_string(),
                players: pot
                    .seats
                    .iter()
                    .filter_map(|seat| self.seats.get(*seat))
                    .map(|p| p.address.clone())
                    .collect(),
            })
            .collect();

        let next_to_act = if self.round.is_betting() {
            self.find_next_player_to_act()
        } else {
            None
        };

        TableStateDto {
            address: self.address.clone(),
            small_blind: self.config.small_blind.to_string(),
            big_blind: self.config.big_blind.to_string(),
            small_blind_position: self.small_blind_seat,
            big_blind_position: self.big_blind_seat,
            dealer: self.dealer.unwrap_or(0),
            players,
            community_cards: self.community_cards.iter().map(|c| c.value()).collect(),
            pots,
            next_to_act,
            round: self.round,
            winners: self
                .winners
                .iter()
                .map(|w| WinnerDto {
                    address: w.address.clone(),
                    amount: w.amount.to_string(),
                })
                .collect(),
            signature: String::new(),
        }
    }
}
