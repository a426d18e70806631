// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Pokerchain core types shared by nodes and clients.
#![warn(clippy::all, rust_2018_idioms, missing_docs)]

pub mod amount;
pub mod crypto;
pub mod dto;
pub mod message;
pub mod poker;
pub mod transaction;
