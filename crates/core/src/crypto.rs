// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Cryptographic types for signing requests and transactions.
use blake2::{Blake2s, Digest, digest};
use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A key for signing messages.
pub struct SigningKey(ed25519_dalek::SigningKey);

/// The hasher used for signatures.
type SigHasher = Blake2s<digest::consts::U32>;

/// The hasher used to derive addresses from verifying keys.
type AddressHasher = Blake2s<digest::consts::U20>;

impl Default for SigningKey {
    fn default() -> Self {
        Self::from_seed(rand::random())
    }
}

impl SigningKey {
    /// Creates a signing key from a 32 bytes secret seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&seed))
    }

    /// Sign a message.
    pub fn sign<T>(&self, msg: &T) -> Signature
    where
        T: Serialize,
    {
        Signature(self.0.sign(&digest_of(msg)))
    }

    /// Get the signature verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key())
    }

    /// The address of the account controlled by this key.
    pub fn address(&self) -> Address {
        self.verifying_key().address()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey({})", self.address())
    }
}

/// Message signature.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(ed25519_dalek::Signature);

impl Signature {
    /// The signature raw bytes.
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }

    /// Parses a `0x` prefixed hex encoded signature.
    pub fn from_hex(s: &str) -> Option<Signature> {
        let digits = s.strip_prefix("0x")?;
        if digits.len() != 128 || !digits.is_ascii() {
            return None;
        }

        let mut bytes = [0u8; 64];
        for (b, pair) in bytes.iter_mut().zip(digits.as_bytes().chunks(2)) {
            let pair = std::str::from_utf8(pair).ok()?;
            *b = u8::from_str_radix(pair, 16).ok()?;
        }

        Some(Signature(ed25519_dalek::Signature::from_bytes(&bytes)))
    }

    /// The `0x` prefixed hex encoding of this signature.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex(&self.0.to_bytes()))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

/// Key for signature verification.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

impl VerifyingKey {
    /// Verifies a message signature.
    pub fn verify<T>(&self, msg: &T, signature: &Signature) -> bool
    where
        T: Serialize,
    {
        self.0.verify(&digest_of(msg), &signature.0).is_ok()
    }

    /// Returns the [Address] for this key.
    pub fn address(&self) -> Address {
        let mut hasher = AddressHasher::new();
        hasher.update(self.0.as_bytes());
        Address(format!("0x{}", hex(&hasher.finalize())))
    }
}

impl fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VerifyingKey(0x{})", hex(self.0.as_bytes()))
    }
}

/// An account or table address.
///
/// Addresses derived from keys are `0x` followed by 40 lowercase hex digits,
/// other addresses (tables, the bridge) are free form strings normalized to
/// lowercase.
#[derive(Clone, Serialize, Deserialize, Hash, Eq, PartialEq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Creates an address from a string.
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().trim().to_ascii_lowercase())
    }

    /// The zero address used for empty seats in snapshots.
    pub fn zero() -> Self {
        Self(format!("0x{}", "0".repeat(40)))
    }

    /// The address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address::new(s)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lowercase hex digits of some bytes.
pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut output, b| {
            output.push_str(&format!("{b:02x}"));
            output
        })
}

fn digest_of<T: Serialize>(msg: &T) -> Vec<u8> {
    let mut hasher = SigHasher::new();
    bincode::serialize_into(&mut hasher, msg).expect("should serialize to hasher");
    hasher.finalize().to_vec()
}
