//! Pillar Sync - provision encrypted client credentials into a Salt pillar.
//!
//! This library fetches a client credential pair from Vault or AWS Parameter
//! Store, encrypts each value to a fixed recipient, writes the Salt pillar
//! file and commits it with git. Plaintext credentials stay in memory only.

pub mod config;
pub mod encryption;
pub mod error;
pub mod git;
pub mod pillar;
pub mod pipeline;
pub mod secrets;
