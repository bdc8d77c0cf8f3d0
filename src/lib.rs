//! Aces market watcher
//!
//! Polls a sportsbook's long-polling socket for tennis matches, extracts
//! their "number of aces" markets and sends one Telegram alert per match
//! the first time a market type shows up.
//!
//! ## Architecture
//!
//! ```text
//! Transport (engine.io polling) → Decoder → Extractor → Ordering → Diff Engine → Notifier
//!                                                                       ↕
//!                                                          Snapshot / Ledger stores
//! ```

pub mod client;
pub mod config;
pub mod decoder;
pub mod diff;
pub mod error;
pub mod extractor;
pub mod notify;
pub mod ordering;
pub mod storage;
pub mod testing;
pub mod types;
pub mod watcher;

#[cfg(test)]
mod types_tests;
#[cfg(test)]
mod error_tests;
