//! Core market types shared by the extractor, ordering and diff engine

use serde::{Deserialize, Serialize};

/// Upstream numeric match identifier
pub type MatchId = u64;

/// One polling cycle's worth of matches
pub type Snapshot = Vec<Match>;

/// One tier of a ladder bet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceOption {
    pub threshold: f64,
    /// Rounded to the nearest 0.05
    pub price: f64,
}

/// A single market on a match
///
/// Two bets are the same bet for diffing purposes when their type names
/// match, whatever their prices or tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Bet {
    /// Over/under at a single cutoff
    Simple {
        type_name: String,
        cutoff: f64,
        over_price: f64,
        under_price: f64,
    },
    /// Multi-tier bet, tiers in source outcome order
    Ladder {
        type_name: String,
        options: Vec<PriceOption>,
    },
}

impl Bet {
    pub fn type_name(&self) -> &str {
        match self {
            Bet::Simple { type_name, .. } | Bet::Ladder { type_name, .. } => type_name,
        }
    }

    pub fn is_ladder(&self) -> bool {
        matches!(self, Bet::Ladder { .. })
    }

    /// A ladder with at least one tier
    pub fn has_options(&self) -> bool {
        matches!(self, Bet::Ladder { options, .. } if !options.is_empty())
    }
}

/// A match and its extracted bets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// "<Player1> - <Player2>", the notification identity key
    pub title: String,
    /// Display link derived from the upstream id
    pub link: String,
    pub bets: Vec<Bet>,
}

impl Match {
    /// Build the display link for a match id
    pub fn link_for(link_base: &str, id: MatchId) -> String {
        format!("{}/{}", link_base.trim_end_matches('/'), id)
    }

    pub fn bet_count(&self) -> usize {
        self.bets.len()
    }
}

/// Round a price to the nearest 0.05, half away from zero
pub fn round_price(price: f64) -> f64 {
    (price * 20.0).round() / 20.0
}
