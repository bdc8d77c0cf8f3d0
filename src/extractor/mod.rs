//! Market extraction
//!
//! Turns the sport document's match metadata and a match document's
//! densest block into normalized [`Match`] and [`Bet`] values. Missing or
//! mistyped fields are expected; they drop the smallest unit they affect
//! (one outcome, one bet, one match) and never the cycle.


use crate::config::WatchConfig;
use crate::decoder::{find_densest_block, DensestBlock};
use crate::error::{DecodeError, ExtractionError};
use crate::ordering::order_bets;
use crate::types::{round_price, Bet, Match, MatchId, PriceOption};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::{debug, warn};

pub const MATCHES_KEY: &str = "matches";

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

/// The match metadata mapping of a sport document
pub fn match_metadata(root: &Map<String, Value>) -> Result<&Map<String, Value>, DecodeError> {
    root.get(MATCHES_KEY)
        .and_then(Value::as_object)
        .ok_or_else(|| DecodeError::UnexpectedShape("no matches mapping in payload".to_string()))
}

/// Ids of matches whose filter list contains the target tag
pub fn select_candidate_match_ids(
    matches: &Map<String, Value>,
    target_filter_tag: i64,
) -> BTreeSet<MatchId> {
    let target = target_filter_tag as f64;
    let mut ids = BTreeSet::new();

    for (key, entry) in matches {
        let Some(object) = entry.as_object() else {
            debug!("Match entry {} is not an object", key);
            continue;
        };
        let Some(filters) = object.get("filters") else {
            debug!("No filters for match {}", key);
            continue;
        };
        let Some(filters) = filters.as_array() else {
            warn!("Filters of match {} are not a list", key);
            continue;
        };
        if !filters.iter().any(|f| f.as_f64() == Some(target)) {
            continue;
        }

        match match_id(key, object) {
            Some(id) => {
                ids.insert(id);
            }
            None => warn!("Match {} carries tag {} but has no id", key, target_filter_tag),
        }
    }

    ids
}

fn match_id(key: &str, object: &Map<String, Value>) -> Option<MatchId> {
    let from_field = object.get("matchId").and_then(|v| match v {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    });
    from_field
        .or_else(|| key.parse().ok())
        .filter(|id| *id != 0)
}

/// Display title of a match from the metadata mapping
pub fn match_title(matches: &Map<String, Value>, id: MatchId) -> Option<&str> {
    matches.get(&id.to_string())?.get("title")?.as_str()
}

/// Case-insensitive substring predicate on bet names
pub fn keyword_predicate(keyword: &str) -> impl Fn(&str) -> bool {
    let keyword = keyword.to_lowercase();
    move |name: &str| name.to_lowercase().contains(&keyword)
}

/// Build every qualifying bet of a match, in definition order
pub fn extract_bets_for_match<P>(
    definitions: &Map<String, Value>,
    outcomes: &Map<String, Value>,
    prices: &Map<String, Value>,
    bet_name_predicate: P,
) -> Vec<Bet>
where
    P: Fn(&str) -> bool,
{
    let mut bets = Vec::new();

    for (definition_id, definition) in definitions {
        let Some(definition) = definition.as_object() else {
            continue;
        };
        let name = definition
            .get("betTypeName")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !bet_name_predicate(name) {
            continue;
        }

        match extract_bet(name, definition, outcomes, prices) {
            Ok(bet) => bets.push(bet),
            Err(e) => warn!("Skipping bet {:?} ({}): {}", name, definition_id, e),
        }
    }

    bets
}

fn extract_bet(
    name: &str,
    definition: &Map<String, Value>,
    outcomes: &Map<String, Value>,
    prices: &Map<String, Value>,
) -> Result<Bet, ExtractionError> {
    let outcome_ids = definition
        .get("outcomes")
        .and_then(Value::as_array)
        .ok_or(ExtractionError::MissingOutcomes)?;

    if definition.get("template").and_then(Value::as_str) == Some("dynamic") {
        let options: Vec<_> = outcome_ids
            .iter()
            .filter_map(|id| ladder_option(id, outcomes, prices))
            .collect();
        if options.is_empty() {
            return Err(ExtractionError::EmptyLadder);
        }
        return Ok(Bet::Ladder {
            type_name: name.to_string(),
            options,
        });
    }

    let raw_cutoff = definition
        .get("specialBetValue")
        .and_then(Value::as_str)
        .ok_or_else(|| ExtractionError::MissingCutoff("no specialBetValue".to_string()))?;
    let cutoff = raw_cutoff
        .strip_prefix("total=")
        .unwrap_or(raw_cutoff)
        .trim()
        .parse::<f64>()
        .map_err(|_| ExtractionError::MissingCutoff(raw_cutoff.to_string()))?;

    let over_price = side_price(outcome_ids.first(), prices)?;
    let under_price = side_price(outcome_ids.get(1), prices)?;

    Ok(Bet::Simple {
        type_name: name.to_string(),
        cutoff,
        over_price,
        under_price,
    })
}

/// Outcome ids arrive as numbers but key the outcome/price maps as strings
fn outcome_key(id: &Value) -> Option<String> {
    match id {
        Value::Number(n) => n
            .as_u64()
            .map(|v| v.to_string())
            .or_else(|| n.as_f64().map(|f| format!("{:.0}", f))),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn price_of(key: &str, prices: &Map<String, Value>) -> Option<f64> {
    prices.get(key).and_then(Value::as_f64).map(round_price)
}

fn side_price(id: Option<&Value>, prices: &Map<String, Value>) -> Result<f64, ExtractionError> {
    let key = id
        .and_then(outcome_key)
        .ok_or_else(|| ExtractionError::MissingPrice("<absent>".to_string()))?;
    price_of(&key, prices).ok_or(ExtractionError::MissingPrice(key))
}

fn ladder_option(
    id: &Value,
    outcomes: &Map<String, Value>,
    prices: &Map<String, Value>,
) -> Option<PriceOption> {
    let key = outcome_key(id)?;
    let label = outcomes.get(&key)?.get("label")?.as_str()?;
    let threshold = leading_number(label)?;
    let price = price_of(&key, prices)?;
    Some(PriceOption { threshold, price })
}

/// First numeric run in an outcome label, e.g. "10+" or "Au moins 5"
pub fn leading_number(label: &str) -> Option<f64> {
    LEADING_NUMBER.find(label)?.as_str().parse().ok()
}

/// Extraction settings bound to one watch configuration
#[derive(Debug, Clone)]
pub struct MarketExtractor {
    bet_name_keyword: String,
    target_filter_tag: i64,
    match_link_base: String,
}

impl MarketExtractor {
    pub fn new(bet_name_keyword: &str, target_filter_tag: i64, match_link_base: &str) -> Self {
        Self {
            bet_name_keyword: bet_name_keyword.to_string(),
            target_filter_tag,
            match_link_base: match_link_base.to_string(),
        }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(
            &config.bet_name_keyword,
            config.target_filter_tag,
            &config.match_link_base,
        )
    }

    /// Candidate matches of a sport payload with their display titles
    pub fn candidates(
        &self,
        root: &Map<String, Value>,
    ) -> Result<Vec<(MatchId, String)>, DecodeError> {
        let matches = match_metadata(root)?;
        let ids = select_candidate_match_ids(matches, self.target_filter_tag);

        Ok(ids
            .into_iter()
            .map(|id| {
                let title = match match_title(matches, id) {
                    Some(title) => title.to_string(),
                    None => {
                        warn!("Match {} has no title", id);
                        format!("#{}", id)
                    }
                };
                (id, title)
            })
            .collect())
    }

    pub fn bets_from_block(&self, block: &DensestBlock<'_>) -> Vec<Bet> {
        extract_bets_for_match(
            block.definitions,
            block.outcomes,
            block.prices,
            keyword_predicate(&self.bet_name_keyword),
        )
    }

    /// Build the ordered match from a decoded match document
    pub fn extract_match(
        &self,
        id: MatchId,
        title: &str,
        document: &Value,
    ) -> Result<Match, DecodeError> {
        let block = find_densest_block(document).ok_or(DecodeError::BlockNotFound)?;
        debug!("Match {}: densest block has {} bets", id, block.len());

        let bets = self.bets_from_block(&block);
        Ok(Match {
            title: title.to_string(),
            link: Match::link_for(&self.match_link_base, id),
            bets: order_bets(bets, title),
        })
    }
}
