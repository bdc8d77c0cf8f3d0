//! Canonical bet ordering for alerts
//!
//! Simple bets before ladders; within each, player 1 first, then player 2,
//! then match-wide bets. Extraction order is kept inside each group.

use crate::types::Bet;
use std::borrow::Borrow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Subject {
    Player1,
    Player2,
    Match,
}

/// Tokens used to attribute a bet name to one player
#[derive(Debug, Clone, Default)]
struct PlayerTokens {
    first: String,
    last: String,
}

impl PlayerTokens {
    fn from_name(name: &str) -> Self {
        let mut parts = name.split_whitespace();
        let first = parts.next().unwrap_or_default().to_string();
        let last = parts.next_back().unwrap_or(first.as_str()).to_string();
        Self { first, last }
    }

    fn named_in(&self, type_name: &str) -> bool {
        (!self.first.is_empty() && type_name.contains(&self.first))
            || (!self.last.is_empty() && type_name.contains(&self.last))
    }
}

fn players(title: &str) -> Option<(PlayerTokens, PlayerTokens)> {
    let mut names = title.split(" - ");
    let p1 = names.next()?;
    let p2 = names.next()?;
    Some((PlayerTokens::from_name(p1), PlayerTokens::from_name(p2)))
}

fn subject_of(type_name: &str, players: Option<&(PlayerTokens, PlayerTokens)>) -> Subject {
    let Some((p1, p2)) = players else {
        return Subject::Match;
    };
    match (p1.named_in(type_name), p2.named_in(type_name)) {
        (true, false) => Subject::Player1,
        (false, true) => Subject::Player2,
        _ => Subject::Match,
    }
}

/// Order bets for presentation given a `"<Player1> - <Player2>"` title
pub fn order_bets<B: Borrow<Bet>>(bets: Vec<B>, title: &str) -> Vec<B> {
    let players = players(title);
    let mut keyed: Vec<((bool, Subject), B)> = bets
        .into_iter()
        .map(|bet| {
            let b = bet.borrow();
            let key = (b.has_options(), subject_of(b.type_name(), players.as_ref()));
            (key, bet)
        })
        .collect();

    // stable, so extraction order survives within a group
    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, bet)| bet).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PriceOption;

    fn simple(name: &str) -> Bet {
        Bet::Simple {
            type_name: name.to_string(),
            cutoff: 10.5,
            over_price: 1.85,
            under_price: 1.9,
        }
    }

    fn ladder(name: &str) -> Bet {
        Bet::Ladder {
            type_name: name.to_string(),
            options: vec![PriceOption {
                threshold: 5.0,
                price: 1.2,
            }],
        }
    }

    fn names(bets: &[Bet]) -> Vec<&str> {
        bets.iter().map(|b| b.type_name()).collect()
    }

    #[test]
    fn test_simple_player_bet_before_match_ladder() {
        let bets = vec![
            simple("X - P2 total"),
            simple("Y de P1"),
            ladder("Z (paliers)"),
        ];
        let ordered = order_bets(bets, "P1 FullName - P2 FullName");
        assert_eq!(names(&ordered), vec!["Y de P1", "X - P2 total", "Z (paliers)"]);
    }

    #[test]
    fn test_empty_ladder_sorts_with_simple_bets() {
        let empty = Bet::Ladder {
            type_name: "Aces (paliers)".to_string(),
            options: vec![],
        };
        let bets = vec![ladder("Z (paliers)"), empty, simple("X total")];
        let ordered = order_bets(bets, "P1 FullName - P2 FullName");
        assert_eq!(names(&ordered), vec!["Aces (paliers)", "X total", "Z (paliers)"]);
    }

    #[test]
    fn test_ordering_is_deterministic() {
        let bets = vec![
            ladder("Nombre d'aces (paliers)"),
            simple("Nombre d'aces"),
            ladder("Nombre d'aces - J. Sinner (paliers)"),
            simple("Nombre d'aces de C. Alcaraz"),
            simple("Nombre d'aces de J. Sinner"),
        ];
        let first = order_bets(bets.clone(), "C. Alcaraz - J. Sinner");
        let second = order_bets(bets, "C. Alcaraz - J. Sinner");
        assert_eq!(first, second);
        assert_eq!(
            names(&first),
            vec![
                "Nombre d'aces de C. Alcaraz",
                "Nombre d'aces de J. Sinner",
                "Nombre d'aces",
                "Nombre d'aces - J. Sinner (paliers)",
                "Nombre d'aces (paliers)",
            ]
        );
    }

    #[test]
    fn test_all_six_groups_in_order() {
        let bets = vec![
            ladder("Aces (paliers)"),
            ladder("Aces Sinner (paliers)"),
            ladder("Aces Alcaraz (paliers)"),
            simple("Aces"),
            simple("Aces Sinner"),
            simple("Aces Alcaraz"),
        ];
        let ordered = order_bets(bets, "C. Alcaraz - J. Sinner");
        assert_eq!(
            names(&ordered),
            vec![
                "Aces Alcaraz",
                "Aces Sinner",
                "Aces",
                "Aces Alcaraz (paliers)",
                "Aces Sinner (paliers)",
                "Aces (paliers)",
            ]
        );
    }

    #[test]
    fn test_bet_naming_both_players_is_match_wide() {
        let bets = vec![simple("Alcaraz vs Sinner aces"), simple("Aces de Alcaraz")];
        let ordered = order_bets(bets, "C. Alcaraz - J. Sinner");
        assert_eq!(names(&ordered), vec!["Aces de Alcaraz", "Alcaraz vs Sinner aces"]);
    }

    #[test]
    fn test_stable_within_group() {
        let bets = vec![simple("b total"), simple("a total"), simple("c total")];
        let ordered = order_bets(bets, "P1 One - P2 Two");
        assert_eq!(names(&ordered), vec!["b total", "a total", "c total"]);
    }

    #[test]
    fn test_title_without_separator_keeps_simple_before_ladder() {
        let bets = vec![ladder("L"), simple("S de Someone")];
        let ordered = order_bets(bets, "Unknown match");
        assert_eq!(names(&ordered), vec!["S de Someone", "L"]);
    }

    #[test]
    fn test_orders_borrowed_bets() {
        let owned = vec![ladder("Z (paliers)"), simple("Y de P1")];
        let refs: Vec<&Bet> = owned.iter().collect();
        let ordered = order_bets(refs, "P1 A - P2 B");
        assert_eq!(ordered[0].type_name(), "Y de P1");
    }
}
