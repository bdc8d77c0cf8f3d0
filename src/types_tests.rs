//! Tests for core types

#[cfg(test)]
mod tests {
    use super::super::types::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_round_price_down() {
        assert!(approx(round_price(1.463), 1.45));
    }

    #[test]
    fn test_round_price_up() {
        assert!(approx(round_price(1.476), 1.50));
    }

    #[test]
    fn test_round_price_exact_tick() {
        assert!(approx(round_price(2.35), 2.35));
        assert!(approx(round_price(1.0), 1.0));
    }

    #[test]
    fn test_round_price_half_up() {
        // 1.125 * 20 = 22.5 -> 23
        assert!(approx(round_price(1.125), 1.15));
    }

    #[test]
    fn test_bet_type_name() {
        let simple = Bet::Simple {
            type_name: "Nombre d'aces".to_string(),
            cutoff: 12.5,
            over_price: 1.8,
            under_price: 1.95,
        };
        let ladder = Bet::Ladder {
            type_name: "Nombre d'aces (paliers)".to_string(),
            options: vec![],
        };
        assert_eq!(simple.type_name(), "Nombre d'aces");
        assert_eq!(ladder.type_name(), "Nombre d'aces (paliers)");
        assert!(!simple.is_ladder());
        assert!(ladder.is_ladder());
        assert!(!ladder.has_options());
        assert!(!simple.has_options());
    }

    #[test]
    fn test_bet_serialization_tagged() {
        let bet = Bet::Simple {
            type_name: "Nombre d'aces".to_string(),
            cutoff: 12.5,
            over_price: 1.8,
            under_price: 1.95,
        };
        let json = serde_json::to_value(&bet).unwrap();
        assert_eq!(json["kind"], "simple");
        assert_eq!(json["type_name"], "Nombre d'aces");
        assert_eq!(json["cutoff"], 12.5);
    }

    #[test]
    fn test_ladder_deserialization_keeps_option_order() {
        let json = r#"{
            "kind": "ladder",
            "type_name": "Nombre d'aces (paliers)",
            "options": [
                {"threshold": 10.0, "price": 1.5},
                {"threshold": 5.0, "price": 1.1}
            ]
        }"#;
        let bet: Bet = serde_json::from_str(json).unwrap();
        match bet {
            Bet::Ladder { options, .. } => {
                assert_eq!(options.len(), 2);
                assert_eq!(options[0].threshold, 10.0);
                assert_eq!(options[1].threshold, 5.0);
            }
            _ => panic!("Expected ladder bet"),
        }
    }

    #[test]
    fn test_match_link_for() {
        assert_eq!(
            Match::link_for("https://www.winamax.fr/paris-sportifs/match/", 4242),
            "https://www.winamax.fr/paris-sportifs/match/4242"
        );
        assert_eq!(
            Match::link_for("https://example.com/match", 7),
            "https://example.com/match/7"
        );
    }

    #[test]
    fn test_match_bet_count() {
        let m = Match {
            title: "A. One - B. Two".to_string(),
            link: "https://example.com/match/1".to_string(),
            bets: vec![Bet::Ladder {
                type_name: "Nombre d'aces (paliers)".to_string(),
                options: vec![PriceOption { threshold: 5.0, price: 1.2 }],
            }],
        };
        assert_eq!(m.bet_count(), 1);
    }
}
