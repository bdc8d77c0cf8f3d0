//! Alert text in Telegram HTML

use crate::types::{Bet, Match};
use std::borrow::Borrow;
use std::fmt::Write;

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// One grouped alert for a match, bets rendered in the given order
pub fn render_alert<B: Borrow<Bet>>(m: &Match, bets: &[B]) -> String {
    let mut text = format!("🎾 <b>{}</b>\n\n", escape_html(&m.title));

    for bet in bets {
        match bet.borrow() {
            Bet::Simple {
                type_name,
                cutoff,
                over_price,
                under_price,
            } => {
                let _ = write!(
                    text,
                    "<b>{}</b>  + {:.1} @ {:.2} / - {:.1} @ {:.2}\n\n",
                    escape_html(type_name),
                    cutoff,
                    over_price,
                    cutoff,
                    under_price
                );
            }
            Bet::Ladder { type_name, options } => {
                let _ = writeln!(text, "<b>{}</b> :", escape_html(type_name));
                for option in options {
                    let _ = writeln!(text, "{:.0} @ {:.2}", option.threshold, option.price);
                }
                text.push('\n');
            }
        }
    }

    let _ = write!(text, "🔗 <a href=\"{}\">LIEN</a>", escape_html(&m.link));
    text
}
