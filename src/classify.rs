// src/classify.rs
//! Trade classification: an ordered list of `(matcher, formatter)` rules.
//!
//! Rules are evaluated top to bottom against the trade's type tag and the
//! first match is authoritative. A trade no rule recognizes yields `None`; the
//! caller logs it as a [`ClassificationMiss`] and moves on.

use chrono::NaiveDateTime;
use serde_json::Value;

use crate::feed::types::{Lifecycle, Trade};
use crate::format::{format_money, format_quantity, format_strikes, pretty_expiry};
use crate::message::{Embed, Message};

pub const DEFAULT_SITE_BASE: &str = "https://thetagang.com";
const LOGO_BASE: &str = "https://g.foolcdn.com/art/companylogos/square";

const BEARISH: &[&str] = &[
    "CALL CREDIT SPREAD",
    "COVERED CALL",
    "SHORT NAKED CALL",
    "PUT DEBIT SPREAD",
    "LONG NAKED PUT",
    "SELL COMMON STOCK",
];

const NEUTRAL: &[&str] = &[
    "SHORT IRON CONDOR",
    "SHORT STRANGLE",
    "SHORT STRADDLE",
    "LONG STRANGLE",
    "LONG STRADDLE",
];

/// Inputs to formatting that are not part of the trade itself.
#[derive(Debug, Clone)]
pub struct FormatCtx {
    pub now: NaiveDateTime,
    pub site_base: String,
}

impl FormatCtx {
    pub fn new(now: NaiveDateTime, site_base: impl Into<String>) -> Self {
        Self {
            now,
            site_base: site_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn at_now(site_base: impl Into<String>) -> Self {
        Self::new(chrono::Utc::now().naive_utc(), site_base)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    Exact(&'static str),
    Contains(&'static str),
}

impl Matcher {
    pub fn matches(&self, tag: &str) -> bool {
        match self {
            Matcher::Exact(s) => tag == *s,
            Matcher::Contains(s) => tag.contains(s),
        }
    }
}

pub type Formatter = fn(&Trade, &FormatCtx) -> Message;

#[derive(Clone)]
pub struct Rule {
    pub name: &'static str,
    pub matcher: Matcher,
    pub format: Formatter,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("matcher", &self.matcher)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Stock trades first, then the option strategies thetagang.com knows.
    pub fn trades() -> Self {
        let option = |name, matcher| Rule {
            name,
            matcher,
            format: option_message,
        };
        Self::new(vec![
            Rule {
                name: "stock",
                matcher: Matcher::Contains("COMMON STOCK"),
                format: stock_message,
            },
            option("cash-secured-put", Matcher::Contains("CASH SECURED PUT")),
            option("covered-call", Matcher::Contains("COVERED CALL")),
            option("spread", Matcher::Contains("SPREAD")),
            option("naked", Matcher::Contains("NAKED")),
            option("strangle", Matcher::Contains("STRANGLE")),
            option("straddle", Matcher::Contains("STRADDLE")),
            option("condor", Matcher::Contains("CONDOR")),
            option("butterfly", Matcher::Contains("BUTTERFLY")),
            option("lizard", Matcher::Contains("LIZARD")),
        ])
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// First rule whose matcher accepts `tag`.
    pub fn select(&self, tag: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.matcher.matches(tag))
    }

    pub fn classify(&self, trade: &Trade, ctx: &FormatCtx) -> Option<Message> {
        self.select(&trade.trade_type).map(|r| (r.format)(trade, ctx))
    }
}

/// A trade no rule recognized, kept with its raw payload for rule authoring.
#[derive(Debug, Clone)]
pub struct ClassificationMiss {
    pub guid: String,
    pub type_tag: String,
    pub raw: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Bullish,
    Bearish,
    Neutral,
}

impl Tone {
    pub fn of(tag: &str) -> Self {
        if BEARISH.contains(&tag) {
            Tone::Bearish
        } else if NEUTRAL.contains(&tag) {
            Tone::Neutral
        } else {
            Tone::Bullish
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Tone::Bearish => "FD3A4A",
            Tone::Neutral => "BFAFB2",
            Tone::Bullish => "299617",
        }
    }
}

fn quantity_suffix(trade: &Trade) -> String {
    match trade.quantity {
        Some(q) if q != 1.0 => format!(" ({})", format_quantity(q)),
        _ => String::new(),
    }
}

/// Stock trades are stored with a close date at the moment they fill, so only
/// option trades are ever shown as closing.
fn shown_as_closing(trade: &Trade) -> bool {
    !trade.is_stock() && trade.lifecycle() == Lifecycle::Closed
}

fn headline(trade: &Trade) -> String {
    let closed = if shown_as_closing(trade) {
        "CLOSED "
    } else {
        ""
    };
    format!(
        "${}: {closed}{}{}",
        trade.symbol.to_uppercase(),
        trade.trade_type,
        quantity_suffix(trade)
    )
}

fn price(trade: &Trade) -> String {
    let p = if shown_as_closing(trade) {
        trade.price_closed.or(trade.price_filled)
    } else {
        trade.price_filled
    };
    p.map(|v| format!("${}", format_money(v)))
        .unwrap_or_else(|| "$?".to_string())
}

fn stock_message(trade: &Trade, ctx: &FormatCtx) -> Message {
    let title = format!("{} @ {}", headline(trade), price(trade));
    card(trade, ctx, title)
}

fn option_message(trade: &Trade, ctx: &FormatCtx) -> Message {
    let mut title = format!(
        "{} @ {} for {}",
        headline(trade),
        format_strikes(&trade.strikes()),
        price(trade)
    );
    if let Some(raw) = trade.expiry_date.as_deref() {
        let expiry = pretty_expiry(raw, ctx.now).unwrap_or_else(|e| {
            tracing::debug!(guid = %trade.guid, error = %e, "keeping raw expiry");
            raw.to_string()
        });
        title.push_str(" on ");
        title.push_str(&expiry);
    }
    card(trade, ctx, title)
}

fn card(trade: &Trade, ctx: &FormatCtx, title: String) -> Message {
    let user = &trade.user.username;
    let user_url = format!("{}/{user}", ctx.site_base);
    let trade_url = format!("{}/{user}/{}", ctx.site_base, trade.guid);

    let description = match trade.note.as_deref().map(str::trim) {
        Some(note) if !note.is_empty() => format!("[{user}]({user_url}): {note}"),
        _ => format!("[{user}]({user_url})"),
    };
    let footer = if trade.is_stock() {
        "Stock trade"
    } else if shown_as_closing(trade) {
        "Closing trade"
    } else {
        "Opening trade"
    };

    let text = format!("{title} by {user} <{trade_url}>");
    Message::with_embed(
        text,
        Embed {
            title,
            description,
            color: Some(Tone::of(&trade.trade_type).color().to_string()),
            footer: Some(footer.to_string()),
            thumbnail_url: Some(format!(
                "{LOGO_BASE}/{}.png",
                trade.symbol.to_lowercase()
            )),
            url: Some(trade_url),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::{Strike, TradeUser};
    use chrono::NaiveDate;

    fn ctx() -> FormatCtx {
        let now = NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        FormatCtx::new(now, "https://thetagang.com/")
    }

    fn trade(tag: &str) -> Trade {
        Trade {
            guid: "g1".into(),
            symbol: "amd".into(),
            trade_type: tag.into(),
            user: TradeUser {
                username: "major".into(),
                role: "patron".into(),
            },
            price_filled: Some(1.5),
            price_closed: None,
            quantity: Some(1.0),
            short_put: Some(Strike::Num(95.0)),
            short_call: None,
            long_put: None,
            long_call: None,
            expiry_date: Some("2026-04-17T00:00:00.000Z".into()),
            close_date: None,
            note: Some("earnings play".into()),
        }
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = RuleSet::trades();
        // "SELL COMMON STOCK" would never reach an option rule.
        assert_eq!(rules.select("SELL COMMON STOCK").unwrap().name, "stock");
        assert_eq!(rules.select("PUT CREDIT SPREAD").unwrap().name, "spread");
        assert_eq!(rules.select("SHORT NAKED CALL").unwrap().name, "naked");
        assert_eq!(rules.select("CASH SECURED PUT").unwrap().name, "cash-secured-put");
        assert!(rules.select("WHEEL OF FORTUNE").is_none());
    }

    #[test]
    fn covered_call_variants_are_relayed() {
        let rules = RuleSet::trades();
        assert_eq!(rules.select("POOR MANS COVERED CALL").unwrap().name, "covered-call");
        let msg = rules.classify(&trade("POOR MANS COVERED CALL"), &ctx()).unwrap();
        assert!(msg.embed.unwrap().title.starts_with("$AMD: POOR MANS COVERED CALL @ $95"));
    }

    #[test]
    fn precedence_is_declaration_order() {
        let rules = RuleSet::new(vec![
            Rule {
                name: "broad",
                matcher: Matcher::Contains("CALL"),
                format: stock_message,
            },
            Rule {
                name: "narrow",
                matcher: Matcher::Exact("COVERED CALL"),
                format: option_message,
            },
        ]);
        assert_eq!(rules.select("COVERED CALL").unwrap().name, "broad");
    }

    #[test]
    fn same_tag_same_rule() {
        let rules = RuleSet::trades();
        let a = rules.select("SHORT STRANGLE").unwrap().name;
        let b = rules.select("SHORT STRANGLE").unwrap().name;
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_type_is_none() {
        assert!(RuleSet::trades().classify(&trade("WHEEL OF FORTUNE"), &ctx()).is_none());
    }

    #[test]
    fn option_card_layout() {
        let msg = RuleSet::trades()
            .classify(&trade("CASH SECURED PUT"), &ctx())
            .unwrap();
        let embed = msg.embed.unwrap();
        assert_eq!(embed.title, "$AMD: CASH SECURED PUT @ $95 for $1.50 on 04/17");
        assert_eq!(
            embed.description,
            "[major](https://thetagang.com/major): earnings play"
        );
        assert_eq!(embed.color.as_deref(), Some("299617"));
        assert_eq!(embed.url.as_deref(), Some("https://thetagang.com/major/g1"));
        assert_eq!(
            embed.thumbnail_url.as_deref(),
            Some("https://g.foolcdn.com/art/companylogos/square/amd.png")
        );
        assert_eq!(embed.footer.as_deref(), Some("Opening trade"));
        assert!(msg.text.starts_with("$AMD: CASH SECURED PUT"));
    }

    #[test]
    fn quantity_shown_when_not_one() {
        let mut t = trade("PUT CREDIT SPREAD");
        t.quantity = Some(3.0);
        t.long_put = Some(Strike::Num(90.0));
        let embed = RuleSet::trades().classify(&t, &ctx()).unwrap().embed.unwrap();
        assert_eq!(
            embed.title,
            "$AMD: PUT CREDIT SPREAD (3) @ $95/$90 for $1.50 on 04/17"
        );
    }

    #[test]
    fn stock_card_has_no_strikes_or_expiry() {
        let mut t = trade("SELL COMMON STOCK");
        t.quantity = Some(100.0);
        t.price_filled = Some(1234.5);
        t.expiry_date = None;
        t.short_put = None;
        t.close_date = Some("2026-03-09".into());
        let embed = RuleSet::trades().classify(&t, &ctx()).unwrap().embed.unwrap();
        assert_eq!(embed.title, "$AMD: SELL COMMON STOCK (100) @ $1,234.50");
        assert_eq!(embed.color.as_deref(), Some("FD3A4A"));
        assert_eq!(embed.footer.as_deref(), Some("Stock trade"));
    }

    #[test]
    fn stock_fill_price_wins_over_close_price() {
        let mut t = trade("BUY COMMON STOCK");
        t.symbol = "aapl".into();
        t.quantity = Some(100.0);
        t.price_filled = Some(150.25);
        t.price_closed = Some(0.0);
        t.expiry_date = None;
        t.short_put = None;
        t.close_date = Some("2026-03-09T15:30:00.000Z".into());
        let embed = RuleSet::trades().classify(&t, &ctx()).unwrap().embed.unwrap();
        assert_eq!(embed.title, "$AAPL: BUY COMMON STOCK (100) @ $150.25");
        assert_ne!(embed.footer.as_deref(), Some("Closing trade"));
    }

    #[test]
    fn closing_trade_prefers_closing_price() {
        let mut t = trade("SHORT STRANGLE");
        t.close_date = Some("2026-03-09".into());
        t.price_closed = Some(0.25);
        let embed = RuleSet::trades().classify(&t, &ctx()).unwrap().embed.unwrap();
        assert!(embed.title.starts_with("$AMD: CLOSED SHORT STRANGLE @ $95 for $0.25"));
        assert_eq!(embed.color.as_deref(), Some("BFAFB2"));
    }

    #[test]
    fn blank_note_is_left_out() {
        let mut t = trade("COVERED CALL");
        t.note = Some("  ".into());
        let embed = RuleSet::trades().classify(&t, &ctx()).unwrap().embed.unwrap();
        assert_eq!(embed.description, "[major](https://thetagang.com/major)");
    }
}
