//! Canned offline answers used when no provider can be reached.
//!
//! Everything here is a pure function of the input text: no clock, no
//! randomness, no I/O.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{last_user_message, Message};

pub const DEMO_LABEL: &str = "[DEMO MODE]";

static ANALYZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:analy[sz]e|analysis)\b").expect("valid analyze regex"));
static SIGNAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bsignals?\b").expect("valid signal regex"));
static RISK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:risks?|risky)\b").expect("valid risk regex"));

/// Which canned answer a message maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    MarketAnalysis,
    Signal,
    Risk,
    Help,
}

impl Template {
    /// First match wins: analysis, then signal, then risk.
    pub fn select(message: &str) -> Self {
        if ANALYZE.is_match(message) {
            Template::MarketAnalysis
        } else if SIGNAL.is_match(message) {
            Template::Signal
        } else if RISK.is_match(message) {
            Template::Risk
        } else {
            Template::Help
        }
    }

    fn body(self) -> &'static str {
        match self {
            Template::MarketAnalysis => "\
Market analysis (sample output)
- Trend: sideways, no confirmed breakout on the daily chart
- Momentum: RSI near 50, MACD flat around the signal line
- Volume: below the 20-day average
- Levels: watch the recent swing high as resistance and the swing low as support
Connect a model provider to get a live analysis.",
            Template::Signal => "\
Signal (sample output)
- Direction: HOLD
- Confidence: low
- Reason: indicators disagree; no entry until trend and momentum align
Connect a model provider to get live signals.",
            Template::Risk => "\
Risk overview (sample output)
- Keep position size at 1-2% of account equity per trade
- Place a stop-loss below the most recent swing low
- Avoid adding to losing positions
Connect a model provider to get a tailored risk review.",
            Template::Help => "\
No model provider is reachable right now, so this is an offline reply.
Try asking to \"analyze\" a market, for a trading \"signal\", or about \"risk\".
Run `modelgate status` to see which providers are configured.",
        }
    }
}

/// Produces labelled demo answers when dispatch is exhausted.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackResponder;

impl FallbackResponder {
    pub fn new() -> Self {
        Self
    }

    pub fn respond(&self, last_user_message: &str) -> String {
        let template = Template::select(last_user_message);
        format!("{} {}", DEMO_LABEL, template.body())
    }

    /// Respond to the most recent user message in a conversation.
    pub fn respond_to(&self, messages: &[Message]) -> String {
        self.respond(last_user_message(messages))
    }
}
