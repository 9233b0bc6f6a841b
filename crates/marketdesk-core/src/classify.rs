//! Provider-independent classification of raw upstream responses.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapters::RawResponse;
use crate::normalize::{is_reported, parse_finite};
use crate::Capability;

/// Classified result of one upstream attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    RateLimit,
    PremiumRequired,
    InvalidRequest,
    Empty,
    TransientError,
}

impl Outcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::RateLimit => "rate_limit",
            Self::PremiumRequired => "premium_required",
            Self::InvalidRequest => "invalid_request",
            Self::Empty => "empty",
            Self::TransientError => "transient_error",
        }
    }

    /// Outcomes that point at the symbol rather than at the provider.
    pub const fn is_symbol_unresolvable(self) -> bool {
        matches!(self, Self::InvalidRequest | Self::Empty)
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Reported,
    Numeric,
    Equals(&'static str),
    NonNullArray,
}

/// One JSON-pointer test against a decoded body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pointer: &'static str,
    rule: Rule,
}

impl Probe {
    /// Matches when the field is reported (not null, blank, or `"none"`).
    pub const fn field(pointer: &'static str) -> Self {
        Self {
            pointer,
            rule: Rule::Reported,
        }
    }

    /// Matches when the field carries a finite number, as a JSON number or numeric text.
    pub const fn number(pointer: &'static str) -> Self {
        Self {
            pointer,
            rule: Rule::Numeric,
        }
    }

    /// Matches when the field is the given string.
    pub const fn equals(pointer: &'static str, value: &'static str) -> Self {
        Self {
            pointer,
            rule: Rule::Equals(value),
        }
    }

    /// Matches when the field is a JSON array, even an empty one.
    pub const fn array(pointer: &'static str) -> Self {
        Self {
            pointer,
            rule: Rule::NonNullArray,
        }
    }

    pub const fn pointer(&self) -> &'static str {
        self.pointer
    }

    pub fn matches(&self, body: &Value) -> bool {
        let value = body.pointer(self.pointer);
        match self.rule {
            Rule::Reported => is_reported(value),
            Rule::Numeric => value.and_then(parse_finite).is_some(),
            Rule::Equals(expected) => value.and_then(Value::as_str) == Some(expected),
            Rule::NonNullArray => value.is_some_and(Value::is_array),
        }
    }

    /// Human-readable text carried by the probed field, if any.
    fn message(&self, body: &Value) -> Option<String> {
        match body.pointer(self.pointer)? {
            Value::String(text) => Some(text.clone()),
            Value::Object(map) => ["description", "message", "code"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::to_owned),
            _ => None,
        }
    }
}

/// How one provider signals each outcome in its native response format.
#[derive(Debug, Clone, Copy)]
pub struct Signals {
    pub rate_limit: &'static [Probe],
    pub premium: &'static [Probe],
    pub error: &'static [Probe],
    /// Any-of identifying fields per capability. A capability with no entry has none.
    pub required: &'static [(Capability, &'static [Probe])],
}

impl Signals {
    fn has_required(&self, capability: Capability, body: &Value) -> bool {
        self.required
            .iter()
            .find(|(candidate, _)| *candidate == capability)
            .map_or(true, |(_, probes)| probes.iter().any(|probe| probe.matches(body)))
    }

    /// Upstream message for a rate-limit, premium or error outcome.
    pub fn message(&self, outcome: Outcome, body: &Value) -> Option<String> {
        let probes = match outcome {
            Outcome::RateLimit => self.rate_limit,
            Outcome::PremiumRequired => self.premium,
            Outcome::InvalidRequest => self.error,
            Outcome::Ok | Outcome::Empty | Outcome::TransientError => return None,
        };
        probes
            .iter()
            .filter(|probe| probe.matches(body))
            .find_map(|probe| probe.message(body))
    }
}

/// Assigns exactly one outcome to a decoded response. First matching rule wins.
pub fn classify(response: &RawResponse, capability: Capability, signals: &Signals) -> Outcome {
    let body = &response.body;
    let any = |probes: &[Probe]| probes.iter().any(|probe| probe.matches(body));

    if response.status == 429 || any(signals.rate_limit) {
        return Outcome::RateLimit;
    }
    if response.status == 402 || any(signals.premium) {
        return Outcome::PremiumRequired;
    }
    if any(signals.error) {
        return Outcome::InvalidRequest;
    }
    if !response.is_success() {
        return Outcome::TransientError;
    }
    if !signals.has_required(capability, body) {
        return Outcome::Empty;
    }
    Outcome::Ok
}
