//! Plan tiers and raw plan values
//!
//! Account records store the plan as free text (`"none"`, `"0"`, `"1"`, ...)
//! that admins can edit by hand, and some callers hand over plain numbers.
//! Everything funnels through [`normalize_tier`], which never fails and never
//! rounds up: any shape it does not recognise becomes [`Tier::FREE`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Subscription access level (higher = more access)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tier(pub u32);

impl Tier {
    /// Default tier for every account
    pub const FREE: Tier = Tier(0);
    /// First paid tier
    pub const STANDARD: Tier = Tier(1);
    /// Top paid tier
    pub const PREMIUM: Tier = Tier(2);

    /// Create tier from level
    #[inline]
    #[must_use]
    pub const fn new(level: u32) -> Self {
        Self(level)
    }

    /// Get numeric level
    #[inline]
    #[must_use]
    pub const fn level(self) -> u32 {
        self.0
    }

    /// String form written back to the account record
    #[inline]
    #[must_use]
    pub fn to_plan_string(self) -> String {
        self.0.to_string()
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Tier {
    fn from(level: u32) -> Self {
        Self(level)
    }
}

/// Sentinel stored for accounts that never picked a plan
pub const NO_PLAN: &str = "none";

/// Plan value as it is found in an account record
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PlanValue {
    /// Field absent or null
    #[default]
    Missing,
    /// String form (`"none"`, `"2"`, or anything an admin typed)
    Text(String),
    /// Raw number
    Number(f64),
}

impl PlanValue {
    /// Sentinel value for a fresh account
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::Text(NO_PLAN.to_string())
    }

    /// Encode back to the stored string form
    #[must_use]
    pub fn to_stored(&self) -> String {
        match self {
            Self::Missing => NO_PLAN.to_string(),
            Self::Text(s) => s.clone(),
            Self::Number(_) => normalize_tier(self).to_plan_string(),
        }
    }
}

impl From<&str> for PlanValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for PlanValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for PlanValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for PlanValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for PlanValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for PlanValue {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<Tier> for PlanValue {
    fn from(tier: Tier) -> Self {
        Self::Number(f64::from(tier.0))
    }
}

impl<T: Into<PlanValue>> From<Option<T>> for PlanValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

impl From<&Value> for PlanValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s.clone()),
            Value::Number(n) => n.as_f64().map_or(Self::Missing, Self::Number),
            // Anything else is not a plan we understand
            _ => Self::Missing,
        }
    }
}

/// Normalize any stored plan shape into a [`Tier`]
///
/// - `"none"`, empty, absent or unparsable → [`Tier::FREE`]
/// - numeric strings use their leading integer (`"2abc"` → 2)
/// - numbers are truncated toward zero
/// - negatives floor at 0, oversized values saturate
#[must_use]
pub fn normalize_tier(value: &PlanValue) -> Tier {
    match value {
        PlanValue::Missing => Tier::FREE,
        PlanValue::Text(text) => parse_plan_text(text),
        PlanValue::Number(n) => from_number(*n),
    }
}

fn parse_plan_text(text: &str) -> Tier {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NO_PLAN) {
        return Tier::FREE;
    }

    let (negative, digits) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    let digits = &digits[..end];

    if digits.is_empty() || negative {
        return Tier::FREE;
    }

    // All-digit input only overflows; saturate rather than fall back to 0
    Tier(digits.parse::<u32>().unwrap_or(u32::MAX))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn from_number(n: f64) -> Tier {
    if !n.is_finite() || n <= 0.0 {
        return Tier::FREE;
    }
    if n >= f64::from(u32::MAX) {
        return Tier(u32::MAX);
    }
    Tier(n.trunc() as u32)
}
