//! Authoritative progress snapshot mirrored from the scoring service.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Number;

const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Relationship subject key -> opaque value chosen by the scoring service.
pub type RelationshipMap = BTreeMap<String, serde_json::Value>;

/// One of the three progress meters.
///
/// Conceptually in `0..=100`, but the value is whatever JSON number the service
/// sent, integral or not; it is never clamped or rounded here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meter(Number);

impl Meter {
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(Number::from(value))
    }

    /// `None` for NaN or infinite input, which JSON cannot carry.
    #[must_use]
    pub fn from_f64(value: f64) -> Option<Self> {
        Number::from_f64(value).map(Self)
    }

    /// The value when the service sent an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.0.as_i64()
    }

    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.0.as_f64().unwrap_or_default()
    }
}

/// Integral values print without a fractional part (`55.0` shows as `55`).
impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_f64() {
            let value = self.as_f64();
            if value.fract() == 0.0 && value.abs() < MAX_EXACT_FLOAT {
                return write!(f, "{}", value as i64);
            }
        }
        write!(f, "{}", self.0)
    }
}

/// The three meters plus the relationship map.
///
/// Deserializes directly from the service's response body; a missing or
/// `null` `relationships` field becomes an empty map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub public_trust: Meter,
    pub personal_clout: Meter,
    pub professional_skill: Meter,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub relationships: RelationshipMap,
}

impl ProgressState {
    #[must_use]
    pub fn new(public_trust: i64, personal_clout: i64, professional_skill: i64) -> Self {
        Self {
            public_trust: Meter::new(public_trust),
            personal_clout: Meter::new(personal_clout),
            professional_skill: Meter::new(professional_skill),
            relationships: RelationshipMap::new(),
        }
    }

    #[must_use]
    pub fn with_relationships(mut self, relationships: RelationshipMap) -> Self {
        self.relationships = relationships;
        self
    }
}

/// Starting view before the service has answered: trust 50, clout 50, skill 0.
impl Default for ProgressState {
    fn default() -> Self {
        Self::new(50, 50, 0)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<RelationshipMap, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RelationshipMap>::deserialize(deserializer)?.unwrap_or_default())
}
