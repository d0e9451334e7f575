//! Matching desired cluster attributes against the availability catalog

use std::collections::BTreeSet;

use serde_json::{Map, Value};

/// Offer fields that change independently of what a caller asks for.
pub const VOLATILE_OFFER_FIELDS: &[&str] = &[
    "default",
    "startDate",
    "endOfLife",
    "upstreamEndOfLife",
    "backup",
    "minNodeNumber",
    "maxNodeNumber",
    "minDiskSize",
    "maxDiskSize",
    "status",
];

/// Finds the first offer containing a desired attribute record.
///
/// Matching is a containment check: every non-ignored key of the desired
/// record must exist in the offer with an equal value, strings compared
/// case-insensitively. Keys the offer has beyond the desired ones are not
/// looked at.
#[derive(Debug, Clone)]
pub struct OfferMatcher {
    ignored: BTreeSet<String>,
}

impl Default for OfferMatcher {
    fn default() -> Self {
        Self::new(VOLATILE_OFFER_FIELDS.iter().copied())
    }
}

impl OfferMatcher {
    pub fn new<I, S>(ignored: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored: ignored.into_iter().map(Into::into).collect(),
        }
    }

    pub fn find<'a>(&self, offers: &'a [Value], desired: &Map<String, Value>) -> Option<&'a Value> {
        offers.iter().find(|offer| match offer.as_object() {
            Some(attributes) => self.matches(attributes, desired),
            None => false,
        })
    }

    pub fn matches(&self, offer: &Map<String, Value>, desired: &Map<String, Value>) -> bool {
        desired
            .iter()
            .filter(|(key, _)| !self.ignored.contains(key.as_str()))
            .all(|(key, wanted)| offer.get(key).is_some_and(|actual| loosely_equal(actual, wanted)))
    }
}

fn loosely_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::String(l), Value::String(r)) => l.to_lowercase() == r.to_lowercase(),
        (Value::Array(l), Value::Array(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| loosely_equal(a, b))
        }
        (Value::Object(l), Value::Object(r)) => {
            l.len() == r.len()
                && l.iter().all(|(key, a)| r.get(key).is_some_and(|b| loosely_equal(a, b)))
        }
        _ => left == right,
    }
}
