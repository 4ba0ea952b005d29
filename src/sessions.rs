use serde::{Deserialize, Serialize};

use crate::types::{DrinksList, RawCount};

/// Turns a collection of drinking sessions into the flat drink log the day
/// rollup builder consumes.
///
/// Any `Fn(&[S]) -> DrinksList` is an adapter, so callers holding their own
/// session type can pass a closure.
pub trait SessionLogAdapter<S> {
    fn to_drinks_list(&self, sessions: &[S]) -> DrinksList;
}

impl<S, F> SessionLogAdapter<S> for F
where
    F: Fn(&[S]) -> DrinksList,
{
    fn to_drinks_list(&self, sessions: &[S]) -> DrinksList {
        self(sessions)
    }
}

/// A drinking session as stored by the app.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DrinkingSession {
    /// Milliseconds since the epoch
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub drinks: DrinksList,
    pub blackout: Option<bool>,
    pub note: Option<String>,
    pub ongoing: Option<bool>,
}

/// Merges every session's own drink log into one log.
///
/// When two sessions log the same drink type at the same timestamp, numeric
/// counts are added up; otherwise the later session's value wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionDrinksAdapter;

impl SessionLogAdapter<DrinkingSession> for SessionDrinksAdapter {
    fn to_drinks_list(&self, sessions: &[DrinkingSession]) -> DrinksList {
        let mut merged = DrinksList::new();

        for session in sessions {
            for (timestamp, record) in &session.drinks {
                let merged_record = merged.entry(timestamp.clone()).or_default();
                for (drink_type, count) in record {
                    merged_record
                        .entry(drink_type.clone())
                        .and_modify(|existing| *existing = merge_counts(existing, count))
                        .or_insert_with(|| count.clone());
                }
            }
        }

        merged
    }
}

fn merge_counts(existing: &RawCount, incoming: &RawCount) -> RawCount {
    match (existing.as_number(), incoming.as_number()) {
        (Some(a), Some(b)) => RawCount::Number(a + b),
        _ => incoming.clone(),
    }
}
