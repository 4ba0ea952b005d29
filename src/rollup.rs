use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::sessions::SessionLogAdapter;
use crate::timezone::{DateKeyResolver, instant_from_millis};
use crate::types::{DayRollup, DrinkKey, DrinksList, DrinksToUnits, RawCount};
use crate::utils::round2;

/// One qualifying drink-type entry of a log record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    pub drink: DrinkKey,
    pub sdu: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RollupKey {
    user_id: String,
    date_key: String,
}

/// Parse a millisecond timestamp key written as decimal text. Anything else
/// (empty, hex, not finite, or outside the representable range) is rejected.
pub fn parse_timestamp_key(key: &str) -> Option<DateTime<Utc>> {
    let millis = key.trim().parse::<f64>().ok()?;
    instant_from_millis(millis)
}

/// Validate one `(drink type, count)` pair against the unit table.
///
/// Rejects unrecognized drink types, counts without a finite numeric value,
/// counts `<= 0`, and types missing from the table (or weighted `<= 0`).
pub fn parse_entry(
    drink_type: &str,
    raw: &RawCount,
    units: &DrinksToUnits,
) -> Option<Contribution> {
    let drink = drink_type.parse::<DrinkKey>().ok()?;
    let count = raw.as_number().filter(|count| *count > 0.0)?;
    let weight = units
        .get(&drink)
        .copied()
        .filter(|weight| weight.is_finite() && *weight > 0.0)?;

    let sdu = weight * count;
    sdu.is_finite().then_some(Contribution { drink, sdu })
}

fn add_contribution(row: &mut DayRollup, contribution: Contribution, time: Option<&str>) {
    row.total_sdu += contribution.sdu;
    row.drinks_count = row.drinks_count.saturating_add(1);
    *row.by_type.entry(contribution.drink).or_insert(0.0) += contribution.sdu;
    if let Some(time) = time {
        row.record_time(time);
    }
}

/// Aggregate a raw drink log into one record per local calendar day.
///
/// Every timestamp is resolved against the single zone held by `resolver`.
/// Malformed entries are skipped; a day without any qualifying entry gets no
/// record at all. Row order is unspecified.
pub fn build_day_rollups(
    drinks: &DrinksList,
    drinks_to_units: &DrinksToUnits,
    user_id: &str,
    resolver: &DateKeyResolver,
) -> Vec<DayRollup> {
    let mut rows: HashMap<RollupKey, DayRollup> = HashMap::new();

    for (timestamp_key, record) in drinks {
        let Some(instant) = parse_timestamp_key(timestamp_key) else {
            tracing::debug!(timestamp = %timestamp_key, "skipping entry with invalid timestamp");
            continue;
        };
        let Some(date_key) = resolver.day_key(instant) else {
            tracing::debug!(timestamp = %timestamp_key, "skipping entry without a local day");
            continue;
        };
        let local_time = resolver.time_of_day(instant);
        let key = RollupKey {
            user_id: user_id.to_string(),
            date_key,
        };

        for (drink_type, raw) in record {
            let Some(contribution) = parse_entry(drink_type, raw, drinks_to_units) else {
                tracing::debug!(
                    timestamp = %timestamp_key,
                    drink_type = %drink_type,
                    value = ?raw,
                    "skipping drink entry"
                );
                continue;
            };

            let row = rows
                .entry(key.clone())
                .or_insert_with(|| DayRollup::empty(&key.user_id, &key.date_key));
            add_contribution(row, contribution, local_time.as_deref());
        }
    }

    rows.into_values()
        .map(|mut row| {
            row.total_sdu = round2(row.total_sdu);
            row
        })
        .collect()
}

/// Flatten `sessions` through `adapter`, then aggregate as
/// [`build_day_rollups`]. Missing or empty collections short-circuit to an
/// empty result without calling the adapter.
pub fn build_day_rollups_from_sessions<S, A>(
    sessions: Option<&[S]>,
    adapter: &A,
    drinks_to_units: &DrinksToUnits,
    user_id: &str,
    resolver: &DateKeyResolver,
) -> Vec<DayRollup>
where
    A: SessionLogAdapter<S> + ?Sized,
{
    match sessions {
        Some(sessions) if !sessions.is_empty() => {
            let drinks = adapter.to_drinks_list(sessions);
            build_day_rollups(&drinks, drinks_to_units, user_id, resolver)
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests;
