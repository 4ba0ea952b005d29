use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::timezone::DateKeyResolver;
use crate::types::{DayRollup, DrinkKey, StackedPoint, WeekStart};
use crate::utils::{parse_day_key, round2, start_of_week, week_bucket_key};

pub const DEFAULT_WEEKS: usize = 8;

type WeekTotals = BTreeMap<DrinkKey, f64>;

/// Sum positive per-type values of every parseable row into the bucket named
/// by [`week_bucket_key`] of the row's own date.
///
/// Labels are Sunday-based, so under a Monday start a Sunday row lands in
/// the following week's bucket.
fn bucket_by_week(rows: &[DayRollup]) -> HashMap<String, WeekTotals> {
    let mut buckets: HashMap<String, WeekTotals> = HashMap::new();

    for row in rows {
        let Some(date) = parse_day_key(&row.date_key) else {
            tracing::debug!(date_key = %row.date_key, "skipping row with unparseable date");
            continue;
        };
        let Some(key) = week_bucket_key(date) else {
            continue;
        };

        let bucket = buckets.entry(key).or_default();
        for (drink, value) in &row.by_type {
            if value.is_finite() && *value > 0.0 {
                *bucket.entry(*drink).or_insert(0.0) += value;
            }
        }
    }

    buckets
}

/// Labels of the last `weeks` weeks ending with the one containing `today`,
/// oldest first.
fn anchor_week_keys(today: NaiveDate, weeks: usize, week_start: WeekStart) -> Vec<String> {
    let current = start_of_week(today, week_start);

    let mut keys: Vec<String> = (0..weeks)
        .rev()
        .filter_map(|offset| {
            let days = (offset as u64).checked_mul(7)?;
            current
                .checked_sub_days(Days::new(days))
                .and_then(week_bucket_key)
        })
        .collect();

    if keys.is_empty()
        && weeks > 0
        && let Some(key) = week_bucket_key(current)
    {
        keys.push(key);
    }

    keys
}

fn segments_for(totals: Option<&WeekTotals>) -> BTreeMap<DrinkKey, f64> {
    let mut segments: BTreeMap<DrinkKey, f64> = totals
        .into_iter()
        .flatten()
        .map(|(drink, value)| (*drink, round2(*value)))
        .filter(|(_, value)| *value > 0.0)
        .collect();

    // Every bar needs at least one renderable segment.
    if segments.is_empty() {
        segments.insert(DrinkKey::Other, 0.0);
    }
    segments
}

/// Per-type stacked weekly totals for the `weeks` weeks ending with the week
/// containing `today`.
///
/// Returns an empty series when there are no rows; otherwise exactly one
/// point per week (oldest first), with a `{other: 0}` placeholder for weeks
/// without data.
pub fn stacked_weekly_by_type(
    rows: &[DayRollup],
    weeks: usize,
    today: NaiveDate,
    week_start: WeekStart,
) -> Vec<StackedPoint> {
    if rows.is_empty() {
        return Vec::new();
    }

    let buckets = bucket_by_week(rows);

    anchor_week_keys(today, weeks, week_start)
        .into_iter()
        .map(|key| {
            let segments = segments_for(buckets.get(&key));
            StackedPoint { x: key, segments }
        })
        .collect()
}

/// [`stacked_weekly_by_type`] anchored at the local day of `now`. Falls back
/// to the UTC date when the resolver has no zone.
pub fn get_by_type_stacked_weekly(
    rows: &[DayRollup],
    weeks: usize,
    now: DateTime<Utc>,
    resolver: &DateKeyResolver,
    week_start: WeekStart,
) -> Vec<StackedPoint> {
    let today = resolver
        .local_date(now)
        .unwrap_or_else(|| now.date_naive());
    stacked_weekly_by_type(rows, weeks, today, week_start)
}
