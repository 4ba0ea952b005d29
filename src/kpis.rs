use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::timezone::DateKeyResolver;
use crate::types::{DayRollup, Kpis, WeekStart};
use crate::utils::{format_day_key, parse_day_key, round_to, round2, start_of_week};

/// Half-open `[start, start + 7 days)` window on calendar dates.
fn in_week(date: NaiveDate, start: NaiveDate) -> bool {
    date >= start
        && start
            .checked_add_days(Days::new(7))
            .is_some_and(|end| date < end)
}

fn week_total(rows: &[DayRollup], start: Option<NaiveDate>) -> f64 {
    let Some(start) = start else {
        return 0.0;
    };
    rows.iter()
        .filter(|row| row.total_sdu.is_finite())
        .filter(|row| parse_day_key(&row.date_key).is_some_and(|date| in_week(date, start)))
        .map(|row| row.total_sdu)
        .sum()
}

/// Today's and this week's totals relative to the local date `today`.
pub fn kpis_at(rows: &[DayRollup], today: NaiveDate, week_start: WeekStart) -> Kpis {
    let today_key = format_day_key(today);
    let current_week = start_of_week(today, week_start);
    let previous_week = current_week.checked_sub_days(Days::new(7));

    let today_row = rows.iter().find(|row| row.date_key == today_key);
    let week_sum = week_total(rows, Some(current_week));
    let prev_week_sum = week_total(rows, previous_week);

    let week_vs_prev_pct = (prev_week_sum > 0.0)
        .then(|| round_to((week_sum - prev_week_sum) / prev_week_sum * 100.0, 1));

    Kpis {
        today_sdu: round2(
            today_row
                .map(|row| row.total_sdu)
                .filter(|sdu| sdu.is_finite())
                .unwrap_or(0.0),
        ),
        drinks_today: today_row.map(|row| row.drinks_count).unwrap_or(0),
        week_sdu: round2(week_sum),
        week_vs_prev_pct,
    }
}

/// [`kpis_at`] for the local day of `now`. Falls back to the UTC date when
/// the resolver has no zone.
pub fn get_kpis(
    rows: &[DayRollup],
    now: DateTime<Utc>,
    resolver: &DateKeyResolver,
    week_start: WeekStart,
) -> Kpis {
    let today = resolver
        .local_date(now)
        .unwrap_or_else(|| now.date_naive());
    kpis_at(rows, today, week_start)
}
