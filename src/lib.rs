//! Daily and weekly analytics over a timestamped drink log.
//!
//! The pipeline is `DrinksList` (or drinking sessions through a
//! [`sessions::SessionLogAdapter`]) into [`rollup::build_day_rollups`], whose
//! `DayRollup` rows feed [`weekly::stacked_weekly_by_type`] and
//! [`kpis::kpis_at`]. Nothing in it fails on bad data: malformed entries are
//! skipped and missing data reads as zero.

pub mod config;
pub mod kpis;
pub mod rollup;
pub mod sessions;
pub mod timezone;
pub mod types;
pub mod utils;
pub mod weekly;

pub use kpis::{get_kpis, kpis_at};
pub use rollup::{build_day_rollups, build_day_rollups_from_sessions};
pub use sessions::{DrinkingSession, SessionDrinksAdapter, SessionLogAdapter};
pub use timezone::{DateKeyResolver, SharedTimezone, TimezoneProvider, TimezoneSetting};
pub use types::{
    DayRollup, DrinkKey, DrinksList, DrinksToUnits, Kpis, RawCount, StackedPoint, WeekStart,
};
pub use weekly::{get_by_type_stacked_weekly, stacked_weekly_by_type};
