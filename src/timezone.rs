//! Local calendar days and times of day for absolute instants.
//!
//! The current user's timezone is an explicit input here. Whatever keeps it
//! up to date (a profile subscription, the config file, a CLI flag) hands a
//! [`TimezoneSetting`] over through a [`TimezoneProvider`], and each
//! [`DateKeyResolver`] is built from exactly one snapshot of it.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::utils::{self, DAY_KEY_FORMAT};

/// Zero-padded 24h time, so lexicographic order is chronological.
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S";

/// The user's timezone preference as pushed by the profile data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimezoneSetting {
    /// IANA identifier, e.g. "Europe/Prague"
    pub selected: String,
    /// Follow the system timezone instead of `selected`
    #[serde(default)]
    pub automatic: bool,
}

impl TimezoneSetting {
    pub fn fixed(zone: impl Into<String>) -> Self {
        Self {
            selected: zone.into(),
            automatic: false,
        }
    }
}

impl Default for TimezoneSetting {
    fn default() -> Self {
        Self {
            selected: "UTC".to_string(),
            automatic: true,
        }
    }
}

pub trait TimezoneProvider {
    fn current(&self) -> TimezoneSetting;
}

impl TimezoneProvider for TimezoneSetting {
    fn current(&self) -> TimezoneSetting {
        self.clone()
    }
}

/// Shared, externally updated timezone setting.
///
/// Clones share the same slot: the subscriber keeps one clone and calls
/// [`SharedTimezone::update`], readers take snapshots via [`TimezoneProvider`].
#[derive(Debug, Clone, Default)]
pub struct SharedTimezone {
    inner: Arc<RwLock<TimezoneSetting>>,
}

impl SharedTimezone {
    pub fn new(setting: TimezoneSetting) -> Self {
        Self {
            inner: Arc::new(RwLock::new(setting)),
        }
    }

    pub fn update(&self, setting: TimezoneSetting) {
        *self.inner.write() = setting;
    }
}

impl TimezoneProvider for SharedTimezone {
    fn current(&self) -> TimezoneSetting {
        self.inner.read().clone()
    }
}

/// Get the system's local timezone as an IANA timezone string (e.g., "America/Chicago")
pub fn system_timezone() -> Option<String> {
    iana_time_zone::get_timezone().ok()
}

/// Resolves instants to local day keys and times of day in one fixed zone.
///
/// An unresolved resolver (unknown zone name) answers `None` for everything,
/// which callers treat as "no valid localized value".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateKeyResolver {
    tz: Option<Tz>,
}

impl DateKeyResolver {
    pub fn new(tz: Tz) -> Self {
        Self { tz: Some(tz) }
    }

    pub fn unresolved() -> Self {
        Self { tz: None }
    }

    pub fn from_name(name: &str) -> Self {
        match name.trim().parse::<Tz>() {
            Ok(tz) => Self::new(tz),
            Err(_) => {
                utils::warn_once(format!(
                    "Unknown timezone '{name}', local days cannot be resolved"
                ));
                Self::unresolved()
            }
        }
    }

    pub fn from_setting(setting: &TimezoneSetting) -> Self {
        if setting.automatic
            && let Some(tz) = system_timezone().and_then(|name| name.parse::<Tz>().ok())
        {
            return Self::new(tz);
        }
        Self::from_name(&setting.selected)
    }

    /// Take a single snapshot of the provider's current setting.
    pub fn from_provider(provider: &dyn TimezoneProvider) -> Self {
        Self::from_setting(&provider.current())
    }

    pub fn timezone(&self) -> Option<Tz> {
        self.tz
    }

    pub fn is_resolved(&self) -> bool {
        self.tz.is_some()
    }

    fn localize(&self, instant: DateTime<Utc>) -> Option<DateTime<Tz>> {
        self.tz.map(|tz| instant.with_timezone(&tz))
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> Option<NaiveDate> {
        self.localize(instant).map(|local| local.date_naive())
    }

    /// `YYYY-MM-DD` in the resolver's zone.
    pub fn day_key(&self, instant: DateTime<Utc>) -> Option<String> {
        self.localize(instant)
            .map(|local| local.format(DAY_KEY_FORMAT).to_string())
    }

    /// `HH:MM:SS` in the resolver's zone.
    pub fn time_of_day(&self, instant: DateTime<Utc>) -> Option<String> {
        self.localize(instant)
            .map(|local| local.format(TIME_OF_DAY_FORMAT).to_string())
    }
}

/// Milliseconds since the epoch to an instant. Fractions are truncated;
/// non-finite or out-of-range values yield `None`.
pub fn instant_from_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis.trunc() as i64)
}
