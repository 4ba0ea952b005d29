use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The closed set of drink types a log entry can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrinkKey {
    SmallBeer,
    Beer,
    Cocktail,
    Other,
    StrongShot,
    WeakShot,
    Wine,
}

impl DrinkKey {
    pub const ALL: [DrinkKey; 7] = [
        DrinkKey::SmallBeer,
        DrinkKey::Beer,
        DrinkKey::Cocktail,
        DrinkKey::Other,
        DrinkKey::StrongShot,
        DrinkKey::WeakShot,
        DrinkKey::Wine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DrinkKey::SmallBeer => "small_beer",
            DrinkKey::Beer => "beer",
            DrinkKey::Cocktail => "cocktail",
            DrinkKey::Other => "other",
            DrinkKey::StrongShot => "strong_shot",
            DrinkKey::WeakShot => "weak_shot",
            DrinkKey::Wine => "wine",
        }
    }
}

impl fmt::Display for DrinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrinkKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DrinkKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or(())
    }
}

/// A drink count exactly as it was stored. Hand-edited records may hold
/// strings, booleans or nested values where a number is expected, so the
/// value is only interpreted when it is aggregated.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCount {
    Number(f64),
    Flag(bool),
    Text(String),
    /// null, arrays, objects
    Other,
}

impl RawCount {
    /// Numeric coercion of the stored value. `None` when the value has no
    /// finite numeric reading.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            RawCount::Number(n) => *n,
            RawCount::Flag(true) => 1.0,
            RawCount::Flag(false) => 0.0,
            RawCount::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    0.0
                } else {
                    text.parse::<f64>().ok()?
                }
            }
            RawCount::Other => return None,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for RawCount {
    fn from(value: f64) -> Self {
        RawCount::Number(value)
    }
}

impl From<u32> for RawCount {
    fn from(value: u32) -> Self {
        RawCount::Number(value as f64)
    }
}

impl From<&str> for RawCount {
    fn from(value: &str) -> Self {
        RawCount::Text(value.to_string())
    }
}

impl Serialize for RawCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RawCount::Number(n) => serializer.serialize_f64(*n),
            RawCount::Flag(b) => serializer.serialize_bool(*b),
            RawCount::Text(text) => serializer.serialize_str(text),
            RawCount::Other => serializer.serialize_unit(),
        }
    }
}

impl<'de> Deserialize<'de> for RawCount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RawCountVisitor;

        impl<'de> Visitor<'de> for RawCountVisitor {
            type Value = RawCount;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("any JSON value")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<RawCount, E> {
                Ok(RawCount::Flag(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<RawCount, E> {
                Ok(RawCount::Number(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<RawCount, E> {
                Ok(RawCount::Number(v as f64))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<RawCount, E> {
                Ok(RawCount::Number(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<RawCount, E> {
                Ok(RawCount::Text(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<RawCount, E> {
                Ok(RawCount::Text(v))
            }

            fn visit_unit<E: de::Error>(self) -> Result<RawCount, E> {
                Ok(RawCount::Other)
            }

            fn visit_none<E: de::Error>(self) -> Result<RawCount, E> {
                Ok(RawCount::Other)
            }

            fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<RawCount, D::Error> {
                RawCount::deserialize(d)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<RawCount, A::Error> {
                while seq.next_element::<IgnoredAny>()?.is_some() {}
                Ok(RawCount::Other)
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawCount, A::Error> {
                while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
                Ok(RawCount::Other)
            }
        }

        deserializer.deserialize_any(RawCountVisitor)
    }
}

/// Drink type key (as stored, possibly unrecognized) to count.
pub type DrinksRecord = BTreeMap<String, RawCount>;

/// Millisecond timestamp key (as stored, possibly malformed) to the drinks
/// logged at that instant.
pub type DrinksList = BTreeMap<String, DrinksRecord>;

/// Standard drink units per one count of each drink type. Partial tables are
/// fine; missing types contribute nothing.
pub type DrinksToUnits = BTreeMap<DrinkKey, f64>;

/// Default unit weights for a fresh config.
pub fn default_drinks_to_units() -> DrinksToUnits {
    BTreeMap::from([
        (DrinkKey::SmallBeer, 0.5),
        (DrinkKey::Beer, 1.0),
        (DrinkKey::Cocktail, 1.5),
        (DrinkKey::Other, 1.0),
        (DrinkKey::StrongShot, 1.0),
        (DrinkKey::WeakShot, 0.5),
        (DrinkKey::Wine, 1.0),
    ])
}

/// Aggregate for one user on one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRollup {
    pub user_id: String,
    pub date_key: String,
    pub total_sdu: f64,
    pub drinks_count: u32,
    pub by_type: BTreeMap<DrinkKey, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_ts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ts: Option<String>,
}

impl DayRollup {
    pub fn empty(user_id: &str, date_key: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            date_key: date_key.to_string(),
            total_sdu: 0.0,
            drinks_count: 0,
            by_type: BTreeMap::new(),
            first_ts: None,
            last_ts: None,
        }
    }

    /// Widen the first/last window to include `time`. Localized times are
    /// zero-padded, so string order is chronological order.
    pub fn record_time(&mut self, time: &str) {
        match &self.first_ts {
            Some(first) if first.as_str() <= time => {}
            _ => self.first_ts = Some(time.to_string()),
        }
        match &self.last_ts {
            Some(last) if last.as_str() >= time => {}
            _ => self.last_ts = Some(time.to_string()),
        }
    }
}

/// One weekly bar of the per-type stacked chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackedPoint {
    /// `"<weekNumber>-<year>"`
    pub x: String,
    pub segments: BTreeMap<DrinkKey, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub today_sdu: f64,
    pub drinks_today: u32,
    pub week_sdu: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_vs_prev_pct: Option<f64>,
}

/// First day of the week for week windows and weekly buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl WeekStart {
    pub fn weekday(&self) -> Weekday {
        match self {
            WeekStart::Monday => Weekday::Mon,
            WeekStart::Tuesday => Weekday::Tue,
            WeekStart::Wednesday => Weekday::Wed,
            WeekStart::Thursday => Weekday::Thu,
            WeekStart::Friday => Weekday::Fri,
            WeekStart::Saturday => Weekday::Sat,
            WeekStart::Sunday => Weekday::Sun,
        }
    }
}

impl fmt::Display for WeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WeekStart::Monday => "monday",
            WeekStart::Tuesday => "tuesday",
            WeekStart::Wednesday => "wednesday",
            WeekStart::Thursday => "thursday",
            WeekStart::Friday => "friday",
            WeekStart::Saturday => "saturday",
            WeekStart::Sunday => "sunday",
        };
        f.write_str(name)
    }
}

impl FromStr for WeekStart {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monday" | "mon" => Ok(WeekStart::Monday),
            "tuesday" | "tue" => Ok(WeekStart::Tuesday),
            "wednesday" | "wed" => Ok(WeekStart::Wednesday),
            "thursday" | "thu" => Ok(WeekStart::Thursday),
            "friday" | "fri" => Ok(WeekStart::Friday),
            "saturday" | "sat" => Ok(WeekStart::Saturday),
            "sunday" | "sun" => Ok(WeekStart::Sunday),
            _ => Err(()),
        }
    }
}
