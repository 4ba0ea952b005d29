use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::timezone::TimezoneSetting;
use crate::types::{DrinkKey, DrinksToUnits, WeekStart, default_drinks_to_units};
use crate::utils;
use crate::weekly::DEFAULT_WEEKS;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub timezone: TimezoneConfig,
    pub analytics: AnalyticsConfig,
    /// Drink type name to standard drink units per drink
    pub units: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimezoneConfig {
    pub selected: String,
    pub automatic: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalyticsConfig {
    pub weeks: usize,
    pub week_start: WeekStart,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: TimezoneConfig {
                selected: "UTC".to_string(),
                automatic: true,
            },
            analytics: AnalyticsConfig {
                weeks: DEFAULT_WEEKS,
                week_start: WeekStart::Monday,
            },
            units: default_drinks_to_units()
                .into_iter()
                .map(|(drink, weight)| (drink.to_string(), weight))
                .collect(),
        }
    }
}

thread_local! {
    static TEST_CONFIG_PATH: RefCell<Option<PathBuf>> = const { RefCell::new(None) };
}

#[cfg(test)]
pub fn set_test_config_path(path: PathBuf) {
    TEST_CONFIG_PATH.with(|p| *p.borrow_mut() = Some(path));
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(test)]
        {
            if let Some(path) = TEST_CONFIG_PATH.with(|p| p.borrow().clone()) {
                return Ok(path);
            }
        }

        Ok(dirs::home_dir()
            .context("Could not find home directory")?
            .join(".drink-rollup.toml"))
    }

    pub fn load() -> Result<Option<Config>> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        Ok(Some(config))
    }

    pub fn save(&self, silent: bool) -> Result<()> {
        let config_path = Self::config_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, content).context("Failed to write config file")?;

        if !silent {
            println!("✅ Configuration saved to: {}", config_path.display());
        }

        Ok(())
    }

    pub fn timezone_setting(&self) -> TimezoneSetting {
        TimezoneSetting {
            selected: self.timezone.selected.clone(),
            automatic: self.timezone.automatic,
        }
    }

    /// The unit table, minus entries naming unknown drink types.
    pub fn drinks_to_units(&self) -> DrinksToUnits {
        self.units
            .iter()
            .filter_map(|(name, weight)| match name.parse::<DrinkKey>() {
                Ok(drink) => Some((drink, *weight)),
                Err(_) => {
                    utils::warn_once(format!(
                        "Ignoring unit weight for unknown drink type '{name}'"
                    ));
                    None
                }
            })
            .collect()
    }

    pub fn set_timezone(&mut self, zone: &str) -> Result<()> {
        zone.parse::<Tz>()
            .map_err(|_| anyhow::anyhow!("Unknown timezone: {zone}"))?;
        self.timezone.selected = zone.to_string();
        Ok(())
    }

    pub fn set_weeks(&mut self, weeks: usize) -> Result<()> {
        if weeks == 0 {
            anyhow::bail!("Invalid number value: weeks must be at least 1");
        }
        self.analytics.weeks = weeks;
        Ok(())
    }

    pub fn set_unit(&mut self, drink: DrinkKey, weight: f64) -> Result<()> {
        if !weight.is_finite() || weight <= 0.0 {
            anyhow::bail!("Invalid number value: unit weights must be positive");
        }
        self.units.insert(drink.to_string(), weight);
        Ok(())
    }
}

// CLI helper functions
pub fn create_default_config(overwrite: bool) -> Result<()> {
    let config = Config::default();
    if !std::fs::exists(Config::config_path()?)? || overwrite {
        config.save(true)?;

        println!("📝 Created default configuration file.");
        println!("📍 Set your timezone with:");
        println!("   drink-rollup config set timezone Europe/Prague");
        println!("or edit");
        println!("   {}", Config::config_path()?.display());
    } else {
        println!("Configuration already exists.  Pass `--overwrite` to overwrite.");
    }

    Ok(())
}

pub fn show_config() -> Result<()> {
    match Config::load()? {
        Some(config) => {
            println!("🔧 Current configuration:");
            println!("   Timezone: {}", config.timezone.selected);
            println!("   Automatic Timezone: {}", config.timezone.automatic);
            println!("   Weeks: {}", config.analytics.weeks);
            println!("   Week Start: {}", config.analytics.week_start);
            for (drink, weight) in &config.units {
                println!("   Units ({drink}): {weight}");
            }
        }
        None => {
            println!("❌ No configuration file found.");
            println!("   Run 'drink-rollup config init' to create one.");
        }
    }
    Ok(())
}

pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?.unwrap_or_default();

    match key {
        "timezone" => config.set_timezone(value)?,
        "timezone-automatic" => {
            let enabled = value
                .parse::<bool>()
                .context("Invalid boolean value. Use 'true' or 'false'")?;
            config.timezone.automatic = enabled;
        }
        "weeks" => {
            let weeks = value.parse::<usize>().context("Invalid number value")?;
            config.set_weeks(weeks)?;
        }
        "week-start" => {
            let week_start = value
                .parse::<WeekStart>()
                .map_err(|_| anyhow::anyhow!("Invalid weekday: {value}"))?;
            config.analytics.week_start = week_start;
        }
        _ => match key.strip_prefix("unit.") {
            Some(drink) => {
                let drink = drink
                    .parse::<DrinkKey>()
                    .map_err(|_| anyhow::anyhow!("Unknown drink type: {drink}"))?;
                let weight = value.parse::<f64>().context("Invalid number value")?;
                config.set_unit(drink, weight)?;
            }
            None => anyhow::bail!("Unknown config key: {}", key),
        },
    }

    config.save(false)?;
    Ok(())
}
