use anyhow::Result;
use chrono::{DateTime, Utc};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder};
use serde::Deserialize;

use crate::constants::{
    CONFIG_FILE_NAME, DEFAULT_GROUP, DEFAULT_MAX_EMPTY_PERIODS, DEFAULT_MISFIRE_THRESHOLD_MS,
    DEFAULT_PREVIEW_COUNT, DEFAULT_PRIORITY, ENV_PREFIX,
};
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub logging: LoggingConfig,
    pub expansion: ExpansionConfig,
    pub misfire: MisfireConfig,
    pub scheduler: SchedulerConfig,
    pub preview: PreviewConfig,
    #[serde(default)]
    pub triggers: Vec<TriggerSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpansionConfig {
    /// Consecutive empty periods tolerated before a rule is reported as
    /// unsatisfiable.
    pub max_empty_periods: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MisfireConfig {
    pub threshold_ms: u64,
}

impl MisfireConfig {
    /// ## Summary
    /// Returns the misfire threshold as a `chrono` delta.
    #[must_use]
    pub fn threshold(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::milliseconds(i64::try_from(self.threshold_ms).unwrap_or(i64::MAX))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Zone used for triggers that do not name one.
    pub time_zone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    pub count: usize,
    pub format: PreviewFormat,
}

/// Trigger definition as it appears in configuration, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerSettings {
    pub name: String,
    #[serde(default = "default_group")]
    pub group: String,
    pub job: String,
    #[serde(default = "default_group")]
    pub job_group: String,
    pub rule: String,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default = "default_repeat_count")]
    pub repeat_count: i32,
    #[serde(default)]
    pub misfire_instruction: i32,
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

const fn default_repeat_count() -> i32 {
    -1
}

const fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

impl Settings {
    /// ## Summary
    /// Returns a configuration builder seeded with every default value.
    ///
    /// ## Errors
    /// Returns an error if a default cannot be stored.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("logging.level", "info")?
            .set_default(
                "expansion.max_empty_periods",
                i64::from(DEFAULT_MAX_EMPTY_PERIODS),
            )?
            .set_default(
                "misfire.threshold_ms",
                i64::from(DEFAULT_MISFIRE_THRESHOLD_MS),
            )?
            .set_default("scheduler.time_zone", "UTC")?
            .set_default("preview.count", i64::from(DEFAULT_PREVIEW_COUNT))?
            .set_default("preview.format", "text")?)
    }

    /// ## Summary
    /// Loads configuration from environment variables and an optional
    /// `kunai.toml`. Environment variables take precedence over file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Self::defaults()?
            // TOML file
            .add_source(config::File::with_name(CONFIG_FILE_NAME).required(false))
            // Env
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Settings>()?)
    }

    /// ## Summary
    /// Checks values that deserialize fine but cannot drive a scheduler.
    ///
    /// ## Errors
    /// Returns `CoreError::ValidationError` for a zero empty-period bound, a
    /// zero preview count or a trigger entry without a name or rule.
    pub fn validate(&self) -> CoreResult<()> {
        if self.expansion.max_empty_periods == 0 {
            return Err(CoreError::ValidationError(
                "expansion.max_empty_periods must be positive".to_string(),
            ));
        }
        if self.preview.count == 0 {
            return Err(CoreError::ValidationError(
                "preview.count must be positive".to_string(),
            ));
        }
        if let Some(entry) = self
            .triggers
            .iter()
            .find(|t| t.name.trim().is_empty() || t.rule.trim().is_empty())
        {
            return Err(CoreError::ValidationError(format!(
                "trigger entry for job '{}' needs a name and a rule",
                entry.job
            )));
        }
        Ok(())
    }

    /// ## Summary
    /// Builds settings from an in-memory TOML document layered over defaults.
    ///
    /// ## Errors
    /// Returns an error if the document is not valid TOML or does not match
    /// the settings schema.
    pub fn from_toml(document: &str) -> Result<Self> {
        Ok(Self::defaults()?
            .add_source(config::File::from_str(document, config::FileFormat::Toml))
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading, deserializing or validating the
/// configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    settings.validate()?;
    Ok(settings)
}
