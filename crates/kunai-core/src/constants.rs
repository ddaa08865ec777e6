/// Application name, used for the config file and environment prefix.
pub const APP_NAME: &str = "kunai";

/// Optional TOML configuration file read at startup.
pub const CONFIG_FILE_NAME: &str = const_str::concat!(APP_NAME, ".toml");

/// Prefix for environment overrides (`KUNAI__LOGGING__LEVEL=info`).
pub const ENV_PREFIX: &str = "KUNAI";

/// Group assigned to trigger and job keys created without one.
pub const DEFAULT_GROUP: &str = "DEFAULT";

/// Priority assigned to triggers created without one.
pub const DEFAULT_PRIORITY: i32 = 5;

/// Consecutive empty periods (or excluded candidates) tolerated before a
/// rule is declared unsatisfiable.
pub const DEFAULT_MAX_EMPTY_PERIODS: u32 = 1000;

/// How late a fire time may be before the host treats it as misfired.
pub const DEFAULT_MISFIRE_THRESHOLD_MS: u32 = 60_000;

/// Number of fire times printed by the preview tool.
pub const DEFAULT_PREVIEW_COUNT: u32 = 10;
