use std::{env, error::Error, fmt, num::NonZeroUsize, path::PathBuf, str::FromStr};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";
const DEFAULT_WINDOW_SIZE: NonZeroUsize = NonZeroUsize::new(60).unwrap();
const DEFAULT_TRAIN_SPLIT: f64 = 0.8;
const DEFAULT_MAX_CONCURRENT_JOBS: NonZeroUsize = NonZeroUsize::MIN;
const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// An environment variable held a value that couldn't be used.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: &'static str,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}={:?}: {}", self.var, self.value, self.reason)
    }
}

impl Error for ConfigError {}

/// Where training and prediction fetch their price history from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSourceKind {
    Yahoo,
    /// Deterministic synthetic series, no network access.
    Memory,
}

impl FromStr for DataSourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yahoo" => Ok(Self::Yahoo),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

/// The service configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub artifacts_dir: PathBuf,
    pub window_size: NonZeroUsize,
    pub train_split: f64,
    pub max_concurrent_jobs: NonZeroUsize,
    pub data_source: DataSourceKind,
    pub yahoo_base_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            window_size: DEFAULT_WINDOW_SIZE,
            train_split: DEFAULT_TRAIN_SPLIT,
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            data_source: DataSourceKind::Yahoo,
            yahoo_base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Reads the configuration from the process environment, falling back to the defaults for
    /// every unset variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Builds the configuration reading every variable through `lookup`.
    ///
    /// # Arguments
    /// * `lookup` - Returns the value of a variable, if set.
    ///
    /// # Returns
    /// The configuration or the first variable that failed to parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let train_split = parse(&lookup, "TRAIN_SPLIT", defaults.train_split)?;
        if !(train_split > 0. && train_split < 1.) {
            return Err(ConfigError {
                var: "TRAIN_SPLIT",
                value: train_split.to_string(),
                reason: "must be within (0, 1)",
            });
        }

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse(&lookup, "PORT", defaults.port)?,
            artifacts_dir: lookup("ARTIFACTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifacts_dir),
            window_size: parse(&lookup, "WINDOW_SIZE", defaults.window_size)?,
            train_split,
            max_concurrent_jobs: parse(&lookup, "MAX_CONCURRENT_JOBS", defaults.max_concurrent_jobs)?,
            data_source: parse(&lookup, "DATA_SOURCE", defaults.data_source)?,
            yahoo_base_url: lookup("YAHOO_BASE_URL").unwrap_or(defaults.yahoo_base_url),
        })
    }

    /// Returns the address the server binds to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(value) = lookup(var) else {
        return Ok(default);
    };

    value.trim().parse().map_err(|_| ConfigError {
        var,
        value,
        reason: "could not be parsed",
    })
}
