//! Application-level configuration loading, including the spectrum label pairs.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};
use tracing::{info, warn};

use crate::dao::models::SpectrumPairEntity;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "WAVELENGTH_BACK_CONFIG_PATH";
/// Countdown advertised to clients before they trigger the forced advance.
pub const DEFAULT_GUESS_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    spectrum_pairs: Vec<SpectrumPairEntity>,
    guess_timeout: Duration,
}

impl AppConfig {
    /// Build a configuration from explicit values.
    pub fn new(spectrum_pairs: Vec<SpectrumPairEntity>, guess_timeout: Duration) -> Self {
        Self {
            spectrum_pairs,
            guess_timeout,
        }
    }

    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        pairs = app_config.spectrum_pairs.len(),
                        guess_timeout_secs = app_config.guess_timeout.as_secs(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Label pairs drawn alongside every new target.
    pub fn spectrum_pairs(&self) -> &[SpectrumPairEntity] {
        &self.spectrum_pairs
    }

    /// Countdown clients run before calling the forced advance.
    pub fn guess_timeout(&self) -> Duration {
        self.guess_timeout
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new(default_spectrum_pairs(), DEFAULT_GUESS_TIMEOUT)
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    spectrum_pairs: Option<Vec<RawSpectrumPair>>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    #[serde(default)]
    guess_timeout_secs: Option<Duration>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let spectrum_pairs = match value.spectrum_pairs {
            Some(pairs) if !pairs.is_empty() => pairs.into_iter().map(Into::into).collect(),
            _ => default_spectrum_pairs(),
        };
        Self::new(
            spectrum_pairs,
            value.guess_timeout_secs.unwrap_or(DEFAULT_GUESS_TIMEOUT),
        )
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single `{left, right}` entry.
struct RawSpectrumPair {
    left: String,
    right: String,
}

impl From<RawSpectrumPair> for SpectrumPairEntity {
    fn from(value: RawSpectrumPair) -> Self {
        Self {
            left: value.left,
            right: value.right,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in label pairs shipped with the binary.
fn default_spectrum_pairs() -> Vec<SpectrumPairEntity> {
    [
        ("Cold", "Hot"),
        ("Useless", "Useful"),
        ("Underrated", "Overrated"),
        ("Easy to spell", "Hard to spell"),
        ("Quiet", "Loud"),
        ("Boring", "Exciting"),
        ("Cheap", "Expensive"),
        ("Healthy food", "Junk food"),
    ]
    .into_iter()
    .map(|(left, right)| SpectrumPairEntity {
        left: left.into(),
        right: right.into(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_and_timeout() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"spectrum_pairs":[{"left":"Dark","right":"Light"}],"guess_timeout_secs":45}"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(
            config.spectrum_pairs(),
            &[SpectrumPairEntity {
                left: "Dark".into(),
                right: "Light".into()
            }]
        );
        assert_eq!(config.guess_timeout(), Duration::from_secs(45));
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let raw: RawConfig = serde_json::from_str("{}").unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.guess_timeout(), DEFAULT_GUESS_TIMEOUT);
        assert_eq!(config.spectrum_pairs()[0].left, "Cold");
        assert_eq!(config.spectrum_pairs()[0].right, "Hot");
    }
}
