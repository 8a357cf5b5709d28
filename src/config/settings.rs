use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::agents::CusumOptions;
use crate::ml::SolverOptions;

pub const DEFAULT_CONFIG_FILE: &str = "ta-agents.toml";
pub const ENV_PREFIX: &str = "TA_AGENTS";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub classifier: SolverOptions,
    pub cusum: CusumOptions,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Decimal places kept by the safe strategy wrapper.
    pub decimals: u32,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self { decimals: 4 }
    }
}

impl Settings {
    /// Defaults, then the TOML file, then `TA_AGENTS_*` variables
    /// (`TA_AGENTS_CLASSIFIER__MAX_ITER=200`). An explicit `path` must exist;
    /// the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).format(config::FileFormat::Toml).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE)
                .format(config::FileFormat::Toml)
                .required(false),
        };

        let builder = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            ));
        }

        // Classifier
        if !(self.classifier.c > 0.0) {
            errors.push("classifier.c must be > 0".to_string());
        }
        if self.classifier.max_iter == 0 {
            errors.push("classifier.max_iter must be > 0".to_string());
        }
        if !(self.classifier.tol > 0.0) {
            errors.push("classifier.tol must be > 0".to_string());
        }

        // CUSUM
        if !(self.cusum.threshold > 0.0) {
            errors.push("cusum.threshold must be > 0".to_string());
        }
        if !(self.cusum.drift >= 0.0) {
            errors.push("cusum.drift must be >= 0".to_string());
        }
        if self.cusum.window < 2 {
            errors.push("cusum.window must be >= 2".to_string());
        }
        if self.cusum.min_rows < 2 {
            errors.push("cusum.min_rows must be >= 2".to_string());
        }

        if self.output.decimals > 10 {
            errors.push("output.decimals must be <= 10".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.classifier.c, 1.0);
        assert_eq!(settings.classifier.max_iter, 100);
        assert_eq!(settings.cusum.window, 250);
        assert_eq!(settings.output.decimals, 4);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_serialization() {
        let settings = Settings::default();
        let toml_str = toml::to_string(&settings).expect("Failed to serialize to TOML");
        let back: Settings = toml::from_str(&toml_str).expect("Failed to deserialize from TOML");
        assert_eq!(back, settings);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str("[cusum]\nwindow = 100\n").unwrap();
        assert_eq!(settings.cusum.window, 100);
        assert_eq!(settings.cusum.min_rows, 5);
        assert_eq!(settings.classifier, SolverOptions::default());
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let mut settings = Settings::default();
        settings.logging.level = "loud".to_string();
        settings.classifier.c = 0.0;
        settings.classifier.tol = f64::NAN;
        settings.cusum.drift = -1.0;
        settings.cusum.window = 1;
        settings.output.decimals = 11;
        let errors = settings.validate().unwrap_err();
        assert_eq!(errors.len(), 6);
        assert!(errors.iter().any(|e| e.contains("cusum.window")));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("ta-agents-settings-{}.toml", std::process::id()));
        fs::write(&path, "[classifier]\nc = 0.5\n\n[output]\ndecimals = 2\n").unwrap();
        let settings = Settings::load(Some(&path)).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(settings.classifier.c, 0.5);
        assert_eq!(settings.classifier.max_iter, 100);
        assert_eq!(settings.output.decimals, 2);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("ta-agents-does-not-exist.toml");
        assert!(Settings::load(Some(&path)).is_err());
    }
}
