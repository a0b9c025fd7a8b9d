use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ledgerseed_eval::ValidateOptions;
use ledgerseed_generate::{GenerateOptions, RowTargets};

use crate::CliError;

/// Contents of a `ledgerseed.toml` settings file.
///
/// Every field is optional; command-line flags and environment variables
/// take precedence over the file, and built-in defaults fill the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub seed: Option<u64>,
    pub today: Option<NaiveDate>,
    /// JSON schema file; the built-in banking schema when unset.
    pub schema: Option<PathBuf>,
    pub expected_fingerprint: Option<String>,
    pub strict: Option<bool>,
    pub targets: TargetOverrides,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetOverrides {
    pub branches: Option<usize>,
    pub customers: Option<usize>,
    pub employees: Option<usize>,
    pub accounts: Option<usize>,
}

impl TargetOverrides {
    fn or(self, fallback: Self) -> Self {
        Self {
            branches: self.branches.or(fallback.branches),
            customers: self.customers.or(fallback.customers),
            employees: self.employees.or(fallback.employees),
            accounts: self.accounts.or(fallback.accounts),
        }
    }

    fn resolve(self) -> RowTargets {
        let defaults = RowTargets::default();
        RowTargets {
            branches: self.branches.unwrap_or(defaults.branches),
            customers: self.customers.unwrap_or(defaults.customers),
            employees: self.employees.unwrap_or(defaults.employees),
            accounts: self.accounts.unwrap_or(defaults.accounts),
        }
    }
}

impl FileConfig {
    /// Field-wise merge where `self` wins.
    pub fn or(self, fallback: FileConfig) -> FileConfig {
        FileConfig {
            seed: self.seed.or(fallback.seed),
            today: self.today.or(fallback.today),
            schema: self.schema.or(fallback.schema),
            expected_fingerprint: self.expected_fingerprint.or(fallback.expected_fingerprint),
            strict: self.strict.or(fallback.strict),
            targets: self.targets.or(fallback.targets),
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfig, CliError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<FileConfig, CliError> {
    Ok(toml::from_str(content)?)
}

/// Fully resolved settings for one run, recorded in the run's `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSettings {
    pub seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub today: Option<NaiveDate>,
    pub targets: RowTargets,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_fingerprint: Option<String>,
    pub strict: bool,
}

impl RunSettings {
    pub fn resolve(overrides: FileConfig, file: FileConfig) -> Result<Self, CliError> {
        let merged = overrides.or(file);
        if let Some(fingerprint) = &merged.expected_fingerprint {
            if fingerprint.len() != 64 || !fingerprint.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(CliError::InvalidConfig(format!(
                    "expected fingerprint must be 64 hex characters, got '{fingerprint}'"
                )));
            }
        }

        Ok(Self {
            seed: merged.seed.unwrap_or(GenerateOptions::DEFAULT_SEED),
            today: merged.today,
            targets: merged.targets.resolve(),
            schema: merged.schema,
            expected_fingerprint: merged
                .expected_fingerprint
                .map(|fingerprint| fingerprint.to_ascii_lowercase()),
            strict: merged.strict.unwrap_or(false),
        })
    }

    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            seed: self.seed,
            targets: self.targets,
            today: self.today,
        }
    }

    /// Validation uses the generation run's anchor date so relative checks line up.
    pub fn validate_options(&self, today: NaiveDate) -> ValidateOptions {
        ValidateOptions {
            today: Some(today),
            expected_fingerprint: self.expected_fingerprint.clone(),
            strict: self.strict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_fill_gaps_left_by_flags() {
        let file = parse_config(
            r#"
            seed = 7
            today = "2024-06-15"

            [targets]
            customers = 25
            accounts = 40
            "#,
        )
        .unwrap();
        let flags = FileConfig {
            targets: TargetOverrides {
                accounts: Some(10),
                ..TargetOverrides::default()
            },
            ..FileConfig::default()
        };

        let settings = RunSettings::resolve(flags, file).unwrap();
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.today, NaiveDate::from_ymd_opt(2024, 6, 15));
        assert_eq!(settings.targets.customers, 25);
        assert_eq!(settings.targets.accounts, 10);
        assert_eq!(settings.targets.branches, RowTargets::DEFAULT_ROWS);
        assert!(!settings.strict);
    }

    #[test]
    fn defaults_apply_without_any_input() {
        let settings = RunSettings::resolve(FileConfig::default(), FileConfig::default()).unwrap();
        assert_eq!(settings.seed, 42);
        assert_eq!(settings.targets, RowTargets::default());
        assert_eq!(settings.generate_options().targets, RowTargets::uniform(500));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_config("seeds = 3").unwrap_err();
        assert!(matches!(err, CliError::Toml(_)));
    }

    #[test]
    fn malformed_fingerprint_is_invalid_config() {
        let flags = FileConfig {
            expected_fingerprint: Some("abc".to_string()),
            ..FileConfig::default()
        };
        let err = RunSettings::resolve(flags, FileConfig::default()).unwrap_err();
        assert!(matches!(err, CliError::InvalidConfig(_)));
    }
}
