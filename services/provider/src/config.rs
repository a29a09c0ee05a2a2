//! Configuration for the provider.
//!
//! Loaded once at startup from a YAML file:
//!
//! ```yaml
//! vsphere:
//!   uri: https://vcenter.example.com/sdk
//!   user: administrator@vsphere.local
//!   password: secret
//!   insecureSkipVerify: false
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors. All of them are fatal to startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required connection field is absent or blank.
    #[error("missing required config field: vsphere.{field}")]
    MissingField { field: &'static str },

    /// The config file could not be read.
    #[error("failed to read config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl ConfigError {
    /// The missing field name, if this is a missing-field error.
    pub fn missing_field(&self) -> Option<&'static str> {
        match self {
            ConfigError::MissingField { field } => Some(field),
            _ => None,
        }
    }
}

/// Provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// vSphere connection settings.
    pub vsphere: VSphereConfig,
}

/// vSphere connection settings.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VSphereConfig {
    /// vCenter SDK endpoint.
    pub uri: String,

    /// Login user.
    pub user: String,

    /// Login password.
    pub password: String,

    /// Skip TLS certificate verification.
    pub insecure_skip_verify: bool,
}

// Keep the password out of logs.
impl std::fmt::Debug for VSphereConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VSphereConfig")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .finish()
    }
}

impl VSphereConfig {
    /// Check that all required connection fields are present.
    ///
    /// Fields are checked in a fixed order (`uri`, `user`, `password`) and the
    /// first missing one is reported.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("uri", &self.uri),
            ("user", &self.user),
            ("password", &self.password),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField { field });
            }
        }

        Ok(())
    }
}

impl Config {
    /// Parse configuration from a YAML document.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&contents)
    }

    /// Load and validate configuration.
    pub fn load_validated(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the whole configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.vsphere.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn vsphere(uri: &str, user: &str, password: &str, insecure: bool) -> VSphereConfig {
        VSphereConfig {
            uri: uri.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            insecure_skip_verify: insecure,
        }
    }

    #[rstest]
    #[case::empty_uri("", "admin", "secret", "uri")]
    #[case::empty_user("https://vcenter/sdk", "", "secret", "user")]
    #[case::empty_password("https://vcenter/sdk", "admin", "", "password")]
    #[case::all_empty_reports_uri_first("", "", "", "uri")]
    #[case::blank_user("https://vcenter/sdk", "   ", "", "user")]
    fn test_missing_field(
        #[case] uri: &str,
        #[case] user: &str,
        #[case] password: &str,
        #[case] expected: &str,
    ) {
        let err = vsphere(uri, user, password, false).validate().unwrap_err();
        assert_eq!(err.missing_field(), Some(expected));
        assert!(err.to_string().contains(expected));
    }

    #[rstest]
    fn test_complete_config_is_valid(#[values(true, false)] insecure: bool) {
        vsphere("https://vcenter/sdk", "admin", "secret", insecure)
            .validate()
            .unwrap();
    }

    #[test]
    fn test_parse_yaml() {
        let config = Config::from_yaml(
            r#"
vsphere:
  uri: https://vcenter.example.com/sdk
  user: administrator@vsphere.local
  password: secret
  insecureSkipVerify: true
"#,
        )
        .unwrap();

        assert_eq!(config.vsphere.uri, "https://vcenter.example.com/sdk");
        assert_eq!(config.vsphere.user, "administrator@vsphere.local");
        assert_eq!(config.vsphere.password, "secret");
        assert!(config.vsphere.insecure_skip_verify);
        config.validate().unwrap();
    }

    #[test]
    fn test_insecure_defaults_to_false() {
        let config = Config::from_yaml(
            r#"
vsphere:
  uri: https://vcenter.example.com/sdk
  user: admin
  password: secret
"#,
        )
        .unwrap();

        assert!(!config.vsphere.insecure_skip_verify);
    }

    #[test]
    fn test_missing_field_in_yaml_is_validation_error() {
        let config = Config::from_yaml(
            r#"
vsphere:
  uri: https://vcenter.example.com/sdk
  password: secret
"#,
        )
        .unwrap();

        let err = config.validate().unwrap_err();
        assert_eq!(err.missing_field(), Some("user"));
    }

    #[test]
    fn test_missing_vsphere_section_is_parse_error() {
        let err = Config::from_yaml("other: {}\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", vsphere("https://vcenter/sdk", "admin", "hunter2", false));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
