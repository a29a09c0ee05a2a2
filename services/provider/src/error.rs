//! Error types for provisioning.

use thiserror::Error;
use vsp_id::IdError;
use vsp_reconcile::ReconcileError;

use crate::config::ConfigError;
use crate::hypervisor::HypervisorError;

/// Provisioning errors with standardized reason codes.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Configuration is incomplete or unreadable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The request's provider data is not valid JSON for the expected shape.
    #[error("invalid provider data for request {request_id}: {source}")]
    InvalidProviderData {
        request_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// The hostname patch could not be rendered.
    #[error("failed to render boot config for {instance}: {source}")]
    BootConfig {
        instance: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A hypervisor call failed.
    #[error("hypervisor call for {instance} failed: {source}")]
    Hypervisor {
        instance: String,
        #[source]
        source: HypervisorError,
    },

    /// The VM exists but has no hardware UUID yet.
    #[error("hardware UUID not yet available for {instance}")]
    UuidUnavailable { instance: String },

    /// The hardware UUID reported by the hypervisor is malformed.
    #[error("cannot translate hardware UUID of {instance}: {source}")]
    Translation {
        instance: String,
        #[source]
        source: IdError,
    },

    /// The status already carries a different machine UUID.
    #[error("machine UUID mismatch for request {request_id}: status has {reported}, VM reports {derived}")]
    UuidMismatch {
        request_id: String,
        reported: String,
        derived: String,
    },

    /// Retries for the request were used up.
    #[error(transparent)]
    Exhausted(#[from] ReconcileError),
}

impl ProviderError {
    /// Get the standardized reason code for this error.
    pub fn reason_code(&self) -> &'static str {
        match self {
            ProviderError::Config(ConfigError::MissingField { .. }) => "config_missing_field",
            ProviderError::Config(_) => "config_invalid",
            ProviderError::InvalidProviderData { .. } => "invalid_provider_data",
            ProviderError::BootConfig { .. } => "boot_config_failed",
            ProviderError::Hypervisor { .. } => "hypervisor_failed",
            ProviderError::UuidUnavailable { .. } => "uuid_unavailable",
            ProviderError::Translation {
                source: IdError::InvalidLength { .. },
                ..
            } => "uuid_invalid_length",
            ProviderError::Translation { .. } => "uuid_invalid_encoding",
            ProviderError::UuidMismatch { .. } => "uuid_mismatch",
            ProviderError::Exhausted(_) => "retries_exhausted",
        }
    }

    /// Returns true if re-running the provisioning step may succeed.
    ///
    /// UUID decode failures count as retryable: the input came from the
    /// hypervisor, and re-querying it is the only way to get a different one.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Hypervisor { source, .. } => source.is_transient(),
            ProviderError::UuidUnavailable { .. } => true,
            ProviderError::Translation { source, .. } => source.is_uuid_error(),
            _ => false,
        }
    }
}
