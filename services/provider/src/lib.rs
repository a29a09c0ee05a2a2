//! vSphere infrastructure provider library.
//!
//! The provider turns machine requests from the orchestrator into vSphere
//! VMs, and reports back a machine UUID the orchestrator can match against
//! the machine once it boots.
//!
//! ## Identity
//!
//! Two invariants keep a booted machine linked to its request:
//!
//! - The VM name and the machine's hostname are the request ID, verbatim
//! - The reported UUID is vSphere's BIOS UUID with its first three groups
//!   byte-swapped, which is what the machine's agent reads at runtime
//!
//! Both live in `vsp-id`; this crate wires them into the provisioning flow.
//!
//! ## Modules
//!
//! - `config`: YAML configuration and startup validation
//! - `context`: Narrow view over a machine request and its status
//! - `hypervisor`: Hypervisor interface and mock implementation
//! - `provision`: The provisioning flow
//! - `request`: Machine request, status and provider data types

pub mod config;
pub mod context;
pub mod error;
pub mod hypervisor;
pub mod provision;
pub mod request;

// Re-export commonly used types
pub use config::{Config, ConfigError, VSphereConfig};
pub use context::{ConnectionParams, ProvisionContext, RequestContext};
pub use error::ProviderError;
pub use hypervisor::{Hypervisor, HypervisorError, MockHypervisor};
pub use provision::{ProvisionOutcome, Provisioner};
pub use request::{ProviderData, ProvisioningRequest, ProvisioningStatus};
