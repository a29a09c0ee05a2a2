//! # vsp-id
//!
//! Identity reconciliation between provisioning requests, vSphere VMs and the
//! machines that boot from them.
//!
//! ## Request identity
//!
//! A VM is created under the request ID verbatim, and the same string is baked
//! into the machine's hostname patch. Any divergence between the two means the
//! booted machine is never linked back to its request:
//!
//! ```text
//! request ID  talos-test-workers-4f2l8w
//! VM name     talos-test-workers-4f2l8w
//! hostname    talos-test-workers-4f2l8w
//! ```
//!
//! ## Hardware UUIDs
//!
//! vSphere reports the BIOS UUID with the first three groups in a different byte
//! order than the one the booted machine's agent reads from SMBIOS:
//!
//! ```text
//! vSphere  422413c3-57c8-96d1-c481-c58dbb837d2d
//! agent    c3132442-c857-d196-c481-c58dbb837d2d
//! ```
//!
//! The last two groups (clock sequence and node) are identical in both forms.

mod error;
mod hardware;
mod macros;
mod types;

pub use error::IdError;
pub use hardware::{
    decode_uuid, translate_to_agent_format, AgentUuid, HypervisorUuid, UUID_HEX_LEN,
};
pub use types::*;

/// Re-export uuid for consumers that need raw UUID operations
pub use ::uuid::Uuid;
