//! Hypervisor interface and mock implementation.
//!
//! The hypervisor interface abstracts the vSphere operations the provider
//! needs:
//! - Creating (cloning) a VM under a given name
//! - Reading the VM's BIOS UUID once it exists
//! - Destroying a VM
//!
//! A mock implementation is provided for testing and development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use vsp_id::{HypervisorUuid, InstanceName, Uuid};

use crate::request::ProviderData;

/// Longest VM name vSphere accepts.
pub const MAX_VM_NAME_LEN: usize = 80;

/// Hypervisor errors.
#[derive(Debug, Error)]
pub enum HypervisorError {
    /// The VM name violates a platform restriction.
    #[error("invalid VM name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// The VM does not exist.
    #[error("VM not found: {0}")]
    NotFound(String),

    /// The hypervisor API call failed.
    #[error("hypervisor API error: {0}")]
    Api(String),
}

impl HypervisorError {
    /// Returns true if retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, HypervisorError::Api(_))
    }
}

/// Boot-time configuration handed to a new VM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootConfig {
    /// Machine config that makes the machine join the orchestrator.
    pub join_config: String,

    /// Extra kernel arguments.
    pub kernel_args: Vec<String>,

    /// Config patch setting the machine's hostname.
    pub hostname_patch: String,
}

/// Everything needed to create one VM.
#[derive(Debug, Clone)]
pub struct InstanceSpec {
    /// VM name, equal to the request ID.
    pub name: InstanceName,

    /// Placement and sizing.
    pub provider_data: ProviderData,

    /// Boot configuration.
    pub boot: BootConfig,
}

/// Handle to a VM on the hypervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceHandle {
    /// VM name.
    pub name: String,

    /// Managed object reference (for example `vm-1001`).
    pub moref: String,
}

/// Hypervisor interface.
#[async_trait]
pub trait Hypervisor: Send + Sync {
    /// Create a VM, or return the existing one if a VM with this name exists.
    async fn create_instance(&self, spec: &InstanceSpec) -> Result<InstanceHandle, HypervisorError>;

    /// Read the VM's BIOS UUID. `None` until the platform has assigned one.
    async fn hardware_uuid(&self, handle: &InstanceHandle)
        -> Result<Option<String>, HypervisorError>;

    /// Destroy a VM by name. Returns false if it did not exist.
    async fn destroy_instance(&self, name: &str) -> Result<bool, HypervisorError>;
}

/// A VM held by [`MockHypervisor`].
#[derive(Debug, Clone)]
pub struct MockInstance {
    pub handle: InstanceHandle,
    pub spec: InstanceSpec,
    pub bios_uuid: String,
}

/// Mock hypervisor for testing and development.
pub struct MockHypervisor {
    /// VMs by name.
    instances: RwLock<HashMap<String, MockInstance>>,

    /// Counter for generating managed object references.
    moref_counter: AtomicU64,

    /// Number of create calls, including ones that found an existing VM.
    create_calls: AtomicU64,

    /// BIOS UUIDs to hand out for specific VM names.
    preassigned: HashMap<String, String>,

    /// Whether creates should "fail".
    fail_creates: bool,

    /// Whether UUID queries should report nothing.
    withhold_uuids: bool,
}

impl MockHypervisor {
    /// Create a new mock hypervisor.
    pub fn new() -> Self {
        Self {
            instances: RwLock::new(HashMap::new()),
            moref_counter: AtomicU64::new(1000),
            create_calls: AtomicU64::new(0),
            preassigned: HashMap::new(),
            fail_creates: false,
            withhold_uuids: false,
        }
    }

    /// Create a mock hypervisor that fails all creates.
    pub fn failing() -> Self {
        Self {
            fail_creates: true,
            ..Self::new()
        }
    }

    /// Create a mock hypervisor that never reports a UUID.
    pub fn withholding_uuids() -> Self {
        Self {
            withhold_uuids: true,
            ..Self::new()
        }
    }

    /// Report `bios_uuid` for the VM named `name` instead of a random one.
    #[must_use]
    pub fn with_uuid(mut self, name: impl Into<String>, bios_uuid: impl Into<String>) -> Self {
        self.preassigned.insert(name.into(), bios_uuid.into());
        self
    }

    /// Look up a VM by name.
    pub async fn instance(&self, name: &str) -> Option<MockInstance> {
        self.instances.read().await.get(name).cloned()
    }

    /// Number of VMs currently present.
    pub async fn instance_count(&self) -> usize {
        self.instances.read().await.len()
    }

    /// Number of create calls received.
    pub fn create_calls(&self) -> u64 {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn next_moref(&self) -> String {
        let counter = self.moref_counter.fetch_add(1, Ordering::SeqCst);
        format!("vm-{counter}")
    }

    /// Generate a BIOS UUID shaped like the ones vCenter assigns.
    fn generate_bios_uuid() -> String {
        let mut bytes = *Uuid::new_v4().as_bytes();
        bytes[0] = 0x42;
        bytes[1] = 0x24;
        HypervisorUuid::from_bytes(bytes).to_string()
    }
}

impl Default for MockHypervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Hypervisor for MockHypervisor {
    async fn create_instance(&self, spec: &InstanceSpec) -> Result<InstanceHandle, HypervisorError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_creates {
            return Err(HypervisorError::Api(
                "mock hypervisor configured to fail".to_string(),
            ));
        }

        let name = spec.name.as_str();
        if name.chars().count() > MAX_VM_NAME_LEN {
            return Err(HypervisorError::InvalidName {
                name: name.to_string(),
                reason: format!("longer than {MAX_VM_NAME_LEN} characters"),
            });
        }

        let mut instances = self.instances.write().await;
        if let Some(existing) = instances.get(name) {
            debug!(
                vm_name = %name,
                moref = %existing.handle.moref,
                "[MOCK] VM already exists"
            );
            return Ok(existing.handle.clone());
        }

        let handle = InstanceHandle {
            name: name.to_string(),
            moref: self.next_moref(),
        };
        let bios_uuid = self
            .preassigned
            .get(name)
            .cloned()
            .unwrap_or_else(Self::generate_bios_uuid);

        info!(
            vm_name = %name,
            moref = %handle.moref,
            template = %spec.provider_data.template,
            cpu = spec.provider_data.cpu,
            memory_mib = spec.provider_data.memory,
            "[MOCK] Creating VM"
        );

        instances.insert(
            name.to_string(),
            MockInstance {
                handle: handle.clone(),
                spec: spec.clone(),
                bios_uuid,
            },
        );

        Ok(handle)
    }

    async fn hardware_uuid(
        &self,
        handle: &InstanceHandle,
    ) -> Result<Option<String>, HypervisorError> {
        let instances = self.instances.read().await;
        let instance = instances
            .get(&handle.name)
            .ok_or_else(|| HypervisorError::NotFound(handle.name.clone()))?;

        if self.withhold_uuids {
            debug!(vm_name = %handle.name, "[MOCK] Withholding BIOS UUID");
            return Ok(None);
        }

        Ok(Some(instance.bios_uuid.clone()))
    }

    async fn destroy_instance(&self, name: &str) -> Result<bool, HypervisorError> {
        let removed = self.instances.write().await.remove(name);
        if let Some(instance) = &removed {
            info!(
                vm_name = %name,
                moref = %instance.handle.moref,
                "[MOCK] Destroying VM"
            );
        }
        Ok(removed.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsp_id::RequestId;

    fn test_spec(name: &str) -> InstanceSpec {
        InstanceSpec {
            name: RequestId::new(name).unwrap().instance_name(),
            provider_data: ProviderData::default(),
            boot: BootConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_mock_create_and_query() {
        let hypervisor = MockHypervisor::new();
        let handle = hypervisor
            .create_instance(&test_spec("talos-test-workers-4f2l8w"))
            .await
            .unwrap();

        assert_eq!(handle.name, "talos-test-workers-4f2l8w");
        assert!(handle.moref.starts_with("vm-"));

        let uuid = hypervisor.hardware_uuid(&handle).await.unwrap().unwrap();
        assert!(uuid.starts_with("4224"));
        assert!(HypervisorUuid::parse(&uuid).is_ok());
    }

    #[tokio::test]
    async fn test_mock_create_is_idempotent() {
        let hypervisor = MockHypervisor::new();
        let first = hypervisor.create_instance(&test_spec("vm-a")).await.unwrap();
        let second = hypervisor.create_instance(&test_spec("vm-a")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(hypervisor.instance_count().await, 1);
        assert_eq!(hypervisor.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_preassigned_uuid() {
        let hypervisor =
            MockHypervisor::new().with_uuid("vm-a", "422413c3-57c8-96d1-c481-c58dbb837d2d");
        let handle = hypervisor.create_instance(&test_spec("vm-a")).await.unwrap();

        assert_eq!(
            hypervisor.hardware_uuid(&handle).await.unwrap().as_deref(),
            Some("422413c3-57c8-96d1-c481-c58dbb837d2d")
        );
    }

    #[tokio::test]
    async fn test_mock_rejects_long_names() {
        let hypervisor = MockHypervisor::new();
        let name = "a".repeat(MAX_VM_NAME_LEN + 1);
        let err = hypervisor.create_instance(&test_spec(&name)).await.unwrap_err();

        assert!(matches!(err, HypervisorError::InvalidName { .. }));
        assert!(!err.is_transient());
        assert_eq!(hypervisor.instance_count().await, 0);
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let hypervisor = MockHypervisor::failing();
        let err = hypervisor.create_instance(&test_spec("vm-a")).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_mock_withholding_uuids() {
        let hypervisor = MockHypervisor::withholding_uuids();
        let handle = hypervisor.create_instance(&test_spec("vm-a")).await.unwrap();
        assert_eq!(hypervisor.hardware_uuid(&handle).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mock_destroy() {
        let hypervisor = MockHypervisor::new();
        let handle = hypervisor.create_instance(&test_spec("vm-a")).await.unwrap();

        assert!(hypervisor.destroy_instance("vm-a").await.unwrap());
        assert!(!hypervisor.destroy_instance("vm-a").await.unwrap());
        assert!(matches!(
            hypervisor.hardware_uuid(&handle).await,
            Err(HypervisorError::NotFound(_))
        ));
    }
}
