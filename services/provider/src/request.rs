//! Machine request and status resources, as seen from the provider.
//!
//! Both are owned by the orchestrator. The provider reads requests and writes
//! exactly one field of the status: the machine UUID, in the agent's form.

use serde::{Deserialize, Serialize};
use vsp_id::RequestId;

/// A request to provision one machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningRequest {
    /// Final, suffixed request ID.
    pub id: RequestId,

    /// Request-set this request belongs to. Naming context only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_set: Option<String>,

    /// Talos version the machine should boot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub talos_version: Option<String>,

    /// Provider-specific JSON payload, see [`ProviderData`].
    #[serde(default)]
    pub provider_data: String,
}

impl ProvisioningRequest {
    /// Create a request with no labels and an empty payload.
    pub fn new(id: RequestId) -> Self {
        Self {
            id,
            request_set: None,
            talos_version: None,
            provider_data: String::new(),
        }
    }

    /// Set the request-set label.
    #[must_use]
    pub fn with_request_set(mut self, request_set: impl Into<String>) -> Self {
        self.request_set = Some(request_set.into());
        self
    }

    /// Set the Talos version.
    #[must_use]
    pub fn with_talos_version(mut self, version: impl Into<String>) -> Self {
        self.talos_version = Some(version.into());
        self
    }

    /// Set the provider data payload.
    #[must_use]
    pub fn with_provider_data(mut self, provider_data: impl Into<String>) -> Self {
        self.provider_data = provider_data.into();
        self
    }
}

/// Status of a machine request, one-to-one with it by ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningStatus {
    /// Same ID as the request.
    pub id: RequestId,

    /// Request-set label, copied from the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_set: Option<String>,

    /// Machine UUID in the form the booted machine reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_uuid: Option<String>,
}

impl ProvisioningStatus {
    /// Create the empty status for a request.
    pub fn for_request(request: &ProvisioningRequest) -> Self {
        Self {
            id: request.id.clone(),
            request_set: request.request_set.clone(),
            machine_uuid: None,
        }
    }
}

/// Provider-specific payload of a machine request.
///
/// Placement and sizing are passed through to the hypervisor untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderData {
    pub datacenter: String,
    pub resource_pool: String,
    pub template: String,
    pub datastore: String,
    pub network: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,

    /// vCPU count.
    pub cpu: u32,

    /// Memory in MiB.
    pub memory: u64,

    /// Disk size in GiB; the template's size when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_size: Option<u64>,
}

impl Default for ProviderData {
    fn default() -> Self {
        Self {
            datacenter: String::new(),
            resource_pool: String::new(),
            template: String::new(),
            datastore: String::new(),
            network: String::new(),
            folder: None,
            cpu: 2,
            memory: 4096,
            disk_size: None,
        }
    }
}

impl ProviderData {
    /// Parse the JSON payload. A blank payload yields the defaults.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_data() {
        let data = ProviderData::parse(
            r#"{
                "datacenter": "DC1",
                "resource_pool": "pool1",
                "template": "talos-template",
                "datastore": "datastore1",
                "network": "VM Network",
                "cpu": 2,
                "memory": 4096
            }"#,
        )
        .unwrap();

        assert_eq!(data.datacenter, "DC1");
        assert_eq!(data.resource_pool, "pool1");
        assert_eq!(data.template, "talos-template");
        assert_eq!(data.datastore, "datastore1");
        assert_eq!(data.network, "VM Network");
        assert_eq!(data.cpu, 2);
        assert_eq!(data.memory, 4096);
        assert_eq!(data.folder, None);
        assert_eq!(data.disk_size, None);
    }

    #[test]
    fn test_blank_provider_data_uses_defaults() {
        assert_eq!(ProviderData::parse("  ").unwrap(), ProviderData::default());
    }

    #[test]
    fn test_partial_provider_data() {
        let data = ProviderData::parse(r#"{"template": "talos-1.8", "cpu": 8}"#).unwrap();
        assert_eq!(data.template, "talos-1.8");
        assert_eq!(data.cpu, 8);
        assert_eq!(data.memory, 4096);
    }

    #[test]
    fn test_invalid_provider_data() {
        assert!(ProviderData::parse(r#"{"cpu": "two"}"#).is_err());
        assert!(ProviderData::parse("not json").is_err());
    }

    #[test]
    fn test_status_for_request() {
        let request = ProvisioningRequest::new(RequestId::new("talos-test-workers-4f2l8w").unwrap())
            .with_request_set("talos-test-workers")
            .with_talos_version("v1.8.0");

        let status = ProvisioningStatus::for_request(&request);
        assert_eq!(status.id, request.id);
        assert_eq!(status.request_set.as_deref(), Some("talos-test-workers"));
        assert_eq!(status.machine_uuid, None);
    }

    #[test]
    fn test_request_json() {
        let request: ProvisioningRequest = serde_json::from_str(
            r#"{"id": "my-cluster-controlplane-abc123", "request_set": "my-cluster-controlplane"}"#,
        )
        .unwrap();

        assert_eq!(request.id.as_str(), "my-cluster-controlplane-abc123");
        assert_eq!(request.provider_data, "");
        assert!(serde_json::from_str::<ProvisioningRequest>(r#"{"id": ""}"#).is_err());
    }
}
