//! Provisioning context.
//!
//! The provisioner never touches the orchestrator's resource store. It sees a
//! request through this narrow interface: the ID, the opaque payload, the
//! join parameters, and one write for the machine UUID.

use serde::{Deserialize, Serialize};
use vsp_id::RequestId;

use crate::request::{ProvisioningRequest, ProvisioningStatus};

/// Parameters a new machine needs to join the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Machine config document that makes the machine join.
    #[serde(default)]
    pub join_config: String,

    /// Extra kernel arguments.
    #[serde(default)]
    pub kernel_args: Vec<String>,
}

/// Capability-style view over one machine request and its status.
pub trait ProvisionContext: Send {
    /// ID of the request being provisioned.
    fn request_id(&self) -> &RequestId;

    /// Request-set label, if any.
    fn request_set(&self) -> Option<&str>;

    /// Raw provider data payload.
    fn provider_data(&self) -> &str;

    /// Join parameters for the machine.
    fn connection_params(&self) -> &ConnectionParams;

    /// The machine UUID already reported in the status, if any.
    fn machine_uuid(&self) -> Option<&str>;

    /// Report the machine UUID (agent form) in the status.
    fn set_machine_uuid(&mut self, uuid: String);
}

/// [`ProvisionContext`] backed by in-memory request and status resources.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request: ProvisioningRequest,
    status: ProvisioningStatus,
    params: ConnectionParams,
}

impl RequestContext {
    /// Create a context from a request and its existing status.
    pub fn new(
        request: ProvisioningRequest,
        status: ProvisioningStatus,
        params: ConnectionParams,
    ) -> Self {
        Self {
            request,
            status,
            params,
        }
    }

    /// Create a context with a fresh, empty status.
    pub fn from_request(request: ProvisioningRequest, params: ConnectionParams) -> Self {
        let status = ProvisioningStatus::for_request(&request);
        Self::new(request, status, params)
    }

    /// The request as observed.
    pub fn request(&self) -> &ProvisioningRequest {
        &self.request
    }

    /// The status as it stands, including any reported UUID.
    pub fn status(&self) -> &ProvisioningStatus {
        &self.status
    }

    /// Consume the context, returning the status to hand back.
    pub fn into_status(self) -> ProvisioningStatus {
        self.status
    }
}

impl ProvisionContext for RequestContext {
    fn request_id(&self) -> &RequestId {
        &self.request.id
    }

    fn request_set(&self) -> Option<&str> {
        self.request.request_set.as_deref()
    }

    fn provider_data(&self) -> &str {
        &self.request.provider_data
    }

    fn connection_params(&self) -> &ConnectionParams {
        &self.params
    }

    fn machine_uuid(&self) -> Option<&str> {
        self.status.machine_uuid.as_deref()
    }

    fn set_machine_uuid(&mut self, uuid: String) {
        self.status.machine_uuid = Some(uuid);
    }
}
