//! Provisioning flow for a single machine request.
//!
//! The provisioner:
//! - Derives the VM name from the request ID (and uses it as the hostname)
//! - Creates the VM on the hypervisor
//! - Reads the VM's BIOS UUID and converts it to the agent's byte order
//! - Reports the converted UUID in the request status
//!
//! A VM that was created is never rolled back because a later step failed.
//! Every step is safe to re-run for the same request.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use vsp_id::{AgentUuid, HypervisorUuid, InstanceName, RequestId};
use vsp_reconcile::RetryTracker;

use crate::context::ProvisionContext;
use crate::error::ProviderError;
use crate::hypervisor::{BootConfig, Hypervisor, InstanceHandle, InstanceSpec};
use crate::request::ProviderData;

/// Result of a successful provisioning pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    /// The VM backing the request.
    pub instance: InstanceHandle,

    /// UUID as vSphere reports it.
    pub hypervisor_uuid: HypervisorUuid,

    /// UUID as written to the status.
    pub machine_uuid: AgentUuid,
}

#[derive(Serialize)]
struct HostnamePatch<'a> {
    machine: MachinePatch<'a>,
}

#[derive(Serialize)]
struct MachinePatch<'a> {
    network: NetworkPatch<'a>,
}

#[derive(Serialize)]
struct NetworkPatch<'a> {
    hostname: &'a str,
}

/// Render the machine config patch that pins the hostname to the VM name.
pub fn hostname_patch(name: &InstanceName) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&HostnamePatch {
        machine: MachinePatch {
            network: NetworkPatch {
                hostname: name.hostname(),
            },
        },
    })
}

/// Provisioner for machine requests.
pub struct Provisioner<H: ?Sized> {
    hypervisor: Arc<H>,
}

impl<H: Hypervisor + ?Sized> Provisioner<H> {
    /// Create a new provisioner.
    pub fn new(hypervisor: Arc<H>) -> Self {
        Self { hypervisor }
    }

    /// Run one provisioning pass for the request behind `ctx`.
    pub async fn provision<C>(&self, ctx: &mut C) -> Result<ProvisionOutcome, ProviderError>
    where
        C: ProvisionContext + ?Sized,
    {
        let request_id = ctx.request_id().clone();
        let name = request_id.instance_name();

        let provider_data = ProviderData::parse(ctx.provider_data()).map_err(|source| {
            ProviderError::InvalidProviderData {
                request_id: request_id.to_string(),
                source,
            }
        })?;

        let hostname_patch =
            hostname_patch(&name).map_err(|source| ProviderError::BootConfig {
                instance: name.to_string(),
                source,
            })?;

        let params = ctx.connection_params();
        let spec = InstanceSpec {
            name: name.clone(),
            provider_data,
            boot: BootConfig {
                join_config: params.join_config.clone(),
                kernel_args: params.kernel_args.clone(),
                hostname_patch,
            },
        };

        info!(
            request_id = %request_id,
            request_set = ctx.request_set().unwrap_or_default(),
            vm_name = %name,
            "Creating VM"
        );

        let instance = self
            .hypervisor
            .create_instance(&spec)
            .await
            .map_err(|source| ProviderError::Hypervisor {
                instance: name.to_string(),
                source,
            })?;

        let raw_uuid = self
            .hypervisor
            .hardware_uuid(&instance)
            .await
            .map_err(|source| ProviderError::Hypervisor {
                instance: name.to_string(),
                source,
            })?
            .ok_or_else(|| ProviderError::UuidUnavailable {
                instance: name.to_string(),
            })?;

        let hypervisor_uuid =
            HypervisorUuid::parse(&raw_uuid).map_err(|source| ProviderError::Translation {
                instance: name.to_string(),
                source,
            })?;
        let machine_uuid = hypervisor_uuid.to_agent_form();
        let derived = machine_uuid.to_string();

        match ctx.machine_uuid() {
            Some(reported) if reported == derived => {
                debug!(
                    request_id = %request_id,
                    machine_uuid = %derived,
                    "Machine UUID already reported"
                );
            }
            Some(reported) => {
                return Err(ProviderError::UuidMismatch {
                    request_id: request_id.to_string(),
                    reported: reported.to_string(),
                    derived,
                });
            }
            None => {
                info!(
                    request_id = %request_id,
                    vm_name = %name,
                    moref = %instance.moref,
                    vsphere_uuid = %hypervisor_uuid,
                    machine_uuid = %derived,
                    "Reporting machine UUID"
                );
                ctx.set_machine_uuid(derived);
            }
        }

        Ok(ProvisionOutcome {
            instance,
            hypervisor_uuid,
            machine_uuid,
        })
    }

    /// Run provisioning passes until success, a non-retryable error, or
    /// retries for the request run out.
    pub async fn provision_with_retries<C>(
        &self,
        ctx: &mut C,
        retries: &mut RetryTracker,
    ) -> Result<ProvisionOutcome, ProviderError>
    where
        C: ProvisionContext + ?Sized,
    {
        let key = ctx.request_id().to_string();
        retries.prune();

        loop {
            match self.provision(&mut *ctx).await {
                Ok(outcome) => {
                    retries.clear(&key);
                    return Ok(outcome);
                }
                Err(e) if e.is_retryable() => {
                    if retries.record_failure(&key) {
                        warn!(
                            request_id = %key,
                            reason = e.reason_code(),
                            error = %e,
                            "Provisioning retries exhausted"
                        );
                        return Err(retries.exhausted_error(&key, &e).into());
                    }

                    let delay = retries.backoff(&key);
                    warn!(
                        request_id = %key,
                        reason = e.reason_code(),
                        error = %e,
                        attempt = retries.attempts(&key),
                        delay_ms = delay.as_millis() as u64,
                        "Provisioning step failed, will retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Destroy the VM backing a request. Returns false if there was none.
    pub async fn deprovision(&self, request_id: &RequestId) -> Result<bool, ProviderError> {
        let name = request_id.instance_name();
        info!(request_id = %request_id, vm_name = %name, "Destroying VM");

        self.hypervisor
            .destroy_instance(name.as_str())
            .await
            .map_err(|source| ProviderError::Hypervisor {
                instance: name.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_patch() {
        let name = RequestId::new("talos-test-workers-4f2l8w")
            .unwrap()
            .instance_name();
        let patch = hostname_patch(&name).unwrap();

        let value: serde_yaml::Value = serde_yaml::from_str(&patch).unwrap();
        assert_eq!(
            value["machine"]["network"]["hostname"].as_str(),
            Some("talos-test-workers-4f2l8w")
        );
    }

    #[test]
    fn test_hostname_patch_quotes_when_needed() {
        let name = RequestId::new("123").unwrap().instance_name();
        let patch = hostname_patch(&name).unwrap();

        let value: serde_yaml::Value = serde_yaml::from_str(&patch).unwrap();
        assert_eq!(value["machine"]["network"]["hostname"].as_str(), Some("123"));
    }
}
