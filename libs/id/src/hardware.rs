//! Hardware UUID forms and the vSphere -> agent byte-order translation.
//!
//! vSphere reports a VM's BIOS UUID with `time_low`, `time_mid` and
//! `time_hi_and_version` in one endianness, while the agent running inside the
//! booted machine reads the same SMBIOS bytes with those three groups
//! reversed. `clock_seq` and `node` (bytes 8..16) are identical in both forms.

use crate::define_uuid_form;
use crate::IdError;

/// Number of hex digits in a UUID once hyphens are stripped.
pub const UUID_HEX_LEN: usize = 32;

define_uuid_form!(
    /// A hardware UUID as reported by the vSphere API.
    HypervisorUuid,
    "hypervisor"
);

define_uuid_form!(
    /// A hardware UUID as the booted machine's agent reports it.
    AgentUuid,
    "agent"
);

/// Decodes a UUID string into its 16 raw bytes.
///
/// Hyphens are stripped before validation, so both `8-4-4-4-12` and the bare
/// 32-digit form are accepted. Upper-case digits decode; output formatting is
/// always lower-case. Non-ASCII input is an encoding error regardless of
/// its length.
pub fn decode_uuid(input: &str) -> Result<[u8; 16], IdError> {
    if let Some(c) = input.chars().find(|c| !c.is_ascii()) {
        return Err(IdError::InvalidEncoding {
            input: input.to_string(),
            reason: format!("non-ASCII character {c:?}"),
        });
    }

    let digits: String = input.chars().filter(|c| *c != '-').collect();
    if digits.len() != UUID_HEX_LEN {
        return Err(IdError::InvalidLength {
            input: input.to_string(),
            expected: UUID_HEX_LEN,
            actual: digits.len(),
        });
    }

    let mut bytes = [0u8; 16];
    hex::decode_to_slice(&digits, &mut bytes).map_err(|e| IdError::InvalidEncoding {
        input: input.to_string(),
        reason: e.to_string(),
    })?;

    Ok(bytes)
}

impl HypervisorUuid {
    /// Converts to the byte order the machine's agent reports.
    #[must_use]
    pub fn to_agent_form(&self) -> AgentUuid {
        let mut bytes = self.0;

        // time_low: bytes 0-3
        bytes.swap(0, 3);
        bytes.swap(1, 2);
        // time_mid: bytes 4-5
        bytes.swap(4, 5);
        // time_hi_and_version: bytes 6-7
        bytes.swap(6, 7);

        AgentUuid::from_bytes(bytes)
    }
}

impl From<HypervisorUuid> for AgentUuid {
    fn from(uuid: HypervisorUuid) -> Self {
        uuid.to_agent_form()
    }
}

/// Translates a vSphere-reported UUID string into the agent's form.
///
/// ```
/// let agent = vsp_id::translate_to_agent_format("422413c3-57c8-96d1-c481-c58dbb837d2d")?;
/// assert_eq!(agent, "c3132442-c857-d196-c481-c58dbb837d2d");
/// # Ok::<(), vsp_id::IdError>(())
/// ```
pub fn translate_to_agent_format(hypervisor_uuid: &str) -> Result<String, IdError> {
    let uuid = HypervisorUuid::parse(hypervisor_uuid)?;
    Ok(uuid.to_agent_form().to_string())
}

// =============================================================================
// Tests
// =============================================================================
