//! Request and instance naming.
//!
//! The orchestrator owns uniqueness: by the time a request reaches the
//! provider its ID already carries the disambiguating suffix. Nothing here
//! rewrites, truncates or encodes that string.

use std::borrow::Borrow;

use crate::IdError;

// =============================================================================
// Request ID
// =============================================================================

/// The orchestrator-assigned ID of one provisioning request.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a request ID, rejecting only the empty string.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(IdError::Empty);
        }
        Ok(Self(id))
    }

    /// Returns the ID as given by the orchestrator.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the name the instance for this request must carry.
    #[must_use]
    pub fn instance_name(&self) -> InstanceName {
        resolve_instance_name(self)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RequestId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RequestId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for RequestId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for RequestId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Instance Name
// =============================================================================

/// The VM name on the hypervisor, which is also the machine's hostname.
///
/// Only obtainable through [`resolve_instance_name`], so it always equals the
/// request ID it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceName(String);

impl InstanceName {
    /// Returns the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the hostname to embed in the machine's boot configuration.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.0
    }

    /// Consumes the name, returning the underlying string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for InstanceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for InstanceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for InstanceName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

/// Derives the instance name for a request.
///
/// The name is the request ID character for character. Hypervisor limits on
/// name length or character set are enforced by the create call, never here.
#[must_use]
pub fn resolve_instance_name(request_id: &RequestId) -> InstanceName {
    InstanceName(request_id.0.clone())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case::workers_with_suffix("talos-test-workers-4f2l8w")]
    #[case::control_plane("my-cluster-controlplane-abc123")]
    #[case::workers("prod-cluster-workers-xyz789")]
    fn test_instance_name_matches_request_id(#[case] id: &str) {
        let request_id = RequestId::new(id).unwrap();
        let name = resolve_instance_name(&request_id);
        assert_eq!(name.as_str(), id);
        assert_eq!(name.hostname(), id);
    }

    #[test]
    fn test_empty_request_id() {
        let result = RequestId::new("");
        assert!(matches!(result, Err(IdError::Empty)));
        assert!(result.unwrap_err().is_empty());
    }

    #[test]
    fn test_no_length_or_charset_rewriting() {
        let long = format!("{}_UPPER.dots", "a".repeat(200));
        let request_id = RequestId::new(long.clone()).unwrap();
        assert_eq!(request_id.instance_name().into_string(), long);
    }

    #[test]
    fn test_request_id_json_roundtrip() {
        let id = RequestId::new("talos-test-workers-4f2l8w").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"talos-test-workers-4f2l8w\"");
        let parsed: RequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_request_id_json_rejects_empty() {
        let result: Result<RequestId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn prop_instance_name_is_request_id(id in "[^\\s]{1,64}") {
            let request_id = RequestId::new(id.clone()).unwrap();
            let name = resolve_instance_name(&request_id);
            prop_assert_eq!(name.as_str(), id.as_str());
        }

        #[test]
        fn prop_instance_name_is_idempotent(id in "[^\\s]{1,64}") {
            let request_id = RequestId::new(id).unwrap();
            prop_assert_eq!(
                resolve_instance_name(&request_id),
                resolve_instance_name(&request_id)
            );
        }
    }
}
