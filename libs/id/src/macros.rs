//! Macros for defining hardware UUID forms.

/// Macro to define a hardware UUID newtype for one byte-order convention.
///
/// This generates a newtype wrapper around the 16 raw bytes with:
/// - A `FORM` constant naming the convention
/// - `from_bytes()` / `as_bytes()`
/// - `parse()` accepting the hyphenated or bare 32-digit hex form
/// - `Display` (lowercase `8-4-4-4-12`) and `FromStr` implementations
/// - `Serialize` and `Deserialize` implementations
///
/// The generated type does not know how its bytes relate to any other form;
/// conversions are written out explicitly next to the type definitions.
///
/// # Example
///
/// ```ignore
/// define_uuid_form!(HypervisorUuid, "hypervisor");
///
/// let uuid: HypervisorUuid = "422413c3-57c8-96d1-c481-c58dbb837d2d".parse()?;
/// ```
#[macro_export]
macro_rules! define_uuid_form {
    ($(#[$meta:meta])* $name:ident, $form:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; 16]);

        impl $name {
            /// The byte-order convention this type carries.
            pub const FORM: &'static str = $form;

            /// Creates a UUID from its raw bytes, as stored in this form.
            #[must_use]
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(bytes)
            }

            /// Returns the raw bytes in this form's order.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; 16] {
                &self.0
            }

            /// Parses a UUID string, hyphens optional.
            pub fn parse(s: &str) -> Result<Self, $crate::IdError> {
                $crate::decode_uuid(s).map(Self)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", $crate::Uuid::from_bytes(self.0).hyphenated())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}
