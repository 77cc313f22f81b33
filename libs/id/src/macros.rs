//! Macros for defining typed ID types.

/// Macro to define a typed ID backed by a random UUID.
///
/// This generates a newtype wrapper around [`uuid::Uuid`] with:
/// - `generate()` to draw a fresh ID from an [`IdSource`](crate::IdSource)
/// - `parse()` accepting only the canonical lowercase hyphenated form
/// - `Display` and `FromStr` implementations
/// - `Serialize` and `Deserialize` implementations (as strings)
/// - `Ord`, `Hash`, and other standard traits
///
/// # Example
///
/// ```ignore
/// define_id!(InstanceUid);
///
/// let id = InstanceUid::generate(&OsRandomSource)?;
/// let parsed: InstanceUid = "0b5c3f0e-8e0f-4a5e-9d0c-2f6b1c7e9a10".parse()?;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        /// A typed ID for this resource type.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($crate::Uuid);

        impl $name {
            /// Draws a fresh random ID from `source`.
            pub fn generate(source: &dyn $crate::IdSource) -> Result<Self, $crate::IdError> {
                source.next_uuid().map(Self)
            }

            /// Creates an ID from a raw UUID.
            #[must_use]
            pub const fn from_uuid(uuid: $crate::Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn uuid(&self) -> $crate::Uuid {
                self.0
            }

            /// Parses an ID from its canonical string form.
            pub fn parse(s: &str) -> Result<Self, $crate::IdError> {
                if s.is_empty() {
                    return Err($crate::IdError::Empty);
                }

                let uuid = $crate::Uuid::parse_str(s)
                    .map_err(|e| $crate::IdError::InvalidUuid(e.to_string()))?;

                if uuid.hyphenated().to_string() != s {
                    return Err($crate::IdError::NotCanonical(s.to_string()));
                }

                Ok(Self(uuid))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0.hyphenated())
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

        impl AsRef<$crate::Uuid> for $name {
            fn as_ref(&self) -> &$crate::Uuid {
                &self.0
            }
        }
    };
}
