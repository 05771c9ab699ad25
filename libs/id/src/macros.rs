//! Macros for defining integer key types.

/// Macro to define a typed integer key assigned by the surrounding system.
///
/// This generates a newtype wrapper around `i32` with:
/// - A `KIND` constant used in error messages
/// - `new()` and `value()`
/// - `Display` and `FromStr` implementations
/// - Transparent `Serialize` and `Deserialize` as a number
/// - `Ord`, `Hash`, and other standard traits
///
/// # Example
///
/// ```ignore
/// define_key!(LocationId, "location id");
///
/// let location = LocationId::new(7);
/// let parsed: LocationId = "7".parse()?;
/// ```
#[macro_export]
macro_rules! define_key {
    ($name:ident, $kind:literal) => {
        /// A typed integer key for this scope.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(i32);

        impl $name {
            /// Human-readable name of this key, used in error messages.
            pub const KIND: &'static str = $kind;

            /// Creates a key from its raw value.
            #[must_use]
            pub const fn new(value: i32) -> Self {
                Self(value)
            }

            /// Returns the underlying value.
            #[must_use]
            pub const fn value(&self) -> i32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.is_empty() {
                    return Err($crate::IdError::Empty);
                }

                s.trim()
                    .parse::<i32>()
                    .map(Self)
                    .map_err(|e| $crate::IdError::InvalidKey {
                        kind: Self::KIND,
                        message: e.to_string(),
                    })
            }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i32 {
            fn from(key: $name) -> Self {
                key.0
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_i32(self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let value = i32::deserialize(deserializer)?;
                Ok(Self(value))
            }
        }
    };
}
