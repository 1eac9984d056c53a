//! Helper macro for closed string vocabularies.
//!
//! Each vocabulary is a fieldless enum whose wire form is a fixed lowercase
//! string. Parsing is case-insensitive and rejects anything outside the set
//! with a [`CoreError::Validation`](crate::error::CoreError::Validation).

macro_rules! define_vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident ($label:literal) {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $val)] $variant ),+
        }

        impl $name {
            /// Every member, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire name of this value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $val ),+
                }
            }

            /// Parse a wire name (case-insensitive, surrounding whitespace ignored).
            pub fn parse(value: &str) -> Result<Self, $crate::error::CoreError> {
                let normalized = value.trim().to_ascii_lowercase();
                match normalized.as_str() {
                    $( $val => Ok($name::$variant), )+
                    _ => Err($crate::error::CoreError::Validation(format!(
                        "Invalid {} '{}'. Must be one of: {}",
                        $label,
                        value,
                        Self::names().join(", ")
                    ))),
                }
            }

            /// All wire names, in declaration order.
            pub fn names() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}
