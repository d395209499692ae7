//! Macro for implementing Display and FromStr for wire-name enums
//!
//! Enums such as the auth scheme appear in persisted documents and in
//! composite cache keys. This macro gives them one canonical lowercase
//! rendering and case-insensitive parsing.
//!
//! # Example
//!
//! ```rust
//! use tokencache_domain::impl_wire_name_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Channel {
//!     Stable,
//!     Preview,
//! }
//!
//! impl_wire_name_conversions!(Channel {
//!     Stable => "stable",
//!     Preview => "preview",
//! });
//! ```

/// Implements Display and FromStr for enums with a lowercase wire name
///
/// * Display writes the wire name.
/// * FromStr parses case-insensitively and reports the enum name on failure.
#[macro_export]
macro_rules! impl_wire_name_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestScheme {
        Bearer,
        Pop,
    }

    impl_wire_name_conversions!(TestScheme {
        Bearer => "bearer",
        Pop => "pop",
    });

    #[test]
    fn test_display_conversion() {
        assert_eq!(TestScheme::Bearer.to_string(), "bearer");
        assert_eq!(TestScheme::Pop.to_string(), "pop");
    }

    #[test]
    fn test_fromstr_mixed_case() {
        assert_eq!(TestScheme::from_str("Bearer").unwrap(), TestScheme::Bearer);
        assert_eq!(TestScheme::from_str("POP").unwrap(), TestScheme::Pop);
        assert_eq!(TestScheme::from_str(" pop ").unwrap(), TestScheme::Pop);
    }

    #[test]
    fn test_fromstr_invalid() {
        let result = TestScheme::from_str("mac");
        assert!(result.unwrap_err().contains("Invalid TestScheme: mac"));
    }
}
