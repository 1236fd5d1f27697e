//! Macro for implementing Display and FromStr for queue enums
//!
//! Status and kind enums are persisted and logged as lowercase strings. The
//! macro keeps both directions of that mapping in one place.
//!
//! # Example
//!
//! ```rust
//! use sitecap_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Channel {
//!     Wifi,
//!     Cellular,
//! }
//!
//! impl_domain_status_conversions!(Channel {
//!     Wifi => "wifi",
//!     Cellular => "cellular",
//! });
//!
//! assert_eq!(Channel::Wifi.to_string(), "wifi");
//! assert_eq!("CELLULAR".parse::<Channel>(), Ok(Channel::Cellular));
//! ```

/// Implements Display and FromStr traits for lowercase-named enums
///
/// - Display writes the mapped string
/// - FromStr parses case-insensitively and reports the enum name on failure
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
