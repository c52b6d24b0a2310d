//! Namespace support for lexspace
//!
//! Every index owns one namespace. The namespace names the ordered set that
//! holds the index's records and the map that tracks which record belongs
//! to each identifier, so indexes sharing a store never see each other's data.

use crate::error::{IndexError, Result};
use bytes::Bytes;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceName(String);

impl NamespaceName {
    /// Parses and validates a string as a namespace name.
    ///
    /// # Arguments
    ///
    /// * `name` - The string to parse as a namespace name.
    /// * `separator` - The separator string that the name must not contain.
    ///
    /// # Returns
    ///
    /// `Ok(NamespaceName)` if the name is valid, `Err(IndexError)` otherwise.
    pub fn parse<S: Into<String>>(name: S, separator: &str) -> Result<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(IndexError::InvalidInput(
                "Namespace name cannot be empty".into(),
            ));
        }

        if name.contains(separator) {
            return Err(IndexError::InvalidInput(format!(
                "Namespace name '{}' cannot contain separator '{}'",
                name, separator
            )));
        }

        if name.contains('\0') {
            return Err(IndexError::InvalidInput(
                "Namespace name cannot contain null bytes".into(),
            ));
        }

        if name.len() > 255 {
            return Err(IndexError::InvalidInput(
                "Namespace name cannot exceed 255 characters".into(),
            ));
        }

        Ok(Self(name))
    }

    /// Returns a reference to the inner string of the namespace name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamespaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The store keys owned by one index
///
/// # Examples
///
/// ```rust
/// use lexspace::Namespace;
///
/// let ns = Namespace::new("people-by-salary").unwrap();
/// assert_eq!(&ns.set_key()[..], b"people-by-salary");
/// assert_eq!(&ns.map_key()[..], b"people-by-salary:hash");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    name: NamespaceName,
    set_key: Bytes,
    map_key: Bytes,
}

impl Namespace {
    /// Separator between the namespace name and derived key suffixes
    pub const SEPARATOR: &'static str = ":";

    /// Suffix of the identifier map key
    pub const MAP_SUFFIX: &'static str = "hash";

    /// Create a new namespace
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the name is empty, too long, or contains
    /// the separator or a null byte.
    pub fn new<S: Into<String>>(name: S) -> Result<Self> {
        let name = NamespaceName::parse(name, Self::SEPARATOR)?;
        let set_key = Bytes::from(name.as_str().to_owned());
        let map_key = Bytes::from(format!(
            "{}{}{}",
            name,
            Self::SEPARATOR,
            Self::MAP_SUFFIX
        ));

        Ok(Self {
            name,
            set_key,
            map_key,
        })
    }

    /// Get the namespace name
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Key of the ordered set holding the records
    pub fn set_key(&self) -> &Bytes {
        &self.set_key
    }

    /// Key of the identifier -> record map
    pub fn map_key(&self) -> &Bytes {
        &self.map_key
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_creation() {
        let ns = Namespace::new("test_namespace").unwrap();
        assert_eq!(ns.name(), "test_namespace");
        assert_eq!(ns.set_key(), &Bytes::from("test_namespace"));
        assert_eq!(ns.map_key(), &Bytes::from("test_namespace:hash"));
    }

    #[test]
    fn test_empty_namespace_name_err() {
        assert!(Namespace::new("").is_err());
    }

    #[test]
    fn test_namespace_name_with_separator_err() {
        // "a:hash" as a set would collide with the map of namespace "a"
        assert!(Namespace::new("a:hash").is_err());
    }

    #[test]
    fn test_namespace_name_parse_with_null_byte() {
        assert!(NamespaceName::parse("null\0byte", ":").is_err());
    }

    #[test]
    fn test_namespace_name_parse_too_long() {
        let long_name = "a".repeat(256);
        assert!(NamespaceName::parse(long_name, ":").is_err());
        assert!(NamespaceName::parse("a".repeat(255), ":").is_ok());
    }

    #[test]
    fn test_namespace_display() {
        let ns = Namespace::new("test_namespace").unwrap();
        assert_eq!(format!("{}", ns), "test_namespace");
    }

    #[test]
    fn test_distinct_namespaces_have_distinct_keys() {
        let a = Namespace::new("tenant_a").unwrap();
        let b = Namespace::new("tenant_b").unwrap();
        assert_ne!(a.set_key(), b.set_key());
        assert_ne!(a.map_key(), b.map_key());
        assert_ne!(a.set_key(), a.map_key());
    }
}
