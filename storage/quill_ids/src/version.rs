//! Module versions with wildcard support.

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};

/// One component of a module version.
///
/// The reserved value `0xFFFF_FFFF` is the wildcard: "any version". Imports
/// carry the wildcard to accept every exported version; lookup operations
/// use it to mean "unconstrained".
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct VersionNumber(u32);

/// A `major.minor` module version, either component possibly wildcarded.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: VersionNumber,
    pub minor: VersionNumber,
}

impl VersionNumber {
    /// Matches any version.
    pub const WILDCARD: Self = Self(u32::MAX);

    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_wildcard(self) -> bool {
        self.0 == u32::MAX
    }
}

impl Version {
    /// Matches any version at all.
    pub const WILDCARD: Self = Self {
        major: VersionNumber::WILDCARD,
        minor: VersionNumber::WILDCARD,
    };

    #[inline]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            major: VersionNumber::new(major),
            minor: VersionNumber::new(minor),
        }
    }

    /// A fixed major version with an unconstrained minor version.
    #[inline]
    pub const fn major_only(major: u32) -> Self {
        Self {
            major: VersionNumber::new(major),
            minor: VersionNumber::WILDCARD,
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::WILDCARD
    }
}

impl std::fmt::Debug for VersionNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_wildcard() {
            write!(f, "*")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl std::fmt::Debug for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}.{:?}", self.major, self.minor)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl ToSql for VersionNumber {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(Value::Integer(i64::from(self.0))))
    }
}

impl FromSql for VersionNumber {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(|raw| Self(raw as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_is_recognized() {
        assert!(VersionNumber::WILDCARD.is_wildcard());
        assert!(!VersionNumber::new(2).is_wildcard());
        assert!(Version::WILDCARD.major.is_wildcard());
        assert!(Version::major_only(2).minor.is_wildcard());
    }

    #[test]
    fn versions_order_by_major_then_minor() {
        assert!(Version::new(1, 9) < Version::new(2, 0));
        assert!(Version::new(2, 0) < Version::new(2, 15));
        // The wildcard sorts after every concrete version.
        assert!(Version::new(2, 15) < Version::major_only(2));
    }
}
