//! Source ids packing a directory component and an optional file name.
//!
//! Path interning happens outside the storage engine; the interner hands out
//! a `DirectoryPathId` per directory and a `FileNameId` per file name, and a
//! [`SourceId`] combines the two. A source id without a file-name component
//! identifies the directory itself and is used as a context id.

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};

/// Identifies an interned directory path.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct DirectoryPathId(u32);

/// Identifies an interned file name within a directory.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct FileNameId(u32);

/// Identifies a source: a directory plus an optional file name.
///
/// The packed representation keeps source ids order-comparable and lets the
/// directory component be recovered without a lookup:
/// bits 32..64 hold the directory path id, bits 0..32 the file name id.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct SourceId(i64);

impl DirectoryPathId {
    /// The null directory path id.
    pub const NULL: Self = Self(0);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl FileNameId {
    /// The null file name id, used for directory-only source ids.
    pub const NULL: Self = Self(0);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl SourceId {
    /// The null source id.
    pub const NULL: Self = Self(0);

    /// Combine a directory and a file name into a source id.
    #[inline]
    pub const fn new(directory: DirectoryPathId, file_name: FileNameId) -> Self {
        Self(((directory.0 as i64) << 32) | file_name.0 as i64)
    }

    /// A source id identifying the directory itself (a context id).
    #[inline]
    pub const fn from_directory(directory: DirectoryPathId) -> Self {
        Self::new(directory, FileNameId::NULL)
    }

    /// Create a source id from its raw database value.
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw database value.
    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// The directory component.
    #[inline]
    pub const fn directory_path_id(self) -> DirectoryPathId {
        DirectoryPathId((self.0 >> 32) as u32)
    }

    /// The file-name component, null for directory-only source ids.
    #[inline]
    pub const fn file_name_id(self) -> FileNameId {
        FileNameId(self.0 as u32)
    }

    /// Check whether this source id identifies a directory, not a file.
    #[inline]
    pub const fn is_context(self) -> bool {
        self.file_name_id().is_null()
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Debug for DirectoryPathId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "DirectoryPathId::NULL")
        } else {
            write!(f, "DirectoryPathId({})", self.0)
        }
    }
}

impl std::fmt::Debug for FileNameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "FileNameId::NULL")
        } else {
            write!(f, "FileNameId({})", self.0)
        }
    }
}

impl std::fmt::Debug for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "SourceId::NULL")
        } else {
            write!(
                f,
                "SourceId({}/{})",
                self.directory_path_id().raw(),
                self.file_name_id().raw()
            )
        }
    }
}

impl ToSql for SourceId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        if self.is_null() {
            Ok(ToSqlOutput::Owned(Value::Null))
        } else {
            Ok(ToSqlOutput::Owned(Value::Integer(self.0)))
        }
    }
}

impl FromSql for SourceId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Self::NULL),
            other => i64::column_result(other).map(Self),
        }
    }
}

impl ToSql for DirectoryPathId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        if self.is_null() {
            Ok(ToSqlOutput::Owned(Value::Null))
        } else {
            Ok(ToSqlOutput::Owned(Value::Integer(i64::from(self.0))))
        }
    }
}

impl FromSql for DirectoryPathId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Self::NULL),
            other => i64::column_result(other).map(|raw| Self(raw as u32)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_id_packs_directory_and_file_name() {
        let source_id = SourceId::new(DirectoryPathId::new(7), FileNameId::new(3));

        assert_eq!(source_id.directory_path_id(), DirectoryPathId::new(7));
        assert_eq!(source_id.file_name_id(), FileNameId::new(3));
        assert!(!source_id.is_context());
    }

    #[test]
    fn directory_only_source_id_is_a_context() {
        let context_id = SourceId::from_directory(DirectoryPathId::new(7));

        assert!(context_id.is_context());
        assert!(context_id.is_valid());
        assert_eq!(context_id.directory_path_id(), DirectoryPathId::new(7));
    }

    #[test]
    fn source_ids_in_the_same_directory_sort_together() {
        let first = SourceId::new(DirectoryPathId::new(1), FileNameId::new(9));
        let second = SourceId::new(DirectoryPathId::new(2), FileNameId::new(1));

        assert!(first < second);
    }

    #[test]
    fn round_trips_through_raw() {
        let source_id = SourceId::new(DirectoryPathId::new(11), FileNameId::new(13));

        assert_eq!(SourceId::from_raw(source_id.raw()), source_id);
    }
}
