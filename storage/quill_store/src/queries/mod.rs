//! The query layer: one prepared statement per read/write.
//!
//! Every function prepares its statement through the connection's statement
//! cache and runs in whatever transaction the caller has open (immediate
//! for synchronization, deferred or implicit for reads). Id-set
//! restrictions are passed as `rarray()` parameters.
//!
//! Single-value selects follow the convention that a missing row yields the
//! null id; the resolver lookups yield the unresolved sentinel instead so
//! "known missing" stays distinguishable from "no reference".

pub(crate) mod annotations;
pub(crate) mod bases;
pub(crate) mod declarations;
pub(crate) mod exported_types;
pub(crate) mod file_statuses;
pub(crate) mod imported_type_names;
pub(crate) mod imports;
pub(crate) mod project_entries;
pub(crate) mod properties;
pub(crate) mod property_editor_paths;
pub(crate) mod types;

use std::rc::Rc;

use rusqlite::types::Value;

/// Bindable id set for `rarray()` restrictions.
pub(crate) fn id_array<I>(ids: I) -> Rc<Vec<Value>>
where
    I: IntoIterator,
    I::Item: IdRaw,
{
    quill_sqlite::to_id_array(ids.into_iter().map(IdRaw::raw_value))
}

/// Raw database representation of an id, for array binding.
pub(crate) trait IdRaw {
    fn raw_value(self) -> i64;
}

impl IdRaw for quill_ids::SourceId {
    fn raw_value(self) -> i64 {
        self.raw()
    }
}

impl IdRaw for quill_ids::TypeId {
    fn raw_value(self) -> i64 {
        self.raw()
    }
}

impl IdRaw for quill_ids::ModuleId {
    fn raw_value(self) -> i64 {
        self.raw()
    }
}

impl IdRaw for quill_ids::DirectoryPathId {
    fn raw_value(self) -> i64 {
        i64::from(self.raw())
    }
}
