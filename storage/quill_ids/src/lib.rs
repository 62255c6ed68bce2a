//! Opaque entity ids for the Quill project storage.
//!
//! Every entity kind stored by the engine gets its own `i64` newtype so ids
//! of different kinds cannot be mixed up at compile time. The raw value `0`
//! is the null id ("no entity"); positive values refer to stored rows.
//! [`TypeId`] additionally reserves `-1` as the [`TypeId::UNRESOLVED`]
//! sentinel: "a base is expected here but cannot be resolved yet".
//!
//! Ids bind to SQL as integers, with the null id mapping to SQL `NULL` in
//! both directions.

mod ids;
mod source_id;
mod version;

pub use ids::{
    EnumerationDeclarationId, FunctionDeclarationId, ImportId, ImportedTypeNameId, ModuleExportedImportId,
    ModuleId, PropertyDeclarationId, SignalDeclarationId, TypeId,
};
pub use source_id::{DirectoryPathId, FileNameId, SourceId};
pub use version::{Version, VersionNumber};

// Ids are stored in large id vectors during synchronization; keep them flat.
const _: () = assert!(std::mem::size_of::<TypeId>() == 8);
const _: () = assert!(std::mem::size_of::<SourceId>() == 8);
