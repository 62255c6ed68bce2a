//! Persistent, incremental type-graph storage for the Quill component
//! language.
//!
//! The store is a content-addressed database over the declared types,
//! modules, imports and file metadata discovered by external parsers. Given
//! a [`SynchronizationPackage`] it diffs the batch against persisted state,
//! resolves symbolic imported type names through a versioned import
//! resolver, relinks every reference left dangling by deletes and renames,
//! rejects inheritance and alias cycles, and notifies observers of the
//! precise set of removed types and changed exported names.
//!
//! Parsing, path interning and rendering live elsewhere; the store treats
//! their output as input. Physical storage is a single SQLite file with a
//! strict-typed schema.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use quill_store::{Database, NullErrorNotifier, ProjectStorage};
//!
//! let database = Database::in_memory()?;
//! let mut storage = ProjectStorage::new(database, Arc::new(NullErrorNotifier))?;
//! storage.synchronize(quill_store::SynchronizationPackage::default())?;
//! # Ok::<(), quill_store::ProjectStorageError>(())
//! ```

mod bases_cache;
mod common_type_cache;
mod database;
mod error;
pub mod info;
mod json;
mod modules;
mod observer;
mod package;
mod queries;
mod store;
mod sync;
mod traits;

pub use bases_cache::BASED_ON_ARITY_LIMIT;
pub use database::{Database, DatabaseConfig, DatabaseLocation};
pub use error::{ErrorNotifier, NullErrorNotifier, ProjectStorageError};
pub use modules::{Module, ModuleKind};
pub use observer::ProjectStorageObserver;
pub use package::{
    AliasPath, EnumerationDeclaration, EnumeratorDeclaration, ExportedType, FileStatus, FileType,
    FunctionDeclaration, Import, ImportKind, ImportedTypeName, ModuleExportedImport,
    ParameterDeclaration, ProjectEntryInfo, PropertyDeclaration, PropertyEditorPath,
    SignalDeclaration, SynchronizationPackage, Type, TypeAnnotation, TypeNameKind,
};
pub use store::ProjectStorage;
pub use traits::{
    AnnotationTraits, PropertyDeclarationTraits, TypeKind, TypeTraits,
};

// Re-export the id crate: every public operation speaks in these ids.
pub use quill_ids::{
    DirectoryPathId, EnumerationDeclarationId, FileNameId, FunctionDeclarationId, ImportId,
    ImportedTypeNameId, ModuleExportedImportId, ModuleId, PropertyDeclarationId,
    SignalDeclarationId, SourceId, TypeId, Version, VersionNumber,
};
