//! The two error channels of the store.
//!
//! Fatal conditions abort the surrounding transaction and surface as
//! [`ProjectStorageError`]: invalid input ids, structural cycles, and the
//! database errors themselves. No partial state survives a fatal error.
//!
//! Non-fatal resolution failures are reported out-of-band through the
//! [`ErrorNotifier`] while synchronization continues; the affected rows keep
//! referential integrity via `NULL` or the unresolved sentinel and relink
//! automatically once a later synchronization supplies the missing
//! definition.

use quill_ids::{ModuleId, SourceId};

/// Fatal storage errors. Any of these rolls back the active transaction.
#[derive(Debug, thiserror::Error)]
pub enum ProjectStorageError {
    #[error("type has an invalid source id")]
    TypeHasInvalidSourceId,

    #[error("file status has an invalid source id")]
    FileStatusHasInvalidSourceId,

    #[error("type annotation has an invalid source id")]
    TypeAnnotationHasInvalidSourceId,

    #[error("project entry has an invalid context source id")]
    ProjectEntryInfoHasInvalidContextSourceId,

    #[error("project entry has an invalid source id")]
    ProjectEntryInfoHasInvalidSourceId,

    #[error("module does not exist")]
    ModuleDoesNotExist,

    #[error("prototype chain has a cycle")]
    PrototypeChainCycle,

    #[error("alias chain has a cycle")]
    AliasChainCycle,

    #[error("exported type {name:?} cannot be inserted")]
    ExportedTypeCannotBeInserted { name: String },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Out-of-band sink for non-fatal resolution failures.
///
/// Implementations must not call back into the store; the notifications are
/// emitted while a transaction is active.
pub trait ErrorNotifier: Send + Sync {
    fn type_name_cannot_be_resolved(&self, _type_name: &str, _source_id: SourceId) {}

    fn property_name_does_not_exist(&self, _property_name: &str, _source_id: SourceId) {}

    fn missing_default_property(
        &self,
        _type_name: &str,
        _property_name: &str,
        _source_id: SourceId,
    ) {
    }

    fn prototype_cycle(&self, _type_name: &str, _source_id: SourceId) {}

    fn alias_cycle(&self, _type_name: &str, _property_name: &str, _source_id: SourceId) {}

    fn exported_type_name_is_duplicate(&self, _module_id: ModuleId, _type_name: &str) {}
}

/// A notifier that drops every notification.
#[derive(Default)]
pub struct NullErrorNotifier;

impl ErrorNotifier for NullErrorNotifier {}
