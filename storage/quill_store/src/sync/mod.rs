//! The batch synchronization state machine.
//!
//! A [`Synchronizer`] lives for exactly one immediate transaction and runs
//! the package through a fixed sequence of steps. The order is load-bearing:
//! imports must exist before exported names resolve, exported names before
//! types, and every deletion collects its dangling dependents into the
//! relinkable buckets that the relink step resolves at the end.
//!
//! ```text
//! file statuses -> imports (+ module-exported expansion) -> exported types
//!   -> types -> delete not-updated types -> relink -> repair broken aliases
//!   -> link new aliases -> annotations -> property editor paths
//!   -> project entries
//! ```

mod aliases;
mod annotations;
mod exported_types;
mod imports;
mod relink;
mod types;

use quill_ids::{SourceId, TypeId};
use quill_sqlite::{insert_update_delete, UpdateChange};
use rusqlite::Connection;

use crate::error::{ErrorNotifier, ProjectStorageError};
use crate::info;
use crate::package::{FileStatus, SynchronizationPackage};
use crate::queries;

pub(crate) use relink::{AliasPropertyDeclaration, BaseRelink, PropertyDeclarationRelink};

/// Whether an import change must push the affected types into the
/// relinkable bases.
#[derive(Copy, Clone, PartialEq, Eq)]
pub(crate) enum Relink {
    No,
    Yes,
}

/// Whether a failed alias-target resolution is reported.
#[derive(Copy, Clone, PartialEq, Eq)]
pub(crate) enum RaiseError {
    No,
    Yes,
}

/// What the caller needs after the transaction committed.
pub(crate) struct SyncOutcome {
    pub deleted_type_ids: Vec<TypeId>,
    pub exported_types_changed: bool,
    pub added_exported_type_names: Vec<info::ExportedTypeName>,
    pub removed_exported_type_names: Vec<info::ExportedTypeName>,
}

pub(crate) struct Synchronizer<'a> {
    connection: &'a Connection,
    notifier: &'a dyn ErrorNotifier,

    alias_declarations_to_link: Vec<AliasPropertyDeclaration>,

    relinkable_alias_property_declarations: Vec<AliasPropertyDeclaration>,
    relinkable_property_declarations: Vec<PropertyDeclarationRelink>,
    relinkable_bases: Vec<BaseRelink>,

    updated_prototype_ids: Vec<TypeId>,
    deleted_type_ids: Vec<TypeId>,

    exported_types_changed: bool,
    added_exported_type_names: Vec<info::ExportedTypeName>,
    removed_exported_type_names: Vec<info::ExportedTypeName>,
}

impl<'a> Synchronizer<'a> {
    pub fn new(connection: &'a Connection, notifier: &'a dyn ErrorNotifier) -> Self {
        Self {
            connection,
            notifier,
            alias_declarations_to_link: Vec::new(),
            relinkable_alias_property_declarations: Vec::new(),
            relinkable_property_declarations: Vec::new(),
            relinkable_bases: Vec::new(),
            updated_prototype_ids: Vec::new(),
            deleted_type_ids: Vec::new(),
            exported_types_changed: false,
            added_exported_type_names: Vec::new(),
            removed_exported_type_names: Vec::new(),
        }
    }

    /// Run the full synchronization sequence against the open transaction.
    #[tracing::instrument(level = "debug", skip_all, fields(
        types = package.types.len(),
        exported_types = package.exported_types.len(),
        imports = package.imports.len(),
    ))]
    pub fn run(
        mut self,
        package: &mut SynchronizationPackage,
    ) -> Result<SyncOutcome, ProjectStorageError> {
        package.updated_type_source_ids.sort_unstable();

        let mut updated_type_ids = Vec::with_capacity(package.types.len());

        self.synchronize_file_statuses(
            &mut package.file_statuses,
            &package.updated_file_status_source_ids,
        )?;
        self.synchronize_imports(package)?;
        self.synchronize_exported_types(
            &mut package.exported_types,
            &package.updated_exported_type_source_ids,
        )?;
        self.synchronize_types(&mut package.types, &mut updated_type_ids)?;
        self.delete_not_updated_types(&updated_type_ids, &package.updated_type_source_ids)?;
        self.relink()?;
        self.repair_broken_alias_property_declarations()?;

        let alias_declarations_to_link = std::mem::take(&mut self.alias_declarations_to_link);
        self.link_aliases(&alias_declarations_to_link, RaiseError::Yes)?;

        let updated_annotation_types = self.synchronize_type_annotations(
            &mut package.type_annotations,
            &package.updated_type_annotation_source_ids,
        )?;
        self.update_annotations_type_traits_from_prototypes(updated_annotation_types)?;
        self.synchronize_property_editor_paths(
            &mut package.property_editor_paths,
            &package.updated_property_editor_path_directory_ids,
        )?;
        self.synchronize_project_entry_infos(
            &mut package.project_entry_infos,
            &package.updated_project_entry_info_source_ids,
        )?;

        let mut deleted_type_ids = self.deleted_type_ids;
        deleted_type_ids.sort_unstable();
        deleted_type_ids.dedup();

        Ok(SyncOutcome {
            deleted_type_ids,
            exported_types_changed: self.exported_types_changed,
            added_exported_type_names: self.added_exported_type_names,
            removed_exported_type_names: self.removed_exported_type_names,
        })
    }

    /// Run only the document-import subset used for single-document edits.
    pub fn run_document_imports(
        mut self,
        imports: &mut Vec<crate::package::Import>,
        source_id: SourceId,
    ) -> Result<(), ProjectStorageError> {
        self.synchronize_document_imports(
            imports,
            &[source_id],
            crate::package::ImportKind::Import,
            Relink::Yes,
        )?;
        self.relink()?;

        Ok(())
    }

    fn synchronize_file_statuses(
        &mut self,
        file_statuses: &mut [FileStatus],
        updated_source_ids: &[SourceId],
    ) -> Result<(), ProjectStorageError> {
        file_statuses.sort_unstable_by_key(|status| status.source_id);

        let views =
            queries::file_statuses::file_statuses_for_source_ids(self.connection, updated_source_ids)?;

        let connection = self.connection;
        insert_update_delete(
            views,
            file_statuses,
            |view, status| view.source_id.cmp(&status.source_id),
            |status| {
                if !status.source_id.is_valid() {
                    return Err(ProjectStorageError::FileStatusHasInvalidSourceId);
                }
                queries::file_statuses::insert_file_status(connection, status)
            },
            |view, status| {
                if view.last_modified != status.last_modified || view.size != status.size {
                    queries::file_statuses::update_file_status(connection, status)?;
                    return Ok(UpdateChange::Update);
                }
                Ok(UpdateChange::No)
            },
            |view| queries::file_statuses::delete_file_status(connection, view.source_id),
        )
    }
}

/// Invalid ids compare equal to each other and to nothing else.
pub(crate) fn compare_invalid_are_true<T>(first: T, second: T) -> bool
where
    T: PartialEq + Copy,
    T: IdValidity,
{
    if !first.id_is_valid() && !second.id_is_valid() {
        return true;
    }
    first == second
}

pub(crate) trait IdValidity {
    fn id_is_valid(self) -> bool;
}

impl IdValidity for quill_ids::PropertyDeclarationId {
    fn id_is_valid(self) -> bool {
        self.is_valid()
    }
}

impl IdValidity for quill_ids::ModuleId {
    fn id_is_valid(self) -> bool {
        self.is_valid()
    }
}

impl IdValidity for TypeId {
    fn id_is_valid(self) -> bool {
        self.is_valid()
    }
}
