//! Synchronization of exported type names.
//!
//! An exported name binds `(module, name, version)` to a backing type.
//! Whenever a binding appears, moves to a different type id or disappears,
//! every property, alias and base that resolved through the name (or
//! through the old type id) is pushed into the relinkable buckets, and the
//! change is recorded in the added/removed diffs handed to observers after
//! commit. Re-pointing a binding and deleting-then-inserting it therefore
//! produce the same observable diff.

use quill_ids::{SourceId, TypeId};
use rusqlite::ErrorCode;

use crate::error::ProjectStorageError;
use crate::info;
use crate::package::ExportedType;
use crate::queries;

use super::types::declare_type;
use super::Synchronizer;

impl Synchronizer<'_> {
    pub(super) fn synchronize_exported_types(
        &mut self,
        exported_types: &mut [ExportedType],
        updated_source_ids: &[SourceId],
    ) -> Result<(), ProjectStorageError> {
        exported_types.sort_unstable_by(|first, second| {
            (&first.name, first.module_id, first.version)
                .cmp(&(&second.name, second.module_id, second.version))
        });

        let views = queries::exported_types::exported_type_views_for_source_ids(
            self.connection,
            updated_source_ids,
        )?;

        let mut views_iter = views.iter();
        let mut entries_iter = exported_types.iter();
        let mut view = views_iter.next();
        let mut entry = entries_iter.next();

        loop {
            match (view, entry) {
                (Some(current_view), Some(current_entry)) => {
                    let view_key = (
                        current_view.name.as_str(),
                        current_view.module_id,
                        current_view.version,
                    );
                    let entry_key = (
                        current_entry.name.as_str(),
                        current_entry.module_id,
                        current_entry.version,
                    );

                    match view_key.cmp(&entry_key) {
                        std::cmp::Ordering::Less => {
                            self.remove_exported_type(current_view)?;
                            view = views_iter.next();
                        }
                        std::cmp::Ordering::Greater => {
                            self.insert_exported_type(current_entry)?;
                            entry = entries_iter.next();
                        }
                        std::cmp::Ordering::Equal => {
                            self.update_exported_type(current_view, current_entry)?;
                            view = views_iter.next();
                            entry = entries_iter.next();
                        }
                    }
                }
                (Some(current_view), None) => {
                    self.remove_exported_type(current_view)?;
                    view = views_iter.next();
                }
                (None, Some(current_entry)) => {
                    self.insert_exported_type(current_entry)?;
                    entry = entries_iter.next();
                }
                (None, None) => break,
            }
        }

        Ok(())
    }

    fn insert_exported_type(&mut self, entry: &ExportedType) -> Result<(), ProjectStorageError> {
        if !entry.module_id.is_valid() {
            return Err(ProjectStorageError::ModuleDoesNotExist);
        }

        let type_id = declare_type(self.connection, &entry.internal_name, entry.type_source_id)?;

        let inserted = queries::exported_types::insert_exported_type_name(
            self.connection,
            entry.module_id,
            &entry.name,
            entry.version,
            type_id,
            entry.context_source_id,
        );

        match inserted {
            Ok(()) => {}
            Err(rusqlite::Error::SqliteFailure(error, _))
                if error.code == ErrorCode::ConstraintViolation =>
            {
                self.notifier
                    .exported_type_name_is_duplicate(entry.module_id, &entry.name);
                return Err(ProjectStorageError::ExportedTypeCannotBeInserted {
                    name: entry.name.clone(),
                });
            }
            Err(error) => return Err(error.into()),
        }

        // The name resolves differently now; everything that resolved it
        // before must try again.
        self.handle_property_declarations_with_exported_type_name(&entry.name, TypeId::NULL)?;
        self.handle_alias_property_declarations_with_exported_type_name(&entry.name, TypeId::NULL)?;
        self.handle_bases_with_exported_type_name(&entry.name, TypeId::UNRESOLVED)?;

        self.added_exported_type_names.push(info::ExportedTypeName {
            module_id: entry.module_id,
            type_id,
            name: entry.name.clone(),
            version: entry.version,
        });
        self.exported_types_changed = true;

        Ok(())
    }

    fn update_exported_type(
        &mut self,
        view: &queries::exported_types::ExportedTypeView,
        entry: &ExportedType,
    ) -> Result<(), ProjectStorageError> {
        let type_id = declare_type(self.connection, &entry.internal_name, entry.type_source_id)?;

        if view.type_id != type_id {
            self.handle_property_declarations_with_property_type(view.type_id)?;
            self.handle_alias_property_declarations_with_property_type(view.type_id)?;
            self.handle_bases(view.type_id)?;

            queries::exported_types::update_exported_type_name_type_id(
                self.connection,
                view.module_id,
                &view.name,
                view.version,
                type_id,
            )?;

            self.exported_types_changed = true;
            self.added_exported_type_names.push(info::ExportedTypeName {
                module_id: entry.module_id,
                type_id,
                name: entry.name.clone(),
                version: entry.version,
            });
            self.removed_exported_type_names
                .push(info::ExportedTypeName {
                    module_id: view.module_id,
                    type_id: view.type_id,
                    name: view.name.clone(),
                    version: view.version,
                });
        }

        if view.context_source_id != entry.context_source_id {
            queries::exported_types::update_exported_type_name_context_source_id(
                self.connection,
                view.module_id,
                &view.name,
                view.version,
                entry.context_source_id,
            )?;
        }

        Ok(())
    }

    fn remove_exported_type(
        &mut self,
        view: &queries::exported_types::ExportedTypeView,
    ) -> Result<(), ProjectStorageError> {
        self.handle_property_declarations_with_property_type(view.type_id)?;
        self.handle_alias_property_declarations_with_property_type(view.type_id)?;
        self.handle_bases(view.type_id)?;

        queries::exported_types::delete_exported_type_name(
            self.connection,
            view.module_id,
            &view.name,
            view.version,
        )?;

        self.removed_exported_type_names
            .push(info::ExportedTypeName {
                module_id: view.module_id,
                type_id: view.type_id,
                name: view.name.clone(),
                version: view.version,
            });
        self.exported_types_changed = true;

        Ok(())
    }
}
