//! Synchronization of type annotations, property-editor paths and project
//! entries.
//!
//! Annotations attach designer metadata to exported types; their trait bits
//! are written onto the annotated type and every heir reachable through
//! `prototypes` that has no annotation of its own. Rows whose type name no
//! longer resolves are dropped from the batch.

use std::cell::RefCell;

use quill_ids::{DirectoryPathId, SourceId, TypeId};
use quill_sqlite::{insert_update_delete, UpdateChange};

use crate::error::ProjectStorageError;
use crate::package::{ProjectEntryInfo, PropertyEditorPath, TypeAnnotation};
use crate::queries;

use super::{compare_invalid_are_true, Synchronizer};

impl Synchronizer<'_> {
    pub(super) fn synchronize_type_annotations(
        &mut self,
        annotations: &mut Vec<TypeAnnotation>,
        updated_source_ids: &[SourceId],
    ) -> Result<Vec<TypeId>, ProjectStorageError> {
        for annotation in annotations.iter_mut() {
            annotation.type_id = queries::exported_types::type_id_by_module_id_and_name(
                self.connection,
                annotation.module_id,
                &annotation.type_name,
            )?;
        }
        annotations.retain(|annotation| annotation.type_id.is_valid());
        annotations.sort_unstable_by_key(|annotation| annotation.type_id);

        let views =
            queries::annotations::annotation_views_for_source_ids(self.connection, updated_source_ids)?;

        let connection = self.connection;
        let updated_types: RefCell<Vec<TypeId>> = RefCell::new(Vec::new());

        insert_update_delete(
            views,
            annotations,
            |view, annotation| view.type_id.cmp(&annotation.type_id),
            |annotation| {
                if !annotation.source_id.is_valid() {
                    return Err(ProjectStorageError::TypeAnnotationHasInvalidSourceId);
                }

                queries::annotations::insert_type_annotation(connection, annotation)?;
                updated_types
                    .borrow_mut()
                    .extend(queries::annotations::propagate_annotation_traits_to_heirs(
                        connection,
                        annotation.type_id,
                        annotation.traits,
                    )?);

                Ok(())
            },
            |view, annotation| {
                let changed = view.type_name != annotation.type_name
                    || view.icon_path != annotation.icon_path
                    || view.item_library_json != annotation.item_library_json
                    || view.hints_json != annotation.hints_json;

                if changed {
                    queries::annotations::update_type_annotation(connection, annotation)?;
                }

                updated_types
                    .borrow_mut()
                    .extend(queries::annotations::propagate_annotation_traits_to_heirs(
                        connection,
                        annotation.type_id,
                        annotation.traits,
                    )?);

                if changed {
                    return Ok(UpdateChange::Update);
                }
                Ok(UpdateChange::No)
            },
            |view| {
                // The nearest annotated ancestor's traits take over for the
                // heirs of the removed annotation.
                let ancestor_traits =
                    queries::annotations::prototype_annotation_traits(connection, view.type_id)?;
                queries::annotations::delete_type_annotation(connection, view.type_id)?;
                queries::annotations::propagate_annotation_traits_to_heirs(
                    connection,
                    view.type_id,
                    ancestor_traits,
                )?;

                Ok(())
            },
        )?;

        Ok(updated_types.into_inner())
    }

    /// Types whose prototype changed but were not covered by the annotation
    /// merge pull their annotation traits from the nearest annotated
    /// ancestor.
    pub(super) fn update_annotations_type_traits_from_prototypes(
        &mut self,
        mut already_updated_types: Vec<TypeId>,
    ) -> Result<(), ProjectStorageError> {
        already_updated_types.sort_unstable();

        let mut updated_prototype_ids = std::mem::take(&mut self.updated_prototype_ids);
        updated_prototype_ids.sort_unstable();
        updated_prototype_ids.dedup();

        for type_id in &updated_prototype_ids {
            if already_updated_types.binary_search(type_id).is_ok() {
                continue;
            }

            let traits = queries::annotations::annotation_traits_from_prototype_chain(
                self.connection,
                *type_id,
            )?;
            if let Some(traits) = traits {
                queries::annotations::propagate_annotation_traits_to_heirs(
                    self.connection,
                    *type_id,
                    traits,
                )?;
            }
        }

        self.updated_prototype_ids = updated_prototype_ids;

        Ok(())
    }

    pub(super) fn synchronize_property_editor_paths(
        &mut self,
        paths: &mut Vec<PropertyEditorPath>,
        updated_directory_ids: &[DirectoryPathId],
    ) -> Result<(), ProjectStorageError> {
        for path in paths.iter_mut() {
            path.type_id = queries::exported_types::type_id_by_module_id_and_name(
                self.connection,
                path.module_id,
                &path.type_name,
            )?;
        }
        paths.sort_unstable_by_key(|path| path.type_id);

        let views = queries::property_editor_paths::views_for_directory_ids(
            self.connection,
            updated_directory_ids,
        )?;

        let connection = self.connection;
        insert_update_delete(
            views,
            paths,
            |view, path| view.type_id.cmp(&path.type_id),
            |path| {
                if path.type_id.is_valid() {
                    queries::property_editor_paths::insert_path(
                        connection,
                        path.type_id,
                        path.path_source_id,
                        path.directory_id,
                    )?;
                }
                Ok(())
            },
            |view, path| {
                if path.path_source_id != view.path_source_id
                    || path.directory_id != view.directory_id
                {
                    queries::property_editor_paths::update_path(
                        connection,
                        path.type_id,
                        path.path_source_id,
                        path.directory_id,
                    )?;
                    return Ok(UpdateChange::Update);
                }
                Ok(UpdateChange::No)
            },
            |view| queries::property_editor_paths::delete_path(connection, view.type_id),
        )
    }

    pub(super) fn synchronize_project_entry_infos(
        &mut self,
        entries: &mut [ProjectEntryInfo],
        updated_context_source_ids: &[SourceId],
    ) -> Result<(), ProjectStorageError> {
        entries.sort_unstable_by_key(|entry| (entry.context_source_id, entry.source_id));

        let views = queries::project_entries::entries_for_context_source_ids(
            self.connection,
            updated_context_source_ids,
        )?;

        let connection = self.connection;
        insert_update_delete(
            views,
            entries,
            |view, entry| {
                (view.context_source_id, view.source_id)
                    .cmp(&(entry.context_source_id, entry.source_id))
            },
            |entry| {
                if !entry.context_source_id.is_valid() {
                    return Err(ProjectStorageError::ProjectEntryInfoHasInvalidContextSourceId);
                }
                if !entry.source_id.is_valid() {
                    return Err(ProjectStorageError::ProjectEntryInfoHasInvalidSourceId);
                }

                queries::project_entries::insert_entry(connection, entry)
            },
            |view, entry| {
                if view.file_type != entry.file_type
                    || !compare_invalid_are_true(view.module_id, entry.module_id)
                {
                    queries::project_entries::update_entry(connection, entry)?;
                    return Ok(UpdateChange::Update);
                }
                Ok(UpdateChange::No)
            },
            |view| {
                queries::project_entries::delete_entry(
                    connection,
                    view.context_source_id,
                    view.source_id,
                )
            },
        )
    }
}
