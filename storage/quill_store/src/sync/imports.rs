//! Synchronization of document imports, module dependencies and the static
//! module-exported-imports graph.
//!
//! Inserting a direct import expands the module-exported graph reachable
//! from the imported module: every reachable `(module, version)` becomes an
//! indirect import linked to its parent through `parentImportId`, so
//! removing the direct import removes the whole family. Indirect imports
//! are inserted without an alias; they contribute bare names regardless of
//! how the parent import is qualified.

use quill_ids::{ImportId, SourceId};
use quill_sqlite::{insert_update_delete, UpdateChange};

use crate::error::ProjectStorageError;
use crate::package::{Import, ImportKind, SynchronizationPackage};
use crate::queries;

use super::{Relink, Synchronizer};

impl Synchronizer<'_> {
    pub(super) fn synchronize_imports(
        &mut self,
        package: &mut SynchronizationPackage,
    ) -> Result<(), ProjectStorageError> {
        self.synchronize_module_exported_imports(package)?;
        self.synchronize_document_imports(
            &mut package.imports,
            &package.updated_import_source_ids,
            ImportKind::Import,
            Relink::No,
        )?;
        self.synchronize_document_imports(
            &mut package.module_dependencies,
            &package.updated_module_dependency_source_ids,
            ImportKind::ModuleDependency,
            Relink::Yes,
        )?;

        Ok(())
    }

    fn synchronize_module_exported_imports(
        &mut self,
        package: &mut SynchronizationPackage,
    ) -> Result<(), ProjectStorageError> {
        package
            .module_exported_imports
            .sort_unstable_by_key(|import| (import.module_id, import.exported_module_id));

        let views = queries::imports::module_exported_import_views(
            self.connection,
            &package.updated_module_ids,
        )?;

        let connection = self.connection;
        insert_update_delete(
            views,
            &package.module_exported_imports,
            |view, import| {
                (view.module_id, view.exported_module_id)
                    .cmp(&(import.module_id, import.exported_module_id))
            },
            |import| queries::imports::insert_module_exported_import(connection, import),
            |_view, _import| Ok(UpdateChange::No),
            |view| {
                queries::imports::delete_module_exported_import(
                    connection,
                    view.module_exported_import_id,
                )
            },
        )
    }

    pub(super) fn synchronize_document_imports(
        &mut self,
        imports: &mut [Import],
        updated_source_ids: &[SourceId],
        kind: ImportKind,
        relink: Relink,
    ) -> Result<(), ProjectStorageError> {
        imports.sort_unstable_by(|first, second| {
            (
                first.source_id,
                first.module_id,
                &first.alias,
                first.version,
            )
                .cmp(&(
                    second.source_id,
                    second.module_id,
                    &second.alias,
                    second.version,
                ))
        });

        let views = queries::imports::import_views_for_context_source_ids(
            self.connection,
            updated_source_ids,
            kind,
        )?;

        // The merge callbacks need `&mut self` for the relink buckets, so
        // the merge join is written out instead of going through the
        // generic helper.
        let mut views_iter = views.iter();
        let mut imports_iter = imports.iter();
        let mut view = views_iter.next();
        let mut import = imports_iter.next();

        loop {
            match (view, import) {
                (Some(current_view), Some(current_import)) => {
                    let view_key = (
                        current_view.source_id,
                        current_view.module_id,
                        &current_view.alias,
                        current_view.version,
                    );
                    let import_key = (
                        current_import.source_id,
                        current_import.module_id,
                        &current_import.alias,
                        current_import.version,
                    );

                    match view_key.cmp(&import_key) {
                        std::cmp::Ordering::Less => {
                            self.remove_document_import(
                                current_view.import_id,
                                current_view.source_id,
                                relink,
                            )?;
                            view = views_iter.next();
                        }
                        std::cmp::Ordering::Greater => {
                            self.insert_document_import_with_expansion(
                                current_import,
                                kind,
                                relink,
                            )?;
                            import = imports_iter.next();
                        }
                        std::cmp::Ordering::Equal => {
                            view = views_iter.next();
                            import = imports_iter.next();
                        }
                    }
                }
                (Some(current_view), None) => {
                    self.remove_document_import(
                        current_view.import_id,
                        current_view.source_id,
                        relink,
                    )?;
                    view = views_iter.next();
                }
                (None, Some(current_import)) => {
                    self.insert_document_import_with_expansion(current_import, kind, relink)?;
                    import = imports_iter.next();
                }
                (None, None) => break,
            }
        }

        Ok(())
    }

    /// Insert a direct import plus every indirect import its module
    /// re-exports.
    fn insert_document_import_with_expansion(
        &mut self,
        import: &Import,
        kind: ImportKind,
        relink: Relink,
    ) -> Result<(), ProjectStorageError> {
        let import_id =
            self.insert_document_import(import, kind, import.module_id, ImportId::NULL, relink)?;

        let expansion = queries::imports::module_exported_import_expansion(
            self.connection,
            import.module_id,
            import.version,
        )?;

        let indirect_kind = match kind {
            ImportKind::Import | ImportKind::ModuleExportedImport => ImportKind::ModuleExportedImport,
            ImportKind::ModuleDependency | ImportKind::ModuleExportedModuleDependency => {
                ImportKind::ModuleExportedModuleDependency
            }
        };

        for (exported_module_id, version) in expansion {
            let indirect_import = Import {
                module_id: exported_module_id,
                version,
                source_id: import.source_id,
                context_source_id: import.context_source_id,
                alias: None,
            };

            self.insert_document_import(
                &indirect_import,
                indirect_kind,
                import.module_id,
                import_id,
                relink,
            )?;
        }

        Ok(())
    }

    fn insert_document_import(
        &mut self,
        import: &Import,
        kind: ImportKind,
        source_module_id: quill_ids::ModuleId,
        parent_import_id: ImportId,
        relink: Relink,
    ) -> Result<ImportId, ProjectStorageError> {
        if relink == Relink::Yes {
            self.handle_bases_with_source_id(import.source_id)?;
        }

        queries::imports::insert_document_import(
            self.connection,
            import,
            kind,
            source_module_id,
            parent_import_id,
        )
    }

    fn remove_document_import(
        &mut self,
        import_id: ImportId,
        source_id: SourceId,
        relink: Relink,
    ) -> Result<(), ProjectStorageError> {
        queries::imports::delete_document_import(self.connection, import_id)?;
        queries::imports::delete_document_imports_with_parent(self.connection, source_id, import_id)?;

        if relink == Relink::Yes {
            self.handle_bases_with_source_id(source_id)?;
        }

        Ok(())
    }
}
