//! The public storage facade.
//!
//! [`ProjectStorage`] owns the database connection, the module cache, the
//! inheritance cache and the common-type cache. `synchronize` is the main
//! write entry point and runs inside one immediate transaction; the lookup
//! operations are read-only and may run on the calling thread at any time
//! between synchronizations.

use std::sync::Arc;

use quill_ids::{
    DirectoryPathId, ImportId, ImportedTypeNameId, ModuleId, PropertyDeclarationId, SourceId,
    TypeId, Version,
};
use quill_sqlite::{with_deferred_transaction, with_immediate_transaction};

use crate::bases_cache::BasesCache;
use crate::common_type_cache::CommonTypeCache;
use crate::database::Database;
use crate::error::{ErrorNotifier, ProjectStorageError};
use crate::info;
use crate::modules::{Module, ModuleKind, ModulesStorage};
use crate::observer::{ObserverBus, ProjectStorageObserver};
use crate::package::{
    EnumerationDeclaration, FileStatus, FileType, FunctionDeclaration, Import, ProjectEntryInfo,
    SignalDeclaration, SynchronizationPackage, TypeNameKind,
};
use crate::queries;
use crate::sync::Synchronizer;

pub struct ProjectStorage {
    database: Database,
    error_notifier: Arc<dyn ErrorNotifier>,
    modules: ModulesStorage,
    common_type_cache: CommonTypeCache,
    bases_cache: BasesCache,
    observers: ObserverBus,
}

impl ProjectStorage {
    /// Wrap an open database, populating the module cache and refreshing
    /// the derived caches from persisted state.
    pub fn new(
        database: Database,
        error_notifier: Arc<dyn ErrorNotifier>,
    ) -> Result<Self, ProjectStorageError> {
        let modules = ModulesStorage::populate(database.connection())?;
        let common_type_cache = CommonTypeCache::new();
        let bases_cache = BasesCache::new();

        bases_cache.reset(database.connection())?;
        common_type_cache.refresh(database.connection(), &modules)?;

        Ok(Self {
            database,
            error_notifier,
            modules,
            common_type_cache,
            bases_cache,
            observers: ObserverBus::default(),
        })
    }

    /// Synchronize a batch of changes against persisted state.
    ///
    /// Runs inside one immediate transaction; a fatal error rolls back
    /// everything. Observers are notified after a successful commit.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn synchronize(
        &mut self,
        mut package: SynchronizationPackage,
    ) -> Result<(), ProjectStorageError> {
        let Self {
            database,
            error_notifier,
            modules,
            common_type_cache,
            bases_cache,
            observers,
        } = self;

        let outcome = with_immediate_transaction(database.connection_mut(), |transaction| {
            let synchronizer = Synchronizer::new(transaction, error_notifier.as_ref());
            let outcome = synchronizer.run(&mut package)?;

            bases_cache.reset(transaction)?;
            common_type_cache.refresh(transaction, modules)?;

            Ok::<_, ProjectStorageError>(outcome)
        })?;

        if !outcome.deleted_type_ids.is_empty() {
            observers.notify_removed_type_ids(&outcome.deleted_type_ids);
        }
        if outcome.exported_types_changed {
            observers.notify_exported_type_names_changed(
                &outcome.added_exported_type_names,
                &outcome.removed_exported_type_names,
            );
        }

        Ok(())
    }

    /// Synchronize the imports of a single document.
    #[tracing::instrument(level = "debug", skip_all, fields(imports = imports.len()))]
    pub fn synchronize_document_imports(
        &mut self,
        mut imports: Vec<Import>,
        source_id: SourceId,
    ) -> Result<(), ProjectStorageError> {
        let Self {
            database,
            error_notifier,
            ..
        } = self;

        with_immediate_transaction(database.connection_mut(), |transaction| {
            let synchronizer = Synchronizer::new(transaction, error_notifier.as_ref());
            synchronizer.run_document_imports(&mut imports, source_id)
        })
    }

    pub fn add_observer(&mut self, observer: Arc<dyn ProjectStorageObserver>) {
        self.observers.add(observer);
    }

    pub fn remove_observer(&mut self, observer: &Arc<dyn ProjectStorageObserver>) {
        self.observers.remove(observer);
    }

    pub fn set_error_notifier(&mut self, error_notifier: Arc<dyn ErrorNotifier>) {
        self.error_notifier = error_notifier;
    }

    // --- modules ---------------------------------------------------------

    /// Look up (or create) the module id for `(name, kind)`.
    pub fn module_id(&self, name: &str, kind: ModuleKind) -> Result<ModuleId, ProjectStorageError> {
        self.modules
            .module_id(self.database.connection(), name, kind)
    }

    pub fn module(&self, module_id: ModuleId) -> Result<Module, ProjectStorageError> {
        self.modules.module(self.database.connection(), module_id)
    }

    pub fn module_ids_starts_with(&self, prefix: &str, kind: ModuleKind) -> Vec<ModuleId> {
        self.modules.module_ids_starts_with(prefix, kind)
    }

    // --- types -----------------------------------------------------------

    /// The type exported as `name` from `module_id`, honouring version
    /// wildcards.
    pub fn type_id(
        &self,
        module_id: ModuleId,
        name: &str,
        version: Version,
    ) -> Result<TypeId, ProjectStorageError> {
        let connection = self.database.connection();

        if !version.minor.is_wildcard() {
            queries::exported_types::type_id_by_module_id_and_name_and_version(
                connection, module_id, name, version,
            )
        } else if !version.major.is_wildcard() {
            queries::exported_types::type_id_by_module_id_and_name_and_major(
                connection,
                module_id,
                name,
                version.major,
            )
        } else {
            queries::exported_types::type_id_by_module_id_and_name(connection, module_id, name)
        }
    }

    pub fn type_ids(&self, module_id: ModuleId) -> Result<Vec<TypeId>, ProjectStorageError> {
        queries::exported_types::type_ids_by_module_id(self.database.connection(), module_id)
    }

    /// Singleton types visible through the imports of a source.
    pub fn singleton_type_ids(
        &self,
        source_id: SourceId,
    ) -> Result<Vec<TypeId>, ProjectStorageError> {
        queries::types::singleton_type_ids_by_source_id(self.database.connection(), source_id)
    }

    pub fn type_info(&self, type_id: TypeId) -> Result<Option<info::Type>, ProjectStorageError> {
        queries::types::info_type(self.database.connection(), type_id)
    }

    /// Full type readback, shaped like the synchronization input.
    pub fn fetch_type(
        &self,
        type_id: TypeId,
    ) -> Result<Option<info::FetchedType>, ProjectStorageError> {
        let connection = self.database.connection();

        with_deferred_transaction(connection, |connection| {
            let Some(mut fetched) = queries::types::fetched_type(connection, type_id)? else {
                return Ok(None);
            };

            fetched.prototype_id = queries::bases::prototype_id(connection, type_id)?;
            fetched.extension_id = queries::bases::extension_id(connection, type_id)?;

            Ok(Some(fetched))
        })
    }

    pub fn fetch_types(&self) -> Result<Vec<info::FetchedType>, ProjectStorageError> {
        let connection = self.database.connection();

        with_deferred_transaction(connection, |connection| {
            let mut types = queries::types::fetched_types(connection)?;

            for fetched in &mut types {
                fetched.prototype_id = queries::bases::prototype_id(connection, fetched.type_id)?;
                fetched.extension_id = queries::bases::extension_id(connection, fetched.type_id)?;
            }

            Ok(types)
        })
    }

    // --- exported and imported type names --------------------------------

    pub fn exported_type_names(
        &self,
        type_id: TypeId,
    ) -> Result<Vec<info::ExportedTypeName>, ProjectStorageError> {
        queries::exported_types::exported_type_names_by_type_id(self.database.connection(), type_id)
    }

    /// Exported names of a type that are visible from `source_id`.
    pub fn exported_type_names_for_source_id(
        &self,
        type_id: TypeId,
        source_id: SourceId,
    ) -> Result<Vec<info::ExportedTypeName>, ProjectStorageError> {
        queries::exported_types::exported_type_names_by_type_id_and_source_id(
            self.database.connection(),
            type_id,
            source_id,
        )
    }

    /// The exported name an imported type name currently resolves to.
    pub fn exported_type_name(
        &self,
        imported_type_name_id: ImportedTypeNameId,
    ) -> Result<Option<info::ExportedTypeName>, ProjectStorageError> {
        with_deferred_transaction(self.database.connection(), |connection| {
            queries::imported_type_names::exported_type_name(connection, imported_type_name_id)
        })
    }

    /// Intern an imported type name scoped to an aliased import.
    pub fn imported_type_name_id(
        &self,
        import_id: ImportId,
        type_name: &str,
    ) -> Result<ImportedTypeNameId, ProjectStorageError> {
        with_deferred_transaction(self.database.connection(), |connection| {
            queries::imported_type_names::fetch_qualified_imported_type_name_id(
                connection, import_id, type_name,
            )
        })
    }

    /// Intern a bare imported type name scoped to a source.
    pub fn imported_type_name_id_for_source_id(
        &self,
        source_id: SourceId,
        type_name: &str,
    ) -> Result<ImportedTypeNameId, ProjectStorageError> {
        with_deferred_transaction(self.database.connection(), |connection| {
            queries::imported_type_names::fetch_imported_type_name_id(
                connection,
                TypeNameKind::Exported,
                source_id.raw(),
                type_name,
            )
        })
    }

    // --- imports ---------------------------------------------------------

    pub fn import_id(&self, import: &Import) -> Result<ImportId, ProjectStorageError> {
        with_deferred_transaction(self.database.connection(), |connection| {
            queries::imports::import_id_for_import(connection, import)
        })
    }

    pub fn import_id_by_alias(
        &self,
        source_id: SourceId,
        alias: &str,
    ) -> Result<ImportId, ProjectStorageError> {
        with_deferred_transaction(self.database.connection(), |connection| {
            queries::imports::import_id_by_source_id_and_alias(connection, source_id, alias)
        })
    }

    /// The source module of the import that made `module_id` visible in
    /// `source_id`.
    pub fn import_module_id(
        &self,
        source_id: SourceId,
        module_id: ModuleId,
    ) -> Result<ModuleId, ProjectStorageError> {
        queries::imports::source_module_id(self.database.connection(), source_id, module_id)
    }

    /// The direct import that (possibly indirectly) made `module_id`
    /// visible in `source_id`, found by walking `parentImportId`.
    pub fn original_import(
        &self,
        source_id: SourceId,
        module_id: ModuleId,
    ) -> Result<Option<Import>, ProjectStorageError> {
        let connection = self.database.connection();

        let mut import_id =
            queries::imports::import_id_for_source_and_module(connection, source_id, module_id)?;

        while import_id.is_valid() {
            let parent_import_id = queries::imports::parent_import_id(connection, import_id)?;
            if !parent_import_id.is_valid() {
                break;
            }
            import_id = parent_import_id;
        }

        queries::imports::document_import_by_import_id(connection, import_id)
    }

    pub fn document_imports(&self) -> Result<Vec<Import>, ProjectStorageError> {
        queries::imports::all_document_imports(self.database.connection())
    }

    // --- property declarations -------------------------------------------

    /// Property declaration ids of a type and all its bases, sorted.
    pub fn property_declaration_ids(
        &self,
        type_id: TypeId,
    ) -> Result<Vec<PropertyDeclarationId>, ProjectStorageError> {
        let mut ids = with_deferred_transaction(self.database.connection(), |connection| {
            let mut ids = queries::properties::local_property_declaration_ids(connection, type_id)?;

            queries::bases::each_prototype_and_extension_id(connection, type_id, |base_id| {
                ids.extend(queries::properties::local_property_declaration_ids(
                    connection, base_id,
                )?);
                Ok(true)
            })?;

            Ok::<_, ProjectStorageError>(ids)
        })?;

        ids.sort_unstable();

        Ok(ids)
    }

    pub fn local_property_declaration_ids(
        &self,
        type_id: TypeId,
    ) -> Result<Vec<PropertyDeclarationId>, ProjectStorageError> {
        queries::properties::local_property_declaration_ids(self.database.connection(), type_id)
    }

    /// The declaration of `name` on the type or the nearest base declaring
    /// it.
    pub fn property_declaration_id(
        &self,
        type_id: TypeId,
        property_name: &str,
    ) -> Result<PropertyDeclarationId, ProjectStorageError> {
        with_deferred_transaction(self.database.connection(), |connection| {
            queries::properties::property_declaration_id(connection, type_id, property_name)
        })
    }

    pub fn local_property_declaration_id(
        &self,
        type_id: TypeId,
        property_name: &str,
    ) -> Result<PropertyDeclarationId, ProjectStorageError> {
        queries::properties::property_declaration_id_by_type_and_name(
            self.database.connection(),
            type_id,
            property_name,
        )
    }

    /// The default property of the type or the nearest base that declares
    /// one.
    pub fn default_property_declaration_id(
        &self,
        type_id: TypeId,
    ) -> Result<PropertyDeclarationId, ProjectStorageError> {
        with_deferred_transaction(self.database.connection(), |connection| {
            queries::properties::default_property_declaration_id(connection, type_id)
        })
    }

    pub fn property_declaration(
        &self,
        property_declaration_id: PropertyDeclarationId,
    ) -> Result<Option<info::PropertyDeclaration>, ProjectStorageError> {
        queries::properties::property_declaration_info(
            self.database.connection(),
            property_declaration_id,
        )
    }

    pub fn property_name(
        &self,
        property_declaration_id: PropertyDeclarationId,
    ) -> Result<Option<String>, ProjectStorageError> {
        queries::properties::property_name(self.database.connection(), property_declaration_id)
    }

    // --- declarations ----------------------------------------------------

    pub fn signal_declaration_names(
        &self,
        type_id: TypeId,
    ) -> Result<Vec<String>, ProjectStorageError> {
        queries::declarations::signal_declaration_names(self.database.connection(), type_id)
    }

    pub fn function_declaration_names(
        &self,
        type_id: TypeId,
    ) -> Result<Vec<String>, ProjectStorageError> {
        queries::declarations::function_declaration_names(self.database.connection(), type_id)
    }

    pub fn fetch_function_declarations(
        &self,
        type_id: TypeId,
    ) -> Result<Vec<FunctionDeclaration>, ProjectStorageError> {
        queries::declarations::function_declarations(self.database.connection(), type_id)
    }

    pub fn fetch_signal_declarations(
        &self,
        type_id: TypeId,
    ) -> Result<Vec<SignalDeclaration>, ProjectStorageError> {
        queries::declarations::signal_declarations(self.database.connection(), type_id)
    }

    pub fn fetch_enumeration_declarations(
        &self,
        type_id: TypeId,
    ) -> Result<Vec<EnumerationDeclaration>, ProjectStorageError> {
        queries::declarations::enumeration_declarations(self.database.connection(), type_id)
    }

    // --- inheritance -----------------------------------------------------

    /// The transitive prototype chain (excluding the type itself).
    pub fn prototype_ids(&self, type_id: TypeId) -> Result<Vec<TypeId>, ProjectStorageError> {
        queries::bases::prototype_chain_ids(self.database.connection(), type_id)
    }

    pub fn prototype_and_self_ids(
        &self,
        type_id: TypeId,
    ) -> Result<Vec<TypeId>, ProjectStorageError> {
        let mut ids = vec![type_id];
        ids.extend(queries::bases::prototype_chain_ids(
            self.database.connection(),
            type_id,
        )?);

        Ok(ids)
    }

    /// Every type that transitively derives from `type_id`.
    pub fn heir_ids(&self, type_id: TypeId) -> Result<Vec<TypeId>, ProjectStorageError> {
        queries::bases::heir_ids(self.database.connection(), type_id)
    }

    /// The first of `base_type_ids` that `type_id` is or derives from, or
    /// the null id. At most twelve candidates are supported.
    pub fn based_on(
        &self,
        type_id: TypeId,
        base_type_ids: &[TypeId],
    ) -> Result<TypeId, ProjectStorageError> {
        self.bases_cache
            .based_on(self.database.connection(), type_id, base_type_ids)
    }

    /// Whether every one of `type_ids` is or derives from `base_type_id`.
    pub fn inherits_all(
        &self,
        type_ids: &[TypeId],
        base_type_id: TypeId,
    ) -> Result<bool, ProjectStorageError> {
        self.bases_cache
            .inherits_all(self.database.connection(), type_ids, base_type_id)
    }

    // --- annotations and metadata ----------------------------------------

    pub fn type_icon_path(&self, type_id: TypeId) -> Result<String, ProjectStorageError> {
        queries::annotations::type_icon_path(self.database.connection(), type_id)
    }

    pub fn type_hints(&self, type_id: TypeId) -> Result<Vec<info::TypeHint>, ProjectStorageError> {
        queries::annotations::type_hints(self.database.connection(), type_id)
    }

    pub fn item_library_entries(
        &self,
        type_id: TypeId,
    ) -> Result<Vec<info::ItemLibraryEntry>, ProjectStorageError> {
        queries::annotations::item_library_entries_by_type_id(self.database.connection(), type_id)
    }

    pub fn item_library_entries_for_source_id(
        &self,
        source_id: SourceId,
    ) -> Result<Vec<info::ItemLibraryEntry>, ProjectStorageError> {
        queries::annotations::item_library_entries_by_source_id(
            self.database.connection(),
            source_id,
        )
    }

    pub fn all_item_library_entries(
        &self,
    ) -> Result<Vec<info::ItemLibraryEntry>, ProjectStorageError> {
        queries::annotations::all_item_library_entries(self.database.connection())
    }

    /// Palette entries contributed by path-library modules imported from
    /// `source_id`; only capitalised (instantiable) names qualify.
    pub fn directory_imports_item_library_entries(
        &self,
        source_id: SourceId,
    ) -> Result<Vec<info::ItemLibraryEntry>, ProjectStorageError> {
        let connection = self.database.connection();
        let rows = queries::annotations::directory_import_rows_by_source_id(connection, source_id)?;

        let mut entries = Vec::new();
        for (type_id, type_name, module_id, component_source_id) in rows {
            if !type_name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                continue;
            }

            let module = self.modules.module(connection, module_id)?;
            if module.kind != ModuleKind::PathLibrary {
                continue;
            }

            entries.push(info::ItemLibraryEntry {
                type_id,
                type_name: type_name.clone(),
                name: type_name,
                import: module.name,
                module_kind: Some(ModuleKind::PathLibrary),
                component_source_id,
                ..info::ItemLibraryEntry::default()
            });
        }

        Ok(entries)
    }

    pub fn type_annotation_source_ids(
        &self,
        directory_id: DirectoryPathId,
    ) -> Result<Vec<SourceId>, ProjectStorageError> {
        queries::annotations::annotation_source_ids(self.database.connection(), directory_id)
    }

    pub fn type_annotation_directory_ids(
        &self,
    ) -> Result<Vec<DirectoryPathId>, ProjectStorageError> {
        queries::annotations::annotation_directory_ids(self.database.connection())
    }

    // --- property editor paths -------------------------------------------

    pub fn property_editor_path_id(
        &self,
        type_id: TypeId,
    ) -> Result<SourceId, ProjectStorageError> {
        queries::property_editor_paths::path_source_id(self.database.connection(), type_id)
    }

    /// Point a type at its property-editor document outside the batch
    /// pipeline.
    pub fn set_property_editor_path_id(
        &mut self,
        type_id: TypeId,
        path_source_id: SourceId,
    ) -> Result<(), ProjectStorageError> {
        with_immediate_transaction(self.database.connection_mut(), |connection| {
            queries::property_editor_paths::upsert_path_source_id(
                connection,
                type_id,
                path_source_id,
            )
        })
    }

    // --- file statuses and project entries -------------------------------

    pub fn file_status(
        &self,
        source_id: SourceId,
    ) -> Result<Option<FileStatus>, ProjectStorageError> {
        queries::file_statuses::file_status(self.database.connection(), source_id)
    }

    pub fn all_file_statuses(&self) -> Result<Vec<FileStatus>, ProjectStorageError> {
        queries::file_statuses::all_file_statuses(self.database.connection())
    }

    pub fn project_entry_info(
        &self,
        source_id: SourceId,
    ) -> Result<Option<ProjectEntryInfo>, ProjectStorageError> {
        queries::project_entries::entry_for_source_id(self.database.connection(), source_id)
    }

    pub fn project_entry_infos(
        &self,
        context_source_id: SourceId,
    ) -> Result<Vec<ProjectEntryInfo>, ProjectStorageError> {
        queries::project_entries::entries_for_context_source_id(
            self.database.connection(),
            context_source_id,
        )
    }

    pub fn project_entry_infos_for_file_type(
        &self,
        context_source_id: SourceId,
        file_type: FileType,
    ) -> Result<Vec<ProjectEntryInfo>, ProjectStorageError> {
        queries::project_entries::entries_for_context_source_id_and_file_type(
            self.database.connection(),
            context_source_id,
            file_type,
        )
    }

    pub fn subdirectory_ids(
        &self,
        directory_id: DirectoryPathId,
    ) -> Result<Vec<DirectoryPathId>, ProjectStorageError> {
        queries::project_entries::subdirectory_ids(self.database.connection(), directory_id)
    }

    // --- common types ----------------------------------------------------

    /// Hot lookup for well-known types, served from the common-type cache.
    pub fn common_type_id(
        &self,
        module_name: &str,
        module_kind: ModuleKind,
        type_name: &str,
    ) -> TypeId {
        self.common_type_cache
            .type_id(module_name, module_kind, type_name)
    }
}
