//! Shared fixtures for the storage integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use quill_store::{
    info, Database, DirectoryPathId, ErrorNotifier, ExportedType, FileNameId, Import,
    ImportedTypeName, Module, ModuleId, ModuleKind, ProjectStorage, ProjectStorageObserver,
    PropertyDeclaration, PropertyDeclarationTraits, SourceId, SynchronizationPackage, Type, TypeId,
    TypeKind, TypeTraits, Version,
};

/// A source id for file `file` in directory `directory`.
pub fn source(directory: u32, file: u32) -> SourceId {
    SourceId::new(DirectoryPathId::new(directory), FileNameId::new(file))
}

/// A directory-only (context) source id.
pub fn context(directory: u32) -> SourceId {
    SourceId::from_directory(DirectoryPathId::new(directory))
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Notified {
    TypeNameCannotBeResolved { type_name: String, source_id: SourceId },
    PropertyNameDoesNotExist { property_name: String, source_id: SourceId },
    MissingDefaultProperty { type_name: String, property_name: String },
    PrototypeCycle { type_name: String },
    AliasCycle { type_name: String, property_name: String },
    ExportedTypeNameIsDuplicate { module_id: ModuleId, type_name: String },
}

/// Error notifier that records every notification for later assertions.
#[derive(Default)]
pub struct RecordingErrorNotifier {
    pub notifications: Mutex<Vec<Notified>>,
}

impl RecordingErrorNotifier {
    pub fn take(&self) -> Vec<Notified> {
        std::mem::take(&mut self.notifications.lock())
    }

    pub fn contains(&self, notification: &Notified) -> bool {
        self.notifications.lock().contains(notification)
    }
}

impl ErrorNotifier for RecordingErrorNotifier {
    fn type_name_cannot_be_resolved(&self, type_name: &str, source_id: SourceId) {
        self.notifications
            .lock()
            .push(Notified::TypeNameCannotBeResolved {
                type_name: type_name.to_owned(),
                source_id,
            });
    }

    fn property_name_does_not_exist(&self, property_name: &str, source_id: SourceId) {
        self.notifications
            .lock()
            .push(Notified::PropertyNameDoesNotExist {
                property_name: property_name.to_owned(),
                source_id,
            });
    }

    fn missing_default_property(&self, type_name: &str, property_name: &str, _source_id: SourceId) {
        self.notifications
            .lock()
            .push(Notified::MissingDefaultProperty {
                type_name: type_name.to_owned(),
                property_name: property_name.to_owned(),
            });
    }

    fn prototype_cycle(&self, type_name: &str, _source_id: SourceId) {
        self.notifications.lock().push(Notified::PrototypeCycle {
            type_name: type_name.to_owned(),
        });
    }

    fn alias_cycle(&self, type_name: &str, property_name: &str, _source_id: SourceId) {
        self.notifications.lock().push(Notified::AliasCycle {
            type_name: type_name.to_owned(),
            property_name: property_name.to_owned(),
        });
    }

    fn exported_type_name_is_duplicate(&self, module_id: ModuleId, type_name: &str) {
        self.notifications
            .lock()
            .push(Notified::ExportedTypeNameIsDuplicate {
                module_id,
                type_name: type_name.to_owned(),
            });
    }
}

/// Observer that records every notification.
#[derive(Default)]
pub struct RecordingObserver {
    pub removed_type_ids: Mutex<Vec<Vec<TypeId>>>,
    pub exported_type_name_changes: Mutex<Vec<(Vec<info::ExportedTypeName>, Vec<info::ExportedTypeName>)>>,
}

impl ProjectStorageObserver for RecordingObserver {
    fn removed_type_ids(&self, type_ids: &[TypeId]) {
        self.removed_type_ids.lock().push(type_ids.to_vec());
    }

    fn exported_type_names_changed(
        &self,
        added: &[info::ExportedTypeName],
        removed: &[info::ExportedTypeName],
    ) {
        self.exported_type_name_changes
            .lock()
            .push((added.to_vec(), removed.to_vec()));
    }
}

pub struct Fixture {
    pub storage: ProjectStorage,
    pub notifier: Arc<RecordingErrorNotifier>,
    pub observer: Arc<RecordingObserver>,
}

/// Route storage tracing to the test output when `RUST_LOG` asks for it.
fn init_tracing() {
    static TRACING: std::sync::Once = std::sync::Once::new();
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();

        let notifier = Arc::new(RecordingErrorNotifier::default());
        let observer = Arc::new(RecordingObserver::default());

        let database = Database::in_memory().expect("in-memory database opens");
        let mut storage =
            ProjectStorage::new(database, notifier.clone()).expect("storage initializes");
        storage.add_observer(observer.clone());

        Self {
            storage,
            notifier,
            observer,
        }
    }

    pub fn module_id(&self, name: &str) -> ModuleId {
        self.storage
            .module_id(name, ModuleKind::QmlLibrary)
            .expect("module id")
    }

    /// The current id of the type exported as `name` from `module`, any
    /// version.
    pub fn exported_type_id(&self, module: &str, name: &str) -> TypeId {
        let module_id = self.module_id(module);
        self.storage
            .type_id(module_id, name, Version::WILDCARD)
            .expect("type id lookup")
    }

    /// Find a declared type id by its internal name.
    pub fn declared_type_id(&self, type_name: &str) -> TypeId {
        self.storage
            .fetch_types()
            .expect("fetch types")
            .into_iter()
            .find(|fetched| fetched.name == type_name)
            .map(|fetched| fetched.type_id)
            .unwrap_or(TypeId::NULL)
    }

    pub fn fetched_type(&self, type_id: TypeId) -> info::FetchedType {
        self.storage
            .fetch_type(type_id)
            .expect("fetch type")
            .expect("type exists")
    }

    #[track_caller]
    pub fn module(&self, module_id: ModuleId) -> Module {
        self.storage.module(module_id).expect("module")
    }
}

/// A reference type declaration.
pub fn reference_type(type_name: &str, source_id: SourceId) -> Type {
    Type {
        type_name: type_name.to_owned(),
        source_id,
        traits: TypeTraits::new(TypeKind::Reference),
        ..Type::default()
    }
}

/// A reference type with a prototype reference.
pub fn derived_type(type_name: &str, source_id: SourceId, prototype: &str) -> Type {
    Type {
        prototype: Some(ImportedTypeName::exported(prototype)),
        ..reference_type(type_name, source_id)
    }
}

/// An exported-type binding backed by the type named `internal_name`.
pub fn exported(
    module_id: ModuleId,
    name: &str,
    version: Version,
    type_source_id: SourceId,
    internal_name: &str,
) -> ExportedType {
    ExportedType {
        module_id,
        name: name.to_owned(),
        version,
        type_source_id,
        internal_name: internal_name.to_owned(),
        context_source_id: type_source_id,
    }
}

/// A regular property declaration.
pub fn property(name: &str, type_name: &str) -> PropertyDeclaration {
    PropertyDeclaration {
        name: name.to_owned(),
        type_name: ImportedTypeName::exported(type_name),
        traits: PropertyDeclarationTraits::empty(),
        alias: None,
    }
}

/// An alias property declaration `alias name: target.property(.tail)`.
pub fn alias_property(
    name: &str,
    target_type_name: &str,
    target_property: &str,
    tail: Option<&str>,
) -> PropertyDeclaration {
    PropertyDeclaration {
        name: name.to_owned(),
        type_name: ImportedTypeName::exported(target_type_name),
        traits: PropertyDeclarationTraits::empty(),
        alias: Some(quill_store::AliasPath {
            property: target_property.to_owned(),
            tail: tail.map(str::to_owned),
        }),
    }
}

/// A wildcard import of `module_id` in `source_id`.
pub fn wildcard_import(module_id: ModuleId, source_id: SourceId) -> Import {
    Import::new(module_id, Version::WILDCARD, source_id)
}

/// Shorthand for an empty package extended by the caller.
pub fn package() -> SynchronizationPackage {
    SynchronizationPackage::default()
}
