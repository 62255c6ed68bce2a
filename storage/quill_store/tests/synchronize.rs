//! End-to-end synchronization scenarios.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use quill_store::{
    ModuleExportedImport, ProjectStorageError, SourceId, SynchronizationPackage, Type, TypeId,
    Version,
};

/// Creates `Item` exported from QtQuick and `Root` deriving from it in a
/// second document.
fn create_and_resolve_package(fixture: &Fixture) -> SynchronizationPackage {
    let qtquick = fixture.module_id("QtQuick");
    let item_source = source(1, 1);
    let root_source = source(1, 2);

    let mut package = package();
    package.types = vec![
        reference_type("Item", item_source),
        derived_type("Root", root_source, "Item"),
    ];
    package.updated_type_source_ids = vec![item_source, root_source];
    package.exported_types = vec![exported(
        qtquick,
        "Item",
        Version::new(2, 0),
        item_source,
        "Item",
    )];
    package.updated_exported_type_source_ids = vec![item_source];
    package.imports = vec![wildcard_import(qtquick, root_source)];
    package.updated_import_source_ids = vec![root_source];

    package
}

#[test]
fn create_and_resolve_binds_the_prototype() {
    let mut fixture = Fixture::new();
    let package = create_and_resolve_package(&fixture);

    fixture.storage.synchronize(package).unwrap();

    let item = fixture.exported_type_id("QtQuick", "Item");
    let root = fixture.declared_type_id("Root");
    assert!(item.is_valid());
    assert!(root.is_valid());
    assert_eq!(fixture.fetched_type(root).prototype_id, item);
    assert_eq!(fixture.storage.based_on(root, &[item]).unwrap(), item);
}

#[test]
fn version_choice_takes_the_highest_minor_within_the_import() {
    let mut fixture = Fixture::new();
    let qtquick = fixture.module_id("QtQuick");
    let item_source = source(1, 1);
    let root_source = source(1, 2);

    let mut package = package();
    package.types = vec![
        reference_type("Item20", item_source),
        reference_type("Item215", item_source),
        derived_type("Root", root_source, "Item"),
    ];
    package.updated_type_source_ids = vec![item_source, root_source];
    package.exported_types = vec![
        exported(qtquick, "Item", Version::new(2, 0), item_source, "Item20"),
        exported(qtquick, "Item", Version::new(2, 15), item_source, "Item215"),
    ];
    package.updated_exported_type_source_ids = vec![item_source];
    package.imports = vec![quill_store::Import::new(
        qtquick,
        Version::new(2, 10),
        root_source,
    )];
    package.updated_import_source_ids = vec![root_source];

    fixture.storage.synchronize(package).unwrap();

    let root = fixture.declared_type_id("Root");
    let item20 = fixture.declared_type_id("Item20");
    assert_eq!(fixture.fetched_type(root).prototype_id, item20);
}

#[test]
fn version_choice_with_wildcard_minor_takes_the_latest() {
    let mut fixture = Fixture::new();
    let qtquick = fixture.module_id("QtQuick");
    let item_source = source(1, 1);
    let root_source = source(1, 2);

    let mut package = package();
    package.types = vec![
        reference_type("Item20", item_source),
        reference_type("Item215", item_source),
        derived_type("Root", root_source, "Item"),
    ];
    package.updated_type_source_ids = vec![item_source, root_source];
    package.exported_types = vec![
        exported(qtquick, "Item", Version::new(2, 0), item_source, "Item20"),
        exported(qtquick, "Item", Version::new(2, 15), item_source, "Item215"),
    ];
    package.updated_exported_type_source_ids = vec![item_source];
    package.imports = vec![quill_store::Import::new(
        qtquick,
        Version::major_only(2),
        root_source,
    )];
    package.updated_import_source_ids = vec![root_source];

    fixture.storage.synchronize(package).unwrap();

    let root = fixture.declared_type_id("Root");
    let item215 = fixture.declared_type_id("Item215");
    assert_eq!(fixture.fetched_type(root).prototype_id, item215);
}

#[test]
fn version_lookup_honours_wildcards() {
    let mut fixture = Fixture::new();
    let package = {
        let qtquick = fixture.module_id("QtQuick");
        let item_source = source(1, 1);

        let mut package = package();
        package.types = vec![
            reference_type("Item20", item_source),
            reference_type("Item215", item_source),
        ];
        package.updated_type_source_ids = vec![item_source];
        package.exported_types = vec![
            exported(qtquick, "Item", Version::new(2, 0), item_source, "Item20"),
            exported(qtquick, "Item", Version::new(2, 15), item_source, "Item215"),
        ];
        package.updated_exported_type_source_ids = vec![item_source];
        package
    };

    fixture.storage.synchronize(package).unwrap();

    let qtquick = fixture.module_id("QtQuick");
    let item20 = fixture.declared_type_id("Item20");
    let item215 = fixture.declared_type_id("Item215");

    let exact = fixture
        .storage
        .type_id(qtquick, "Item", Version::new(2, 10))
        .unwrap();
    let major_only = fixture
        .storage
        .type_id(qtquick, "Item", Version::major_only(2))
        .unwrap();
    let any = fixture
        .storage
        .type_id(qtquick, "Item", Version::WILDCARD)
        .unwrap();

    assert_eq!(exact, item20);
    assert_eq!(major_only, item215);
    assert_eq!(any, item215);
}

#[test]
fn deleting_a_type_unresolves_its_dependents_and_notifies() {
    let mut fixture = Fixture::new();
    fixture
        .storage
        .synchronize(create_and_resolve_package(&fixture))
        .unwrap();

    let item = fixture.exported_type_id("QtQuick", "Item");
    let root = fixture.declared_type_id("Root");
    let item_source = source(1, 1);
    let root_source = source(1, 2);

    // Re-send the type source without `Item`: the type and its exported
    // name disappear.
    let mut removal = package();
    removal.updated_type_source_ids = vec![item_source];
    removal.updated_exported_type_source_ids = vec![item_source];
    fixture.storage.synchronize(removal).unwrap();

    assert_eq!(
        fixture.observer.removed_type_ids.lock().last(),
        Some(&vec![item])
    );
    assert_eq!(fixture.fetched_type(root).prototype_id, TypeId::UNRESOLVED);
    assert!(fixture.notifier.contains(&Notified::TypeNameCannotBeResolved {
        type_name: "Item".to_owned(),
        source_id: root_source,
    }));
}

#[test]
fn redefining_a_deleted_type_relinks_dependents_automatically() {
    let mut fixture = Fixture::new();
    fixture
        .storage
        .synchronize(create_and_resolve_package(&fixture))
        .unwrap();

    let item_source = source(1, 1);

    let mut removal = package();
    removal.updated_type_source_ids = vec![item_source];
    removal.updated_exported_type_source_ids = vec![item_source];
    fixture.storage.synchronize(removal).unwrap();

    // Redefine `Item`; the dangling prototype reference of `Root` must
    // relink without `Root`'s source being part of the package.
    let qtquick = fixture.module_id("QtQuick");
    let mut redefinition = package();
    redefinition.types = vec![reference_type("Item", item_source)];
    redefinition.updated_type_source_ids = vec![item_source];
    redefinition.exported_types = vec![exported(
        qtquick,
        "Item",
        Version::new(2, 0),
        item_source,
        "Item",
    )];
    redefinition.updated_exported_type_source_ids = vec![item_source];
    fixture.storage.synchronize(redefinition).unwrap();

    let new_item = fixture.exported_type_id("QtQuick", "Item");
    let root = fixture.declared_type_id("Root");
    assert!(new_item.is_valid());
    assert_eq!(fixture.fetched_type(root).prototype_id, new_item);
}

fn alias_chain_package(fixture: &Fixture) -> SynchronizationPackage {
    let qtquick = fixture.module_id("QtQuick");
    let library_source = source(1, 1);
    let document_source = source(1, 2);

    let mut package = package();
    package.types = vec![
        Type {
            traits: quill_store::TypeTraits::new(quill_store::TypeKind::Value),
            ..reference_type("double", library_source)
        },
        Type {
            property_declarations: vec![property("width", "double")],
            ..reference_type("Item", library_source)
        },
        Type {
            property_declarations: vec![property("target", "Item")],
            ..reference_type("Panel", library_source)
        },
        Type {
            property_declarations: vec![alias_property("proxy", "Panel", "target", Some("width"))],
            ..reference_type("Dialog", document_source)
        },
    ];
    package.updated_type_source_ids = vec![library_source, document_source];
    package.exported_types = vec![
        exported(qtquick, "double", Version::new(2, 0), library_source, "double"),
        exported(qtquick, "Item", Version::new(2, 0), library_source, "Item"),
        exported(qtquick, "Panel", Version::new(2, 0), library_source, "Panel"),
    ];
    package.updated_exported_type_source_ids = vec![library_source];
    package.imports = vec![
        wildcard_import(qtquick, library_source),
        wildcard_import(qtquick, document_source),
    ];
    package.updated_import_source_ids = vec![library_source, document_source];

    package
}

#[test]
fn alias_chain_resolves_to_the_tail_property_type() {
    let mut fixture = Fixture::new();
    fixture
        .storage
        .synchronize(alias_chain_package(&fixture))
        .unwrap();

    let dialog = fixture.declared_type_id("Dialog");
    let double = fixture.declared_type_id("double");

    let proxy = fixture
        .storage
        .property_declaration_id(dialog, "proxy")
        .unwrap();
    let declaration = fixture.storage.property_declaration(proxy).unwrap().unwrap();

    assert_eq!(declaration.property_type_id, double);
}

#[test]
fn deleting_the_alias_target_type_nulls_the_alias_value() {
    let mut fixture = Fixture::new();
    fixture
        .storage
        .synchronize(alias_chain_package(&fixture))
        .unwrap();

    let library_source = source(1, 1);
    let qtquick = fixture.module_id("QtQuick");

    // Re-send the library without `Item`; `Panel.target` loses its type and
    // the alias chain through it loses its value.
    let mut removal = package();
    removal.types = vec![
        Type {
            traits: quill_store::TypeTraits::new(quill_store::TypeKind::Value),
            ..reference_type("double", library_source)
        },
        Type {
            property_declarations: vec![property("target", "Item")],
            ..reference_type("Panel", library_source)
        },
    ];
    removal.updated_type_source_ids = vec![library_source];
    removal.exported_types = vec![
        exported(qtquick, "double", Version::new(2, 0), library_source, "double"),
        exported(qtquick, "Panel", Version::new(2, 0), library_source, "Panel"),
    ];
    removal.updated_exported_type_source_ids = vec![library_source];
    fixture.storage.synchronize(removal).unwrap();

    let dialog = fixture.declared_type_id("Dialog");
    let proxy = fixture
        .storage
        .property_declaration_id(dialog, "proxy")
        .unwrap();
    let declaration = fixture.storage.property_declaration(proxy).unwrap().unwrap();

    assert!(declaration.property_type_id.is_null());
}

#[test]
fn prototype_cycles_roll_back_the_whole_synchronization() {
    let mut fixture = Fixture::new();
    let qtquick = fixture.module_id("QtQuick");
    let cycle_source = source(1, 1);

    let mut package = package();
    package.types = vec![
        derived_type("X", cycle_source, "Y"),
        derived_type("Y", cycle_source, "X"),
    ];
    package.updated_type_source_ids = vec![cycle_source];
    package.exported_types = vec![
        exported(qtquick, "X", Version::new(1, 0), cycle_source, "X"),
        exported(qtquick, "Y", Version::new(1, 0), cycle_source, "Y"),
    ];
    package.updated_exported_type_source_ids = vec![cycle_source];
    package.imports = vec![wildcard_import(qtquick, cycle_source)];
    package.updated_import_source_ids = vec![cycle_source];

    let result = fixture.storage.synchronize(package);

    assert!(matches!(
        result,
        Err(ProjectStorageError::PrototypeChainCycle)
    ));
    // Nothing is persisted and no observer fires.
    assert_eq!(fixture.storage.fetch_types().unwrap(), vec![]);
    assert!(fixture.observer.removed_type_ids.lock().is_empty());
    assert!(fixture.observer.exported_type_name_changes.lock().is_empty());
}

#[test]
fn alias_cycles_roll_back_the_whole_synchronization() {
    let mut fixture = Fixture::new();
    let qtquick = fixture.module_id("QtQuick");
    let cycle_source = source(1, 1);

    let mut package = package();
    package.types = vec![
        Type {
            property_declarations: vec![alias_property("a", "B", "b", None)],
            ..reference_type("A", cycle_source)
        },
        Type {
            property_declarations: vec![alias_property("b", "A", "a", None)],
            ..reference_type("B", cycle_source)
        },
    ];
    package.updated_type_source_ids = vec![cycle_source];
    package.exported_types = vec![
        exported(qtquick, "A", Version::new(1, 0), cycle_source, "A"),
        exported(qtquick, "B", Version::new(1, 0), cycle_source, "B"),
    ];
    package.updated_exported_type_source_ids = vec![cycle_source];
    package.imports = vec![wildcard_import(qtquick, cycle_source)];
    package.updated_import_source_ids = vec![cycle_source];

    let result = fixture.storage.synchronize(package);

    assert!(matches!(result, Err(ProjectStorageError::AliasChainCycle)));
    assert_eq!(fixture.storage.fetch_types().unwrap(), vec![]);
}

#[test]
fn module_exported_imports_expand_to_indirect_imports() {
    let mut fixture = Fixture::new();
    let qtquick = fixture.module_id("QtQuick");
    let qtqml = fixture.module_id("QtQml");
    let library_source = source(1, 1);
    let document_source = source(1, 2);

    let mut package = package();
    package.module_exported_imports = vec![ModuleExportedImport {
        module_id: qtquick,
        exported_module_id: qtqml,
        version: Version::WILDCARD,
        is_auto_version: true,
    }];
    package.updated_module_ids = vec![qtquick];
    package.types = vec![
        reference_type("QtObject", library_source),
        derived_type("Root", document_source, "QtObject"),
    ];
    package.updated_type_source_ids = vec![library_source, document_source];
    package.exported_types = vec![exported(
        qtqml,
        "QtObject",
        Version::new(2, 0),
        library_source,
        "QtObject",
    )];
    package.updated_exported_type_source_ids = vec![library_source];
    package.imports = vec![quill_store::Import::new(
        qtquick,
        Version::new(2, 10),
        document_source,
    )];
    package.updated_import_source_ids = vec![document_source];

    fixture.storage.synchronize(package).unwrap();

    // The indirect import exists, carries the importer's version and links
    // back to the direct import.
    let imports = fixture.storage.document_imports().unwrap();
    let indirect = imports
        .iter()
        .find(|import| import.module_id == qtqml && import.source_id == document_source)
        .expect("indirect import inserted");
    assert_eq!(indirect.version, Version::new(2, 10));

    let original = fixture
        .storage
        .original_import(document_source, qtqml)
        .unwrap()
        .expect("original import found");
    assert_eq!(original.module_id, qtquick);

    // `QtObject` is resolvable from the document through the indirect
    // import.
    let root = fixture.declared_type_id("Root");
    let qtobject = fixture.declared_type_id("QtObject");
    assert_eq!(fixture.fetched_type(root).prototype_id, qtobject);
}

#[test]
fn synchronization_is_idempotent() {
    let mut fixture = Fixture::new();
    let package = create_and_resolve_package(&fixture);

    fixture.storage.synchronize(package.clone()).unwrap();
    let state_after_first = fixture.storage.fetch_types().unwrap();
    let observer_events = fixture.observer.exported_type_name_changes.lock().len();

    fixture.storage.synchronize(package).unwrap();

    assert_eq!(fixture.storage.fetch_types().unwrap(), state_after_first);
    // The second application changes nothing: no deletions, no diffs.
    assert!(fixture.observer.removed_type_ids.lock().is_empty());
    assert_eq!(
        fixture.observer.exported_type_name_changes.lock().len(),
        observer_events
    );
}

#[test]
fn entry_order_within_a_package_does_not_matter() {
    let mut ordered = Fixture::new();
    let mut reversed = Fixture::new();

    let package = create_and_resolve_package(&ordered);
    let mut reversed_package = create_and_resolve_package(&reversed);
    reversed_package.types.reverse();
    reversed_package.updated_type_source_ids.reverse();

    ordered.storage.synchronize(package).unwrap();
    reversed.storage.synchronize(reversed_package).unwrap();

    let names = |fixture: &Fixture| {
        let mut types: Vec<(String, bool)> = fixture
            .storage
            .fetch_types()
            .unwrap()
            .into_iter()
            .map(|fetched| (fetched.name, fetched.prototype_id.is_valid()))
            .collect();
        types.sort();
        types
    };

    assert_eq!(names(&ordered), names(&reversed));
}

#[test]
fn observers_receive_the_exact_exported_name_diff() {
    let mut fixture = Fixture::new();
    fixture
        .storage
        .synchronize(create_and_resolve_package(&fixture))
        .unwrap();

    let changes = fixture.observer.exported_type_name_changes.lock();
    let (added, removed) = changes.last().expect("exported names changed");

    assert_eq!(removed.len(), 0);
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].name, "Item");
    assert_eq!(added[0].version, Version::new(2, 0));
}

#[test]
fn repointing_an_exported_name_reports_both_sides_of_the_diff() {
    let mut fixture = Fixture::new();
    fixture
        .storage
        .synchronize(create_and_resolve_package(&fixture))
        .unwrap();

    let old_item = fixture.exported_type_id("QtQuick", "Item");
    let qtquick = fixture.module_id("QtQuick");
    let item_source = source(1, 1);

    // Same exported name, different backing type.
    let mut repoint = package();
    repoint.types = vec![
        reference_type("Item", item_source),
        reference_type("NewItem", item_source),
    ];
    repoint.updated_type_source_ids = vec![item_source];
    repoint.exported_types = vec![exported(
        qtquick,
        "Item",
        Version::new(2, 0),
        item_source,
        "NewItem",
    )];
    repoint.updated_exported_type_source_ids = vec![item_source];
    fixture.storage.synchronize(repoint).unwrap();

    let new_item = fixture.declared_type_id("NewItem");
    let changes = fixture.observer.exported_type_name_changes.lock();
    let (added, removed) = changes.last().expect("exported names changed");

    assert_eq!(added.len(), 1);
    assert_eq!(removed.len(), 1);
    assert_eq!(added[0].type_id, new_item);
    assert_eq!(removed[0].type_id, old_item);

    // The dependent prototype follows the re-pointed name.
    drop(changes);
    let root = fixture.declared_type_id("Root");
    assert_eq!(fixture.fetched_type(root).prototype_id, new_item);
}

#[test]
fn duplicate_exported_names_are_reported_and_fail_the_synchronization() {
    let mut fixture = Fixture::new();
    let qtquick = fixture.module_id("QtQuick");
    let item_source = source(1, 1);

    let mut package = package();
    package.types = vec![
        reference_type("ItemA", item_source),
        reference_type("ItemB", item_source),
    ];
    package.updated_type_source_ids = vec![item_source];
    package.exported_types = vec![
        exported(qtquick, "Item", Version::new(2, 0), item_source, "ItemA"),
        exported(qtquick, "Item", Version::new(2, 0), item_source, "ItemB"),
    ];
    package.updated_exported_type_source_ids = vec![item_source];

    let result = fixture.storage.synchronize(package);

    assert!(matches!(
        result,
        Err(ProjectStorageError::ExportedTypeCannotBeInserted { .. })
    ));
    assert!(fixture
        .notifier
        .contains(&Notified::ExportedTypeNameIsDuplicate {
            module_id: qtquick,
            type_name: "Item".to_owned(),
        }));
}

#[test]
fn missing_default_property_is_reported() {
    let mut fixture = Fixture::new();
    let qtquick = fixture.module_id("QtQuick");
    let item_source = source(1, 1);

    let mut package = package();
    package.types = vec![Type {
        default_property_name: Some("data".to_owned()),
        ..reference_type("Item", item_source)
    }];
    package.updated_type_source_ids = vec![item_source];
    package.exported_types = vec![exported(
        qtquick,
        "Item",
        Version::new(2, 0),
        item_source,
        "Item",
    )];
    package.updated_exported_type_source_ids = vec![item_source];

    fixture.storage.synchronize(package).unwrap();

    assert!(fixture.notifier.contains(&Notified::MissingDefaultProperty {
        type_name: "Item".to_owned(),
        property_name: "data".to_owned(),
    }));
}

#[test]
fn default_property_binds_to_the_local_declaration() {
    let mut fixture = Fixture::new();
    let qtquick = fixture.module_id("QtQuick");
    let item_source = source(1, 1);

    let mut package = package();
    package.types = vec![
        Type {
            traits: quill_store::TypeTraits::new(quill_store::TypeKind::Value),
            ..reference_type("double", item_source)
        },
        Type {
            default_property_name: Some("data".to_owned()),
            property_declarations: vec![property("data", "double")],
            ..reference_type("Item", item_source)
        },
    ];
    package.updated_type_source_ids = vec![item_source];
    package.exported_types = vec![
        exported(qtquick, "double", Version::new(2, 0), item_source, "double"),
        exported(qtquick, "Item", Version::new(2, 0), item_source, "Item"),
    ];
    package.updated_exported_type_source_ids = vec![item_source];
    package.imports = vec![wildcard_import(qtquick, item_source)];
    package.updated_import_source_ids = vec![item_source];

    fixture.storage.synchronize(package).unwrap();

    let item = fixture.declared_type_id("Item");
    let data = fixture
        .storage
        .local_property_declaration_id(item, "data")
        .unwrap();
    let default = fixture
        .storage
        .default_property_declaration_id(item)
        .unwrap();

    assert!(data.is_valid());
    assert_eq!(default, data);
    // The default property belongs to the type itself, never to a base.
    let declaration = fixture.storage.property_declaration(default).unwrap().unwrap();
    assert_eq!(declaration.type_id, item);
}

#[test]
fn unresolvable_property_types_are_null_and_reported() {
    let mut fixture = Fixture::new();
    let qtquick = fixture.module_id("QtQuick");
    let item_source = source(1, 1);

    let mut package = package();
    package.types = vec![Type {
        property_declarations: vec![property("content", "Missing")],
        ..reference_type("Item", item_source)
    }];
    package.updated_type_source_ids = vec![item_source];
    package.exported_types = vec![exported(
        qtquick,
        "Item",
        Version::new(2, 0),
        item_source,
        "Item",
    )];
    package.updated_exported_type_source_ids = vec![item_source];
    package.imports = vec![wildcard_import(qtquick, item_source)];
    package.updated_import_source_ids = vec![item_source];

    fixture.storage.synchronize(package).unwrap();

    let item = fixture.declared_type_id("Item");
    let content = fixture
        .storage
        .local_property_declaration_id(item, "content")
        .unwrap();
    let declaration = fixture.storage.property_declaration(content).unwrap().unwrap();

    assert!(declaration.property_type_id.is_null());
    assert!(fixture.notifier.contains(&Notified::TypeNameCannotBeResolved {
        type_name: "Missing".to_owned(),
        source_id: item_source,
    }));
}

#[test]
fn synchronize_document_imports_updates_a_single_document() {
    let mut fixture = Fixture::new();
    fixture
        .storage
        .synchronize(create_and_resolve_package(&fixture))
        .unwrap();

    let root_source = source(1, 2);

    // Dropping the only import leaves the prototype unresolvable.
    fixture
        .storage
        .synchronize_document_imports(vec![], root_source)
        .unwrap();

    let root = fixture.declared_type_id("Root");
    assert_eq!(fixture.fetched_type(root).prototype_id, TypeId::UNRESOLVED);

    // Restoring the import relinks it.
    let qtquick = fixture.module_id("QtQuick");
    fixture
        .storage
        .synchronize_document_imports(vec![wildcard_import(qtquick, root_source)], root_source)
        .unwrap();

    let item = fixture.exported_type_id("QtQuick", "Item");
    assert_eq!(fixture.fetched_type(root).prototype_id, item);
}

#[test]
fn shadowing_an_inherited_property_rechains_aliases() {
    let mut fixture = Fixture::new();
    let qtquick = fixture.module_id("QtQuick");
    let library_source = source(1, 1);
    let document_source = source(1, 2);

    // Base has `label`; Derived inherits it; an alias binds to it through
    // Derived.
    let mut package = package();
    package.types = vec![
        Type {
            traits: quill_store::TypeTraits::new(quill_store::TypeKind::Value),
            ..reference_type("string", library_source)
        },
        Type {
            property_declarations: vec![property("label", "string")],
            ..reference_type("Base", library_source)
        },
        derived_type("Derived", library_source, "Base"),
        Type {
            property_declarations: vec![alias_property("text", "Derived", "label", None)],
            ..reference_type("Consumer", document_source)
        },
    ];
    package.updated_type_source_ids = vec![library_source, document_source];
    package.exported_types = vec![
        exported(qtquick, "string", Version::new(2, 0), library_source, "string"),
        exported(qtquick, "Base", Version::new(2, 0), library_source, "Base"),
        exported(qtquick, "Derived", Version::new(2, 0), library_source, "Derived"),
    ];
    package.updated_exported_type_source_ids = vec![library_source];
    package.imports = vec![
        wildcard_import(qtquick, library_source),
        wildcard_import(qtquick, document_source),
    ];
    package.updated_import_source_ids = vec![library_source, document_source];

    fixture.storage.synchronize(package).unwrap();

    let base = fixture.declared_type_id("Base");
    let derived = fixture.declared_type_id("Derived");
    let consumer = fixture.declared_type_id("Consumer");

    // The alias chains through the inherited declaration on Base.
    let base_label = fixture
        .storage
        .local_property_declaration_id(base, "label")
        .unwrap();
    let derived_label = fixture
        .storage
        .property_declaration_id(derived, "label")
        .unwrap();
    assert_eq!(derived_label, base_label);

    // Now Derived declares its own `label`, shadowing the inherited one.
    let mut shadow = self::package();
    shadow.types = vec![
        Type {
            traits: quill_store::TypeTraits::new(quill_store::TypeKind::Value),
            ..reference_type("string", library_source)
        },
        Type {
            property_declarations: vec![property("label", "string")],
            ..reference_type("Base", library_source)
        },
        Type {
            property_declarations: vec![property("label", "string")],
            ..derived_type("Derived", library_source, "Base")
        },
    ];
    shadow.updated_type_source_ids = vec![library_source];
    shadow.exported_types = vec![
        exported(qtquick, "string", Version::new(2, 0), library_source, "string"),
        exported(qtquick, "Base", Version::new(2, 0), library_source, "Base"),
        exported(qtquick, "Derived", Version::new(2, 0), library_source, "Derived"),
    ];
    shadow.updated_exported_type_source_ids = vec![library_source];
    shadow.imports = vec![wildcard_import(qtquick, library_source)];
    shadow.updated_import_source_ids = vec![library_source];
    fixture.storage.synchronize(shadow).unwrap();

    let own_label = fixture
        .storage
        .local_property_declaration_id(derived, "label")
        .unwrap();
    assert!(own_label.is_valid());
    assert_ne!(own_label, base_label);

    // The alias follows the shadowing declaration.
    let text = fixture
        .storage
        .property_declaration_id(consumer, "text")
        .unwrap();
    assert!(text.is_valid());
    let declaration = fixture.storage.property_declaration(text).unwrap().unwrap();
    let string_type = fixture.declared_type_id("string");
    assert_eq!(declaration.property_type_id, string_type);
}

#[test]
fn file_statuses_are_merged_incrementally() {
    let mut fixture = Fixture::new();
    let first = source(1, 1);
    let second = source(1, 2);

    let mut package = package();
    package.file_statuses = vec![
        quill_store::FileStatus {
            source_id: first,
            size: 100,
            last_modified: 10,
        },
        quill_store::FileStatus {
            source_id: second,
            size: 200,
            last_modified: 20,
        },
    ];
    package.updated_file_status_source_ids = vec![first, second];
    fixture.storage.synchronize(package).unwrap();

    // Update one, remove the other.
    let mut update = self::package();
    update.file_statuses = vec![quill_store::FileStatus {
        source_id: first,
        size: 150,
        last_modified: 15,
    }];
    update.updated_file_status_source_ids = vec![first, second];
    fixture.storage.synchronize(update).unwrap();

    let status = fixture.storage.file_status(first).unwrap().unwrap();
    assert_eq!(status.size, 150);
    assert_eq!(status.last_modified, 15);
    assert!(fixture.storage.file_status(second).unwrap().is_none());
}

#[test]
fn invalid_source_ids_fail_fatally() {
    let mut fixture = Fixture::new();

    let mut package = package();
    package.types = vec![reference_type("Item", SourceId::NULL)];
    package.updated_type_source_ids = vec![source(1, 1)];

    let result = fixture.storage.synchronize(package);

    assert!(matches!(
        result,
        Err(ProjectStorageError::TypeHasInvalidSourceId)
    ));
}
