//! Read-only lookup operations against a synchronized store.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use quill_store::{
    DirectoryPathId, EnumerationDeclaration, EnumeratorDeclaration, FileType, FunctionDeclaration,
    ModuleKind, ParameterDeclaration, ProjectEntryInfo, PropertyDeclarationTraits,
    PropertyEditorPath, SignalDeclaration, SynchronizationPackage, Type, TypeAnnotation, TypeId,
    TypeKind, TypeTraits, Version,
};

/// A library with an inheritance chain, declarations and metadata:
/// `Control -> Item`, `Button -> Control`, plus a singleton `Theme`.
fn library_package(fixture: &Fixture) -> SynchronizationPackage {
    let qtquick = fixture.module_id("QtQuick");
    let library_source = source(1, 1);
    let document_source = source(1, 2);

    let mut package = package();
    package.types = vec![
        Type {
            traits: TypeTraits::new(TypeKind::Value),
            ..reference_type("double", library_source)
        },
        Type {
            property_declarations: vec![property("width", "double"), property("height", "double")],
            signal_declarations: vec![
                SignalDeclaration {
                    name: "clicked".to_owned(),
                    parameters: vec![],
                },
                SignalDeclaration {
                    name: "moved".to_owned(),
                    parameters: vec![ParameterDeclaration {
                        name: "x".to_owned(),
                        type_name: "double".to_owned(),
                        traits: PropertyDeclarationTraits::empty(),
                    }],
                },
            ],
            function_declarations: vec![FunctionDeclaration {
                name: "contains".to_owned(),
                return_type_name: "bool".to_owned(),
                parameters: vec![ParameterDeclaration {
                    name: "x".to_owned(),
                    type_name: "double".to_owned(),
                    traits: PropertyDeclarationTraits::empty(),
                }],
            }],
            enumeration_declarations: vec![EnumerationDeclaration {
                name: "Orientation".to_owned(),
                enumerator_declarations: vec![
                    EnumeratorDeclaration {
                        name: "Horizontal".to_owned(),
                        value: Some(0),
                    },
                    EnumeratorDeclaration {
                        name: "Vertical".to_owned(),
                        value: None,
                    },
                ],
            }],
            ..reference_type("Item", library_source)
        },
        Type {
            property_declarations: vec![property("padding", "double")],
            ..derived_type("Control", library_source, "Item")
        },
        derived_type("Button", library_source, "Control"),
        Type {
            traits: TypeTraits::new(TypeKind::Reference).with_flag(TypeTraits::IS_SINGLETON),
            ..reference_type("Theme", library_source)
        },
    ];
    package.updated_type_source_ids = vec![library_source, document_source];
    package.exported_types = vec![
        exported(qtquick, "double", Version::new(2, 0), library_source, "double"),
        exported(qtquick, "Item", Version::new(2, 0), library_source, "Item"),
        exported(qtquick, "Control", Version::new(2, 0), library_source, "Control"),
        exported(qtquick, "Button", Version::new(2, 0), library_source, "Button"),
        exported(qtquick, "Theme", Version::new(2, 0), library_source, "Theme"),
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
fn prototype_chain_and_heirs_are_enumerable() {
    let mut fixture = Fixture::new();
    fixture.storage.synchronize(library_package(&fixture)).unwrap();

    let item = fixture.declared_type_id("Item");
    let control = fixture.declared_type_id("Control");
    let button = fixture.declared_type_id("Button");

    assert_eq!(
        fixture.storage.prototype_ids(button).unwrap(),
        vec![control, item]
    );
    assert_eq!(
        fixture.storage.prototype_and_self_ids(button).unwrap(),
        vec![button, control, item]
    );

    let mut heirs = fixture.storage.heir_ids(item).unwrap();
    heirs.sort_unstable();
    let mut expected = vec![control, button];
    expected.sort_unstable();
    assert_eq!(heirs, expected);
}

#[test]
fn based_on_walks_the_chain_and_inherits_all_checks_every_type() {
    let mut fixture = Fixture::new();
    fixture.storage.synchronize(library_package(&fixture)).unwrap();

    let item = fixture.declared_type_id("Item");
    let control = fixture.declared_type_id("Control");
    let button = fixture.declared_type_id("Button");
    let theme = fixture.declared_type_id("Theme");

    assert_eq!(fixture.storage.based_on(button, &[item]).unwrap(), item);
    assert_eq!(
        fixture.storage.based_on(button, &[theme, control]).unwrap(),
        control
    );
    assert!(fixture.storage.based_on(theme, &[item]).unwrap().is_null());

    assert!(fixture
        .storage
        .inherits_all(&[button, control], item)
        .unwrap());
    assert!(!fixture
        .storage
        .inherits_all(&[button, theme], item)
        .unwrap());
}

#[test]
fn property_declarations_include_inherited_ones() {
    let mut fixture = Fixture::new();
    fixture.storage.synchronize(library_package(&fixture)).unwrap();

    let item = fixture.declared_type_id("Item");
    let button = fixture.declared_type_id("Button");

    let local = fixture.storage.local_property_declaration_ids(button).unwrap();
    assert!(local.is_empty());

    let all = fixture.storage.property_declaration_ids(button).unwrap();
    assert_eq!(all.len(), 3); // width, height, padding

    let width_on_item = fixture
        .storage
        .local_property_declaration_id(item, "width")
        .unwrap();
    let width_via_button = fixture
        .storage
        .property_declaration_id(button, "width")
        .unwrap();
    assert_eq!(width_via_button, width_on_item);
}

#[test]
fn signal_and_function_names_include_the_whole_chain() {
    let mut fixture = Fixture::new();
    fixture.storage.synchronize(library_package(&fixture)).unwrap();

    let button = fixture.declared_type_id("Button");

    assert_eq!(
        fixture.storage.signal_declaration_names(button).unwrap(),
        vec!["clicked".to_owned(), "moved".to_owned()]
    );
    assert_eq!(
        fixture.storage.function_declaration_names(button).unwrap(),
        vec!["contains".to_owned()]
    );
}

#[test]
fn declaration_readbacks_round_trip_their_json_columns() {
    let mut fixture = Fixture::new();
    fixture.storage.synchronize(library_package(&fixture)).unwrap();

    let item = fixture.declared_type_id("Item");

    let functions = fixture.storage.fetch_function_declarations(item).unwrap();
    assert_eq!(functions.len(), 1);
    assert_eq!(functions[0].name, "contains");
    assert_eq!(functions[0].return_type_name, "bool");
    assert_eq!(functions[0].parameters.len(), 1);
    assert_eq!(functions[0].parameters[0].type_name, "double");

    let signals = fixture.storage.fetch_signal_declarations(item).unwrap();
    assert_eq!(signals.len(), 2);
    assert_eq!(signals[0].name, "clicked");
    assert!(signals[0].parameters.is_empty());

    let enumerations = fixture.storage.fetch_enumeration_declarations(item).unwrap();
    assert_eq!(enumerations.len(), 1);
    assert_eq!(enumerations[0].name, "Orientation");
    assert_eq!(
        enumerations[0].enumerator_declarations,
        vec![
            EnumeratorDeclaration {
                name: "Horizontal".to_owned(),
                value: Some(0),
            },
            EnumeratorDeclaration {
                name: "Vertical".to_owned(),
                value: None,
            },
        ]
    );
}

#[test]
fn singleton_type_ids_are_visible_through_imports() {
    let mut fixture = Fixture::new();
    fixture.storage.synchronize(library_package(&fixture)).unwrap();

    let document_source = source(1, 2);
    let theme = fixture.declared_type_id("Theme");

    assert_eq!(
        fixture.storage.singleton_type_ids(document_source).unwrap(),
        vec![theme]
    );
}

#[test]
fn exported_type_names_are_filtered_by_source_visibility() {
    let mut fixture = Fixture::new();
    fixture.storage.synchronize(library_package(&fixture)).unwrap();

    let item = fixture.declared_type_id("Item");
    let document_source = source(1, 2);
    let unrelated_source = source(9, 9);

    let names = fixture.storage.exported_type_names(item).unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].name, "Item");

    let visible = fixture
        .storage
        .exported_type_names_for_source_id(item, document_source)
        .unwrap();
    assert_eq!(visible.len(), 1);

    let invisible = fixture
        .storage
        .exported_type_names_for_source_id(item, unrelated_source)
        .unwrap();
    assert!(invisible.is_empty());
}

#[test]
fn imported_type_name_ids_are_stable_and_resolvable() {
    let mut fixture = Fixture::new();
    fixture.storage.synchronize(library_package(&fixture)).unwrap();

    let document_source = source(1, 2);

    let first = fixture
        .storage
        .imported_type_name_id_for_source_id(document_source, "Item")
        .unwrap();
    let second = fixture
        .storage
        .imported_type_name_id_for_source_id(document_source, "Item")
        .unwrap();
    assert_eq!(first, second);

    let exported_name = fixture
        .storage
        .exported_type_name(first)
        .unwrap()
        .expect("name resolves");
    assert_eq!(exported_name.name, "Item");
    assert_eq!(exported_name.type_id, fixture.declared_type_id("Item"));
}

#[test]
fn common_type_cache_serves_well_known_slots_after_synchronization() {
    let mut fixture = Fixture::new();
    fixture.storage.synchronize(library_package(&fixture)).unwrap();

    let item = fixture.declared_type_id("Item");

    assert_eq!(
        fixture
            .storage
            .common_type_id("QtQuick", ModuleKind::QmlLibrary, "Item"),
        item
    );
    assert!(fixture
        .storage
        .common_type_id("QtQuick", ModuleKind::QmlLibrary, "Window")
        .is_null());
}

#[test]
fn type_info_reports_traits() {
    let mut fixture = Fixture::new();
    fixture.storage.synchronize(library_package(&fixture)).unwrap();

    let theme = fixture.declared_type_id("Theme");
    let info = fixture.storage.type_info(theme).unwrap().unwrap();

    assert!(info.traits.is_singleton());
    assert_eq!(info.source_id, source(1, 1));
}

fn annotation_package(fixture: &Fixture) -> SynchronizationPackage {
    let mut package = library_package(fixture);
    let qtquick = fixture.module_id("QtQuick");
    let annotation_source = source(2, 1);

    package.type_annotations = vec![TypeAnnotation {
        module_id: qtquick,
        type_name: "Item".to_owned(),
        source_id: annotation_source,
        directory_id: DirectoryPathId::new(2),
        icon_path: "icons/item.png".to_owned(),
        item_library_json: r#"[{"name":"Item","iconPath":"icons/item.png","category":"Base Items","import":"QtQuick","toolTip":"The base item","properties":[["width","double","100"]]}]"#.to_owned(),
        hints_json: r#"{"resizable":"true"}"#.to_owned(),
        traits: quill_store::AnnotationTraits::from_bits(1),
        type_id: TypeId::NULL,
    }];
    package.updated_type_annotation_source_ids = vec![annotation_source];

    package
}

#[test]
fn annotations_provide_icon_hints_and_item_library_entries() {
    let mut fixture = Fixture::new();
    fixture.storage.synchronize(annotation_package(&fixture)).unwrap();

    let item = fixture.declared_type_id("Item");

    assert_eq!(
        fixture.storage.type_icon_path(item).unwrap(),
        "icons/item.png"
    );

    let hints = fixture.storage.type_hints(item).unwrap();
    assert_eq!(hints.len(), 1);
    assert_eq!(hints[0].name, "resizable");
    assert_eq!(hints[0].expression, "true");

    let entries = fixture.storage.item_library_entries(item).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].category, "Base Items");
    assert_eq!(entries[0].properties.len(), 1);
    assert_eq!(entries[0].properties[0].name, "width");

    let all_entries = fixture.storage.all_item_library_entries().unwrap();
    assert_eq!(all_entries.len(), 1);

    // Entries are visible from the document that imports QtQuick.
    let by_source = fixture
        .storage
        .item_library_entries_for_source_id(source(1, 2))
        .unwrap();
    assert_eq!(by_source.len(), 1);

    assert_eq!(
        fixture
            .storage
            .type_annotation_source_ids(DirectoryPathId::new(2))
            .unwrap(),
        vec![source(2, 1)]
    );
    assert_eq!(
        fixture.storage.type_annotation_directory_ids().unwrap(),
        vec![DirectoryPathId::new(2)]
    );
}

#[test]
fn annotation_traits_propagate_to_heirs_until_overridden() {
    let mut fixture = Fixture::new();
    fixture.storage.synchronize(annotation_package(&fixture)).unwrap();

    let item = fixture.declared_type_id("Item");
    let control = fixture.declared_type_id("Control");
    let button = fixture.declared_type_id("Button");

    let annotation_traits = |type_id| {
        fixture
            .storage
            .type_info(type_id)
            .unwrap()
            .unwrap()
            .annotation_traits
    };

    assert_eq!(annotation_traits(item).bits(), 1);
    assert_eq!(annotation_traits(control).bits(), 1);
    assert_eq!(annotation_traits(button).bits(), 1);
}

#[test]
fn property_editor_paths_resolve_by_exported_name() {
    let mut fixture = Fixture::new();
    let mut package = library_package(&fixture);
    let qtquick = fixture.module_id("QtQuick");
    let editor_source = source(3, 1);

    package.property_editor_paths = vec![PropertyEditorPath {
        module_id: qtquick,
        type_name: "Item".to_owned(),
        path_source_id: editor_source,
        directory_id: DirectoryPathId::new(3),
        type_id: TypeId::NULL,
    }];
    package.updated_property_editor_path_directory_ids = vec![DirectoryPathId::new(3)];
    fixture.storage.synchronize(package).unwrap();

    let item = fixture.declared_type_id("Item");
    assert_eq!(
        fixture.storage.property_editor_path_id(item).unwrap(),
        editor_source
    );
}

#[test]
fn property_editor_path_can_be_set_directly() {
    let mut fixture = Fixture::new();
    fixture.storage.synchronize(library_package(&fixture)).unwrap();

    let item = fixture.declared_type_id("Item");
    let editor_source = source(3, 2);

    fixture
        .storage
        .set_property_editor_path_id(item, editor_source)
        .unwrap();

    assert_eq!(
        fixture.storage.property_editor_path_id(item).unwrap(),
        editor_source
    );
}

#[test]
fn project_entries_are_queryable_by_context_and_file_type() {
    let mut fixture = Fixture::new();
    let qtquick = fixture.module_id("QtQuick");

    let directory = context(1);
    let document = source(1, 2);
    let subdirectory = context(4);

    let mut package = package();
    package.project_entry_infos = vec![
        ProjectEntryInfo {
            context_source_id: directory,
            source_id: document,
            module_id: qtquick,
            file_type: FileType::Document,
        },
        ProjectEntryInfo {
            context_source_id: directory,
            source_id: subdirectory,
            module_id: quill_store::ModuleId::NULL,
            file_type: FileType::Directory,
        },
    ];
    package.updated_project_entry_info_source_ids = vec![directory];
    fixture.storage.synchronize(package).unwrap();

    let all = fixture.storage.project_entry_infos(directory).unwrap();
    assert_eq!(all.len(), 2);

    let documents = fixture
        .storage
        .project_entry_infos_for_file_type(directory, FileType::Document)
        .unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].source_id, document);

    let entry = fixture.storage.project_entry_info(document).unwrap().unwrap();
    assert_eq!(entry.context_source_id, directory);
    assert_eq!(entry.module_id, qtquick);

    assert_eq!(
        fixture
            .storage
            .subdirectory_ids(DirectoryPathId::new(1))
            .unwrap(),
        vec![DirectoryPathId::new(4)]
    );
}

#[test]
fn directory_imports_item_library_entries_cover_path_library_components() {
    let mut fixture = Fixture::new();
    let path_module = fixture
        .storage
        .module_id("/project/controls", ModuleKind::PathLibrary)
        .unwrap();
    let component_source = source(5, 1);
    let document_source = source(5, 2);

    let mut package = package();
    package.types = vec![
        reference_type("FancyButton", component_source),
        reference_type("internalHelper", component_source),
    ];
    package.updated_type_source_ids = vec![component_source];
    package.exported_types = vec![
        exported(
            path_module,
            "FancyButton",
            Version::WILDCARD,
            component_source,
            "FancyButton",
        ),
        exported(
            path_module,
            "internalHelper",
            Version::WILDCARD,
            component_source,
            "internalHelper",
        ),
    ];
    package.updated_exported_type_source_ids = vec![component_source];
    package.imports = vec![wildcard_import(path_module, document_source)];
    package.updated_import_source_ids = vec![document_source];
    fixture.storage.synchronize(package).unwrap();

    let entries = fixture
        .storage
        .directory_imports_item_library_entries(document_source)
        .unwrap();

    // Lowercase (non-instantiable) names are filtered out.
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "FancyButton");
    assert_eq!(entries[0].import, "/project/controls");
    assert_eq!(entries[0].module_kind, Some(ModuleKind::PathLibrary));
    assert_eq!(entries[0].component_source_id, component_source);
}

#[test]
fn qualified_imported_type_names_resolve_through_their_alias() {
    let mut fixture = Fixture::new();
    let qtquick = fixture.module_id("QtQuick");
    let library_source = source(1, 1);
    let document_source = source(1, 2);

    let mut package = package();
    package.types = vec![
        reference_type("Item", library_source),
        Type {
            prototype: Some(quill_store::ImportedTypeName::qualified("QQ", "Item")),
            ..reference_type("Root", document_source)
        },
    ];
    package.updated_type_source_ids = vec![library_source, document_source];
    package.exported_types = vec![exported(
        qtquick,
        "Item",
        Version::new(2, 0),
        library_source,
        "Item",
    )];
    package.updated_exported_type_source_ids = vec![library_source];
    package.imports = vec![wildcard_import(qtquick, document_source).with_alias("QQ")];
    package.updated_import_source_ids = vec![document_source];
    fixture.storage.synchronize(package).unwrap();

    let item = fixture.declared_type_id("Item");
    let root = fixture.declared_type_id("Root");
    assert_eq!(fixture.fetched_type(root).prototype_id, item);

    let import_id = fixture
        .storage
        .import_id_by_alias(document_source, "QQ")
        .unwrap();
    assert!(import_id.is_valid());

    let name_id = fixture
        .storage
        .imported_type_name_id(import_id, "Item")
        .unwrap();
    let exported_name = fixture
        .storage
        .exported_type_name(name_id)
        .unwrap()
        .expect("qualified name resolves");
    assert_eq!(exported_name.type_id, item);
}

#[test]
fn file_statuses_can_be_listed() {
    let mut fixture = Fixture::new();

    let mut package = package();
    package.file_statuses = vec![
        quill_store::FileStatus {
            source_id: source(1, 1),
            size: 10,
            last_modified: 1,
        },
        quill_store::FileStatus {
            source_id: source(1, 2),
            size: 20,
            last_modified: 2,
        },
    ];
    package.updated_file_status_source_ids = vec![source(1, 1), source(1, 2)];
    fixture.storage.synchronize(package).unwrap();

    let statuses = fixture.storage.all_file_statuses().unwrap();
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0].source_id, source(1, 1));
}
