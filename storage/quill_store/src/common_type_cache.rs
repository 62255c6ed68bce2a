//! The common-type cache.
//!
//! A fixed table of well-known `(module, kind, type name)` slots refreshed
//! inside the synchronization transaction, so hot lookups for builtins and
//! core items skip the resolver entirely. Between refreshes the slots are
//! read under a shared lock that is never contended by writers.

use parking_lot::RwLock;
use quill_ids::TypeId;
use rusqlite::Connection;
use rustc_hash::FxHashMap;

use crate::error::ProjectStorageError;
use crate::modules::{ModuleKind, ModulesStorage};
use crate::queries;

type Slot = (&'static str, ModuleKind, &'static str);

/// The well-known slots. Lookups outside this table fall back to the
/// resolver.
const COMMON_TYPES: &[Slot] = &[
    ("QML", ModuleKind::QmlLibrary, "BoolType"),
    ("QML", ModuleKind::QmlLibrary, "DoubleType"),
    ("QML", ModuleKind::QmlLibrary, "IntType"),
    ("QML", ModuleKind::QmlLibrary, "bool"),
    ("QML", ModuleKind::QmlLibrary, "double"),
    ("QML", ModuleKind::QmlLibrary, "int"),
    ("QML", ModuleKind::QmlLibrary, "string"),
    ("QML", ModuleKind::QmlLibrary, "url"),
    ("QML", ModuleKind::QmlLibrary, "var"),
    ("QtQml", ModuleKind::QmlLibrary, "Component"),
    ("QtQml", ModuleKind::QmlLibrary, "Connections"),
    ("QtQml", ModuleKind::QmlLibrary, "QtObject"),
    ("QtQml.Models", ModuleKind::QmlLibrary, "ListElement"),
    ("QtQml.Models", ModuleKind::QmlLibrary, "ListModel"),
    ("QtQuick", ModuleKind::QmlLibrary, "BorderImage"),
    ("QtQuick", ModuleKind::QmlLibrary, "Column"),
    ("QtQuick", ModuleKind::QmlLibrary, "GridView"),
    ("QtQuick", ModuleKind::QmlLibrary, "Image"),
    ("QtQuick", ModuleKind::QmlLibrary, "Item"),
    ("QtQuick", ModuleKind::QmlLibrary, "ListView"),
    ("QtQuick", ModuleKind::QmlLibrary, "Loader"),
    ("QtQuick", ModuleKind::QmlLibrary, "MouseArea"),
    ("QtQuick", ModuleKind::QmlLibrary, "PathView"),
    ("QtQuick", ModuleKind::QmlLibrary, "PropertyAnimation"),
    ("QtQuick", ModuleKind::QmlLibrary, "PropertyChanges"),
    ("QtQuick", ModuleKind::QmlLibrary, "Rectangle"),
    ("QtQuick", ModuleKind::QmlLibrary, "Repeater"),
    ("QtQuick", ModuleKind::QmlLibrary, "Row"),
    ("QtQuick", ModuleKind::QmlLibrary, "State"),
    ("QtQuick", ModuleKind::QmlLibrary, "Text"),
    ("QtQuick", ModuleKind::QmlLibrary, "TextEdit"),
    ("QtQuick", ModuleKind::QmlLibrary, "Transition"),
    ("QtQuick", ModuleKind::QmlLibrary, "Window"),
    ("QtQuick.Layouts", ModuleKind::QmlLibrary, "ColumnLayout"),
    ("QtQuick.Layouts", ModuleKind::QmlLibrary, "GridLayout"),
    ("QtQuick.Layouts", ModuleKind::QmlLibrary, "RowLayout"),
];

pub(crate) struct CommonTypeCache {
    type_ids: RwLock<FxHashMap<Slot, TypeId>>,
}

impl CommonTypeCache {
    pub fn new() -> Self {
        Self {
            type_ids: RwLock::new(FxHashMap::default()),
        }
    }

    /// Re-resolve every slot against the current exported type names.
    pub fn refresh(
        &self,
        connection: &Connection,
        modules: &ModulesStorage,
    ) -> Result<(), ProjectStorageError> {
        let mut type_ids = FxHashMap::default();

        for &slot in COMMON_TYPES {
            let (module_name, module_kind, type_name) = slot;
            let module_id = modules.module_id(connection, module_name, module_kind)?;
            let type_id = queries::exported_types::type_id_by_module_id_and_name(
                connection, module_id, type_name,
            )?;
            type_ids.insert(slot, type_id);
        }

        *self.type_ids.write() = type_ids;

        Ok(())
    }

    /// The cached type id for a well-known slot; null if the slot is not in
    /// the table or the type is not (yet) exported.
    pub fn type_id(
        &self,
        module_name: &str,
        module_kind: ModuleKind,
        type_name: &str,
    ) -> TypeId {
        let type_ids = self.type_ids.read();
        type_ids
            .iter()
            .find(|((module, kind, name), _)| {
                *module == module_name && *kind == module_kind && *name == type_name
            })
            .map(|(_, &type_id)| type_id)
            .unwrap_or(TypeId::NULL)
    }
}
