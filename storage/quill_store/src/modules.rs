//! The module cache.
//!
//! Modules are immutable `(name, kind)` pairs; the cache is populated by a
//! single scan of the `modules` table at startup and written through on
//! misses. Reads take the shared lock and copy the value out, so concurrent
//! readers never block one another; a miss upgrades to the exclusive lock
//! and re-checks before writing.

use parking_lot::RwLock;
use quill_ids::ModuleId;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, OptionalExtension};
use rustc_hash::FxHashMap;

use crate::error::ProjectStorageError;

/// Namespace a module name lives in.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u32)]
pub enum ModuleKind {
    QmlLibrary = 1,
    CppLibrary = 2,
    PathLibrary = 3,
}

/// A module: a name unique within its kind.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Module {
    pub name: String,
    pub kind: ModuleKind,
}

/// The largest number of ids a prefix lookup returns.
const PREFIX_LOOKUP_LIMIT: usize = 128;

#[derive(Default)]
struct ModuleCache {
    ids: FxHashMap<(String, ModuleKind), ModuleId>,
    modules: FxHashMap<ModuleId, Module>,
}

impl ModuleCache {
    fn insert(&mut self, module_id: ModuleId, module: Module) {
        self.ids
            .insert((module.name.clone(), module.kind), module_id);
        self.modules.insert(module_id, module);
    }
}

pub(crate) struct ModulesStorage {
    cache: RwLock<ModuleCache>,
}

impl ModulesStorage {
    /// Build the cache from the persisted `modules` table.
    pub fn populate(connection: &Connection) -> Result<Self, ProjectStorageError> {
        let mut cache = ModuleCache::default();

        let mut statement =
            connection.prepare_cached("SELECT name, kind, moduleId FROM modules")?;
        let rows = statement.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, ModuleKind>(1)?,
                row.get::<_, ModuleId>(2)?,
            ))
        })?;

        for row in rows {
            let (name, kind, module_id) = row?;
            cache.insert(module_id, Module { name, kind });
        }

        Ok(Self {
            cache: RwLock::new(cache),
        })
    }

    /// Look up (or create) the id for `(name, kind)`.
    ///
    /// An empty name yields the null id without touching the database.
    pub fn module_id(
        &self,
        connection: &Connection,
        name: &str,
        kind: ModuleKind,
    ) -> Result<ModuleId, ProjectStorageError> {
        if name.is_empty() {
            return Ok(ModuleId::NULL);
        }

        {
            let cache = self.cache.read();
            if let Some(&module_id) = cache.ids.get(&(name.to_owned(), kind)) {
                return Ok(module_id);
            }
        }

        let module_id = fetch_module_id(connection, name, kind)?;

        let mut cache = self.cache.write();
        cache.insert(
            module_id,
            Module {
                name: name.to_owned(),
                kind,
            },
        );

        Ok(module_id)
    }

    /// Copy-on-read module lookup by id.
    pub fn module(
        &self,
        connection: &Connection,
        module_id: ModuleId,
    ) -> Result<Module, ProjectStorageError> {
        if module_id.is_null() {
            return Err(ProjectStorageError::ModuleDoesNotExist);
        }

        {
            let cache = self.cache.read();
            if let Some(module) = cache.modules.get(&module_id) {
                return Ok(module.clone());
            }
        }

        let module = connection
            .prepare_cached("SELECT name, kind FROM modules WHERE moduleId=?1")?
            .query_row([module_id], |row| {
                Ok(Module {
                    name: row.get(0)?,
                    kind: row.get(1)?,
                })
            })
            .optional()?
            .ok_or(ProjectStorageError::ModuleDoesNotExist)?;

        let mut cache = self.cache.write();
        cache.insert(module_id, module.clone());

        Ok(module)
    }

    /// All module ids whose name starts with `prefix`, capped at 128.
    pub fn module_ids_starts_with(&self, prefix: &str, kind: ModuleKind) -> Vec<ModuleId> {
        if prefix.is_empty() {
            return Vec::new();
        }

        let cache = self.cache.read();
        let mut module_ids: Vec<ModuleId> = cache
            .modules
            .iter()
            .filter(|(_, module)| module.kind == kind && module.name.starts_with(prefix))
            .map(|(&module_id, _)| module_id)
            .collect();

        module_ids.sort_unstable();
        module_ids.truncate(PREFIX_LOOKUP_LIMIT);
        module_ids
    }
}

fn fetch_module_id(
    connection: &Connection,
    name: &str,
    kind: ModuleKind,
) -> Result<ModuleId, ProjectStorageError> {
    let found = connection
        .prepare_cached("SELECT moduleId FROM modules WHERE name=?1 AND kind=?2")?
        .query_row(rusqlite::params![name, kind], |row| row.get(0))
        .optional()?;

    if let Some(module_id) = found {
        return Ok(module_id);
    }

    let module_id = connection
        .prepare_cached(
            "INSERT INTO modules(name, kind) VALUES(?1, ?2) \
             ON CONFLICT DO UPDATE SET name=?1, kind=?2 \
             RETURNING moduleId",
        )?
        .query_row(rusqlite::params![name, kind], |row| row.get(0))?;

    Ok(module_id)
}

impl ToSql for ModuleKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(Value::Integer(*self as i64)))
    }
}

impl FromSql for ModuleKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match i64::column_result(value)? {
            1 => Ok(Self::QmlLibrary),
            2 => Ok(Self::CppLibrary),
            3 => Ok(Self::PathLibrary),
            other => Err(FromSqlError::OutOfRange(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    fn storage() -> (Database, ModulesStorage) {
        let database = Database::in_memory().unwrap();
        let modules = ModulesStorage::populate(database.connection()).unwrap();
        (database, modules)
    }

    #[test]
    fn module_id_is_created_on_first_lookup() {
        let (database, modules) = storage();

        let module_id = modules
            .module_id(database.connection(), "QtQuick", ModuleKind::QmlLibrary)
            .unwrap();

        assert!(module_id.is_valid());
    }

    #[test]
    fn module_id_is_stable_across_lookups() {
        let (database, modules) = storage();

        let first = modules
            .module_id(database.connection(), "QtQuick", ModuleKind::QmlLibrary)
            .unwrap();
        let second = modules
            .module_id(database.connection(), "QtQuick", ModuleKind::QmlLibrary)
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn same_name_with_different_kind_is_a_different_module() {
        let (database, modules) = storage();

        let qml = modules
            .module_id(database.connection(), "QtQuick", ModuleKind::QmlLibrary)
            .unwrap();
        let cpp = modules
            .module_id(database.connection(), "QtQuick", ModuleKind::CppLibrary)
            .unwrap();

        assert_ne!(qml, cpp);
    }

    #[test]
    fn empty_name_is_the_null_module() {
        let (database, modules) = storage();

        let module_id = modules
            .module_id(database.connection(), "", ModuleKind::QmlLibrary)
            .unwrap();

        assert!(module_id.is_null());
    }

    #[test]
    fn module_lookup_round_trips() {
        let (database, modules) = storage();

        let module_id = modules
            .module_id(database.connection(), "QtQuick", ModuleKind::QmlLibrary)
            .unwrap();
        let module = modules.module(database.connection(), module_id).unwrap();

        assert_eq!(module.name, "QtQuick");
        assert_eq!(module.kind, ModuleKind::QmlLibrary);
    }

    #[test]
    fn null_module_lookup_fails() {
        let (database, modules) = storage();

        let result = modules.module(database.connection(), ModuleId::NULL);

        assert!(matches!(
            result,
            Err(ProjectStorageError::ModuleDoesNotExist)
        ));
    }

    #[test]
    fn cache_is_populated_from_persisted_modules() {
        let database = Database::in_memory().unwrap();
        let first = ModulesStorage::populate(database.connection()).unwrap();
        let module_id = first
            .module_id(database.connection(), "QtQuick", ModuleKind::QmlLibrary)
            .unwrap();

        let repopulated = ModulesStorage::populate(database.connection()).unwrap();
        let module = repopulated.module(database.connection(), module_id).unwrap();

        assert_eq!(module.name, "QtQuick");
    }

    #[test]
    fn prefix_lookup_filters_by_kind_and_prefix() {
        let (database, modules) = storage();

        let quick = modules
            .module_id(database.connection(), "QtQuick", ModuleKind::QmlLibrary)
            .unwrap();
        let layouts = modules
            .module_id(
                database.connection(),
                "QtQuick.Layouts",
                ModuleKind::QmlLibrary,
            )
            .unwrap();
        let _qml = modules
            .module_id(database.connection(), "QtQml", ModuleKind::QmlLibrary)
            .unwrap();
        let _path = modules
            .module_id(database.connection(), "QtQuickPath", ModuleKind::PathLibrary)
            .unwrap();

        let found = modules.module_ids_starts_with("QtQuick", ModuleKind::QmlLibrary);

        assert_eq!(found, vec![quick, layouts]);
    }
}
