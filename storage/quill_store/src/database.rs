//! Database configuration and the idempotent schema.
//!
//! The whole store lives in one SQLite file (or in memory, for tests) with
//! a strict-typed relational schema. Opening a database creates any missing
//! tables and indexes; an already-initialized database is left untouched,
//! tracked through `PRAGMA user_version`.

use std::path::PathBuf;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};

use crate::error::ProjectStorageError;
use crate::traits::TypeTraits;

const SCHEMA_VERSION: i64 = 1;

/// Where the database lives.
#[derive(Clone, Debug)]
pub enum DatabaseLocation {
    Path(PathBuf),
    InMemory,
}

/// Open configuration for a project storage database.
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub location: DatabaseLocation,
    /// How long statements wait on a locked database before failing.
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            location: DatabaseLocation::Path(path.into()),
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self {
            location: DatabaseLocation::InMemory,
            ..Self::default()
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            location: DatabaseLocation::InMemory,
            busy_timeout: Duration::from_secs(10),
        }
    }
}

/// An open project storage database with the schema in place.
pub struct Database {
    connection: Connection,
}

impl Database {
    /// Open (and initialize, if necessary) a database.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn open(config: &DatabaseConfig) -> Result<Self, ProjectStorageError> {
        let connection = match &config.location {
            DatabaseLocation::Path(path) => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
            )?,
            DatabaseLocation::InMemory => Connection::open_in_memory()?,
        };

        connection.busy_timeout(config.busy_timeout)?;
        if matches!(config.location, DatabaseLocation::Path(_)) {
            // journal_mode reports the resulting mode, so it cannot go
            // through pragma_update.
            connection.pragma_update_and_check(None, "journal_mode", "wal", |_row| Ok(()))?;
            connection.pragma_update(None, "synchronous", "normal")?;
        }
        quill_sqlite::load_array_module(&connection)?;

        let version: i64 = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version < SCHEMA_VERSION {
            create_schema(&connection)?;
            connection.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }

        Ok(Self { connection })
    }

    /// Open a fresh in-memory database.
    pub fn in_memory() -> Result<Self, ProjectStorageError> {
        Self::open(&DatabaseConfig::in_memory())
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.connection
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }
}

fn create_schema(connection: &Connection) -> Result<(), ProjectStorageError> {
    connection.execute_batch(DDL)?;

    // Partial index accelerating singleton lookups; the mask is part of the
    // persisted trait layout.
    connection.execute_batch(&format!(
        "CREATE INDEX IF NOT EXISTS index_types_singletonTraits \
         ON types(traits) WHERE traits & {}",
        TypeTraits::SINGLETON_MASK
    ))?;

    Ok(())
}

const DDL: &str = "
CREATE TABLE IF NOT EXISTS modules(
    moduleId INTEGER PRIMARY KEY,
    name TEXT,
    kind INTEGER
) STRICT;
CREATE UNIQUE INDEX IF NOT EXISTS index_modules_name_kind ON modules(name, kind);
CREATE INDEX IF NOT EXISTS index_modules_kind ON modules(kind);

CREATE TABLE IF NOT EXISTS types(
    typeId INTEGER PRIMARY KEY,
    sourceId INTEGER,
    name TEXT,
    traits INTEGER,
    prototypeNameId INTEGER,
    extensionNameId INTEGER,
    defaultPropertyId INTEGER,
    annotationTraits INTEGER
) STRICT;
CREATE UNIQUE INDEX IF NOT EXISTS index_types_sourceId_name ON types(sourceId, name);
CREATE INDEX IF NOT EXISTS index_types_defaultPropertyId ON types(defaultPropertyId);
CREATE INDEX IF NOT EXISTS index_types_prototypeNameId ON types(prototypeNameId);
CREATE INDEX IF NOT EXISTS index_types_extensionNameId ON types(extensionNameId);

CREATE TABLE IF NOT EXISTS propertyDeclarations(
    propertyDeclarationId INTEGER PRIMARY KEY,
    typeId INTEGER,
    name TEXT,
    propertyTypeId INTEGER,
    propertyTraits INTEGER,
    propertyImportedTypeNameId INTEGER,
    aliasPropertyImportedTypeNameId INTEGER,
    aliasPropertyDeclarationName TEXT,
    aliasPropertyDeclarationTailName TEXT,
    aliasPropertyDeclarationId INTEGER
        REFERENCES propertyDeclarations ON UPDATE NO ACTION ON DELETE RESTRICT,
    aliasPropertyDeclarationTailId INTEGER
        REFERENCES propertyDeclarations ON UPDATE NO ACTION ON DELETE RESTRICT
) STRICT;
CREATE UNIQUE INDEX IF NOT EXISTS index_propertyDeclarations_typeId_name
    ON propertyDeclarations(typeId, name);
CREATE INDEX IF NOT EXISTS index_propertyDeclarations_propertyTypeId
    ON propertyDeclarations(propertyTypeId, propertyImportedTypeNameId);
CREATE INDEX IF NOT EXISTS index_propertyDeclarations_aliasPropertyImportedTypeNameId
    ON propertyDeclarations(aliasPropertyImportedTypeNameId, propertyImportedTypeNameId);
CREATE INDEX IF NOT EXISTS index_propertyDeclarations_aliasPropertyDeclarationId
    ON propertyDeclarations(aliasPropertyDeclarationId)
    WHERE aliasPropertyDeclarationId IS NOT NULL;
CREATE INDEX IF NOT EXISTS index_propertyDeclarations_aliasPropertyDeclarationTailId
    ON propertyDeclarations(aliasPropertyDeclarationTailId)
    WHERE aliasPropertyDeclarationTailId IS NOT NULL;

CREATE TABLE IF NOT EXISTS bases(
    typeId INTEGER,
    baseId INTEGER,
    PRIMARY KEY(typeId, baseId)
) STRICT, WITHOUT ROWID;
CREATE INDEX IF NOT EXISTS index_bases_baseId_typeId ON bases(baseId, typeId);

CREATE TABLE IF NOT EXISTS prototypes(
    typeId INTEGER PRIMARY KEY,
    prototypeId INTEGER
) STRICT;
CREATE INDEX IF NOT EXISTS index_prototypes_typeId_prototypeId
    ON prototypes(typeId, prototypeId);
CREATE INDEX IF NOT EXISTS index_prototypes_prototypeId_typeId
    ON prototypes(prototypeId, typeId);

CREATE TABLE IF NOT EXISTS exportedTypeNames(
    name TEXT,
    moduleId INTEGER,
    typeId INTEGER,
    majorVersion INTEGER,
    minorVersion INTEGER,
    contextSourceId INTEGER,
    PRIMARY KEY(name, moduleId, majorVersion, minorVersion)
) STRICT, WITHOUT ROWID;
CREATE INDEX IF NOT EXISTS index_exportedTypeNames_typeId ON exportedTypeNames(typeId);
CREATE INDEX IF NOT EXISTS index_exportedTypeNames_moduleId ON exportedTypeNames(moduleId);
CREATE INDEX IF NOT EXISTS index_exportedTypeNames_contextSourceId
    ON exportedTypeNames(contextSourceId);

CREATE TABLE IF NOT EXISTS importedTypeNames(
    importedTypeNameId INTEGER PRIMARY KEY,
    importOrSourceId INTEGER,
    name TEXT,
    kind INTEGER
) STRICT;
CREATE UNIQUE INDEX IF NOT EXISTS index_importedTypeNames_kind_importOrSourceId_name
    ON importedTypeNames(kind, importOrSourceId, name);
CREATE INDEX IF NOT EXISTS index_importedTypeNames_name ON importedTypeNames(name);

CREATE TABLE IF NOT EXISTS enumerationDeclarations(
    enumerationDeclarationId INTEGER PRIMARY KEY,
    typeId INTEGER,
    name TEXT,
    enumeratorDeclarations TEXT
) STRICT;
CREATE UNIQUE INDEX IF NOT EXISTS index_enumerationDeclarations_typeId_name
    ON enumerationDeclarations(typeId, name);

CREATE TABLE IF NOT EXISTS functionDeclarations(
    functionDeclarationId INTEGER PRIMARY KEY,
    typeId INTEGER,
    name TEXT,
    signature TEXT,
    returnTypeName TEXT
) STRICT;
CREATE UNIQUE INDEX IF NOT EXISTS index_functionDeclarations_typeId_name_signature
    ON functionDeclarations(typeId, name, signature);

CREATE TABLE IF NOT EXISTS signalDeclarations(
    signalDeclarationId INTEGER PRIMARY KEY,
    typeId INTEGER,
    name TEXT,
    signature TEXT
) STRICT;
CREATE UNIQUE INDEX IF NOT EXISTS index_signalDeclarations_typeId_name_signature
    ON signalDeclarations(typeId, name, signature);

CREATE TABLE IF NOT EXISTS moduleExportedImports(
    moduleExportedImportId INTEGER PRIMARY KEY,
    moduleId INTEGER,
    exportedModuleId INTEGER,
    isAutoVersion INTEGER,
    majorVersion INTEGER,
    minorVersion INTEGER
) STRICT;
CREATE UNIQUE INDEX IF NOT EXISTS index_moduleExportedImports_exportedModuleId_moduleId
    ON moduleExportedImports(exportedModuleId, moduleId);

CREATE TABLE IF NOT EXISTS documentImports(
    importId INTEGER PRIMARY KEY,
    sourceId INTEGER,
    contextSourceId INTEGER,
    moduleId INTEGER,
    sourceModuleId INTEGER,
    kind INTEGER,
    majorVersion INTEGER,
    minorVersion INTEGER,
    parentImportId INTEGER,
    alias TEXT
) STRICT;
CREATE UNIQUE INDEX IF NOT EXISTS index_documentImports_full_key
    ON documentImports(sourceId, moduleId, alias, kind, sourceModuleId,
                       majorVersion, minorVersion, parentImportId);
CREATE UNIQUE INDEX IF NOT EXISTS index_documentImports_sourceId_alias
    ON documentImports(sourceId, alias) WHERE alias IS NOT NULL;
CREATE INDEX IF NOT EXISTS index_documentImports_contextSourceId_kind
    ON documentImports(contextSourceId, kind);

CREATE TABLE IF NOT EXISTS fileStatuses(
    sourceId INTEGER PRIMARY KEY,
    size INTEGER,
    lastModified INTEGER
) STRICT;

CREATE TABLE IF NOT EXISTS projectEntryInfos(
    contextSourceId INTEGER,
    sourceId INTEGER,
    moduleId INTEGER,
    fileType INTEGER,
    PRIMARY KEY(contextSourceId, sourceId)
) STRICT, WITHOUT ROWID;
CREATE UNIQUE INDEX IF NOT EXISTS index_projectEntryInfos_sourceId
    ON projectEntryInfos(sourceId);
CREATE INDEX IF NOT EXISTS index_projectEntryInfos_contextSourceId_fileType
    ON projectEntryInfos(contextSourceId, fileType);

CREATE TABLE IF NOT EXISTS propertyEditorPaths(
    typeId INTEGER PRIMARY KEY,
    pathSourceId INTEGER,
    directoryId INTEGER
) STRICT, WITHOUT ROWID;
CREATE INDEX IF NOT EXISTS index_propertyEditorPaths_directoryId
    ON propertyEditorPaths(directoryId);

CREATE TABLE IF NOT EXISTS typeAnnotations(
    typeId INTEGER PRIMARY KEY,
    sourceId INTEGER,
    directoryId INTEGER,
    typeName TEXT,
    iconPath TEXT,
    itemLibrary TEXT,
    hints TEXT
) STRICT, WITHOUT ROWID;
CREATE UNIQUE INDEX IF NOT EXISTS index_typeAnnotations_sourceId_typeId
    ON typeAnnotations(sourceId, typeId);
CREATE INDEX IF NOT EXISTS index_typeAnnotations_directoryId
    ON typeAnnotations(directoryId);
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creation_is_idempotent() {
        let database = Database::in_memory().unwrap();

        create_schema(database.connection()).unwrap();
        create_schema(database.connection()).unwrap();
    }

    #[test]
    fn all_tables_exist_after_open() {
        let database = Database::in_memory().unwrap();

        let count: i64 = database
            .connection()
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name IN (
                     'modules', 'types', 'propertyDeclarations', 'bases', 'prototypes',
                     'exportedTypeNames', 'importedTypeNames', 'enumerationDeclarations',
                     'functionDeclarations', 'signalDeclarations', 'moduleExportedImports',
                     'documentImports', 'fileStatuses', 'projectEntryInfos',
                     'propertyEditorPaths', 'typeAnnotations')",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(count, 16);
    }

    #[test]
    fn user_version_marks_the_database_initialized() {
        let database = Database::in_memory().unwrap();

        let version: i64 = database
            .connection()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();

        assert_eq!(version, SCHEMA_VERSION);
    }
}
