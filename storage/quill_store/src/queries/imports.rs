//! Statements over the `documentImports` and `moduleExportedImports`
//! tables.

use quill_ids::{ImportId, ModuleExportedImportId, ModuleId, SourceId, Version, VersionNumber};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::ProjectStorageError;
use crate::package::{Import, ImportKind, ModuleExportedImport};

use super::id_array;

/// A persisted document import row, keyed by
/// `(source, module, alias, version)`.
pub(crate) struct ImportView {
    pub import_id: ImportId,
    pub source_id: SourceId,
    pub module_id: ModuleId,
    pub version: Version,
    pub alias: Option<String>,
}

/// A persisted module-exported-import edge.
pub(crate) struct ModuleExportedImportView {
    pub module_exported_import_id: ModuleExportedImportId,
    pub module_id: ModuleId,
    pub exported_module_id: ModuleId,
}

pub(crate) fn import_views_for_context_source_ids(
    connection: &Connection,
    updated_source_ids: &[SourceId],
    kind: ImportKind,
) -> Result<Vec<ImportView>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT importId, sourceId, moduleId, majorVersion, minorVersion, alias \
         FROM documentImports \
         WHERE contextSourceId IN rarray(?1) AND kind=?2 \
         ORDER BY sourceId, moduleId, alias, majorVersion, minorVersion",
    )?;
    let views = statement
        .query_map(
            params![id_array(updated_source_ids.iter().copied()), kind],
            |row| {
                Ok(ImportView {
                    import_id: row.get(0)?,
                    source_id: row.get(1)?,
                    module_id: row.get(2)?,
                    version: Version {
                        major: row.get(3)?,
                        minor: row.get(4)?,
                    },
                    alias: row.get(5)?,
                })
            },
        )?
        .collect::<Result<_, _>>()?;

    Ok(views)
}

pub(crate) fn insert_document_import(
    connection: &Connection,
    import: &Import,
    kind: ImportKind,
    source_module_id: ModuleId,
    parent_import_id: ImportId,
) -> Result<ImportId, ProjectStorageError> {
    let import_id = connection
        .prepare_cached(
            "INSERT INTO documentImports(sourceId, moduleId, sourceModuleId, kind, \
               majorVersion, minorVersion, parentImportId, contextSourceId, alias) \
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
             RETURNING importId",
        )?
        .query_row(
            params![
                import.source_id,
                import.module_id,
                source_module_id,
                kind,
                import.version.major,
                import.version.minor,
                parent_import_id,
                import.context_source_id,
                import.alias,
            ],
            |row| row.get(0),
        )?;

    Ok(import_id)
}

pub(crate) fn delete_document_import(
    connection: &Connection,
    import_id: ImportId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("DELETE FROM documentImports WHERE importId=?1")?
        .execute(params![import_id])?;

    Ok(())
}

/// Delete the indirect imports hanging off a removed direct import.
pub(crate) fn delete_document_imports_with_parent(
    connection: &Connection,
    source_id: SourceId,
    parent_import_id: ImportId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("DELETE FROM documentImports WHERE sourceId=?1 AND parentImportId=?2")?
        .execute(params![source_id, parent_import_id])?;

    Ok(())
}

/// Expand the module-exported-imports graph reachable from `module_id`.
///
/// Auto-version edges propagate the importer's version; other edges carry
/// their declared version.
pub(crate) fn module_exported_import_expansion(
    connection: &Connection,
    module_id: ModuleId,
    version: Version,
) -> Result<Vec<(ModuleId, Version)>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "WITH RECURSIVE \
           imports(moduleId, majorVersion, minorVersion, moduleExportedImportId) AS ( \
               SELECT exportedModuleId, \
                      iif(isAutoVersion=1, ?2, majorVersion), \
                      iif(isAutoVersion=1, ?3, minorVersion), \
                      moduleExportedImportId \
                 FROM moduleExportedImports WHERE moduleId=?1 \
             UNION ALL \
               SELECT exportedModuleId, \
                      iif(mei.isAutoVersion=1, i.majorVersion, mei.majorVersion), \
                      iif(mei.isAutoVersion=1, i.minorVersion, mei.minorVersion), \
                      mei.moduleExportedImportId \
                 FROM moduleExportedImports AS mei JOIN imports AS i USING(moduleId)) \
         SELECT DISTINCT moduleId, majorVersion, minorVersion \
         FROM imports",
    )?;
    let expansion = statement
        .query_map(
            params![module_id, version.major, version.minor],
            |row| {
                Ok((
                    row.get::<_, ModuleId>(0)?,
                    Version {
                        major: row.get::<_, VersionNumber>(1)?,
                        minor: row.get::<_, VersionNumber>(2)?,
                    },
                ))
            },
        )?
        .collect::<Result<_, _>>()?;

    Ok(expansion)
}

pub(crate) fn import_id_by_source_id_and_alias(
    connection: &Connection,
    source_id: SourceId,
    alias: &str,
) -> Result<ImportId, ProjectStorageError> {
    let import_id = connection
        .prepare_cached(
            "SELECT importId FROM documentImports WHERE sourceId=?1 AND alias=?2 LIMIT 1",
        )?
        .query_row(params![source_id, alias], |row| row.get(0))
        .optional()?
        .unwrap_or_default();

    Ok(import_id)
}

pub(crate) fn import_id_for_import(
    connection: &Connection,
    import: &Import,
) -> Result<ImportId, ProjectStorageError> {
    let import_id = connection
        .prepare_cached(
            "SELECT importId \
             FROM documentImports \
             WHERE sourceId=?1 \
               AND moduleId=?2 \
               AND alias IS ?5 \
               AND majorVersion=?3 \
               AND minorVersion=?4 \
             LIMIT 1",
        )?
        .query_row(
            params![
                import.source_id,
                import.module_id,
                import.version.major,
                import.version.minor,
                import.alias,
            ],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or_default();

    Ok(import_id)
}

/// The source module of the import row that made `module_id` visible in
/// `source_id` (differs from `module_id` for indirect imports).
pub(crate) fn source_module_id(
    connection: &Connection,
    source_id: SourceId,
    module_id: ModuleId,
) -> Result<ModuleId, ProjectStorageError> {
    let source_module_id = connection
        .prepare_cached(
            "SELECT sourceModuleId FROM documentImports WHERE sourceId=?1 AND moduleId=?2",
        )?
        .query_row(params![source_id, module_id], |row| row.get(0))
        .optional()?
        .unwrap_or_default();

    Ok(source_module_id)
}

pub(crate) fn import_id_for_source_and_module(
    connection: &Connection,
    source_id: SourceId,
    module_id: ModuleId,
) -> Result<ImportId, ProjectStorageError> {
    let import_id = connection
        .prepare_cached(
            "SELECT importId FROM documentImports WHERE sourceId=?1 AND moduleId=?2",
        )?
        .query_row(params![source_id, module_id], |row| row.get(0))
        .optional()?
        .unwrap_or_default();

    Ok(import_id)
}

pub(crate) fn parent_import_id(
    connection: &Connection,
    import_id: ImportId,
) -> Result<ImportId, ProjectStorageError> {
    let parent_import_id = connection
        .prepare_cached("SELECT parentImportId FROM documentImports WHERE importId=?1")?
        .query_row(params![import_id], |row| row.get(0))
        .optional()?
        .unwrap_or_default();

    Ok(parent_import_id)
}

fn import_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Import> {
    Ok(Import {
        module_id: row.get(0)?,
        version: Version {
            major: row.get(1)?,
            minor: row.get(2)?,
        },
        source_id: row.get(3)?,
        context_source_id: row.get(4)?,
        alias: row.get(5)?,
    })
}

pub(crate) fn document_import_by_import_id(
    connection: &Connection,
    import_id: ImportId,
) -> Result<Option<Import>, ProjectStorageError> {
    let import = connection
        .prepare_cached(
            "SELECT moduleId, majorVersion, minorVersion, sourceId, contextSourceId, alias \
             FROM documentImports \
             WHERE importId=?1",
        )?
        .query_row(params![import_id], import_from_row)
        .optional()?;

    Ok(import)
}

pub(crate) fn all_document_imports(
    connection: &Connection,
) -> Result<Vec<Import>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT moduleId, majorVersion, minorVersion, sourceId, contextSourceId, alias \
         FROM documentImports",
    )?;
    let imports = statement
        .query_map([], import_from_row)?
        .collect::<Result<_, _>>()?;

    Ok(imports)
}

pub(crate) fn module_exported_import_views(
    connection: &Connection,
    updated_module_ids: &[ModuleId],
) -> Result<Vec<ModuleExportedImportView>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT moduleExportedImportId, moduleId, exportedModuleId \
         FROM moduleExportedImports \
         WHERE moduleId IN rarray(?1) \
         ORDER BY moduleId, exportedModuleId",
    )?;
    let views = statement
        .query_map(
            params![id_array(updated_module_ids.iter().copied())],
            |row| {
                Ok(ModuleExportedImportView {
                    module_exported_import_id: row.get(0)?,
                    module_id: row.get(1)?,
                    exported_module_id: row.get(2)?,
                })
            },
        )?
        .collect::<Result<_, _>>()?;

    Ok(views)
}

pub(crate) fn insert_module_exported_import(
    connection: &Connection,
    import: &ModuleExportedImport,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "INSERT INTO moduleExportedImports(moduleId, exportedModuleId, isAutoVersion, \
               majorVersion, minorVersion) \
             VALUES(?1, ?2, ?3, ?4, ?5)",
        )?
        .execute(params![
            import.module_id,
            import.exported_module_id,
            import.is_auto_version,
            import.version.major,
            import.version.minor,
        ])?;

    Ok(())
}

pub(crate) fn delete_module_exported_import(
    connection: &Connection,
    module_exported_import_id: ModuleExportedImportId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("DELETE FROM moduleExportedImports WHERE moduleExportedImportId=?1")?
        .execute(params![module_exported_import_id])?;

    Ok(())
}
