//! Statements over the `exportedTypeNames` table.

use quill_ids::{ModuleId, SourceId, TypeId, Version, VersionNumber};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::ProjectStorageError;
use crate::info;

use super::id_array;

/// A persisted exported type name, keyed by `(name, module, version)`.
pub(crate) struct ExportedTypeView {
    pub module_id: ModuleId,
    pub name: String,
    pub version: Version,
    pub type_id: TypeId,
    pub context_source_id: SourceId,
}

pub(crate) fn exported_type_views_for_source_ids(
    connection: &Connection,
    updated_source_ids: &[SourceId],
) -> Result<Vec<ExportedTypeView>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT moduleId, name, majorVersion, minorVersion, typeId, contextSourceId \
         FROM exportedTypeNames \
         WHERE contextSourceId IN rarray(?1) \
         ORDER BY name, moduleId, majorVersion, minorVersion",
    )?;
    let views = statement
        .query_map(
            params![id_array(updated_source_ids.iter().copied())],
            |row| {
                Ok(ExportedTypeView {
                    module_id: row.get(0)?,
                    name: row.get(1)?,
                    version: Version {
                        major: row.get(2)?,
                        minor: row.get(3)?,
                    },
                    type_id: row.get(4)?,
                    context_source_id: row.get(5)?,
                })
            },
        )?
        .collect::<Result<_, _>>()?;

    Ok(views)
}

/// Insert an exported type name row; the raw result is surfaced so the
/// caller can map a unique-constraint violation to the duplicate report.
pub(crate) fn insert_exported_type_name(
    connection: &Connection,
    module_id: ModuleId,
    name: &str,
    version: Version,
    type_id: TypeId,
    context_source_id: SourceId,
) -> rusqlite::Result<()> {
    connection
        .prepare_cached(
            "INSERT INTO exportedTypeNames( \
               moduleId, name, majorVersion, minorVersion, typeId, contextSourceId) \
             VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
        )?
        .execute(params![
            module_id,
            name,
            version.major,
            version.minor,
            type_id,
            context_source_id
        ])?;

    Ok(())
}

pub(crate) fn delete_exported_type_name(
    connection: &Connection,
    module_id: ModuleId,
    name: &str,
    version: Version,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "DELETE FROM exportedTypeNames \
             WHERE name=?2 AND moduleId=?1 AND majorVersion=?3 AND minorVersion=?4",
        )?
        .execute(params![module_id, name, version.major, version.minor])?;

    Ok(())
}

pub(crate) fn update_exported_type_name_type_id(
    connection: &Connection,
    module_id: ModuleId,
    name: &str,
    version: Version,
    type_id: TypeId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "UPDATE exportedTypeNames \
             SET typeId=?5 \
             WHERE name=?2 AND moduleId=?1 AND majorVersion=?3 AND minorVersion=?4",
        )?
        .execute(params![module_id, name, version.major, version.minor, type_id])?;

    Ok(())
}

pub(crate) fn update_exported_type_name_context_source_id(
    connection: &Connection,
    module_id: ModuleId,
    name: &str,
    version: Version,
    context_source_id: SourceId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "UPDATE exportedTypeNames \
             SET contextSourceId=?5 \
             WHERE name=?2 AND moduleId=?1 AND majorVersion=?3 AND minorVersion=?4",
        )?
        .execute(params![
            module_id,
            name,
            version.major,
            version.minor,
            context_source_id
        ])?;

    Ok(())
}

pub(crate) fn type_id_by_module_id_and_name(
    connection: &Connection,
    module_id: ModuleId,
    name: &str,
) -> Result<TypeId, ProjectStorageError> {
    let type_id = connection
        .prepare_cached(
            "SELECT typeId FROM exportedTypeNames \
             WHERE moduleId=?1 AND name=?2 \
             ORDER BY majorVersion DESC, minorVersion DESC \
             LIMIT 1",
        )?
        .query_row(params![module_id, name], |row| row.get(0))
        .optional()?
        .unwrap_or_default();

    Ok(type_id)
}

pub(crate) fn type_id_by_module_id_and_name_and_major(
    connection: &Connection,
    module_id: ModuleId,
    name: &str,
    major: VersionNumber,
) -> Result<TypeId, ProjectStorageError> {
    let type_id = connection
        .prepare_cached(
            "SELECT typeId FROM exportedTypeNames \
             WHERE moduleId=?1 AND name=?2 AND majorVersion=?3 \
             ORDER BY minorVersion DESC \
             LIMIT 1",
        )?
        .query_row(params![module_id, name, major], |row| row.get(0))
        .optional()?
        .unwrap_or_default();

    Ok(type_id)
}

pub(crate) fn type_id_by_module_id_and_name_and_version(
    connection: &Connection,
    module_id: ModuleId,
    name: &str,
    version: Version,
) -> Result<TypeId, ProjectStorageError> {
    let type_id = connection
        .prepare_cached(
            "SELECT typeId FROM exportedTypeNames \
             WHERE moduleId=?1 AND name=?2 AND majorVersion=?3 AND minorVersion<=?4 \
             ORDER BY minorVersion DESC \
             LIMIT 1",
        )?
        .query_row(
            params![module_id, name, version.major, version.minor],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or_default();

    Ok(type_id)
}

pub(crate) fn type_ids_by_module_id(
    connection: &Connection,
    module_id: ModuleId,
) -> Result<Vec<TypeId>, ProjectStorageError> {
    let mut statement = connection
        .prepare_cached("SELECT DISTINCT typeId FROM exportedTypeNames WHERE moduleId=?1")?;
    let type_ids = statement
        .query_map(params![module_id], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    Ok(type_ids)
}

fn exported_type_name_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<info::ExportedTypeName> {
    Ok(info::ExportedTypeName {
        module_id: row.get(0)?,
        type_id: row.get(1)?,
        name: row.get(2)?,
        version: Version {
            major: row.get(3)?,
            minor: row.get(4)?,
        },
    })
}

pub(crate) fn exported_type_names_by_type_id(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Vec<info::ExportedTypeName>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT moduleId, typeId, name, majorVersion, minorVersion \
         FROM exportedTypeNames \
         WHERE typeId=?1",
    )?;
    let names = statement
        .query_map(params![type_id], |row| exported_type_name_from_row(row))?
        .collect::<Result<_, _>>()?;

    Ok(names)
}

/// Exported names of a type that are visible through the imports of a
/// source.
pub(crate) fn exported_type_names_by_type_id_and_source_id(
    connection: &Connection,
    type_id: TypeId,
    source_id: SourceId,
) -> Result<Vec<info::ExportedTypeName>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT etn.moduleId, typeId, name, etn.majorVersion, etn.minorVersion \
         FROM exportedTypeNames AS etn \
           JOIN documentImports USING(moduleId) \
         WHERE typeId=?1 AND sourceId=?2",
    )?;
    let names = statement
        .query_map(params![type_id, source_id], |row| {
            exported_type_name_from_row(row)
        })?
        .collect::<Result<_, _>>()?;

    Ok(names)
}
