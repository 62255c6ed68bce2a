//! Statements over the `propertyEditorPaths` table.

use quill_ids::{DirectoryPathId, SourceId, TypeId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::ProjectStorageError;

use super::id_array;

/// A persisted property-editor path, keyed by type id.
pub(crate) struct PropertyEditorPathView {
    pub type_id: TypeId,
    pub path_source_id: SourceId,
    pub directory_id: DirectoryPathId,
}

pub(crate) fn views_for_directory_ids(
    connection: &Connection,
    updated_directory_ids: &[DirectoryPathId],
) -> Result<Vec<PropertyEditorPathView>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT typeId, pathSourceId, directoryId \
         FROM propertyEditorPaths \
         WHERE directoryId IN rarray(?1) \
         ORDER BY typeId",
    )?;
    let views = statement
        .query_map(
            params![id_array(updated_directory_ids.iter().copied())],
            |row| {
                Ok(PropertyEditorPathView {
                    type_id: row.get(0)?,
                    path_source_id: row.get(1)?,
                    directory_id: row.get(2)?,
                })
            },
        )?
        .collect::<Result<_, _>>()?;

    Ok(views)
}

pub(crate) fn insert_path(
    connection: &Connection,
    type_id: TypeId,
    path_source_id: SourceId,
    directory_id: DirectoryPathId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "INSERT INTO propertyEditorPaths(typeId, pathSourceId, directoryId) \
             VALUES(?1, ?2, ?3)",
        )?
        .execute(params![type_id, path_source_id, directory_id])?;

    Ok(())
}

pub(crate) fn update_path(
    connection: &Connection,
    type_id: TypeId,
    path_source_id: SourceId,
    directory_id: DirectoryPathId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "UPDATE propertyEditorPaths \
             SET pathSourceId=?2, directoryId=?3 \
             WHERE typeId=?1",
        )?
        .execute(params![type_id, path_source_id, directory_id])?;

    Ok(())
}

pub(crate) fn delete_path(
    connection: &Connection,
    type_id: TypeId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("DELETE FROM propertyEditorPaths WHERE typeId=?1")?
        .execute(params![type_id])?;

    Ok(())
}

pub(crate) fn path_source_id(
    connection: &Connection,
    type_id: TypeId,
) -> Result<SourceId, ProjectStorageError> {
    let path_source_id = connection
        .prepare_cached("SELECT pathSourceId FROM propertyEditorPaths WHERE typeId=?1")?
        .query_row(params![type_id], |row| row.get(0))
        .optional()?
        .unwrap_or_default();

    Ok(path_source_id)
}

/// Point a type at its property-editor document, outside the batch
/// pipeline.
pub(crate) fn upsert_path_source_id(
    connection: &Connection,
    type_id: TypeId,
    path_source_id: SourceId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "INSERT INTO propertyEditorPaths(typeId, pathSourceId) VALUES(?1, ?2) \
             ON CONFLICT DO UPDATE SET pathSourceId=excluded.pathSourceId \
             WHERE pathSourceId IS NOT excluded.pathSourceId",
        )?
        .execute(params![type_id, path_source_id])?;

    Ok(())
}
