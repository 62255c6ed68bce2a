//! Statements over the `projectEntryInfos` table.

use quill_ids::{DirectoryPathId, SourceId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::ProjectStorageError;
use crate::package::{FileType, ProjectEntryInfo};

use super::id_array;

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectEntryInfo> {
    Ok(ProjectEntryInfo {
        context_source_id: row.get(0)?,
        source_id: row.get(1)?,
        module_id: row.get(2)?,
        file_type: row.get(3)?,
    })
}

pub(crate) fn entries_for_context_source_ids(
    connection: &Connection,
    updated_context_source_ids: &[SourceId],
) -> Result<Vec<ProjectEntryInfo>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT contextSourceId, sourceId, moduleId, fileType \
         FROM projectEntryInfos \
         WHERE contextSourceId IN rarray(?1) \
         ORDER BY contextSourceId, sourceId",
    )?;
    let entries = statement
        .query_map(
            params![id_array(updated_context_source_ids.iter().copied())],
            entry_from_row,
        )?
        .collect::<Result<_, _>>()?;

    Ok(entries)
}

pub(crate) fn entries_for_context_source_id(
    connection: &Connection,
    context_source_id: SourceId,
) -> Result<Vec<ProjectEntryInfo>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT contextSourceId, sourceId, moduleId, fileType \
         FROM projectEntryInfos \
         WHERE contextSourceId=?1",
    )?;
    let entries = statement
        .query_map(params![context_source_id], entry_from_row)?
        .collect::<Result<_, _>>()?;

    Ok(entries)
}

pub(crate) fn entries_for_context_source_id_and_file_type(
    connection: &Connection,
    context_source_id: SourceId,
    file_type: FileType,
) -> Result<Vec<ProjectEntryInfo>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT contextSourceId, sourceId, moduleId, fileType \
         FROM projectEntryInfos \
         WHERE contextSourceId=?1 AND fileType=?2",
    )?;
    let entries = statement
        .query_map(params![context_source_id, file_type], entry_from_row)?
        .collect::<Result<_, _>>()?;

    Ok(entries)
}

pub(crate) fn entry_for_source_id(
    connection: &Connection,
    source_id: SourceId,
) -> Result<Option<ProjectEntryInfo>, ProjectStorageError> {
    let entry = connection
        .prepare_cached(
            "SELECT contextSourceId, sourceId, moduleId, fileType \
             FROM projectEntryInfos \
             WHERE sourceId=?1 \
             LIMIT 1",
        )?
        .query_row(params![source_id], entry_from_row)
        .optional()?;

    Ok(entry)
}

/// Directory ids of the subdirectory entries below a directory.
pub(crate) fn subdirectory_ids(
    connection: &Connection,
    directory_id: DirectoryPathId,
) -> Result<Vec<DirectoryPathId>, ProjectStorageError> {
    let context_source_id = SourceId::from_directory(directory_id);
    let mut statement = connection.prepare_cached(
        "SELECT sourceId FROM projectEntryInfos WHERE contextSourceId=?1 AND fileType=?2",
    )?;
    let directory_ids = statement
        .query_map(params![context_source_id, FileType::Directory], |row| {
            row.get::<_, SourceId>(0)
        })?
        .map(|source_id| source_id.map(|source_id| source_id.directory_path_id()))
        .collect::<Result<_, _>>()?;

    Ok(directory_ids)
}

pub(crate) fn insert_entry(
    connection: &Connection,
    entry: &ProjectEntryInfo,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "INSERT INTO projectEntryInfos(contextSourceId, sourceId, moduleId, fileType) \
             VALUES(?1, ?2, ?3, ?4)",
        )?
        .execute(params![
            entry.context_source_id,
            entry.source_id,
            entry.module_id,
            entry.file_type
        ])?;

    Ok(())
}

pub(crate) fn update_entry(
    connection: &Connection,
    entry: &ProjectEntryInfo,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "UPDATE projectEntryInfos SET moduleId=?3, fileType=?4 \
             WHERE contextSourceId=?1 AND sourceId=?2",
        )?
        .execute(params![
            entry.context_source_id,
            entry.source_id,
            entry.module_id,
            entry.file_type
        ])?;

    Ok(())
}

pub(crate) fn delete_entry(
    connection: &Connection,
    context_source_id: SourceId,
    source_id: SourceId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "DELETE FROM projectEntryInfos WHERE contextSourceId=?1 AND sourceId=?2",
        )?
        .execute(params![context_source_id, source_id])?;

    Ok(())
}
