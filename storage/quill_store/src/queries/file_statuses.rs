//! Statements over the `fileStatuses` table.

use quill_ids::SourceId;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::ProjectStorageError;
use crate::package::FileStatus;

use super::id_array;

fn file_status_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileStatus> {
    Ok(FileStatus {
        source_id: row.get(0)?,
        size: row.get(1)?,
        last_modified: row.get(2)?,
    })
}

pub(crate) fn file_statuses_for_source_ids(
    connection: &Connection,
    updated_source_ids: &[SourceId],
) -> Result<Vec<FileStatus>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT sourceId, size, lastModified \
         FROM fileStatuses \
         WHERE sourceId IN rarray(?1) \
         ORDER BY sourceId",
    )?;
    let statuses = statement
        .query_map(
            params![id_array(updated_source_ids.iter().copied())],
            file_status_from_row,
        )?
        .collect::<Result<_, _>>()?;

    Ok(statuses)
}

pub(crate) fn all_file_statuses(
    connection: &Connection,
) -> Result<Vec<FileStatus>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT sourceId, size, lastModified FROM fileStatuses ORDER BY sourceId",
    )?;
    let statuses = statement
        .query_map([], file_status_from_row)?
        .collect::<Result<_, _>>()?;

    Ok(statuses)
}

pub(crate) fn file_status(
    connection: &Connection,
    source_id: SourceId,
) -> Result<Option<FileStatus>, ProjectStorageError> {
    let status = connection
        .prepare_cached("SELECT sourceId, size, lastModified FROM fileStatuses WHERE sourceId=?1")?
        .query_row(params![source_id], file_status_from_row)
        .optional()?;

    Ok(status)
}

pub(crate) fn insert_file_status(
    connection: &Connection,
    status: &FileStatus,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("INSERT INTO fileStatuses(sourceId, size, lastModified) VALUES(?1, ?2, ?3)")?
        .execute(params![status.source_id, status.size, status.last_modified])?;

    Ok(())
}

pub(crate) fn update_file_status(
    connection: &Connection,
    status: &FileStatus,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("UPDATE fileStatuses SET size=?2, lastModified=?3 WHERE sourceId=?1")?
        .execute(params![status.source_id, status.size, status.last_modified])?;

    Ok(())
}

pub(crate) fn delete_file_status(
    connection: &Connection,
    source_id: SourceId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("DELETE FROM fileStatuses WHERE sourceId=?1")?
        .execute(params![source_id])?;

    Ok(())
}
