//! Statements over the `bases` and `prototypes` tables.
//!
//! `bases` is the union of prototype and extension parents; `prototypes`
//! singles out the preferred parent for single-chain walks. The recursive
//! chain queries are consumed row-by-row so cycle checks can abort the walk
//! the moment the starting type reappears.

use quill_ids::{ImportedTypeNameId, SourceId, TypeId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::ProjectStorageError;

pub(crate) fn insert_base(
    connection: &Connection,
    type_id: TypeId,
    base_id: TypeId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("INSERT INTO bases(typeId, baseId) VALUES(?1, ?2)")?
        .execute(params![type_id, base_id])?;

    Ok(())
}

pub(crate) fn update_base(
    connection: &Connection,
    type_id: TypeId,
    new_base_id: TypeId,
    old_base_id: TypeId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("UPDATE bases SET baseId=?2 WHERE typeId=?1 AND baseId=?3")?
        .execute(params![type_id, new_base_id, old_base_id])?;

    Ok(())
}

pub(crate) fn delete_base(
    connection: &Connection,
    type_id: TypeId,
    base_id: TypeId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("DELETE FROM bases WHERE typeId=?1 AND baseId=?2")?
        .execute(params![type_id, base_id])?;

    Ok(())
}

pub(crate) fn delete_all_bases(
    connection: &Connection,
    type_id: TypeId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("DELETE FROM bases WHERE typeId=?1")?
        .execute(params![type_id])?;

    Ok(())
}

pub(crate) fn base_ids(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Vec<TypeId>, ProjectStorageError> {
    let mut statement =
        connection.prepare_cached("SELECT baseId FROM bases WHERE typeId=?1 ORDER BY baseId")?;
    let base_ids = statement
        .query_map(params![type_id], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    Ok(base_ids)
}

/// Upsert the preferred prototype; returns whether the row changed.
pub(crate) fn upsert_prototype(
    connection: &Connection,
    type_id: TypeId,
    prototype_id: TypeId,
) -> Result<bool, ProjectStorageError> {
    let changed = connection
        .prepare_cached(
            "INSERT INTO prototypes(typeId, prototypeId) \
             VALUES(?1, ?2) \
             ON CONFLICT DO UPDATE SET prototypeId=excluded.prototypeId \
             WHERE prototypeId IS NOT excluded.prototypeId",
        )?
        .execute(params![type_id, prototype_id])?;

    Ok(changed > 0)
}

pub(crate) fn delete_prototype(
    connection: &Connection,
    type_id: TypeId,
) -> Result<bool, ProjectStorageError> {
    let changed = connection
        .prepare_cached("DELETE FROM prototypes WHERE typeId=?1")?
        .execute(params![type_id])?;

    Ok(changed > 0)
}

pub(crate) fn prototype_id(
    connection: &Connection,
    type_id: TypeId,
) -> Result<TypeId, ProjectStorageError> {
    let prototype_id = connection
        .prepare_cached("SELECT prototypeId FROM prototypes WHERE typeId=?1")?
        .query_row(params![type_id], |row| row.get(0))
        .optional()?
        .unwrap_or_default();

    Ok(prototype_id)
}

pub(crate) fn extension_id(
    connection: &Connection,
    type_id: TypeId,
) -> Result<TypeId, ProjectStorageError> {
    let extension_id = connection
        .prepare_cached(
            "SELECT baseId FROM bases WHERE typeId=?1 AND baseId NOT IN ( \
               SELECT prototypeId FROM prototypes WHERE typeId=?1)",
        )?
        .query_row(params![type_id], |row| row.get(0))
        .optional()?
        .unwrap_or_default();

    Ok(extension_id)
}

/// Every type of a source with its prototype and extension name ids.
pub(crate) fn type_base_name_rows_by_source_id(
    connection: &Connection,
    source_id: SourceId,
) -> Result<Vec<(TypeId, ImportedTypeNameId, ImportedTypeNameId)>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT typeId, prototypeNameId, extensionNameId FROM types WHERE sourceId=?1",
    )?;
    let rows = statement
        .query_map(params![source_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<Result<_, _>>()?;

    Ok(rows)
}

pub(crate) fn base_name_ids(
    connection: &Connection,
    type_id: TypeId,
) -> Result<(ImportedTypeNameId, ImportedTypeNameId), ProjectStorageError> {
    let name_ids = connection
        .prepare_cached("SELECT prototypeNameId, extensionNameId FROM types WHERE typeId=?1")?
        .query_row(params![type_id], |row| Ok((row.get(0)?, row.get(1)?)))
        .optional()?
        .unwrap_or_default();

    Ok(name_ids)
}

/// Re-point every base edge at `base_id` to the unresolved sentinel,
/// returning the owning type ids.
pub(crate) fn reset_bases_to_unresolved(
    connection: &Connection,
    base_id: TypeId,
) -> Result<Vec<TypeId>, ProjectStorageError> {
    let mut statement =
        connection.prepare_cached("UPDATE bases SET baseId=?2 WHERE baseId=?1 RETURNING typeId")?;
    let type_ids = statement
        .query_map(params![base_id, TypeId::UNRESOLVED], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    Ok(type_ids)
}

pub(crate) fn reset_prototypes_to_unresolved(
    connection: &Connection,
    prototype_id: TypeId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("UPDATE prototypes SET prototypeId=?2 WHERE prototypeId=?1")?
        .execute(params![prototype_id, TypeId::UNRESOLVED])?;

    Ok(())
}

/// Types whose prototype or extension is spelled `name` and currently bound
/// to `base_id`.
pub(crate) fn bases_referencing_name_and_base(
    connection: &Connection,
    name: &str,
    base_id: TypeId,
) -> Result<Vec<(TypeId, ImportedTypeNameId, ImportedTypeNameId)>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT typeId, prototypeNameId, extensionNameId \
         FROM types JOIN bases USING(typeId) JOIN importedTypeNames AS itn \
         WHERE baseId=?2 AND itn.name=?1 \
           AND (importedTypeNameId=prototypeNameId OR importedTypeNameId=extensionNameId)",
    )?;
    let rows = statement
        .query_map(params![name, base_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<Result<_, _>>()?;

    Ok(rows)
}

/// Walk the transitive prototype+extension chain of `type_id`, calling `f`
/// for each chain id until it returns `false`.
pub(crate) fn each_prototype_and_extension_id(
    connection: &Connection,
    type_id: TypeId,
    mut f: impl FnMut(TypeId) -> Result<bool, ProjectStorageError>,
) -> Result<(), ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "WITH RECURSIVE \
           prototypes(typeId) AS ( \
               SELECT baseId FROM bases WHERE typeId=?1 \
             UNION ALL \
               SELECT baseId \
               FROM bases JOIN prototypes USING(typeId)) \
         SELECT typeId FROM prototypes",
    )?;
    let mut rows = statement.query(params![type_id])?;

    while let Some(row) = rows.next()? {
        if !f(row.get(0)?)? {
            break;
        }
    }

    Ok(())
}

/// The transitive prototype chain of `type_id` over the `prototypes` table.
pub(crate) fn prototype_chain_ids(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Vec<TypeId>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "WITH RECURSIVE \
           typeChain(typeId) AS ( \
               SELECT prototypeId FROM prototypes WHERE typeId=?1 \
             UNION ALL \
               SELECT prototypeId \
               FROM prototypes JOIN typeChain USING(typeId)) \
         SELECT typeId FROM typeChain",
    )?;
    let type_ids = statement
        .query_map(params![type_id], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    Ok(type_ids)
}

/// Every type that transitively derives from `type_id`.
pub(crate) fn heir_ids(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Vec<TypeId>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "WITH RECURSIVE \
           typeSelection(typeId) AS ( \
               SELECT typeId FROM bases WHERE baseId=?1 \
             UNION ALL \
               SELECT b.typeId \
               FROM bases AS b JOIN typeSelection AS ts \
               WHERE baseId=ts.typeId) \
         SELECT typeId FROM typeSelection",
    )?;
    let type_ids = statement
        .query_map(params![type_id], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    Ok(type_ids)
}
