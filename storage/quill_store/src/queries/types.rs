//! Statements over the `types` table.

use quill_ids::{PropertyDeclarationId, SourceId, TypeId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::ProjectStorageError;
use crate::info;
use crate::traits::TypeTraits;

use super::id_array;

/// A type with its current default property, keyed by type id.
pub(crate) struct TypeWithDefaultPropertyView {
    pub type_id: TypeId,
    pub default_property_id: PropertyDeclarationId,
}

pub(crate) fn insert_type(
    connection: &Connection,
    source_id: SourceId,
    name: &str,
) -> Result<TypeId, ProjectStorageError> {
    let type_id = connection
        .prepare_cached("INSERT INTO types(sourceId, name) VALUES(?1, ?2) RETURNING typeId")?
        .query_row(params![source_id, name], |row| row.get(0))?;

    Ok(type_id)
}

pub(crate) fn type_id_by_source_id_and_name(
    connection: &Connection,
    source_id: SourceId,
    name: &str,
) -> Result<TypeId, ProjectStorageError> {
    let type_id = connection
        .prepare_cached("SELECT typeId FROM types WHERE sourceId=?1 AND name=?2")?
        .query_row(params![source_id, name], |row| row.get(0))
        .optional()?
        .unwrap_or_default();

    Ok(type_id)
}

pub(crate) fn type_id_by_source_id(
    connection: &Connection,
    source_id: SourceId,
) -> Result<TypeId, ProjectStorageError> {
    let type_id = connection
        .prepare_cached("SELECT typeId FROM types WHERE sourceId=?1")?
        .query_row(params![source_id], |row| row.get(0))
        .optional()?
        .unwrap_or_default();

    Ok(type_id)
}

pub(crate) fn update_type_traits(
    connection: &Connection,
    type_id: TypeId,
    traits: TypeTraits,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("UPDATE types SET traits=?2 WHERE typeId=?1")?
        .execute(params![type_id, traits])?;

    Ok(())
}

pub(crate) fn update_prototype_and_extension_name(
    connection: &Connection,
    type_id: TypeId,
    prototype_name_id: quill_ids::ImportedTypeNameId,
    extension_name_id: quill_ids::ImportedTypeNameId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "UPDATE types \
             SET prototypeNameId=?2, extensionNameId=?3 \
             WHERE typeId=?1 AND (prototypeNameId IS NOT ?2 OR extensionNameId IS NOT ?3)",
        )?
        .execute(params![type_id, prototype_name_id, extension_name_id])?;

    Ok(())
}

pub(crate) fn type_name_and_source_id(
    connection: &Connection,
    type_id: TypeId,
) -> Result<(String, SourceId), ProjectStorageError> {
    let row = connection
        .prepare_cached("SELECT name, sourceId FROM types WHERE typeId=?1")?
        .query_row(params![type_id], |row| Ok((row.get(0)?, row.get(1)?)))
        .optional()?
        .unwrap_or_default();

    Ok(row)
}

pub(crate) fn source_id_by_type_id(
    connection: &Connection,
    type_id: TypeId,
) -> Result<SourceId, ProjectStorageError> {
    let source_id = connection
        .prepare_cached("SELECT sourceId FROM types WHERE typeId=?1")?
        .query_row(params![type_id], |row| row.get(0))
        .optional()?
        .unwrap_or_default();

    Ok(source_id)
}

/// Clear every synchronized column of a deleted type, keeping the row (and
/// therefore the type id) alive for references that relink later.
pub(crate) fn reset_type(
    connection: &Connection,
    type_id: TypeId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "UPDATE types \
             SET traits=NULL, \
                 prototypeNameId=NULL, \
                 extensionNameId=NULL, \
                 defaultPropertyId=NULL, \
                 annotationTraits=NULL \
             WHERE typeId=?1",
        )?
        .execute(params![type_id])?;

    Ok(())
}

pub(crate) fn not_updated_type_ids(
    connection: &Connection,
    updated_source_ids: &[SourceId],
    updated_type_ids: &[TypeId],
) -> Result<Vec<TypeId>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT DISTINCT typeId FROM types \
         WHERE sourceId IN rarray(?1) AND typeId NOT IN rarray(?2)",
    )?;
    let type_ids = statement
        .query_map(
            params![
                id_array(updated_source_ids.iter().copied()),
                id_array(updated_type_ids.iter().copied())
            ],
            |row| row.get(0),
        )?
        .collect::<Result<_, _>>()?;

    Ok(type_ids)
}

pub(crate) fn types_with_default_property(
    connection: &Connection,
) -> Result<Vec<TypeWithDefaultPropertyView>, ProjectStorageError> {
    let mut statement = connection
        .prepare_cached("SELECT typeId, defaultPropertyId FROM types ORDER BY typeId")?;
    let views = statement
        .query_map([], |row| {
            Ok(TypeWithDefaultPropertyView {
                type_id: row.get(0)?,
                default_property_id: row.get(1)?,
            })
        })?
        .collect::<Result<_, _>>()?;

    Ok(views)
}

pub(crate) fn update_default_property_id(
    connection: &Connection,
    type_id: TypeId,
    default_property_id: PropertyDeclarationId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("UPDATE types SET defaultPropertyId=?2 WHERE typeId=?1")?
        .execute(params![type_id, default_property_id])?;

    Ok(())
}

pub(crate) fn clear_default_property_id_referencing(
    connection: &Connection,
    property_declaration_id: PropertyDeclarationId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("UPDATE types SET defaultPropertyId=NULL WHERE defaultPropertyId=?1")?
        .execute(params![property_declaration_id])?;

    Ok(())
}

pub(crate) fn max_type_id(connection: &Connection) -> Result<i64, ProjectStorageError> {
    let max: Option<i64> = connection
        .prepare_cached("SELECT max(typeId) FROM types")?
        .query_row([], |row| row.get(0))?;

    Ok(max.unwrap_or(0))
}

pub(crate) fn info_type(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Option<info::Type>, ProjectStorageError> {
    let found = connection
        .prepare_cached("SELECT sourceId, traits, annotationTraits FROM types WHERE typeId=?1")?
        .query_row(params![type_id], |row| {
            Ok(info::Type {
                source_id: row.get(0)?,
                traits: row.get(1)?,
                annotation_traits: row.get(2)?,
            })
        })
        .optional()?;

    Ok(found)
}

pub(crate) fn fetched_type(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Option<info::FetchedType>, ProjectStorageError> {
    let found = connection
        .prepare_cached(
            "SELECT t.sourceId, t.name, t.typeId, t.traits, t.annotationTraits, pd.name \
             FROM types AS t \
               LEFT JOIN propertyDeclarations AS pd \
                 ON defaultPropertyId=propertyDeclarationId \
             WHERE t.typeId=?1",
        )?
        .query_row(params![type_id], |row| {
            Ok(info::FetchedType {
                source_id: row.get(0)?,
                name: row.get(1)?,
                type_id: row.get(2)?,
                traits: row.get(3)?,
                annotation_traits: row.get(4)?,
                default_property_name: row.get(5)?,
                prototype_id: TypeId::NULL,
                extension_id: TypeId::NULL,
            })
        })
        .optional()?;

    Ok(found)
}

pub(crate) fn fetched_types(
    connection: &Connection,
) -> Result<Vec<info::FetchedType>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT t.sourceId, t.name, t.typeId, t.traits, t.annotationTraits, pd.name \
         FROM types AS t \
           LEFT JOIN propertyDeclarations AS pd \
             ON defaultPropertyId=propertyDeclarationId \
         WHERE traits IS NOT NULL",
    )?;
    let types = statement
        .query_map([], |row| {
            Ok(info::FetchedType {
                source_id: row.get(0)?,
                name: row.get(1)?,
                type_id: row.get(2)?,
                traits: row.get(3)?,
                annotation_traits: row.get(4)?,
                default_property_name: row.get(5)?,
                prototype_id: TypeId::NULL,
                extension_id: TypeId::NULL,
            })
        })?
        .collect::<Result<_, _>>()?;

    Ok(types)
}

pub(crate) fn singleton_type_ids_by_source_id(
    connection: &Connection,
    source_id: SourceId,
) -> Result<Vec<TypeId>, ProjectStorageError> {
    let sql = format!(
        "SELECT DISTINCT typeId \
         FROM types \
           JOIN exportedTypeNames USING(typeId) \
           JOIN documentImports AS di USING(moduleId) \
         WHERE di.sourceId=?1 AND traits & {}",
        TypeTraits::SINGLETON_MASK
    );
    let mut statement = connection.prepare_cached(&sql)?;
    let type_ids = statement
        .query_map(params![source_id], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    Ok(type_ids)
}
