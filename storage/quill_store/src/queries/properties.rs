//! Statements over the `propertyDeclarations` table.
//!
//! Alias rows keep the textual target (`aliasPropertyDeclarationName`,
//! `aliasPropertyDeclarationTailName`) next to the resolved linkage
//! (`aliasPropertyDeclarationId`, `aliasPropertyDeclarationTailId`); the
//! resolved type and traits are copied from the target when an alias is
//! linked and propagated down alias chains with recursive updates.

use quill_ids::{ImportedTypeNameId, PropertyDeclarationId, SourceId, TypeId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::ProjectStorageError;
use crate::info;
use crate::traits::PropertyDeclarationTraits;

/// A persisted property declaration, keyed by name within its type.
pub(crate) struct PropertyDeclarationView {
    pub name: String,
    pub traits: PropertyDeclarationTraits,
    pub property_type_id: TypeId,
    pub imported_type_name_id: ImportedTypeNameId,
    pub id: PropertyDeclarationId,
}

/// A persisted alias row, keyed by name within its type.
pub(crate) struct AliasDeclarationView {
    pub name: String,
    pub id: PropertyDeclarationId,
}

/// A dangling alias row with its textual target.
pub(crate) struct BrokenAliasView {
    pub type_id: TypeId,
    pub id: PropertyDeclarationId,
    pub alias_imported_type_name_id: ImportedTypeNameId,
    pub alias_property_name: String,
    pub alias_property_name_tail: Option<String>,
    pub source_id: SourceId,
}

/// The resolved facts of a property used when linking aliases against it.
pub(crate) struct PropertyDeclarationResult {
    pub imported_type_name_id: ImportedTypeNameId,
    pub property_type_id: TypeId,
    pub id: PropertyDeclarationId,
    pub traits: PropertyDeclarationTraits,
}

pub(crate) fn property_declaration_views(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Vec<PropertyDeclarationView>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT name, propertyTraits, propertyTypeId, propertyImportedTypeNameId, \
                propertyDeclarationId \
         FROM propertyDeclarations \
         WHERE typeId=?1 \
         ORDER BY name",
    )?;
    let views = statement
        .query_map(params![type_id], |row| {
            Ok(PropertyDeclarationView {
                name: row.get(0)?,
                traits: row.get(1)?,
                property_type_id: row.get(2)?,
                imported_type_name_id: row.get(3)?,
                id: row.get(4)?,
            })
        })?
        .collect::<Result<_, _>>()?;

    Ok(views)
}

pub(crate) fn insert_property_declaration(
    connection: &Connection,
    type_id: TypeId,
    name: &str,
    property_type_id: TypeId,
    traits: PropertyDeclarationTraits,
    imported_type_name_id: ImportedTypeNameId,
) -> Result<PropertyDeclarationId, ProjectStorageError> {
    let id = connection
        .prepare_cached(
            "INSERT INTO propertyDeclarations( \
               typeId, name, propertyTypeId, propertyTraits, propertyImportedTypeNameId, \
               aliasPropertyDeclarationId) \
             VALUES(?1, ?2, ?3, ?4, ?5, NULL) \
             RETURNING propertyDeclarationId",
        )?
        .query_row(
            params![type_id, name, property_type_id, traits, imported_type_name_id],
            |row| row.get(0),
        )?;

    Ok(id)
}

pub(crate) fn insert_alias_property_declaration(
    connection: &Connection,
    type_id: TypeId,
    name: &str,
    alias_imported_type_name_id: ImportedTypeNameId,
    alias_property_name: &str,
    alias_property_name_tail: Option<&str>,
) -> Result<PropertyDeclarationId, ProjectStorageError> {
    let id = connection
        .prepare_cached(
            "INSERT INTO propertyDeclarations( \
               typeId, name, aliasPropertyImportedTypeNameId, aliasPropertyDeclarationName, \
               aliasPropertyDeclarationTailName) \
             VALUES(?1, ?2, ?3, ?4, ?5) \
             RETURNING propertyDeclarationId",
        )?
        .query_row(
            params![
                type_id,
                name,
                alias_imported_type_name_id,
                alias_property_name,
                alias_property_name_tail
            ],
            |row| row.get(0),
        )?;

    Ok(id)
}

/// Turn a row into a regular property declaration, clearing any alias
/// leftovers.
pub(crate) fn update_property_declaration(
    connection: &Connection,
    id: PropertyDeclarationId,
    property_type_id: TypeId,
    traits: PropertyDeclarationTraits,
    imported_type_name_id: ImportedTypeNameId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "UPDATE propertyDeclarations \
             SET propertyTypeId=?2, \
                 propertyTraits=?3, \
                 propertyImportedTypeNameId=?4, \
                 aliasPropertyImportedTypeNameId=NULL, \
                 aliasPropertyDeclarationName=NULL, \
                 aliasPropertyDeclarationTailName=NULL, \
                 aliasPropertyDeclarationId=NULL, \
                 aliasPropertyDeclarationTailId=NULL \
             WHERE propertyDeclarationId=?1",
        )?
        .execute(params![id, property_type_id, traits, imported_type_name_id])?;

    Ok(())
}

/// Reset an alias row whose target is gone: no resolved type, no linkage.
pub(crate) fn reset_alias_property_declaration(
    connection: &Connection,
    id: PropertyDeclarationId,
    traits: PropertyDeclarationTraits,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "UPDATE propertyDeclarations \
             SET propertyTypeId=NULL, \
                 propertyTraits=?2, \
                 propertyImportedTypeNameId=NULL, \
                 aliasPropertyDeclarationId=NULL, \
                 aliasPropertyDeclarationTailId=NULL \
             WHERE propertyDeclarationId=?1",
        )?
        .execute(params![id, traits])?;

    Ok(())
}

/// Push `(propertyTypeId, propertyTraits)` down every alias chain hanging
/// off `id`.
pub(crate) fn update_alias_values_recursively_with(
    connection: &Connection,
    id: PropertyDeclarationId,
    property_type_id: TypeId,
    traits: PropertyDeclarationTraits,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "WITH RECURSIVE \
               properties(aliasPropertyDeclarationId) AS ( \
                 SELECT propertyDeclarationId FROM propertyDeclarations \
                   WHERE aliasPropertyDeclarationId=?1 \
                UNION ALL \
                 SELECT pd.propertyDeclarationId \
                 FROM propertyDeclarations AS pd JOIN properties \
                   USING(aliasPropertyDeclarationId)) \
             UPDATE propertyDeclarations AS pd \
             SET propertyTypeId=?2, propertyTraits=?3 \
             FROM properties AS p \
             WHERE pd.propertyDeclarationId=p.aliasPropertyDeclarationId",
        )?
        .execute(params![id, property_type_id, traits])?;

    Ok(())
}

/// Push the row's own `(propertyTypeId, propertyTraits)` down its alias
/// chains.
pub(crate) fn update_alias_values_recursively(
    connection: &Connection,
    id: PropertyDeclarationId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "WITH RECURSIVE \
               propertyValues(propertyTypeId, propertyTraits) AS ( \
                 SELECT propertyTypeId, propertyTraits FROM propertyDeclarations \
                   WHERE propertyDeclarationId=?1), \
               properties(aliasPropertyDeclarationId) AS ( \
                 SELECT propertyDeclarationId FROM propertyDeclarations \
                   WHERE aliasPropertyDeclarationId=?1 \
                UNION ALL \
                 SELECT pd.propertyDeclarationId \
                 FROM propertyDeclarations AS pd JOIN properties \
                   USING(aliasPropertyDeclarationId)) \
             UPDATE propertyDeclarations AS pd \
             SET propertyTypeId=pv.propertyTypeId, propertyTraits=pv.propertyTraits \
             FROM properties AS p, propertyValues AS pv \
             WHERE pd.propertyDeclarationId=p.aliasPropertyDeclarationId",
        )?
        .execute(params![id])?;

    Ok(())
}

pub(crate) fn delete_property_declaration(
    connection: &Connection,
    id: PropertyDeclarationId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("DELETE FROM propertyDeclarations WHERE propertyDeclarationId=?1")?
        .execute(params![id])?;

    Ok(())
}

pub(crate) fn delete_property_declarations_by_type_id(
    connection: &Connection,
    type_id: TypeId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("DELETE FROM propertyDeclarations WHERE typeId=?1")?
        .execute(params![type_id])?;

    Ok(())
}

pub(crate) fn alias_declaration_views(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Vec<AliasDeclarationView>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT name, propertyDeclarationId \
         FROM propertyDeclarations \
         WHERE typeId=?1 AND aliasPropertyDeclarationId IS NOT NULL \
         ORDER BY name",
    )?;
    let views = statement
        .query_map(params![type_id], |row| {
            Ok(AliasDeclarationView {
                name: row.get(0)?,
                id: row.get(1)?,
            })
        })?
        .collect::<Result<_, _>>()?;

    Ok(views)
}

/// Re-point aliases bound to `from` at `to` (used when a shadowing property
/// appears or a shadowed property takes over for a removed one).
pub(crate) fn repoint_alias_references(
    connection: &Connection,
    from: PropertyDeclarationId,
    to: PropertyDeclarationId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "UPDATE propertyDeclarations SET aliasPropertyDeclarationId=?2 \
             WHERE aliasPropertyDeclarationId=?1",
        )?
        .execute(params![from, to])?;

    Ok(())
}

/// Re-point aliases bound to `old` at `new`, copying `new`'s resolved type
/// and traits into them.
pub(crate) fn repoint_alias_references_with_values(
    connection: &Connection,
    new: PropertyDeclarationId,
    old: PropertyDeclarationId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "UPDATE propertyDeclarations \
             SET propertyTypeId=new.propertyTypeId, \
                 propertyTraits=new.propertyTraits, \
                 aliasPropertyDeclarationId=?1 \
             FROM (SELECT propertyTypeId, propertyTraits FROM propertyDeclarations \
                   WHERE propertyDeclarationId=?1) AS new \
             WHERE aliasPropertyDeclarationId=?2",
        )?
        .execute(params![new, old])?;

    Ok(())
}

/// Null out an alias row's linkage and resolved value, if it has any.
pub(crate) fn update_alias_property_declaration_to_null(
    connection: &Connection,
    id: PropertyDeclarationId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "UPDATE propertyDeclarations \
             SET aliasPropertyDeclarationId=NULL, propertyTypeId=NULL, propertyTraits=NULL \
             WHERE propertyDeclarationId=?1 \
               AND (aliasPropertyDeclarationId IS NOT NULL \
                 OR propertyTypeId IS NOT NULL \
                 OR propertyTraits IS NOT NULL)",
        )?
        .execute(params![id])?;

    Ok(())
}

/// Null just the alias linkage of a row.
pub(crate) fn clear_alias_property_declaration_id(
    connection: &Connection,
    id: PropertyDeclarationId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "UPDATE propertyDeclarations SET aliasPropertyDeclarationId=NULL \
             WHERE propertyDeclarationId=?1",
        )?
        .execute(params![id])?;

    Ok(())
}

/// Alias rows that depend on `type_id`: through their resolved type,
/// through their link target, or through an imported name that now maps to
/// the type.
pub(crate) fn alias_rows_depending_on_type(
    connection: &Connection,
    type_id: TypeId,
) -> Result<
    Vec<(
        TypeId,
        PropertyDeclarationId,
        ImportedTypeNameId,
        PropertyDeclarationId,
        PropertyDeclarationId,
    )>,
    ProjectStorageError,
> {
    let mut statement = connection.prepare_cached(
        "  SELECT alias.typeId, \
                  alias.propertyDeclarationId, \
                  alias.aliasPropertyImportedTypeNameId, \
                  alias.aliasPropertyDeclarationId, \
                  alias.aliasPropertyDeclarationTailId \
           FROM propertyDeclarations AS alias \
             JOIN propertyDeclarations AS target \
               ON alias.aliasPropertyDeclarationId=target.propertyDeclarationId \
                  OR alias.aliasPropertyDeclarationTailId=target.propertyDeclarationId \
           WHERE alias.propertyTypeId=?1 \
         UNION ALL \
           SELECT alias.typeId, \
                  alias.propertyDeclarationId, \
                  alias.aliasPropertyImportedTypeNameId, \
                  alias.aliasPropertyDeclarationId, \
                  alias.aliasPropertyDeclarationTailId \
           FROM propertyDeclarations AS alias \
             JOIN propertyDeclarations AS target \
               ON alias.aliasPropertyDeclarationId=target.propertyDeclarationId \
                  OR alias.aliasPropertyDeclarationTailId=target.propertyDeclarationId \
           WHERE target.typeId=?1 \
         UNION ALL \
           SELECT alias.typeId, \
                  alias.propertyDeclarationId, \
                  alias.aliasPropertyImportedTypeNameId, \
                  alias.aliasPropertyDeclarationId, \
                  alias.aliasPropertyDeclarationTailId \
           FROM propertyDeclarations AS alias \
             JOIN propertyDeclarations AS target \
               ON alias.aliasPropertyDeclarationId=target.propertyDeclarationId \
                  OR alias.aliasPropertyDeclarationTailId=target.propertyDeclarationId \
           WHERE alias.aliasPropertyImportedTypeNameId IN \
             (SELECT importedTypeNameId \
              FROM exportedTypeNames JOIN importedTypeNames USING(name) \
              WHERE typeId=?1)",
    )?;
    let rows = statement
        .query_map(params![type_id], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        })?
        .collect::<Result<_, _>>()?;

    Ok(rows)
}

/// Null the resolved type of every non-alias property bound to `type_id`,
/// returning the rows for relinking.
pub(crate) fn null_property_types_for_type(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Vec<(TypeId, PropertyDeclarationId, ImportedTypeNameId)>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "UPDATE propertyDeclarations SET propertyTypeId=NULL \
         WHERE propertyTypeId=?1 AND aliasPropertyDeclarationId IS NULL \
         RETURNING typeId, propertyDeclarationId, propertyImportedTypeNameId",
    )?;
    let rows = statement
        .query_map(params![type_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<Result<_, _>>()?;

    Ok(rows)
}

/// Non-alias properties whose imported name is spelled `name` and whose
/// resolved type currently is `type_id` (possibly null).
pub(crate) fn property_rows_for_name_and_type(
    connection: &Connection,
    name: &str,
    type_id: TypeId,
) -> Result<Vec<(TypeId, PropertyDeclarationId, ImportedTypeNameId)>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT typeId, propertyDeclarationId, propertyImportedTypeNameId \
         FROM propertyDeclarations \
         WHERE propertyTypeId IS ?2 \
           AND propertyImportedTypeNameId IN \
             (SELECT importedTypeNameId FROM importedTypeNames WHERE name=?1)",
    )?;
    let rows = statement
        .query_map(params![name, type_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<Result<_, _>>()?;

    Ok(rows)
}

/// Alias rows whose target's imported name is spelled `name` and whose
/// resolved type currently is `type_id` (possibly null).
pub(crate) fn alias_rows_for_name_and_type(
    connection: &Connection,
    name: &str,
    type_id: TypeId,
) -> Result<
    Vec<(
        TypeId,
        PropertyDeclarationId,
        ImportedTypeNameId,
        PropertyDeclarationId,
        PropertyDeclarationId,
    )>,
    ProjectStorageError,
> {
    let mut statement = connection.prepare_cached(
        "SELECT alias.typeId, \
                alias.propertyDeclarationId, \
                alias.aliasPropertyImportedTypeNameId, \
                alias.aliasPropertyDeclarationId, \
                alias.aliasPropertyDeclarationTailId \
         FROM propertyDeclarations AS alias \
           JOIN propertyDeclarations AS target \
             ON alias.aliasPropertyDeclarationId=target.propertyDeclarationId \
                OR alias.aliasPropertyDeclarationTailId=target.propertyDeclarationId \
         WHERE alias.propertyTypeId IS ?2 \
           AND target.propertyImportedTypeNameId IN \
             (SELECT importedTypeNameId FROM importedTypeNames WHERE name=?1)",
    )?;
    let rows = statement
        .query_map(params![name, type_id], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        })?
        .collect::<Result<_, _>>()?;

    Ok(rows)
}

pub(crate) fn property_name(
    connection: &Connection,
    id: PropertyDeclarationId,
) -> Result<Option<String>, ProjectStorageError> {
    let name = connection
        .prepare_cached("SELECT name FROM propertyDeclarations WHERE propertyDeclarationId=?1")?
        .query_row(params![id], |row| row.get(0))
        .optional()?;

    Ok(name)
}

pub(crate) fn update_property_declaration_type(
    connection: &Connection,
    id: PropertyDeclarationId,
    property_type_id: TypeId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "UPDATE propertyDeclarations SET propertyTypeId=?2 WHERE propertyDeclarationId=?1",
        )?
        .execute(params![id, property_type_id])?;

    Ok(())
}

pub(crate) fn update_alias_id_and_type_name_id(
    connection: &Connection,
    id: PropertyDeclarationId,
    alias_id: PropertyDeclarationId,
    imported_type_name_id: ImportedTypeNameId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "UPDATE propertyDeclarations \
             SET aliasPropertyDeclarationId=?2, propertyImportedTypeNameId=?3 \
             WHERE propertyDeclarationId=?1",
        )?
        .execute(params![id, alias_id, imported_type_name_id])?;

    Ok(())
}

/// Relink an alias row to a freshly resolved target, copying its value.
pub(crate) fn update_property_declaration_with_alias_and_type(
    connection: &Connection,
    id: PropertyDeclarationId,
    property_type_id: TypeId,
    traits: PropertyDeclarationTraits,
    imported_type_name_id: ImportedTypeNameId,
    alias_id: PropertyDeclarationId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "UPDATE propertyDeclarations \
             SET propertyTypeId=?2, \
                 propertyTraits=?3, \
                 propertyImportedTypeNameId=?4, \
                 aliasPropertyDeclarationId=?5 \
             WHERE propertyDeclarationId=?1",
        )?
        .execute(params![id, property_type_id, traits, imported_type_name_id, alias_id])?;

    Ok(())
}

/// Copy the ultimate alias target's value onto the alias row itself.
pub(crate) fn propagate_alias_values(
    connection: &Connection,
    id: PropertyDeclarationId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "WITH RECURSIVE \
               properties(propertyDeclarationId, propertyTypeId, propertyTraits) AS ( \
                   SELECT aliasPropertyDeclarationId, propertyTypeId, propertyTraits \
                   FROM propertyDeclarations WHERE propertyDeclarationId=?1 \
                 UNION ALL \
                   SELECT pd.aliasPropertyDeclarationId, pd.propertyTypeId, pd.propertyTraits \
                   FROM propertyDeclarations AS pd JOIN properties \
                     USING(propertyDeclarationId)) \
             UPDATE propertyDeclarations AS pd \
             SET propertyTypeId=p.propertyTypeId, propertyTraits=p.propertyTraits \
             FROM properties AS p \
             WHERE pd.propertyDeclarationId=?1 AND p.propertyDeclarationId IS NULL AND \
               (pd.propertyTypeId IS NOT p.propertyTypeId \
                 OR pd.propertyTraits IS NOT p.propertyTraits)",
        )?
        .execute(params![id])?;

    Ok(())
}

/// Walk the alias chain hanging off `id`, calling `f` for each link until
/// it returns `false`.
pub(crate) fn each_alias_chain_id(
    connection: &Connection,
    id: PropertyDeclarationId,
    mut f: impl FnMut(PropertyDeclarationId) -> Result<bool, ProjectStorageError>,
) -> Result<(), ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "WITH RECURSIVE \
           properties(propertyDeclarationId) AS ( \
               SELECT aliasPropertyDeclarationId FROM propertyDeclarations \
               WHERE propertyDeclarationId=?1 \
             UNION ALL \
               SELECT aliasPropertyDeclarationId FROM propertyDeclarations \
               JOIN properties USING(propertyDeclarationId)) \
         SELECT propertyDeclarationId FROM properties",
    )?;
    let mut rows = statement.query(params![id])?;

    while let Some(row) = rows.next()? {
        let chain_id: PropertyDeclarationId = row.get(0)?;
        if chain_id.is_null() {
            break;
        }
        if !f(chain_id)? {
            break;
        }
    }

    Ok(())
}

pub(crate) fn property_declaration_id_by_type_and_name(
    connection: &Connection,
    type_id: TypeId,
    name: &str,
) -> Result<PropertyDeclarationId, ProjectStorageError> {
    let id = connection
        .prepare_cached(
            "SELECT propertyDeclarationId \
             FROM propertyDeclarations \
             WHERE typeId=?1 AND name=?2 \
             LIMIT 1",
        )?
        .query_row(params![type_id, name], |row| row.get(0))
        .optional()?
        .unwrap_or_default();

    Ok(id)
}

pub(crate) fn property_declaration_result(
    connection: &Connection,
    id: PropertyDeclarationId,
) -> Result<Option<PropertyDeclarationResult>, ProjectStorageError> {
    let result = connection
        .prepare_cached(
            "SELECT propertyImportedTypeNameId, propertyTypeId, propertyDeclarationId, \
                    propertyTraits \
             FROM propertyDeclarations \
             WHERE propertyDeclarationId=?1 \
             LIMIT 1",
        )?
        .query_row(params![id], |row| {
            Ok(PropertyDeclarationResult {
                imported_type_name_id: row.get(0)?,
                property_type_id: row.get(1)?,
                id: row.get(2)?,
                traits: row.get(3)?,
            })
        })
        .optional()?;

    Ok(result)
}

pub(crate) fn local_property_declaration_ids(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Vec<PropertyDeclarationId>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT propertyDeclarationId \
         FROM propertyDeclarations \
         WHERE typeId=?1 \
         ORDER BY propertyDeclarationId",
    )?;
    let ids = statement
        .query_map(params![type_id], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    Ok(ids)
}

pub(crate) fn property_declaration_info(
    connection: &Connection,
    id: PropertyDeclarationId,
) -> Result<Option<info::PropertyDeclaration>, ProjectStorageError> {
    let declaration = connection
        .prepare_cached(
            "SELECT typeId, name, propertyTraits, propertyTypeId \
             FROM propertyDeclarations \
             WHERE propertyDeclarationId=?1 \
             LIMIT 1",
        )?
        .query_row(params![id], |row| {
            Ok(info::PropertyDeclaration {
                type_id: row.get(0)?,
                name: row.get(1)?,
                traits: row.get(2)?,
                property_type_id: row.get(3)?,
            })
        })
        .optional()?;

    Ok(declaration)
}

pub(crate) fn property_declaration_name_and_type_id(
    connection: &Connection,
    id: PropertyDeclarationId,
) -> Result<(String, TypeId), ProjectStorageError> {
    let row = connection
        .prepare_cached(
            "SELECT name, typeId \
             FROM propertyDeclarations \
             WHERE propertyDeclarationId=?1 \
             LIMIT 1",
        )?
        .query_row(params![id], |row| Ok((row.get(0)?, row.get(1)?)))
        .optional()?
        .unwrap_or_default();

    Ok(row)
}

pub(crate) fn default_property_declaration_id_local(
    connection: &Connection,
    type_id: TypeId,
) -> Result<PropertyDeclarationId, ProjectStorageError> {
    let id = connection
        .prepare_cached("SELECT defaultPropertyId FROM types WHERE typeId=?1")?
        .query_row(params![type_id], |row| row.get(0))
        .optional()?
        .unwrap_or_default();

    Ok(id)
}

/// The first declaration named `name` along the prototype+extension chain
/// above `type_id` (not on the type itself).
pub(crate) fn next_property_declaration_id(
    connection: &Connection,
    type_id: TypeId,
    name: &str,
) -> Result<PropertyDeclarationId, ProjectStorageError> {
    let mut found = PropertyDeclarationId::NULL;

    super::bases::each_prototype_and_extension_id(connection, type_id, |base_id| {
        let id = property_declaration_id_by_type_and_name(connection, base_id, name)?;
        if id.is_valid() {
            found = id;
            return Ok(false);
        }
        Ok(true)
    })?;

    Ok(found)
}

/// The declaration named `name` on `type_id` or the nearest base declaring
/// it.
pub(crate) fn property_declaration_id(
    connection: &Connection,
    type_id: TypeId,
    name: &str,
) -> Result<PropertyDeclarationId, ProjectStorageError> {
    let id = property_declaration_id_by_type_and_name(connection, type_id, name)?;
    if id.is_valid() {
        return Ok(id);
    }

    next_property_declaration_id(connection, type_id, name)
}

/// Resolved facts of `name` on `type_id` or the nearest base declaring it.
pub(crate) fn property_declaration_by_type_and_name(
    connection: &Connection,
    type_id: TypeId,
    name: &str,
) -> Result<Option<PropertyDeclarationResult>, ProjectStorageError> {
    let id = property_declaration_id(connection, type_id, name)?;

    property_declaration_result(connection, id)
}

/// The default property of the nearest base above `type_id` that has one.
pub(crate) fn next_default_property_declaration_id(
    connection: &Connection,
    type_id: TypeId,
) -> Result<PropertyDeclarationId, ProjectStorageError> {
    let mut found = PropertyDeclarationId::NULL;

    super::bases::each_prototype_and_extension_id(connection, type_id, |base_id| {
        let id = default_property_declaration_id_local(connection, base_id)?;
        if id.is_valid() {
            found = id;
            return Ok(false);
        }
        Ok(true)
    })?;

    Ok(found)
}

/// The default property of `type_id` or the nearest base that declares one.
pub(crate) fn default_property_declaration_id(
    connection: &Connection,
    type_id: TypeId,
) -> Result<PropertyDeclarationId, ProjectStorageError> {
    let id = default_property_declaration_id_local(connection, type_id)?;
    if id.is_valid() {
        return Ok(id);
    }

    next_default_property_declaration_id(connection, type_id)
}

/// Alias rows that lost their resolved binding but kept their textual
/// target; the repair pass retries linking them.
pub(crate) fn broken_alias_declarations(
    connection: &Connection,
) -> Result<Vec<BrokenAliasView>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT typeId, \
                propertyDeclarationId, \
                aliasPropertyImportedTypeNameId, \
                aliasPropertyDeclarationName, \
                aliasPropertyDeclarationTailName, \
                sourceId \
         FROM propertyDeclarations JOIN types USING(typeId) \
         WHERE aliasPropertyImportedTypeNameId IS NOT NULL \
           AND propertyImportedTypeNameId IS NULL",
    )?;
    let views = statement
        .query_map([], |row| {
            Ok(BrokenAliasView {
                type_id: row.get(0)?,
                id: row.get(1)?,
                alias_imported_type_name_id: row.get(2)?,
                alias_property_name: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                alias_property_name_tail: row.get(4)?,
                source_id: row.get(5)?,
            })
        })?
        .collect::<Result<_, _>>()?;

    Ok(views)
}
