//! Statements over the function, signal and enumeration declaration
//! tables. Signatures and enumerator maps live in JSON columns; the
//! readbacks parse them back into declaration values.

use quill_ids::{EnumerationDeclarationId, FunctionDeclarationId, SignalDeclarationId, TypeId};
use rusqlite::{params, Connection};

use crate::error::ProjectStorageError;
use crate::json;
use crate::package::{EnumerationDeclaration, FunctionDeclaration, SignalDeclaration};

pub(crate) struct FunctionDeclarationView {
    pub name: String,
    pub return_type_name: String,
    pub signature: String,
    pub id: FunctionDeclarationId,
}

pub(crate) struct SignalDeclarationView {
    pub name: String,
    pub signature: String,
    pub id: SignalDeclarationId,
}

pub(crate) struct EnumerationDeclarationView {
    pub name: String,
    pub enumerator_declarations: String,
    pub id: EnumerationDeclarationId,
}

pub(crate) fn function_declaration_views(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Vec<FunctionDeclarationView>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT name, returnTypeName, signature, functionDeclarationId \
         FROM functionDeclarations \
         WHERE typeId=?1 \
         ORDER BY name, signature",
    )?;
    let views = statement
        .query_map(params![type_id], |row| {
            Ok(FunctionDeclarationView {
                name: row.get(0)?,
                return_type_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                signature: row.get(2)?,
                id: row.get(3)?,
            })
        })?
        .collect::<Result<_, _>>()?;

    Ok(views)
}

pub(crate) fn insert_function_declaration(
    connection: &Connection,
    type_id: TypeId,
    name: &str,
    return_type_name: &str,
    signature: &str,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "INSERT INTO functionDeclarations(typeId, name, returnTypeName, signature) \
             VALUES(?1, ?2, ?3, ?4)",
        )?
        .execute(params![type_id, name, return_type_name, signature])?;

    Ok(())
}

pub(crate) fn update_function_declaration(
    connection: &Connection,
    id: FunctionDeclarationId,
    return_type_name: &str,
    signature: &str,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "UPDATE functionDeclarations \
             SET returnTypeName=?2, signature=?3 \
             WHERE functionDeclarationId=?1",
        )?
        .execute(params![id, return_type_name, signature])?;

    Ok(())
}

pub(crate) fn delete_function_declaration(
    connection: &Connection,
    id: FunctionDeclarationId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("DELETE FROM functionDeclarations WHERE functionDeclarationId=?1")?
        .execute(params![id])?;

    Ok(())
}

pub(crate) fn delete_function_declarations_by_type_id(
    connection: &Connection,
    type_id: TypeId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("DELETE FROM functionDeclarations WHERE typeId=?1")?
        .execute(params![type_id])?;

    Ok(())
}

pub(crate) fn signal_declaration_views(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Vec<SignalDeclarationView>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT name, signature, signalDeclarationId \
         FROM signalDeclarations \
         WHERE typeId=?1 \
         ORDER BY name, signature",
    )?;
    let views = statement
        .query_map(params![type_id], |row| {
            Ok(SignalDeclarationView {
                name: row.get(0)?,
                signature: row.get(1)?,
                id: row.get(2)?,
            })
        })?
        .collect::<Result<_, _>>()?;

    Ok(views)
}

pub(crate) fn insert_signal_declaration(
    connection: &Connection,
    type_id: TypeId,
    name: &str,
    signature: &str,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "INSERT INTO signalDeclarations(typeId, name, signature) VALUES(?1, ?2, ?3)",
        )?
        .execute(params![type_id, name, signature])?;

    Ok(())
}

pub(crate) fn delete_signal_declaration(
    connection: &Connection,
    id: SignalDeclarationId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("DELETE FROM signalDeclarations WHERE signalDeclarationId=?1")?
        .execute(params![id])?;

    Ok(())
}

pub(crate) fn delete_signal_declarations_by_type_id(
    connection: &Connection,
    type_id: TypeId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("DELETE FROM signalDeclarations WHERE typeId=?1")?
        .execute(params![type_id])?;

    Ok(())
}

pub(crate) fn enumeration_declaration_views(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Vec<EnumerationDeclarationView>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT name, enumeratorDeclarations, enumerationDeclarationId \
         FROM enumerationDeclarations \
         WHERE typeId=?1 \
         ORDER BY name",
    )?;
    let views = statement
        .query_map(params![type_id], |row| {
            Ok(EnumerationDeclarationView {
                name: row.get(0)?,
                enumerator_declarations: row.get(1)?,
                id: row.get(2)?,
            })
        })?
        .collect::<Result<_, _>>()?;

    Ok(views)
}

pub(crate) fn insert_enumeration_declaration(
    connection: &Connection,
    type_id: TypeId,
    name: &str,
    enumerator_declarations: &str,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "INSERT INTO enumerationDeclarations(typeId, name, enumeratorDeclarations) \
             VALUES(?1, ?2, ?3)",
        )?
        .execute(params![type_id, name, enumerator_declarations])?;

    Ok(())
}

pub(crate) fn update_enumeration_declaration(
    connection: &Connection,
    id: EnumerationDeclarationId,
    enumerator_declarations: &str,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "UPDATE enumerationDeclarations \
             SET enumeratorDeclarations=?2 \
             WHERE enumerationDeclarationId=?1",
        )?
        .execute(params![id, enumerator_declarations])?;

    Ok(())
}

pub(crate) fn delete_enumeration_declaration(
    connection: &Connection,
    id: EnumerationDeclarationId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("DELETE FROM enumerationDeclarations WHERE enumerationDeclarationId=?1")?
        .execute(params![id])?;

    Ok(())
}

pub(crate) fn delete_enumeration_declarations_by_type_id(
    connection: &Connection,
    type_id: TypeId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("DELETE FROM enumerationDeclarations WHERE typeId=?1")?
        .execute(params![type_id])?;

    Ok(())
}

pub(crate) fn function_declarations(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Vec<FunctionDeclaration>, ProjectStorageError> {
    let views = function_declaration_views(connection, type_id)?;

    Ok(views
        .into_iter()
        .map(|view| FunctionDeclaration {
            name: view.name,
            return_type_name: view.return_type_name,
            parameters: json::parse_signature(&view.signature),
        })
        .collect())
}

pub(crate) fn signal_declarations(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Vec<SignalDeclaration>, ProjectStorageError> {
    let views = signal_declaration_views(connection, type_id)?;

    Ok(views
        .into_iter()
        .map(|view| SignalDeclaration {
            name: view.name,
            parameters: json::parse_signature(&view.signature),
        })
        .collect())
}

pub(crate) fn enumeration_declarations(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Vec<EnumerationDeclaration>, ProjectStorageError> {
    let views = enumeration_declaration_views(connection, type_id)?;

    Ok(views
        .into_iter()
        .map(|view| EnumerationDeclaration {
            name: view.name,
            enumerator_declarations: json::parse_enumerators(&view.enumerator_declarations),
        })
        .collect())
}

/// Signal names of a type and all its bases, sorted.
pub(crate) fn signal_declaration_names(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Vec<String>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "WITH RECURSIVE \
           prototypes(typeId) AS ( \
               VALUES(?1) \
             UNION ALL \
               SELECT baseId \
               FROM bases JOIN prototypes USING(typeId)) \
         SELECT name FROM prototypes JOIN signalDeclarations USING(typeId) ORDER BY name",
    )?;
    let names = statement
        .query_map(params![type_id], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    Ok(names)
}

/// Function names of a type and all its bases, sorted.
pub(crate) fn function_declaration_names(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Vec<String>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "WITH RECURSIVE \
           prototypes(typeId) AS ( \
               VALUES(?1) \
             UNION ALL \
               SELECT baseId \
               FROM bases JOIN prototypes USING(typeId)) \
         SELECT name FROM prototypes JOIN functionDeclarations USING(typeId) ORDER BY name",
    )?;
    let names = statement
        .query_map(params![type_id], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    Ok(names)
}
