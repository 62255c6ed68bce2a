//! Statements over the `typeAnnotations` table, including the recursive
//! annotation-trait propagation through prototype heirs.

use quill_ids::{DirectoryPathId, SourceId, TypeId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::ProjectStorageError;
use crate::info;
use crate::package::TypeAnnotation;
use crate::traits::AnnotationTraits;

use super::id_array;

/// A persisted annotation, keyed by type id.
pub(crate) struct TypeAnnotationView {
    pub type_id: TypeId,
    pub type_name: String,
    pub icon_path: String,
    pub item_library_json: String,
    pub hints_json: String,
}

fn empty_as_null(text: &str) -> Option<&str> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

pub(crate) fn annotation_views_for_source_ids(
    connection: &Connection,
    updated_source_ids: &[SourceId],
) -> Result<Vec<TypeAnnotationView>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT typeId, typeName, iconPath, itemLibrary, hints \
         FROM typeAnnotations \
         WHERE sourceId IN rarray(?1) \
         ORDER BY typeId",
    )?;
    let views = statement
        .query_map(
            params![id_array(updated_source_ids.iter().copied())],
            |row| {
                Ok(TypeAnnotationView {
                    type_id: row.get(0)?,
                    type_name: row.get(1)?,
                    icon_path: row.get(2)?,
                    item_library_json: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    hints_json: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                })
            },
        )?
        .collect::<Result<_, _>>()?;

    Ok(views)
}

pub(crate) fn insert_type_annotation(
    connection: &Connection,
    annotation: &TypeAnnotation,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "INSERT INTO typeAnnotations( \
               typeId, sourceId, directoryId, typeName, iconPath, itemLibrary, hints) \
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?
        .execute(params![
            annotation.type_id,
            annotation.source_id,
            annotation.directory_id,
            annotation.type_name,
            annotation.icon_path,
            empty_as_null(&annotation.item_library_json),
            empty_as_null(&annotation.hints_json),
        ])?;

    Ok(())
}

pub(crate) fn update_type_annotation(
    connection: &Connection,
    annotation: &TypeAnnotation,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached(
            "UPDATE typeAnnotations \
             SET typeName=?2, iconPath=?3, itemLibrary=?4, hints=?5 \
             WHERE typeId=?1",
        )?
        .execute(params![
            annotation.type_id,
            annotation.type_name,
            annotation.icon_path,
            empty_as_null(&annotation.item_library_json),
            empty_as_null(&annotation.hints_json),
        ])?;

    Ok(())
}

pub(crate) fn delete_type_annotation(
    connection: &Connection,
    type_id: TypeId,
) -> Result<(), ProjectStorageError> {
    connection
        .prepare_cached("DELETE FROM typeAnnotations WHERE typeId=?1")?
        .execute(params![type_id])?;

    Ok(())
}

/// Write `traits` onto `type_id` and every heir reachable through
/// `prototypes` that does not carry its own annotation; returns the updated
/// type ids.
pub(crate) fn propagate_annotation_traits_to_heirs(
    connection: &Connection,
    type_id: TypeId,
    traits: AnnotationTraits,
) -> Result<Vec<TypeId>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "WITH RECURSIVE \
           heirs(typeId) AS ( \
               VALUES(?1) \
             UNION ALL \
               SELECT p.typeId \
               FROM prototypes AS p JOIN heirs AS h \
               WHERE prototypeId=h.typeId \
                 AND p.typeId NOT IN (SELECT typeId FROM typeAnnotations)) \
         UPDATE types AS t \
         SET annotationTraits = ?2 \
         FROM heirs h \
         WHERE t.typeId=h.typeId \
         RETURNING typeId",
    )?;
    let updated = statement
        .query_map(params![type_id, traits], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    Ok(updated)
}

/// The annotation traits of the nearest annotated ancestor along the
/// prototype chain.
pub(crate) fn annotation_traits_from_prototype_chain(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Option<AnnotationTraits>, ProjectStorageError> {
    let traits = connection
        .prepare_cached(
            "WITH RECURSIVE \
               typeChain(typeId, baseId) AS ( \
                   SELECT typeId, prototypeId \
                   FROM prototypes \
                   WHERE typeId=?1 \
                 UNION ALL \
                   SELECT tc.typeId, p.prototypeId \
                   FROM prototypes AS p JOIN typeChain AS tc \
                   WHERE p.typeId=tc.baseId) \
             SELECT annotationTraits \
             FROM typeChain AS tc \
               JOIN typeAnnotations AS ta ON(ta.typeId=tc.baseId) \
               JOIN types AS t ON(t.typeId=tc.baseId) \
             LIMIT 1",
        )?
        .query_row(params![type_id], |row| row.get(0))
        .optional()?;

    Ok(traits)
}

/// The annotation traits of an annotated direct base, if any.
pub(crate) fn prototype_annotation_traits(
    connection: &Connection,
    type_id: TypeId,
) -> Result<AnnotationTraits, ProjectStorageError> {
    let traits = connection
        .prepare_cached(
            "SELECT annotationTraits \
             FROM types \
             WHERE typeId=(SELECT baseId FROM bases WHERE typeId=?1) \
               AND annotationTraits IS NOT NULL \
             LIMIT 1",
        )?
        .query_row(params![type_id], |row| row.get(0))
        .optional()?
        .unwrap_or(AnnotationTraits::NONE);

    Ok(traits)
}

pub(crate) fn type_icon_path(
    connection: &Connection,
    type_id: TypeId,
) -> Result<String, ProjectStorageError> {
    let icon_path = connection
        .prepare_cached("SELECT iconPath FROM typeAnnotations WHERE typeId=?1")?
        .query_row(params![type_id], |row| row.get(0))
        .optional()?
        .unwrap_or_default();

    Ok(icon_path)
}

pub(crate) fn type_hints(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Vec<info::TypeHint>, ProjectStorageError> {
    let hints_json: Option<String> = connection
        .prepare_cached("SELECT hints FROM typeAnnotations WHERE typeId=?1")?
        .query_row(params![type_id], |row| row.get(0))
        .optional()?
        .flatten();

    let Some(hints_json) = hints_json else {
        return Ok(Vec::new());
    };

    let map: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&hints_json).unwrap_or_default();

    Ok(map
        .into_iter()
        .map(|(name, value)| info::TypeHint {
            name,
            expression: match value {
                serde_json::Value::String(expression) => expression,
                other => other.to_string(),
            },
        })
        .collect())
}

fn parse_item_library_entries(
    type_id: TypeId,
    type_name: &str,
    item_library_json: &str,
    entries: &mut Vec<info::ItemLibraryEntry>,
) {
    let parsed: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_str(item_library_json).unwrap_or_default();

    for object in parsed {
        let text = |key: &str| -> String {
            object
                .get(key)
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };

        let properties = object
            .get("properties")
            .and_then(serde_json::Value::as_array)
            .map(|triples| {
                triples
                    .iter()
                    .filter_map(serde_json::Value::as_array)
                    .filter_map(|triple| {
                        let as_text = |value: Option<&serde_json::Value>| -> String {
                            match value {
                                Some(serde_json::Value::String(text)) => text.clone(),
                                Some(other) => other.to_string(),
                                None => String::new(),
                            }
                        };
                        if triple.is_empty() {
                            return None;
                        }
                        Some(info::ItemLibraryProperty {
                            name: as_text(triple.first()),
                            type_name: as_text(triple.get(1)),
                            value: as_text(triple.get(2)),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let extra_file_paths = object
            .get("extraFilePaths")
            .and_then(serde_json::Value::as_array)
            .map(|paths| {
                paths
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        entries.push(info::ItemLibraryEntry {
            type_id,
            type_name: type_name.to_owned(),
            name: text("name"),
            icon_path: text("iconPath"),
            category: text("category"),
            import: text("import"),
            tool_tip: text("toolTip"),
            template_path: text("templatePath"),
            properties,
            extra_file_paths,
            module_kind: None,
            component_source_id: SourceId::NULL,
        });
    }
}

pub(crate) fn item_library_entries_by_type_id(
    connection: &Connection,
    type_id: TypeId,
) -> Result<Vec<info::ItemLibraryEntry>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT typeId, typeName, itemLibrary \
         FROM typeAnnotations \
         WHERE typeId=?1 AND itemLibrary IS NOT NULL",
    )?;
    let rows: Vec<(TypeId, String, String)> = statement
        .query_map(params![type_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<Result<_, _>>()?;

    let mut entries = Vec::new();
    for (type_id, type_name, item_library_json) in rows {
        parse_item_library_entries(type_id, &type_name, &item_library_json, &mut entries);
    }

    Ok(entries)
}

pub(crate) fn all_item_library_entries(
    connection: &Connection,
) -> Result<Vec<info::ItemLibraryEntry>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT typeId, typeName, itemLibrary \
         FROM typeAnnotations \
         WHERE itemLibrary IS NOT NULL",
    )?;
    let rows: Vec<(TypeId, String, String)> = statement
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<_, _>>()?;

    let mut entries = Vec::new();
    for (type_id, type_name, item_library_json) in rows {
        parse_item_library_entries(type_id, &type_name, &item_library_json, &mut entries);
    }

    Ok(entries)
}

/// Item-library entries of every type visible through the imports of a
/// source.
pub(crate) fn item_library_entries_by_source_id(
    connection: &Connection,
    source_id: SourceId,
) -> Result<Vec<info::ItemLibraryEntry>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT typeId, typeName, itemLibrary \
         FROM typeAnnotations \
         WHERE itemLibrary IS NOT NULL \
           AND typeId IN (SELECT DISTINCT typeId \
                          FROM documentImports AS di JOIN exportedTypeNames \
                            USING(moduleId) \
                          WHERE di.sourceId=?1)",
    )?;
    let rows: Vec<(TypeId, String, String)> = statement
        .query_map(params![source_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<Result<_, _>>()?;

    let mut entries = Vec::new();
    for (type_id, type_name, item_library_json) in rows {
        parse_item_library_entries(type_id, &type_name, &item_library_json, &mut entries);
    }

    Ok(entries)
}

/// Exported types visible through the imports of a source, with the source
/// of the backing component; the store filters them down to path-library
/// modules.
pub(crate) fn directory_import_rows_by_source_id(
    connection: &Connection,
    source_id: SourceId,
) -> Result<Vec<(TypeId, String, quill_ids::ModuleId, SourceId)>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT typeId, etn.name, moduleId, t.sourceId \
         FROM documentImports AS di \
           JOIN exportedTypeNames AS etn USING(moduleId) \
           JOIN types AS t USING(typeId) \
         WHERE di.sourceId=?1",
    )?;
    let rows = statement
        .query_map(params![source_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<Result<_, _>>()?;

    Ok(rows)
}

pub(crate) fn annotation_source_ids(
    connection: &Connection,
    directory_id: DirectoryPathId,
) -> Result<Vec<SourceId>, ProjectStorageError> {
    let mut statement = connection.prepare_cached(
        "SELECT sourceId FROM typeAnnotations WHERE directoryId=?1 ORDER BY sourceId",
    )?;
    let source_ids = statement
        .query_map(params![directory_id], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    Ok(source_ids)
}

pub(crate) fn annotation_directory_ids(
    connection: &Connection,
) -> Result<Vec<DirectoryPathId>, ProjectStorageError> {
    let mut statement = connection
        .prepare_cached("SELECT DISTINCT directoryId FROM typeAnnotations ORDER BY directoryId")?;
    let directory_ids = statement
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    Ok(directory_ids)
}
