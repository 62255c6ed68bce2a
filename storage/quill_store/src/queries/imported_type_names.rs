//! Statements over the `importedTypeNames` table and the import resolver.
//!
//! Imported type names are interned: a `(kind, importOrSourceId, name)`
//! triple maps to a stable id so references survive renames and deletions
//! and can be relinked. The resolver joins them against the document
//! imports and exported names, applying the version predicate
//!
//! ```text
//! importMajor = wildcard
//!   OR (importMajor = exportedMajor
//!       AND (importMinor = wildcard OR importMinor >= exportedMinor))
//! ```
//!
//! and preferring direct imports, then the highest version. A failed
//! resolution yields the unresolved sentinel, not the null id.

use quill_ids::{ImportId, ImportedTypeNameId, SourceId, TypeId, Version};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::ProjectStorageError;
use crate::info;
use crate::package::{ImportedTypeName, TypeNameKind};

use super::imports;

/// Intern `(kind, importOrSourceId, name)`, returning the stable id.
pub(crate) fn fetch_imported_type_name_id(
    connection: &Connection,
    kind: TypeNameKind,
    import_or_source_id: i64,
    name: &str,
) -> Result<ImportedTypeNameId, ProjectStorageError> {
    let found = connection
        .prepare_cached(
            "SELECT importedTypeNameId FROM importedTypeNames \
             WHERE kind=?1 AND importOrSourceId=?2 AND name=?3 \
             LIMIT 1",
        )?
        .query_row(params![kind, import_or_source_id, name], |row| row.get(0))
        .optional()?;

    if let Some(imported_type_name_id) = found {
        return Ok(imported_type_name_id);
    }

    let imported_type_name_id = connection
        .prepare_cached(
            "INSERT INTO importedTypeNames(kind, importOrSourceId, name) \
             VALUES(?1, ?2, ?3) \
             RETURNING importedTypeNameId",
        )?
        .query_row(params![kind, import_or_source_id, name], |row| row.get(0))?;

    Ok(imported_type_name_id)
}

/// Intern a package-level imported type name within its source scope.
pub(crate) fn fetch_imported_type_name_id_for_name(
    connection: &Connection,
    type_name: &ImportedTypeName,
    source_id: SourceId,
) -> Result<(ImportedTypeNameId, TypeNameKind), ProjectStorageError> {
    match type_name {
        ImportedTypeName::Exported(name) => {
            let imported_type_name_id = fetch_imported_type_name_id(
                connection,
                TypeNameKind::Exported,
                source_id.raw(),
                name,
            )?;

            Ok((imported_type_name_id, TypeNameKind::Exported))
        }
        ImportedTypeName::QualifiedExported { alias, name } => {
            let import_id = imports::import_id_by_source_id_and_alias(connection, source_id, alias)?;
            let imported_type_name_id = fetch_imported_type_name_id(
                connection,
                TypeNameKind::QualifiedExported,
                import_id.raw(),
                name,
            )?;

            Ok((imported_type_name_id, TypeNameKind::QualifiedExported))
        }
    }
}

pub(crate) fn imported_type_name_kind(
    connection: &Connection,
    imported_type_name_id: ImportedTypeNameId,
) -> Result<TypeNameKind, ProjectStorageError> {
    let kind = connection
        .prepare_cached("SELECT kind FROM importedTypeNames WHERE importedTypeNameId=?1")?
        .query_row(params![imported_type_name_id], |row| row.get(0))
        .optional()?
        .unwrap_or(TypeNameKind::Exported);

    Ok(kind)
}

pub(crate) fn imported_type_name(
    connection: &Connection,
    imported_type_name_id: ImportedTypeNameId,
) -> Result<String, ProjectStorageError> {
    let name = connection
        .prepare_cached("SELECT name FROM importedTypeNames WHERE importedTypeNameId=?1")?
        .query_row(params![imported_type_name_id], |row| row.get(0))
        .optional()?
        .unwrap_or_default();

    Ok(name)
}

/// Resolve an imported type name id of known kind to a type id.
pub(crate) fn fetch_type_id(
    connection: &Connection,
    imported_type_name_id: ImportedTypeNameId,
    kind: TypeNameKind,
) -> Result<TypeId, ProjectStorageError> {
    let sql = match kind {
        TypeNameKind::Exported => {
            "SELECT typeId FROM importedTypeNames AS itn \
               JOIN exportedTypeNames AS etn USING(name) \
               JOIN documentImports AS di ON importOrSourceId=sourceId \
             WHERE importedTypeNameId=?1 \
               AND itn.kind=1 \
               AND etn.moduleId=di.moduleId \
               AND di.alias IS NULL \
               AND (di.majorVersion=0xFFFFFFFF \
                 OR (di.majorVersion=etn.majorVersion \
                   AND (di.minorVersion=0xFFFFFFFF OR di.minorVersion>=etn.minorVersion))) \
             ORDER BY di.kind, etn.majorVersion DESC, etn.minorVersion DESC \
             LIMIT 1"
        }
        TypeNameKind::QualifiedExported => {
            "SELECT typeId \
             FROM importedTypeNames AS itn \
               JOIN documentImports AS di ON importOrSourceId=di.importId \
               JOIN documentImports AS di2 ON di.sourceId=di2.sourceId \
                 AND di.moduleId=di2.sourceModuleId \
               JOIN exportedTypeNames AS etn ON di2.moduleId=etn.moduleId \
             WHERE itn.kind=2 \
               AND importedTypeNameId=?1 \
               AND itn.name=etn.name \
               AND (di.majorVersion=0xFFFFFFFF \
                 OR (di.majorVersion=etn.majorVersion \
                   AND (di.minorVersion=0xFFFFFFFF OR di.minorVersion>=etn.minorVersion))) \
             ORDER BY etn.majorVersion DESC, etn.minorVersion DESC \
             LIMIT 1"
        }
    };

    let type_id = connection
        .prepare_cached(sql)?
        .query_row(params![imported_type_name_id], |row| row.get(0))
        .optional()?
        .unwrap_or(TypeId::UNRESOLVED);

    Ok(type_id)
}

/// Resolve an imported type name id, fetching its kind first.
pub(crate) fn fetch_type_id_by_name_id(
    connection: &Connection,
    imported_type_name_id: ImportedTypeNameId,
) -> Result<TypeId, ProjectStorageError> {
    let kind = imported_type_name_kind(connection, imported_type_name_id)?;

    fetch_type_id(connection, imported_type_name_id, kind)
}

/// The exported name an imported type name currently resolves to.
pub(crate) fn exported_type_name(
    connection: &Connection,
    imported_type_name_id: ImportedTypeNameId,
) -> Result<Option<info::ExportedTypeName>, ProjectStorageError> {
    let kind = imported_type_name_kind(connection, imported_type_name_id)?;

    let sql = match kind {
        TypeNameKind::Exported => {
            "SELECT etn.moduleId, etn.typeId, etn.name, etn.majorVersion, etn.minorVersion \
             FROM importedTypeNames AS itn \
               JOIN exportedTypeNames AS etn USING(name) \
               JOIN documentImports AS di ON importOrSourceId=sourceId \
             WHERE importedTypeNameId=?1 \
               AND itn.kind=1 \
               AND etn.moduleId=di.moduleId \
               AND (di.majorVersion=0xFFFFFFFF \
                 OR (di.majorVersion=etn.majorVersion \
                   AND (di.minorVersion=0xFFFFFFFF OR di.minorVersion>=etn.minorVersion))) \
             ORDER BY di.kind, etn.majorVersion DESC, etn.minorVersion DESC \
             LIMIT 1"
        }
        TypeNameKind::QualifiedExported => {
            "SELECT etn.moduleId, etn.typeId, etn.name, etn.majorVersion, etn.minorVersion \
             FROM importedTypeNames AS itn \
               JOIN documentImports AS di ON importOrSourceId=di.importId \
               JOIN documentImports AS di2 ON di.sourceId=di2.sourceId \
                 AND di.moduleId=di2.sourceModuleId \
               JOIN exportedTypeNames AS etn ON di2.moduleId=etn.moduleId \
             WHERE itn.kind=2 \
               AND importedTypeNameId=?1 \
               AND itn.name=etn.name \
               AND (di.majorVersion=0xFFFFFFFF \
                 OR (di.majorVersion=etn.majorVersion \
                   AND (di.minorVersion=0xFFFFFFFF OR di.minorVersion>=etn.minorVersion))) \
             ORDER BY etn.majorVersion DESC, etn.minorVersion DESC \
             LIMIT 1"
        }
    };

    let name = connection
        .prepare_cached(sql)?
        .query_row(params![imported_type_name_id], |row| {
            Ok(info::ExportedTypeName {
                module_id: row.get(0)?,
                type_id: row.get(1)?,
                name: row.get(2)?,
                version: Version {
                    major: row.get(3)?,
                    minor: row.get(4)?,
                },
            })
        })
        .optional()?;

    Ok(name)
}

/// Intern an imported type name scoped to a qualified import.
pub(crate) fn fetch_qualified_imported_type_name_id(
    connection: &Connection,
    import_id: ImportId,
    name: &str,
) -> Result<ImportedTypeNameId, ProjectStorageError> {
    fetch_imported_type_name_id(
        connection,
        TypeNameKind::QualifiedExported,
        import_id.raw(),
        name,
    )
}
