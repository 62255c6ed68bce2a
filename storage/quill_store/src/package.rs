//! The synchronization wire format.
//!
//! External parsers turn documents and type-description files into a
//! [`SynchronizationPackage`]; the store diffs it against persisted state.
//! Every entity list comes with the set of updated keys (source ids, module
//! ids or directory ids) that scopes the diff: persisted rows outside the
//! updated key set are left alone, rows inside it that have no incoming
//! counterpart are removed.

use quill_ids::{DirectoryPathId, ModuleId, SourceId, TypeId, Version};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};

use crate::traits::{AnnotationTraits, PropertyDeclarationTraits, TypeTraits};

/// How a document import row came to be.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(u32)]
pub enum ImportKind {
    /// A direct import written in the document.
    Import = 1,
    /// A build-system level module dependency.
    ModuleDependency = 2,
    /// Inserted implicitly because an imported module re-exports another.
    ModuleExportedImport = 3,
    /// Like [`ImportKind::ModuleExportedImport`] but rooted in a module
    /// dependency.
    ModuleExportedModuleDependency = 4,
}

/// How an imported type name is scoped.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u32)]
pub enum TypeNameKind {
    /// A bare name, looked up through every non-aliased import of the source.
    Exported = 1,
    /// A name qualified by an import alias, looked up through that import.
    QualifiedExported = 2,
}

/// What kind of file a project entry refers to.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u32)]
pub enum FileType {
    /// A component document.
    Document = 1,
    /// A type-description file.
    TypesFile = 2,
    /// A subdirectory.
    Directory = 3,
}

/// A textual type reference appearing in a document.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ImportedTypeName {
    /// A bare name like `Rectangle`.
    Exported(String),
    /// A name qualified by an import alias, like `QQ.Rectangle`.
    QualifiedExported { alias: String, name: String },
}

impl ImportedTypeName {
    pub fn exported(name: impl Into<String>) -> Self {
        Self::Exported(name.into())
    }

    pub fn qualified(alias: impl Into<String>, name: impl Into<String>) -> Self {
        Self::QualifiedExported {
            alias: alias.into(),
            name: name.into(),
        }
    }

    /// The referenced type name, without the qualifier.
    pub fn name(&self) -> &str {
        match self {
            Self::Exported(name) => name,
            Self::QualifiedExported { name, .. } => name,
        }
    }
}

/// A document import or module dependency.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Import {
    pub module_id: ModuleId,
    pub version: Version,
    pub source_id: SourceId,
    pub context_source_id: SourceId,
    pub alias: Option<String>,
}

impl Import {
    pub fn new(module_id: ModuleId, version: Version, source_id: SourceId) -> Self {
        Self {
            module_id,
            version,
            source_id,
            context_source_id: source_id,
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// A static edge declaring that importing `module_id` implicitly imports
/// `exported_module_id`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ModuleExportedImport {
    pub module_id: ModuleId,
    pub exported_module_id: ModuleId,
    pub version: Version,
    /// Propagate the importer's version instead of `version`.
    pub is_auto_version: bool,
}

/// The target of an alias property: `alias name: target.property(.tail)`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AliasPath {
    pub property: String,
    pub tail: Option<String>,
}

impl AliasPath {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            tail: None,
        }
    }

    pub fn with_tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = Some(tail.into());
        self
    }
}

/// A property declaration of a type.
///
/// A declaration with `alias: Some(..)` is an alias property; its effective
/// type and traits are copied from the resolved target during linking.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PropertyDeclaration {
    pub name: String,
    pub type_name: ImportedTypeName,
    pub traits: PropertyDeclarationTraits,
    pub alias: Option<AliasPath>,
}

/// One parameter of a function or signal signature.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParameterDeclaration {
    pub name: String,
    pub type_name: String,
    pub traits: PropertyDeclarationTraits,
}

/// A function declaration of a type.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct FunctionDeclaration {
    pub name: String,
    pub return_type_name: String,
    pub parameters: Vec<ParameterDeclaration>,
}

/// A signal declaration of a type.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct SignalDeclaration {
    pub name: String,
    pub parameters: Vec<ParameterDeclaration>,
}

/// One enumerator of an enumeration declaration.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EnumeratorDeclaration {
    pub name: String,
    /// `None` for enumerators without an explicit value.
    pub value: Option<i64>,
}

/// An enumeration declaration of a type.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct EnumerationDeclaration {
    pub name: String,
    pub enumerator_declarations: Vec<EnumeratorDeclaration>,
}

/// A declared type.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Type {
    pub type_name: String,
    pub source_id: SourceId,
    pub traits: TypeTraits,
    pub prototype: Option<ImportedTypeName>,
    pub extension: Option<ImportedTypeName>,
    pub default_property_name: Option<String>,
    pub property_declarations: Vec<PropertyDeclaration>,
    pub function_declarations: Vec<FunctionDeclaration>,
    pub signal_declarations: Vec<SignalDeclaration>,
    pub enumeration_declarations: Vec<EnumerationDeclaration>,
    /// Assigned while the package is synchronized.
    pub type_id: TypeId,
}

/// Binds an exported `(module, name, version)` label to a declared type.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ExportedType {
    pub module_id: ModuleId,
    pub name: String,
    pub version: Version,
    /// Source of the backing type declaration.
    pub type_source_id: SourceId,
    /// Internal name of the backing type; empty if the source declares a
    /// single anonymous type.
    pub internal_name: String,
    pub context_source_id: SourceId,
}

/// Size and modification time of a tracked file.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct FileStatus {
    pub source_id: SourceId,
    pub size: i64,
    pub last_modified: i64,
}

/// Pairs a file with its containing context plus module and file type.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ProjectEntryInfo {
    pub context_source_id: SourceId,
    pub source_id: SourceId,
    pub module_id: ModuleId,
    pub file_type: FileType,
}

/// Designer metadata attached to an exported type.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct TypeAnnotation {
    pub module_id: ModuleId,
    pub type_name: String,
    pub source_id: SourceId,
    pub directory_id: DirectoryPathId,
    pub icon_path: String,
    pub item_library_json: String,
    pub hints_json: String,
    pub traits: AnnotationTraits,
    /// Resolved while the package is synchronized.
    pub type_id: TypeId,
}

/// Maps an exported type to the property-editor document describing it.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PropertyEditorPath {
    pub module_id: ModuleId,
    pub type_name: String,
    pub path_source_id: SourceId,
    pub directory_id: DirectoryPathId,
    /// Resolved while the package is synchronized.
    pub type_id: TypeId,
}

/// A batch of changes to synchronize against persisted state.
#[derive(Clone, Default, Debug)]
pub struct SynchronizationPackage {
    pub types: Vec<Type>,
    pub updated_type_source_ids: Vec<SourceId>,

    pub exported_types: Vec<ExportedType>,
    pub updated_exported_type_source_ids: Vec<SourceId>,

    pub imports: Vec<Import>,
    pub updated_import_source_ids: Vec<SourceId>,

    pub module_dependencies: Vec<Import>,
    pub updated_module_dependency_source_ids: Vec<SourceId>,

    pub module_exported_imports: Vec<ModuleExportedImport>,
    pub updated_module_ids: Vec<ModuleId>,

    pub file_statuses: Vec<FileStatus>,
    pub updated_file_status_source_ids: Vec<SourceId>,

    pub project_entry_infos: Vec<ProjectEntryInfo>,
    pub updated_project_entry_info_source_ids: Vec<SourceId>,

    pub type_annotations: Vec<TypeAnnotation>,
    pub updated_type_annotation_source_ids: Vec<SourceId>,

    pub property_editor_paths: Vec<PropertyEditorPath>,
    pub updated_property_editor_path_directory_ids: Vec<DirectoryPathId>,
}

macro_rules! impl_sql_enum {
    ($name:ident { $($variant:ident = $value:literal),+ $(,)? }) => {
        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::Owned(Value::Integer(*self as i64)))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                match i64::column_result(value)? {
                    $($value => Ok(Self::$variant),)+
                    other => Err(FromSqlError::OutOfRange(other)),
                }
            }
        }
    };
}

impl_sql_enum!(ImportKind {
    Import = 1,
    ModuleDependency = 2,
    ModuleExportedImport = 3,
    ModuleExportedModuleDependency = 4,
});

impl_sql_enum!(TypeNameKind {
    Exported = 1,
    QualifiedExported = 2,
});

impl_sql_enum!(FileType {
    Document = 1,
    TypesFile = 2,
    Directory = 3,
});
