//! Packed trait bits persisted alongside types and properties.

use bitflags::bitflags;
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};

/// What kind of value a type represents.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[repr(u32)]
pub enum TypeKind {
    #[default]
    None = 0,
    Reference = 1,
    Value = 2,
    Sequence = 3,
}

/// Packed type traits persisted in `types.traits`.
///
/// The low four bits hold the [`TypeKind`]; the remaining bits are flags.
/// The layout is part of the persisted format, so the constants never move.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct TypeTraits(u32);

impl TypeTraits {
    const KIND_MASK: u32 = 0xF;

    pub const IS_ENUM: u32 = 1 << 4;
    pub const IS_FILE_COMPONENT: u32 = 1 << 5;
    pub const IS_SINGLETON: u32 = 1 << 6;
    pub const IS_INSIDE_PROJECT: u32 = 1 << 7;
    pub const USES_CUSTOM_PARSER: u32 = 1 << 8;

    /// The bit the partial singleton index and the singleton lookup filter on.
    pub const SINGLETON_MASK: u32 = Self::IS_SINGLETON;

    #[inline]
    pub const fn new(kind: TypeKind) -> Self {
        Self(kind as u32)
    }

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn kind(self) -> TypeKind {
        match self.0 & Self::KIND_MASK {
            1 => TypeKind::Reference,
            2 => TypeKind::Value,
            3 => TypeKind::Sequence,
            _ => TypeKind::None,
        }
    }

    #[inline]
    pub const fn with_flag(self, flag: u32) -> Self {
        Self(self.0 | flag)
    }

    #[inline]
    pub const fn has_flag(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    #[inline]
    pub const fn is_singleton(self) -> bool {
        self.has_flag(Self::IS_SINGLETON)
    }

    #[inline]
    pub const fn is_file_component(self) -> bool {
        self.has_flag(Self::IS_FILE_COMPONENT)
    }

    #[inline]
    pub const fn is_inside_project(self) -> bool {
        self.has_flag(Self::IS_INSIDE_PROJECT)
    }
}

impl std::fmt::Debug for TypeTraits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TypeTraits({:?}, {:#x})", self.kind(), self.0 & !Self::KIND_MASK)
    }
}

/// Trait bits contributed by type annotations, persisted in
/// `types.annotationTraits` and inherited through prototypes until another
/// annotation intervenes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Debug)]
pub struct AnnotationTraits(u32);

impl AnnotationTraits {
    pub const NONE: Self = Self(0);

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

bitflags! {
    /// Traits of a property declaration.
    #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
    pub struct PropertyDeclarationTraits: u32 {
        const IS_READ_ONLY = 1 << 0;
        const IS_VALUE_TYPE = 1 << 1;
        const IS_LIST = 1 << 2;
    }
}

impl ToSql for TypeTraits {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(Value::Integer(i64::from(self.0))))
    }
}

impl FromSql for TypeTraits {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Self::default()),
            other => i64::column_result(other).map(|bits| Self(bits as u32)),
        }
    }
}

impl ToSql for AnnotationTraits {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(Value::Integer(i64::from(self.0))))
    }
}

impl FromSql for AnnotationTraits {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Self::NONE),
            other => i64::column_result(other).map(|bits| Self(bits as u32)),
        }
    }
}

impl ToSql for PropertyDeclarationTraits {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(Value::Integer(i64::from(self.bits()))))
    }
}

impl FromSql for PropertyDeclarationTraits {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Self::empty()),
            other => i64::column_result(other).map(|bits| Self::from_bits_truncate(bits as u32)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_lives_in_the_low_bits() {
        let traits = TypeTraits::new(TypeKind::Reference).with_flag(TypeTraits::IS_SINGLETON);

        assert_eq!(traits.kind(), TypeKind::Reference);
        assert!(traits.is_singleton());
        assert!(!traits.is_file_component());
    }

    #[test]
    fn singleton_mask_selects_only_the_singleton_bit() {
        let singleton = TypeTraits::new(TypeKind::Reference).with_flag(TypeTraits::IS_SINGLETON);
        let plain = TypeTraits::new(TypeKind::Reference);

        assert_ne!(singleton.bits() & TypeTraits::SINGLETON_MASK, 0);
        assert_eq!(plain.bits() & TypeTraits::SINGLETON_MASK, 0);
    }

    #[test]
    fn traits_round_trip_through_bits() {
        let traits = TypeTraits::new(TypeKind::Sequence).with_flag(TypeTraits::IS_ENUM);

        assert_eq!(TypeTraits::from_bits(traits.bits()), traits);
        assert_eq!(traits.kind(), TypeKind::Sequence);
    }
}
