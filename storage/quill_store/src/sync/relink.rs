//! The relinkable-set protocol.
//!
//! Deleting, renaming or re-mapping a type leaves dangling references in
//! three places: bases (prototype/extension edges), property declarations
//! (resolved property types) and alias properties (resolved targets).
//! Whenever one of those references is invalidated, the affected row is
//! recorded in a relinkable bucket together with the textual name id it was
//! resolved from; the relink step at the end of the synchronization
//! re-resolves each survivor against the new state and reports what stays
//! unresolvable.

use quill_ids::{ImportedTypeNameId, PropertyDeclarationId, SourceId, TypeId};

use crate::error::ProjectStorageError;
use crate::queries;

use super::Synchronizer;

/// An alias property whose resolved target must be re-established.
#[derive(Clone, Debug)]
pub(crate) struct AliasPropertyDeclaration {
    pub type_id: TypeId,
    pub property_declaration_id: PropertyDeclarationId,
    pub alias_imported_type_name_id: ImportedTypeNameId,
    pub alias_property_name: String,
    pub alias_property_name_tail: Option<String>,
    pub source_id: SourceId,
}

impl AliasPropertyDeclaration {
    pub fn composed_property_name(&self) -> String {
        match &self.alias_property_name_tail {
            Some(tail) => format!("{}.{}", self.alias_property_name, tail),
            None => self.alias_property_name.clone(),
        }
    }

    fn relink_key(&self) -> (TypeId, PropertyDeclarationId) {
        (self.type_id, self.property_declaration_id)
    }
}

/// A property declaration whose resolved type must be re-established.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct PropertyDeclarationRelink {
    pub type_id: TypeId,
    pub property_declaration_id: PropertyDeclarationId,
    pub imported_type_name_id: ImportedTypeNameId,
}

/// A type whose prototype/extension must be re-resolved from its name ids.
#[derive(Clone, Debug)]
pub(crate) struct BaseRelink {
    pub type_id: TypeId,
    pub prototype_name_id: ImportedTypeNameId,
    pub extension_name_id: ImportedTypeNameId,
}

/// Drop relinkable entries whose rows were re-synchronized in this pass.
pub(crate) fn remove_relinkable_entries<T, K: Ord>(
    relinkables: &mut Vec<T>,
    mut ids: Vec<K>,
    key: impl Fn(&T) -> K,
) {
    ids.sort_unstable();
    relinkables.retain(|entry| ids.binary_search(&key(entry)).is_err());
}

impl Synchronizer<'_> {
    /// Null the resolved type of every property bound to `type_id` and
    /// remember the rows for relinking.
    pub(super) fn handle_property_declarations_with_property_type(
        &mut self,
        type_id: TypeId,
    ) -> Result<(), ProjectStorageError> {
        let rows = queries::properties::null_property_types_for_type(self.connection, type_id)?;

        for (owner_type_id, property_declaration_id, imported_type_name_id) in rows {
            self.relinkable_property_declarations
                .push(PropertyDeclarationRelink {
                    type_id: owner_type_id,
                    property_declaration_id,
                    imported_type_name_id,
                });
        }

        Ok(())
    }

    /// Unlink every alias that depends on `type_id` and remember it, with
    /// its textual target, for relinking.
    pub(super) fn handle_alias_property_declarations_with_property_type(
        &mut self,
        type_id: TypeId,
    ) -> Result<(), ProjectStorageError> {
        let rows = queries::properties::alias_rows_depending_on_type(self.connection, type_id)?;

        for (owner_type_id, property_declaration_id, alias_name_id, alias_id, tail_id) in rows {
            let alias_property_name = queries::properties::property_name(self.connection, alias_id)?
                .unwrap_or_default();
            let alias_property_name_tail = if tail_id.is_valid() {
                queries::properties::property_name(self.connection, tail_id)?
            } else {
                None
            };
            let source_id = queries::types::source_id_by_type_id(self.connection, owner_type_id)?;

            self.relinkable_alias_property_declarations
                .push(AliasPropertyDeclaration {
                    type_id: owner_type_id,
                    property_declaration_id,
                    alias_imported_type_name_id: alias_name_id,
                    alias_property_name,
                    alias_property_name_tail,
                    source_id,
                });

            queries::properties::update_alias_property_declaration_to_null(
                self.connection,
                property_declaration_id,
            )?;
        }

        Ok(())
    }

    /// Properties whose imported name is spelled `name` and currently binds
    /// to `type_id` get re-resolved later; the name maps to a new type now.
    pub(super) fn handle_property_declarations_with_exported_type_name(
        &mut self,
        name: &str,
        type_id: TypeId,
    ) -> Result<(), ProjectStorageError> {
        let rows = queries::properties::property_rows_for_name_and_type(self.connection, name, type_id)?;

        for (owner_type_id, property_declaration_id, imported_type_name_id) in rows {
            self.relinkable_property_declarations
                .push(PropertyDeclarationRelink {
                    type_id: owner_type_id,
                    property_declaration_id,
                    imported_type_name_id,
                });
        }

        Ok(())
    }

    pub(super) fn handle_alias_property_declarations_with_exported_type_name(
        &mut self,
        name: &str,
        type_id: TypeId,
    ) -> Result<(), ProjectStorageError> {
        let rows = queries::properties::alias_rows_for_name_and_type(self.connection, name, type_id)?;

        for (owner_type_id, property_declaration_id, alias_name_id, alias_id, tail_id) in rows {
            let alias_property_name = queries::properties::property_name(self.connection, alias_id)?
                .unwrap_or_default();
            let alias_property_name_tail = if tail_id.is_valid() {
                queries::properties::property_name(self.connection, tail_id)?
            } else {
                None
            };
            let source_id = queries::types::source_id_by_type_id(self.connection, owner_type_id)?;

            self.relinkable_alias_property_declarations
                .push(AliasPropertyDeclaration {
                    type_id: owner_type_id,
                    property_declaration_id,
                    alias_imported_type_name_id: alias_name_id,
                    alias_property_name,
                    alias_property_name_tail,
                    source_id,
                });
        }

        Ok(())
    }

    /// Re-point every base edge at `base_id` to the unresolved sentinel and
    /// remember the owning types for relinking.
    pub(super) fn handle_bases(&mut self, base_id: TypeId) -> Result<(), ProjectStorageError> {
        let mut owner_type_ids =
            queries::bases::reset_bases_to_unresolved(self.connection, base_id)?;
        queries::bases::reset_prototypes_to_unresolved(self.connection, base_id)?;

        owner_type_ids.sort_unstable();
        owner_type_ids.dedup();

        for type_id in owner_type_ids {
            let (prototype_name_id, extension_name_id) =
                queries::bases::base_name_ids(self.connection, type_id)?;

            if prototype_name_id.is_valid() || extension_name_id.is_valid() {
                self.relinkable_bases.push(BaseRelink {
                    type_id,
                    prototype_name_id,
                    extension_name_id,
                });
            }
        }

        Ok(())
    }

    /// Types spelling their prototype or extension as `name` while bound to
    /// `base_id` must re-resolve once the name maps elsewhere.
    pub(super) fn handle_bases_with_exported_type_name(
        &mut self,
        name: &str,
        base_id: TypeId,
    ) -> Result<(), ProjectStorageError> {
        let rows =
            queries::bases::bases_referencing_name_and_base(self.connection, name, base_id)?;

        for (type_id, prototype_name_id, extension_name_id) in rows {
            self.relinkable_bases.push(BaseRelink {
                type_id,
                prototype_name_id,
                extension_name_id,
            });
        }

        Ok(())
    }

    /// Clear the bases of every type in `source_id` and remember them for
    /// relinking; used when the source's imports change.
    pub(super) fn handle_bases_with_source_id(
        &mut self,
        source_id: SourceId,
    ) -> Result<(), ProjectStorageError> {
        let rows = queries::bases::type_base_name_rows_by_source_id(self.connection, source_id)?;

        for (type_id, prototype_name_id, extension_name_id) in rows {
            queries::bases::delete_all_bases(self.connection, type_id)?;

            if prototype_name_id.is_valid() || extension_name_id.is_valid() {
                self.relinkable_bases.push(BaseRelink {
                    type_id,
                    prototype_name_id,
                    extension_name_id,
                });
            }
        }

        Ok(())
    }

    /// Delete a type: collect its dependents, drop every child row and
    /// reset the `types` row (the id itself stays reserved).
    pub(super) fn delete_type(&mut self, type_id: TypeId) -> Result<(), ProjectStorageError> {
        self.handle_property_declarations_with_property_type(type_id)?;
        self.handle_alias_property_declarations_with_property_type(type_id)?;
        self.handle_bases(type_id)?;

        queries::declarations::delete_enumeration_declarations_by_type_id(self.connection, type_id)?;
        queries::properties::delete_property_declarations_by_type_id(self.connection, type_id)?;
        queries::declarations::delete_function_declarations_by_type_id(self.connection, type_id)?;
        queries::declarations::delete_signal_declarations_by_type_id(self.connection, type_id)?;
        queries::bases::delete_prototype(self.connection, type_id)?;
        queries::bases::delete_all_bases(self.connection, type_id)?;
        queries::types::reset_type(self.connection, type_id)?;

        Ok(())
    }

    /// Delete every type whose source is in the updated set but which the
    /// package no longer declares.
    pub(super) fn delete_not_updated_types(
        &mut self,
        updated_type_ids: &[TypeId],
        updated_type_source_ids: &[SourceId],
    ) -> Result<(), ProjectStorageError> {
        let type_ids = queries::types::not_updated_type_ids(
            self.connection,
            updated_type_source_ids,
            updated_type_ids,
        )?;

        for type_id in type_ids {
            self.deleted_type_ids.push(type_id);
            self.delete_type(type_id)?;
        }

        Ok(())
    }

    /// Re-resolve everything the earlier steps left dangling, in order:
    /// bases, then property declarations, then alias properties. Entries
    /// whose owner was deleted in this pass are skipped.
    pub(super) fn relink(&mut self) -> Result<(), ProjectStorageError> {
        let mut deleted_type_ids = std::mem::take(&mut self.deleted_type_ids);
        deleted_type_ids.sort_unstable();

        self.relink_bases(&deleted_type_ids)?;
        self.relink_property_declarations(&deleted_type_ids)?;
        self.relink_alias_property_declarations(&deleted_type_ids)?;

        self.deleted_type_ids = deleted_type_ids;

        Ok(())
    }

    fn relink_bases(&mut self, deleted_type_ids: &[TypeId]) -> Result<(), ProjectStorageError> {
        let mut relinkable_bases = std::mem::take(&mut self.relinkable_bases);
        relinkable_bases.sort_by_key(|base| base.type_id);
        relinkable_bases.dedup_by_key(|base| base.type_id);

        for base in relinkable_bases {
            if deleted_type_ids.binary_search(&base.type_id).is_ok() {
                continue;
            }

            let prototype_id = self.resolve_base_name(base.type_id, base.prototype_name_id)?;
            let extension_id = self.resolve_base_name(base.type_id, base.extension_name_id)?;

            let changed_bases = self.update_bases(base.type_id, prototype_id, extension_id)?;
            self.update_prototypes(base.type_id, prototype_id)?;

            if changed_bases {
                self.check_prototype_chain_cycle(base.type_id)?;
            }
        }

        Ok(())
    }

    fn resolve_base_name(
        &mut self,
        type_id: TypeId,
        base_name_id: ImportedTypeNameId,
    ) -> Result<TypeId, ProjectStorageError> {
        if !base_name_id.is_valid() {
            return Ok(TypeId::NULL);
        }

        let base_id =
            queries::imported_type_names::fetch_type_id_by_name_id(self.connection, base_name_id)?;
        if !base_id.is_valid() {
            let name = queries::imported_type_names::imported_type_name(self.connection, base_name_id)?;
            let source_id = queries::types::source_id_by_type_id(self.connection, type_id)?;
            self.notifier.type_name_cannot_be_resolved(&name, source_id);
        }

        Ok(base_id)
    }

    fn relink_property_declarations(
        &mut self,
        deleted_type_ids: &[TypeId],
    ) -> Result<(), ProjectStorageError> {
        let mut relinkables = std::mem::take(&mut self.relinkable_property_declarations);
        relinkables.sort_by_key(|property| (property.type_id, property.property_declaration_id));
        relinkables.dedup();

        for property in relinkables {
            if deleted_type_ids.binary_search(&property.type_id).is_ok() {
                continue;
            }

            let mut property_type_id = queries::imported_type_names::fetch_type_id_by_name_id(
                self.connection,
                property.imported_type_name_id,
            )?;

            if !property_type_id.is_valid() {
                let name = queries::imported_type_names::imported_type_name(
                    self.connection,
                    property.imported_type_name_id,
                )?;
                let source_id =
                    queries::types::source_id_by_type_id(self.connection, property.type_id)?;
                self.notifier.type_name_cannot_be_resolved(&name, source_id);
                property_type_id = TypeId::NULL;
            }

            queries::properties::update_property_declaration_type(
                self.connection,
                property.property_declaration_id,
                property_type_id,
            )?;
        }

        Ok(())
    }

    fn relink_alias_property_declarations(
        &mut self,
        deleted_type_ids: &[TypeId],
    ) -> Result<(), ProjectStorageError> {
        let mut relinkables = std::mem::take(&mut self.relinkable_alias_property_declarations);
        relinkables.sort_by_key(AliasPropertyDeclaration::relink_key);
        relinkables.dedup_by_key(|alias| alias.relink_key());

        for alias in relinkables {
            if deleted_type_ids.binary_search(&alias.type_id).is_ok() {
                continue;
            }

            let target_type_id = queries::imported_type_names::fetch_type_id_by_name_id(
                self.connection,
                alias.alias_imported_type_name_id,
            )?;

            if target_type_id.is_valid() {
                let target = queries::properties::property_declaration_by_type_and_name(
                    self.connection,
                    target_type_id,
                    &alias.alias_property_name,
                )?;

                if let Some(target) = target {
                    queries::properties::update_property_declaration_with_alias_and_type(
                        self.connection,
                        alias.property_declaration_id,
                        target.property_type_id,
                        target.traits,
                        target.imported_type_name_id,
                        target.id,
                    )?;
                    continue;
                }
            }

            let name = queries::imported_type_names::imported_type_name(
                self.connection,
                alias.alias_imported_type_name_id,
            )?;
            let source_id = queries::types::source_id_by_type_id(self.connection, alias.type_id)?;
            self.notifier.type_name_cannot_be_resolved(&name, source_id);
            queries::properties::reset_alias_property_declaration(
                self.connection,
                alias.property_declaration_id,
                crate::traits::PropertyDeclarationTraits::empty(),
            )?;
        }

        Ok(())
    }

    pub(super) fn prune_relinkable_bases(&mut self, type_ids: Vec<TypeId>) {
        remove_relinkable_entries(&mut self.relinkable_bases, type_ids, |base| base.type_id);
    }

    pub(super) fn prune_relinkable_property_declarations(
        &mut self,
        property_declaration_ids: Vec<PropertyDeclarationId>,
    ) {
        remove_relinkable_entries(
            &mut self.relinkable_property_declarations,
            property_declaration_ids,
            |property| property.property_declaration_id,
        );
    }

    pub(super) fn prune_relinkable_alias_property_declarations(
        &mut self,
        property_declaration_ids: Vec<PropertyDeclarationId>,
    ) {
        remove_relinkable_entries(
            &mut self.relinkable_alias_property_declarations,
            property_declaration_ids,
            |alias| alias.property_declaration_id,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_relinkable_entries_drops_matching_keys() {
        let mut relinkables = vec![1_i64, 2, 3, 4];

        remove_relinkable_entries(&mut relinkables, vec![2_i64, 4], |&entry| entry);

        assert_eq!(relinkables, vec![1, 3]);
    }

    #[test]
    fn composed_property_name_joins_tail_with_a_dot() {
        let alias = AliasPropertyDeclaration {
            type_id: TypeId::new(1),
            property_declaration_id: PropertyDeclarationId::new(1),
            alias_imported_type_name_id: ImportedTypeNameId::new(1),
            alias_property_name: "target".to_owned(),
            alias_property_name_tail: Some("width".to_owned()),
            source_id: SourceId::NULL,
        };

        assert_eq!(alias.composed_property_name(), "target.width");
    }
}
