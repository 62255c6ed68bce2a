//! The alias linker.
//!
//! Linking runs in three passes over the collected alias declarations:
//! resolve each target to a property declaration id, check the resulting
//! chains for cycles, then copy the ultimate target's type and traits down
//! every chain. Aliases whose target cannot be resolved are reset to an
//! unresolved state and reported; a later synchronization that supplies the
//! target relinks them through the repair pass.

use quill_ids::{PropertyDeclarationId, TypeId};

use crate::error::ProjectStorageError;
use crate::queries;
use crate::traits::PropertyDeclarationTraits;

use super::relink::AliasPropertyDeclaration;
use super::{RaiseError, Synchronizer};

impl Synchronizer<'_> {
    pub(super) fn link_aliases(
        &mut self,
        alias_declarations: &[AliasPropertyDeclaration],
        raise_error: RaiseError,
    ) -> Result<(), ProjectStorageError> {
        self.link_alias_property_declaration_ids(alias_declarations, raise_error)?;
        self.check_alias_property_declaration_cycles(alias_declarations)?;
        self.update_alias_property_declaration_values(alias_declarations)?;

        Ok(())
    }

    fn link_alias_property_declaration_ids(
        &mut self,
        alias_declarations: &[AliasPropertyDeclaration],
        raise_error: RaiseError,
    ) -> Result<(), ProjectStorageError> {
        for alias in alias_declarations {
            let alias_type_id = queries::imported_type_names::fetch_type_id_by_name_id(
                self.connection,
                alias.alias_imported_type_name_id,
            )?;

            if alias_type_id.is_valid() {
                let alias_id = self.fetch_alias_id(
                    alias_type_id,
                    &alias.alias_property_name,
                    alias.alias_property_name_tail.as_deref(),
                )?;

                if alias_id.is_valid() {
                    queries::properties::update_alias_id_and_type_name_id(
                        self.connection,
                        alias.property_declaration_id,
                        alias_id,
                        alias.alias_imported_type_name_id,
                    )?;
                } else {
                    queries::properties::reset_alias_property_declaration(
                        self.connection,
                        alias.property_declaration_id,
                        PropertyDeclarationTraits::empty(),
                    )?;
                    queries::properties::update_alias_values_recursively_with(
                        self.connection,
                        alias.property_declaration_id,
                        TypeId::NULL,
                        PropertyDeclarationTraits::empty(),
                    )?;
                    self.notifier.property_name_does_not_exist(
                        &alias.composed_property_name(),
                        alias.source_id,
                    );
                }
            } else if raise_error == RaiseError::Yes {
                let name = queries::imported_type_names::imported_type_name(
                    self.connection,
                    alias.alias_imported_type_name_id,
                )?;
                self.notifier
                    .type_name_cannot_be_resolved(&name, alias.source_id);
                queries::properties::reset_alias_property_declaration(
                    self.connection,
                    alias.property_declaration_id,
                    PropertyDeclarationTraits::empty(),
                )?;
            }
        }

        Ok(())
    }

    /// Resolve `target.property(.tail)` to the property declaration the
    /// alias forwards to.
    fn fetch_alias_id(
        &self,
        alias_type_id: TypeId,
        alias_property_name: &str,
        alias_property_name_tail: Option<&str>,
    ) -> Result<PropertyDeclarationId, ProjectStorageError> {
        let Some(tail) = alias_property_name_tail else {
            return queries::properties::property_declaration_id(
                self.connection,
                alias_type_id,
                alias_property_name,
            );
        };

        let stem = queries::properties::property_declaration_by_type_and_name(
            self.connection,
            alias_type_id,
            alias_property_name,
        )?;

        let Some(stem) = stem else {
            return Ok(PropertyDeclarationId::NULL);
        };

        queries::properties::property_declaration_id(self.connection, stem.property_type_id, tail)
    }

    fn check_alias_property_declaration_cycles(
        &self,
        alias_declarations: &[AliasPropertyDeclaration],
    ) -> Result<(), ProjectStorageError> {
        for alias in alias_declarations {
            self.check_alias_chain_cycle(alias.property_declaration_id)?;
        }

        Ok(())
    }

    fn check_alias_chain_cycle(
        &self,
        property_declaration_id: PropertyDeclarationId,
    ) -> Result<(), ProjectStorageError> {
        let mut has_cycle = false;

        queries::properties::each_alias_chain_id(
            self.connection,
            property_declaration_id,
            |chain_id| {
                if chain_id == property_declaration_id {
                    has_cycle = true;
                    return Ok(false);
                }
                Ok(true)
            },
        )?;

        if has_cycle {
            let (property_name, type_id) = queries::properties::property_declaration_name_and_type_id(
                self.connection,
                property_declaration_id,
            )?;
            let (type_name, source_id) =
                queries::types::type_name_and_source_id(self.connection, type_id)?;
            self.notifier.alias_cycle(&type_name, &property_name, source_id);
            return Err(ProjectStorageError::AliasChainCycle);
        }

        Ok(())
    }

    fn update_alias_property_declaration_values(
        &mut self,
        alias_declarations: &[AliasPropertyDeclaration],
    ) -> Result<(), ProjectStorageError> {
        for alias in alias_declarations {
            queries::properties::propagate_alias_values(
                self.connection,
                alias.property_declaration_id,
            )?;
            queries::properties::update_alias_values_recursively(
                self.connection,
                alias.property_declaration_id,
            )?;
        }

        Ok(())
    }

    /// Safety net: retry linking alias rows that kept their textual target
    /// but lost their resolved binding, without reporting failures again.
    pub(super) fn repair_broken_alias_property_declarations(
        &mut self,
    ) -> Result<(), ProjectStorageError> {
        let broken = queries::properties::broken_alias_declarations(self.connection)?;

        let alias_declarations: Vec<AliasPropertyDeclaration> = broken
            .into_iter()
            .map(|view| AliasPropertyDeclaration {
                type_id: view.type_id,
                property_declaration_id: view.id,
                alias_imported_type_name_id: view.alias_imported_type_name_id,
                alias_property_name: view.alias_property_name,
                alias_property_name_tail: view.alias_property_name_tail,
                source_id: view.source_id,
            })
            .collect();

        self.link_aliases(&alias_declarations, RaiseError::No)
    }
}
