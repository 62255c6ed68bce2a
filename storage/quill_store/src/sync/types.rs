//! Synchronization of types and their child declarations.

use std::cell::Cell;

use quill_ids::{ImportedTypeNameId, PropertyDeclarationId, SourceId, TypeId};
use quill_sqlite::{insert_update_delete, UpdateChange};
use smallvec::SmallVec;

use crate::error::ProjectStorageError;
use crate::json;
use crate::package::{
    EnumerationDeclaration, FunctionDeclaration, ImportedTypeName, PropertyDeclaration,
    SignalDeclaration, Type,
};
use crate::queries;

use super::relink::AliasPropertyDeclaration;
use super::{compare_invalid_are_true, Synchronizer};

/// Return the id of the named type in `source_id`, inserting the row if it
/// does not exist yet. An empty name looks the type up by source alone.
pub(super) fn declare_type(
    connection: &rusqlite::Connection,
    type_name: &str,
    source_id: SourceId,
) -> Result<TypeId, ProjectStorageError> {
    if type_name.is_empty() {
        return queries::types::type_id_by_source_id(connection, source_id);
    }

    let type_id = queries::types::type_id_by_source_id_and_name(connection, source_id, type_name)?;
    if type_id.is_valid() {
        return Ok(type_id);
    }

    queries::types::insert_type(connection, source_id, type_name)
}

impl Synchronizer<'_> {
    pub(super) fn synchronize_types(
        &mut self,
        types: &mut Vec<Type>,
        updated_type_ids: &mut Vec<TypeId>,
    ) -> Result<(), ProjectStorageError> {
        for ty in types.iter_mut() {
            if !ty.source_id.is_valid() {
                return Err(ProjectStorageError::TypeHasInvalidSourceId);
            }

            ty.type_id = declare_type(self.connection, &ty.type_name, ty.source_id)?;
            queries::types::update_type_traits(self.connection, ty.type_id, ty.traits)?;
            updated_type_ids.push(ty.type_id);
        }

        types.sort_unstable_by_key(|ty| ty.type_id);

        self.sync_prototypes_and_extensions(types)?;
        self.reset_default_properties_if_changed(types)?;
        self.reset_removed_alias_property_declarations_to_null(types)?;
        self.sync_declarations(types)?;
        self.sync_default_properties(types)?;

        Ok(())
    }

    fn sync_prototypes_and_extensions(
        &mut self,
        types: &mut [Type],
    ) -> Result<(), ProjectStorageError> {
        let mut type_ids = Vec::with_capacity(types.len());

        for ty in types.iter() {
            self.sync_prototype_and_extension(ty)?;
            type_ids.push(ty.type_id);
        }

        self.prune_relinkable_bases(type_ids);

        Ok(())
    }

    fn sync_prototype_and_extension(&mut self, ty: &Type) -> Result<(), ProjectStorageError> {
        let (prototype_id, prototype_name_id) =
            self.fetch_imported_type_name_id_and_type_id(ty.prototype.as_ref(), ty.source_id)?;
        let (extension_id, extension_name_id) =
            self.fetch_imported_type_name_id_and_type_id(ty.extension.as_ref(), ty.source_id)?;

        queries::types::update_prototype_and_extension_name(
            self.connection,
            ty.type_id,
            prototype_name_id,
            extension_name_id,
        )?;

        let changed_bases = self.update_bases(ty.type_id, prototype_id, extension_id)?;
        let changed_prototypes = self.update_prototypes(ty.type_id, prototype_id)?;

        if changed_bases {
            self.check_prototype_chain_cycle(ty.type_id)?;
        }

        if changed_prototypes {
            self.updated_prototype_ids.push(ty.type_id);
        }

        Ok(())
    }

    /// Resolve an optional prototype/extension reference. A reference that
    /// cannot be resolved yet is reported and mapped to the unresolved
    /// sentinel; it keeps its name id so relinking can find it later.
    pub(super) fn fetch_imported_type_name_id_and_type_id(
        &self,
        type_name: Option<&ImportedTypeName>,
        source_id: SourceId,
    ) -> Result<(TypeId, ImportedTypeNameId), ProjectStorageError> {
        let Some(type_name) = type_name else {
            return Ok((TypeId::NULL, ImportedTypeNameId::NULL));
        };
        if type_name.name().is_empty() {
            return Ok((TypeId::NULL, ImportedTypeNameId::NULL));
        }

        let (type_name_id, kind) = queries::imported_type_names::fetch_imported_type_name_id_for_name(
            self.connection,
            type_name,
            source_id,
        )?;
        let type_id = queries::imported_type_names::fetch_type_id(self.connection, type_name_id, kind)?;

        if !type_id.is_valid() {
            self.notifier
                .type_name_cannot_be_resolved(type_name.name(), source_id);
            return Ok((TypeId::UNRESOLVED, type_name_id));
        }

        Ok((type_id, type_name_id))
    }

    /// Reconcile the `bases` rows of a type against its (up to two)
    /// parents; returns whether any edge changed.
    pub(super) fn update_bases(
        &mut self,
        type_id: TypeId,
        prototype_id: TypeId,
        extension_id: TypeId,
    ) -> Result<bool, ProjectStorageError> {
        let mut base_ids: SmallVec<[TypeId; 2]> = SmallVec::new();
        if !prototype_id.is_null() {
            base_ids.push(prototype_id);
        }
        if !extension_id.is_null() && extension_id != prototype_id {
            base_ids.push(extension_id);
        }
        base_ids.sort_unstable();

        let views = queries::bases::base_ids(self.connection, type_id)?;

        let connection = self.connection;
        let changed = Cell::new(false);

        insert_update_delete(
            views,
            base_ids.as_slice(),
            |view, base| view.cmp(base),
            |&base_id| {
                queries::bases::insert_base(connection, type_id, base_id)?;
                changed.set(true);
                Ok::<(), ProjectStorageError>(())
            },
            |&view_base_id, &base_id| {
                if view_base_id != base_id {
                    queries::bases::update_base(connection, type_id, base_id, view_base_id)?;
                    changed.set(true);
                    return Ok(UpdateChange::Update);
                }
                Ok(UpdateChange::No)
            },
            |&view_base_id| {
                queries::bases::delete_base(connection, type_id, view_base_id)?;
                changed.set(true);
                Ok(())
            },
        )?;

        Ok(changed.get())
    }

    /// Reconcile the single `prototypes` row of a type; returns whether it
    /// changed.
    pub(super) fn update_prototypes(
        &mut self,
        type_id: TypeId,
        prototype_id: TypeId,
    ) -> Result<bool, ProjectStorageError> {
        if !prototype_id.is_null() {
            queries::bases::upsert_prototype(self.connection, type_id, prototype_id)
        } else {
            queries::bases::delete_prototype(self.connection, type_id)
        }
    }

    /// Abort if the prototype+extension chain of `type_id` passes through
    /// `type_id` again. Any cycle introduced by a bases update necessarily
    /// contains the updated type, so the walk terminates.
    pub(super) fn check_prototype_chain_cycle(
        &self,
        type_id: TypeId,
    ) -> Result<(), ProjectStorageError> {
        let mut has_cycle = false;

        queries::bases::each_prototype_and_extension_id(self.connection, type_id, |chain_id| {
            if chain_id == type_id {
                has_cycle = true;
                return Ok(false);
            }
            Ok(true)
        })?;

        if has_cycle {
            let (type_name, source_id) =
                queries::types::type_name_and_source_id(self.connection, type_id)?;
            self.notifier.prototype_cycle(&type_name, source_id);
            return Err(ProjectStorageError::PrototypeChainCycle);
        }

        Ok(())
    }

    /// Null out `defaultPropertyId` for every type whose incoming default
    /// property differs, before the declarations are merged.
    fn reset_default_properties_if_changed(
        &mut self,
        types: &[Type],
    ) -> Result<(), ProjectStorageError> {
        let views = queries::types::types_with_default_property(self.connection)?;

        let connection = self.connection;
        insert_update_delete(
            views,
            types,
            |view, ty| view.type_id.cmp(&ty.type_id),
            |_| Ok(()),
            |view, ty| {
                let mut value_default_property_id = PropertyDeclarationId::NULL;
                if let Some(name) = ty.default_property_name.as_deref() {
                    if !name.is_empty() {
                        value_default_property_id =
                            queries::properties::property_declaration_id(connection, ty.type_id, name)?;
                    }
                }

                if compare_invalid_are_true(value_default_property_id, view.default_property_id) {
                    return Ok(UpdateChange::No);
                }

                queries::types::update_default_property_id(
                    connection,
                    ty.type_id,
                    PropertyDeclarationId::NULL,
                )?;

                Ok(UpdateChange::Update)
            },
            |_| Ok(()),
        )
    }

    /// Aliases no longer declared by their type lose their linkage before
    /// the declaration merge runs.
    fn reset_removed_alias_property_declarations_to_null(
        &mut self,
        types: &mut [Type],
    ) -> Result<(), ProjectStorageError> {
        let mut property_declaration_ids = Vec::with_capacity(types.len());
        let connection = self.connection;

        for ty in types.iter_mut() {
            ty.property_declarations
                .sort_unstable_by(|first, second| first.name.cmp(&second.name));

            let views = queries::properties::alias_declaration_views(connection, ty.type_id)?;

            insert_update_delete(
                views,
                &ty.property_declarations,
                |view, declaration| view.name.as_str().cmp(declaration.name.as_str()),
                |_| Ok::<(), ProjectStorageError>(()),
                |_, _| Ok(UpdateChange::No),
                |view| {
                    queries::properties::update_alias_property_declaration_to_null(
                        connection, view.id,
                    )?;
                    property_declaration_ids.push(view.id);
                    Ok(())
                },
            )?;
        }

        self.prune_relinkable_alias_property_declarations(property_declaration_ids);

        Ok(())
    }

    fn sync_declarations(&mut self, types: &mut [Type]) -> Result<(), ProjectStorageError> {
        let mut property_declaration_ids = Vec::with_capacity(types.len() * 10);

        for ty in types.iter_mut() {
            let type_id = ty.type_id;
            let source_id = ty.source_id;

            self.synchronize_property_declarations(
                type_id,
                &mut ty.property_declarations,
                source_id,
                &mut property_declaration_ids,
            )?;
            self.synchronize_function_declarations(type_id, &mut ty.function_declarations)?;
            self.synchronize_signal_declarations(type_id, &mut ty.signal_declarations)?;
            self.synchronize_enumeration_declarations(type_id, &mut ty.enumeration_declarations)?;
        }

        self.prune_relinkable_property_declarations(property_declaration_ids);

        Ok(())
    }

    fn synchronize_property_declarations(
        &mut self,
        type_id: TypeId,
        declarations: &mut [PropertyDeclaration],
        source_id: SourceId,
        property_declaration_ids: &mut Vec<PropertyDeclarationId>,
    ) -> Result<(), ProjectStorageError> {
        declarations.sort_unstable_by(|first, second| first.name.cmp(&second.name));

        let views = queries::properties::property_declaration_views(self.connection, type_id)?;

        let mut views_iter = views.iter();
        let mut declarations_iter = declarations.iter();
        let mut view = views_iter.next();
        let mut declaration = declarations_iter.next();

        loop {
            match (view, declaration) {
                (Some(current_view), Some(current_declaration)) => {
                    match current_view.name.as_str().cmp(current_declaration.name.as_str()) {
                        std::cmp::Ordering::Less => {
                            self.remove_property_declaration(
                                type_id,
                                current_view,
                                property_declaration_ids,
                            )?;
                            view = views_iter.next();
                        }
                        std::cmp::Ordering::Greater => {
                            self.insert_property_declaration_entry(
                                type_id,
                                current_declaration,
                                source_id,
                            )?;
                            declaration = declarations_iter.next();
                        }
                        std::cmp::Ordering::Equal => {
                            self.update_property_declaration_entry(
                                type_id,
                                current_view,
                                current_declaration,
                                source_id,
                                property_declaration_ids,
                            )?;
                            view = views_iter.next();
                            declaration = declarations_iter.next();
                        }
                    }
                }
                (Some(current_view), None) => {
                    self.remove_property_declaration(type_id, current_view, property_declaration_ids)?;
                    view = views_iter.next();
                }
                (None, Some(current_declaration)) => {
                    self.insert_property_declaration_entry(type_id, current_declaration, source_id)?;
                    declaration = declarations_iter.next();
                }
                (None, None) => break,
            }
        }

        Ok(())
    }

    fn insert_property_declaration_entry(
        &mut self,
        type_id: TypeId,
        declaration: &PropertyDeclaration,
        source_id: SourceId,
    ) -> Result<(), ProjectStorageError> {
        if let Some(alias) = &declaration.alias {
            let (alias_imported_type_name_id, _) =
                queries::imported_type_names::fetch_imported_type_name_id_for_name(
                    self.connection,
                    &declaration.type_name,
                    source_id,
                )?;

            let property_declaration_id = queries::properties::insert_alias_property_declaration(
                self.connection,
                type_id,
                &declaration.name,
                alias_imported_type_name_id,
                &alias.property,
                alias.tail.as_deref(),
            )?;

            self.alias_declarations_to_link.push(AliasPropertyDeclaration {
                type_id,
                property_declaration_id,
                alias_imported_type_name_id,
                alias_property_name: alias.property.clone(),
                alias_property_name_tail: alias.tail.clone(),
                source_id,
            });

            return Ok(());
        }

        let (imported_type_name_id, kind) =
            queries::imported_type_names::fetch_imported_type_name_id_for_name(
                self.connection,
                &declaration.type_name,
                source_id,
            )?;
        let mut property_type_id =
            queries::imported_type_names::fetch_type_id(self.connection, imported_type_name_id, kind)?;

        if !property_type_id.is_valid() {
            self.notifier
                .type_name_cannot_be_resolved(declaration.type_name.name(), source_id);
            property_type_id = TypeId::NULL;
        }

        let property_declaration_id = queries::properties::insert_property_declaration(
            self.connection,
            type_id,
            &declaration.name,
            property_type_id,
            declaration.traits,
            imported_type_name_id,
        )?;

        // A same-named property in a base is shadowed now; aliases bound to
        // it chain through the new declaration instead.
        let next_property_declaration_id = queries::properties::next_property_declaration_id(
            self.connection,
            type_id,
            &declaration.name,
        )?;
        if next_property_declaration_id.is_valid() {
            queries::properties::repoint_alias_references(
                self.connection,
                next_property_declaration_id,
                property_declaration_id,
            )?;
            queries::properties::update_alias_values_recursively_with(
                self.connection,
                property_declaration_id,
                property_type_id,
                declaration.traits,
            )?;
        }

        Ok(())
    }

    fn update_property_declaration_entry(
        &mut self,
        type_id: TypeId,
        view: &queries::properties::PropertyDeclarationView,
        declaration: &PropertyDeclaration,
        source_id: SourceId,
        property_declaration_ids: &mut Vec<PropertyDeclarationId>,
    ) -> Result<(), ProjectStorageError> {
        if let Some(alias) = &declaration.alias {
            let (alias_imported_type_name_id, _) =
                queries::imported_type_names::fetch_imported_type_name_id_for_name(
                    self.connection,
                    &declaration.type_name,
                    source_id,
                )?;

            self.alias_declarations_to_link.push(AliasPropertyDeclaration {
                type_id,
                property_declaration_id: view.id,
                alias_imported_type_name_id,
                alias_property_name: alias.property.clone(),
                alias_property_name_tail: alias.tail.clone(),
                source_id,
            });
            property_declaration_ids.push(view.id);

            return Ok(());
        }

        let (imported_type_name_id, kind) =
            queries::imported_type_names::fetch_imported_type_name_id_for_name(
                self.connection,
                &declaration.type_name,
                source_id,
            )?;
        let mut property_type_id =
            queries::imported_type_names::fetch_type_id(self.connection, imported_type_name_id, kind)?;

        if !property_type_id.is_valid() {
            self.notifier
                .type_name_cannot_be_resolved(declaration.type_name.name(), source_id);
            property_type_id = TypeId::NULL;
            property_declaration_ids.push(view.id);
        }

        if view.traits == declaration.traits
            && compare_invalid_are_true(property_type_id, view.property_type_id)
            && imported_type_name_id == view.imported_type_name_id
        {
            return Ok(());
        }

        queries::properties::update_property_declaration(
            self.connection,
            view.id,
            property_type_id,
            declaration.traits,
            imported_type_name_id,
        )?;
        queries::properties::update_alias_values_recursively_with(
            self.connection,
            view.id,
            property_type_id,
            declaration.traits,
        )?;
        property_declaration_ids.push(view.id);

        Ok(())
    }

    fn remove_property_declaration(
        &mut self,
        type_id: TypeId,
        view: &queries::properties::PropertyDeclarationView,
        property_declaration_ids: &mut Vec<PropertyDeclarationId>,
    ) -> Result<(), ProjectStorageError> {
        // A shadowed base property (if any) takes over for the dependents
        // of the removed declaration.
        let next_property_declaration_id =
            queries::properties::next_property_declaration_id(self.connection, type_id, &view.name)?;
        if next_property_declaration_id.is_valid() {
            queries::properties::repoint_alias_references_with_values(
                self.connection,
                next_property_declaration_id,
                view.id,
            )?;
        }

        queries::types::clear_default_property_id_referencing(self.connection, view.id)?;
        queries::properties::delete_property_declaration(self.connection, view.id)?;
        property_declaration_ids.push(view.id);

        Ok(())
    }

    fn synchronize_function_declarations(
        &mut self,
        type_id: TypeId,
        declarations: &mut [FunctionDeclaration],
    ) -> Result<(), ProjectStorageError> {
        declarations.sort_unstable_by(|first, second| {
            first
                .name
                .cmp(&second.name)
                .then_with(|| json::create_signature(&first.parameters).cmp(&json::create_signature(&second.parameters)))
        });

        let views = queries::declarations::function_declaration_views(self.connection, type_id)?;

        let connection = self.connection;
        insert_update_delete(
            views,
            declarations,
            |view, declaration| {
                view.name
                    .as_str()
                    .cmp(declaration.name.as_str())
                    .then_with(|| {
                        view.signature
                            .cmp(&json::create_signature(&declaration.parameters))
                    })
            },
            |declaration| {
                let signature = json::create_signature(&declaration.parameters);
                queries::declarations::insert_function_declaration(
                    connection,
                    type_id,
                    &declaration.name,
                    &declaration.return_type_name,
                    &signature,
                )
            },
            |view, declaration| {
                let signature = json::create_signature(&declaration.parameters);
                if declaration.return_type_name == view.return_type_name
                    && signature == view.signature
                {
                    return Ok(UpdateChange::No);
                }
                queries::declarations::update_function_declaration(
                    connection,
                    view.id,
                    &declaration.return_type_name,
                    &signature,
                )?;
                Ok(UpdateChange::Update)
            },
            |view| queries::declarations::delete_function_declaration(connection, view.id),
        )
    }

    fn synchronize_signal_declarations(
        &mut self,
        type_id: TypeId,
        declarations: &mut [SignalDeclaration],
    ) -> Result<(), ProjectStorageError> {
        declarations.sort_unstable_by(|first, second| {
            first
                .name
                .cmp(&second.name)
                .then_with(|| json::create_signature(&first.parameters).cmp(&json::create_signature(&second.parameters)))
        });

        let views = queries::declarations::signal_declaration_views(self.connection, type_id)?;

        let connection = self.connection;
        insert_update_delete(
            views,
            declarations,
            |view, declaration| {
                view.name
                    .as_str()
                    .cmp(declaration.name.as_str())
                    .then_with(|| {
                        view.signature
                            .cmp(&json::create_signature(&declaration.parameters))
                    })
            },
            |declaration| {
                let signature = json::create_signature(&declaration.parameters);
                queries::declarations::insert_signal_declaration(
                    connection,
                    type_id,
                    &declaration.name,
                    &signature,
                )
            },
            |_view, _declaration| Ok(UpdateChange::No),
            |view| queries::declarations::delete_signal_declaration(connection, view.id),
        )
    }

    fn synchronize_enumeration_declarations(
        &mut self,
        type_id: TypeId,
        declarations: &mut [EnumerationDeclaration],
    ) -> Result<(), ProjectStorageError> {
        declarations.sort_unstable_by(|first, second| first.name.cmp(&second.name));

        let views = queries::declarations::enumeration_declaration_views(self.connection, type_id)?;

        let connection = self.connection;
        insert_update_delete(
            views,
            declarations,
            |view, declaration| view.name.as_str().cmp(declaration.name.as_str()),
            |declaration| {
                let enumerators = json::create_enumerators(&declaration.enumerator_declarations);
                queries::declarations::insert_enumeration_declaration(
                    connection,
                    type_id,
                    &declaration.name,
                    &enumerators,
                )
            },
            |view, declaration| {
                let enumerators = json::create_enumerators(&declaration.enumerator_declarations);
                if enumerators == view.enumerator_declarations {
                    return Ok(UpdateChange::No);
                }
                queries::declarations::update_enumeration_declaration(
                    connection,
                    view.id,
                    &enumerators,
                )?;
                Ok(UpdateChange::Update)
            },
            |view| queries::declarations::delete_enumeration_declaration(connection, view.id),
        )
    }

    /// Now that the declarations exist, bind each type's default property
    /// to the declaration of that name; a missing declaration is reported.
    fn sync_default_properties(&mut self, types: &[Type]) -> Result<(), ProjectStorageError> {
        let views = queries::types::types_with_default_property(self.connection)?;

        let connection = self.connection;
        let notifier = self.notifier;
        insert_update_delete(
            views,
            types,
            |view, ty| view.type_id.cmp(&ty.type_id),
            |_| Ok(()),
            |view, ty| {
                let mut value_default_property_id = PropertyDeclarationId::NULL;
                if let Some(name) = ty.default_property_name.as_deref() {
                    if !name.is_empty() {
                        let declaration = queries::properties::property_declaration_by_type_and_name(
                            connection, ty.type_id, name,
                        )?;

                        match declaration {
                            Some(declaration) => value_default_property_id = declaration.id,
                            None => {
                                notifier.missing_default_property(&ty.type_name, name, ty.source_id);
                            }
                        }
                    }
                }

                if compare_invalid_are_true(value_default_property_id, view.default_property_id) {
                    return Ok(UpdateChange::No);
                }

                queries::types::update_default_property_id(
                    connection,
                    ty.type_id,
                    value_default_property_id,
                )?;

                Ok(UpdateChange::Update)
            },
            |_| Ok(()),
        )
    }
}
