//! The inheritance cache.
//!
//! Per type id, a lazily filled slot with the set of all transitive
//! prototype and extension ids, produced by the recursive bases walk. The
//! cache is invalidated wholesale at the end of every synchronization and
//! resized to the largest type id, so slots never refer to stale rows.

use parking_lot::RwLock;
use quill_ids::TypeId;
use rusqlite::Connection;
use smallvec::SmallVec;

use crate::error::ProjectStorageError;
use crate::queries;

/// The observed maximum chain length; longer chains spill to the heap.
pub(crate) type BaseIds = SmallVec<[TypeId; 12]>;

/// `based_on` accepts at most this many candidate base ids.
pub const BASED_ON_ARITY_LIMIT: usize = 12;

pub(crate) struct BasesCache {
    slots: RwLock<Vec<Option<BaseIds>>>,
}

impl BasesCache {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
        }
    }

    /// Drop every slot and size the cache to the current largest type id.
    pub fn reset(&self, connection: &Connection) -> Result<(), ProjectStorageError> {
        let max_type_id = queries::types::max_type_id(connection)?;

        let mut slots = self.slots.write();
        slots.clear();
        slots.resize(usize::try_from(max_type_id).unwrap_or(0), None);

        Ok(())
    }

    fn bases_for(
        &self,
        connection: &Connection,
        type_id: TypeId,
    ) -> Result<BaseIds, ProjectStorageError> {
        let index = usize::try_from(type_id.raw() - 1).unwrap_or(0);

        {
            let slots = self.slots.read();
            if let Some(Some(bases)) = slots.get(index) {
                return Ok(bases.clone());
            }
        }

        let mut bases = BaseIds::new();
        queries::bases::each_prototype_and_extension_id(connection, type_id, |base_id| {
            bases.push(base_id);
            Ok(true)
        })?;

        let mut slots = self.slots.write();
        if slots.len() <= index {
            slots.resize(index + 1, None);
        }
        slots[index] = Some(bases.clone());

        Ok(bases)
    }

    /// The first of `base_type_ids` that `type_id` is or derives from, or
    /// the null id.
    ///
    /// The candidate list is capped at [`BASED_ON_ARITY_LIMIT`].
    pub fn based_on(
        &self,
        connection: &Connection,
        type_id: TypeId,
        base_type_ids: &[TypeId],
    ) -> Result<TypeId, ProjectStorageError> {
        debug_assert!(base_type_ids.len() <= BASED_ON_ARITY_LIMIT);

        if !type_id.is_valid() || base_type_ids.is_empty() {
            return Ok(TypeId::NULL);
        }

        if base_type_ids.contains(&type_id) {
            return Ok(type_id);
        }

        let bases = self.bases_for(connection, type_id)?;
        let found = bases
            .iter()
            .copied()
            .find(|base_id| base_type_ids.contains(base_id))
            .unwrap_or(TypeId::NULL);

        Ok(found)
    }

    /// Whether every one of `type_ids` is or derives from `base_type_id`.
    pub fn inherits_all(
        &self,
        connection: &Connection,
        type_ids: &[TypeId],
        base_type_id: TypeId,
    ) -> Result<bool, ProjectStorageError> {
        for &type_id in type_ids {
            if !type_id.is_valid() {
                return Ok(false);
            }
            if type_id == base_type_id {
                continue;
            }
            let bases = self.bases_for(connection, type_id)?;
            if !bases.contains(&base_type_id) {
                return Ok(false);
            }
        }

        Ok(true)
    }
}
