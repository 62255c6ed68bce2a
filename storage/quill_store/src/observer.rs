//! The observer bus.
//!
//! Observers are notified after a successful commit, in a fixed order: the
//! sorted unique set of deleted type ids first, then the exported-name diff
//! (if any name changed). Observers must not call back into the store
//! during notification.

use std::sync::Arc;

use quill_ids::TypeId;

use crate::info;

pub trait ProjectStorageObserver: Send + Sync {
    /// Types removed by the synchronization, sorted and unique.
    fn removed_type_ids(&self, _type_ids: &[TypeId]) {}

    /// The exact exported-name diff of the synchronization.
    fn exported_type_names_changed(
        &self,
        _added: &[info::ExportedTypeName],
        _removed: &[info::ExportedTypeName],
    ) {
    }
}

#[derive(Default)]
pub(crate) struct ObserverBus {
    observers: Vec<Arc<dyn ProjectStorageObserver>>,
}

impl ObserverBus {
    pub fn add(&mut self, observer: Arc<dyn ProjectStorageObserver>) {
        self.observers.push(observer);
    }

    pub fn remove(&mut self, observer: &Arc<dyn ProjectStorageObserver>) {
        self.observers
            .retain(|registered| !Arc::ptr_eq(registered, observer));
    }

    pub fn notify_removed_type_ids(&self, type_ids: &[TypeId]) {
        for observer in &self.observers {
            observer.removed_type_ids(type_ids);
        }
    }

    pub fn notify_exported_type_names_changed(
        &self,
        added: &[info::ExportedTypeName],
        removed: &[info::ExportedTypeName],
    ) {
        for observer in &self.observers {
            observer.exported_type_names_changed(added, removed);
        }
    }
}
