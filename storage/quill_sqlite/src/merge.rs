//! The generic three-way synchronization merge.
//!
//! Synchronization diffs a *range* (the persisted rows restricted to the
//! updated key space, sorted by key) against a batch of incoming *entries*
//! (sorted by the same key) and emits the minimal set of operations:
//!
//! - an entry without a matching row is inserted,
//! - a row with a matching entry is offered for update (the callback decides
//!   whether anything actually changed),
//! - a row without a matching entry is removed.
//!
//! Both inputs must be sorted by the merge key or the diff is meaningless.
//! Duplicate keys among the entries are not collapsed; the second insert of
//! a duplicate key surfaces as a constraint violation at the call site,
//! which is exactly where duplicate exported names are detected.

use std::cmp::Ordering;

/// Whether an update callback changed the row.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum UpdateChange {
    No,
    Update,
}

/// Merge sorted persisted `views` against sorted incoming `entries`.
pub fn insert_update_delete<View, Entry, Error>(
    views: Vec<View>,
    entries: &[Entry],
    mut compare_key: impl FnMut(&View, &Entry) -> Ordering,
    mut insert: impl FnMut(&Entry) -> Result<(), Error>,
    mut update: impl FnMut(&View, &Entry) -> Result<UpdateChange, Error>,
    mut remove: impl FnMut(&View) -> Result<(), Error>,
) -> Result<(), Error> {
    let mut views = views.iter();
    let mut entries = entries.iter();

    let mut view = views.next();
    let mut entry = entries.next();

    loop {
        match (view, entry) {
            (Some(current_view), Some(current_entry)) => {
                match compare_key(current_view, current_entry) {
                    Ordering::Less => {
                        remove(current_view)?;
                        view = views.next();
                    }
                    Ordering::Greater => {
                        insert(current_entry)?;
                        entry = entries.next();
                    }
                    Ordering::Equal => {
                        update(current_view, current_entry)?;
                        view = views.next();
                        entry = entries.next();
                    }
                }
            }
            (Some(current_view), None) => {
                remove(current_view)?;
                view = views.next();
            }
            (None, Some(current_entry)) => {
                insert(current_entry)?;
                entry = entries.next();
            }
            (None, None) => return Ok(()),
        }
    }
}
