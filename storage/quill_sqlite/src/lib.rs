//! SQLite plumbing shared by the Quill storage crates.
//!
//! Three concerns live here, all of them independent of the storage schema:
//!
//! - [`transaction`]: scoped transaction helpers for the three transaction
//!   flavours the store uses (immediate, deferred, implicit).
//! - [`merge`]: the generic three-way synchronization merge that diffs a
//!   range of persisted rows against a batch of incoming entries.
//! - [`array`]: binding helpers for passing id sets to `rarray()`
//!   table-valued queries.

pub mod array;
pub mod merge;
pub mod transaction;

pub use array::{load_array_module, to_id_array};
pub use merge::{insert_update_delete, UpdateChange};
pub use transaction::{with_deferred_transaction, with_immediate_transaction};
