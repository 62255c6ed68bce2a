//! Scoped transaction helpers.
//!
//! The store uses three transaction flavours:
//!
//! - **Immediate** for write operations: the write lock is taken up front so
//!   a synchronization either runs to commit or rolls back as a unit.
//! - **Deferred** for read-mostly operations that may upgrade to a write on
//!   a cache miss (module id fetch, imported-type-name interning).
//! - **Implicit** for small reads: no helper needed, the statement runs in
//!   SQLite's autocommit mode.
//!
//! The closure receives the transaction as a plain [`Connection`] reference;
//! an `Err` return rolls back, an `Ok` return commits.

use rusqlite::{Connection, TransactionBehavior};

/// Run `f` inside an `BEGIN IMMEDIATE` transaction.
pub fn with_immediate_transaction<T, E>(
    connection: &mut Connection,
    f: impl FnOnce(&Connection) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<rusqlite::Error>,
{
    let transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = f(&transaction)?;
    transaction.commit()?;

    Ok(value)
}

/// Run `f` inside a deferred transaction.
///
/// Uses an unchecked transaction so read paths can stay `&Connection`; the
/// caller must not nest another transaction on the same connection.
pub fn with_deferred_transaction<T, E>(
    connection: &Connection,
    f: impl FnOnce(&Connection) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<rusqlite::Error>,
{
    let transaction = connection.unchecked_transaction()?;
    let value = f(&transaction)?;
    transaction.commit()?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection_with_table() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute_batch("CREATE TABLE kv(key INTEGER PRIMARY KEY, value INTEGER)")
            .unwrap();
        connection
    }

    #[test]
    fn immediate_transaction_commits_on_ok() {
        let mut connection = connection_with_table();

        with_immediate_transaction(&mut connection, |transaction| {
            transaction.execute("INSERT INTO kv(key, value) VALUES(1, 10)", [])?;
            Ok::<_, rusqlite::Error>(())
        })
        .unwrap();

        let value: i64 = connection
            .query_row("SELECT value FROM kv WHERE key=1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(value, 10);
    }

    #[test]
    fn immediate_transaction_rolls_back_on_err() {
        let mut connection = connection_with_table();

        let result = with_immediate_transaction(&mut connection, |transaction| {
            transaction.execute("INSERT INTO kv(key, value) VALUES(1, 10)", [])?;
            Err::<(), _>(rusqlite::Error::InvalidQuery)
        });

        assert!(result.is_err());
        let count: i64 = connection
            .query_row("SELECT count(*) FROM kv", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn deferred_transaction_works_on_shared_reference() {
        let connection = connection_with_table();

        let count = with_deferred_transaction(&connection, |transaction| {
            transaction.query_row("SELECT count(*) FROM kv", [], |row| row.get::<_, i64>(0))
        })
        .unwrap();

        assert_eq!(count, 0);
    }
}
