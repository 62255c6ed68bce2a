//! Binding helpers for `rarray()` table-valued queries.
//!
//! Statements that restrict on an id set (`WHERE sourceId IN rarray(?1)`)
//! take the set as a single bound parameter. The virtual table module must
//! be registered once per connection before such a statement is prepared.

use std::rc::Rc;

use rusqlite::types::Value;
use rusqlite::Connection;

/// Register the `rarray` virtual table module on a connection.
pub fn load_array_module(connection: &Connection) -> rusqlite::Result<()> {
    rusqlite::vtab::array::load_module(connection)
}

/// Collect raw id values into an `rarray()` bindable parameter.
pub fn to_id_array(ids: impl IntoIterator<Item = i64>) -> Rc<Vec<Value>> {
    Rc::new(ids.into_iter().map(Value::Integer).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rarray_restricts_a_query_to_the_bound_ids() {
        let connection = Connection::open_in_memory().unwrap();
        load_array_module(&connection).unwrap();
        connection
            .execute_batch(
                "CREATE TABLE items(id INTEGER PRIMARY KEY);
                 INSERT INTO items(id) VALUES(1), (2), (3), (4)",
            )
            .unwrap();

        let ids = to_id_array([2, 4]);
        let mut statement = connection
            .prepare("SELECT id FROM items WHERE id IN rarray(?1) ORDER BY id")
            .unwrap();
        let found: Vec<i64> = statement
            .query_map([ids], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(found, vec![2, 4]);
    }
}
