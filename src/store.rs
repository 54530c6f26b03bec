// 🔌 Store seam - what the mapper needs from a relational backend
//
// Named parameters carry their sigil (":id"). Rows come back as
// `Attributes` keyed by column name.

use rusqlite::types::ToSql;
use rusqlite::{Connection, Row};
use tracing::debug;

use crate::error::MapperError;
use crate::value::{Attributes, Value};

/// (":name", value) pairs bound by name.
pub type NamedParams = [(String, Value)];

pub trait Store {
    /// Zero-or-one row.
    fn fetch_optional(&self, sql: &str, params: &NamedParams)
        -> Result<Option<Attributes>, MapperError>;

    /// Zero-or-many rows, in store iteration order.
    fn fetch_all(&self, sql: &str, params: &NamedParams) -> Result<Vec<Attributes>, MapperError>;

    /// Number of rows affected.
    fn execute(&self, sql: &str, params: &NamedParams) -> Result<usize, MapperError>;

    /// Identity generated by the most recent successful insert on this handle.
    fn last_insert_id(&self) -> i64;
}

// ============================================================================
// SQLITE
// ============================================================================

fn bind(params: &NamedParams) -> Vec<(&str, &dyn ToSql)> {
    params
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect()
}

fn read_row(row: &Row<'_>, columns: &[String]) -> rusqlite::Result<Attributes> {
    let mut attributes = Attributes::new();
    for (index, column) in columns.iter().enumerate() {
        attributes.insert(column.clone(), row.get::<_, Value>(index)?);
    }
    Ok(attributes)
}

// Statements go through rusqlite's per-connection cache, so the templates a
// mapper builds once are only compiled once.
impl Store for Connection {
    fn fetch_optional(
        &self,
        sql: &str,
        params: &NamedParams,
    ) -> Result<Option<Attributes>, MapperError> {
        debug!(sql, "fetch one");
        let mut stmt = self.prepare_cached(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let bound = bind(params);
        let mut rows = stmt.query(bound.as_slice())?;
        let attributes = match rows.next()? {
            Some(row) => Some(read_row(row, &columns)?),
            None => None,
        };
        Ok(attributes)
    }

    fn fetch_all(&self, sql: &str, params: &NamedParams) -> Result<Vec<Attributes>, MapperError> {
        debug!(sql, "fetch all");
        let mut stmt = self.prepare_cached(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let bound = bind(params);
        let mut rows = stmt.query(bound.as_slice())?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(read_row(row, &columns)?);
        }
        Ok(result)
    }

    fn execute(&self, sql: &str, params: &NamedParams) -> Result<usize, MapperError> {
        debug!(sql, "execute");
        let mut stmt = self.prepare_cached(sql)?;
        let bound = bind(params);
        Ok(stmt.execute(bound.as_slice())?)
    }

    fn last_insert_id(&self) -> i64 {
        self.last_insert_rowid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE notes (id INTEGER PRIMARY KEY AUTOINCREMENT, body TEXT, score REAL);
             INSERT INTO notes (body, score) VALUES ('first', 1.5), ('second', NULL);",
        )
        .unwrap();
        conn
    }

    fn param(name: &str, value: impl Into<Value>) -> (String, Value) {
        (name.to_string(), value.into())
    }

    #[test]
    fn test_fetch_optional_by_named_param() {
        let conn = setup();

        let row = Store::fetch_optional(
            &conn,
            "SELECT * FROM notes WHERE id = :id",
            &[param(":id", 1_i64)],
        )
        .unwrap()
        .unwrap();

        assert_eq!(row.get("id"), Some(&Value::Integer(1)));
        assert_eq!(row.get("body"), Some(&Value::from("first")));
        assert_eq!(row.get("score"), Some(&Value::Real(1.5)));

        let missing = Store::fetch_optional(
            &conn,
            "SELECT * FROM notes WHERE id = :id",
            &[param(":id", 99_i64)],
        )
        .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_fetch_all_keeps_order_and_nulls() {
        let conn = setup();

        let rows = Store::fetch_all(&conn, "SELECT * FROM notes", &[]).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("body"), Some(&Value::from("first")));
        assert_eq!(rows[1].get("score"), Some(&Value::Null));
    }

    #[test]
    fn test_execute_and_last_insert_id() {
        let conn = setup();

        let affected = Store::execute(
            &conn,
            "INSERT INTO notes (body, score) VALUES (:body, :score)",
            &[param(":body", "third"), param(":score", Value::Null)],
        )
        .unwrap();

        assert_eq!(affected, 1);
        assert_eq!(Store::last_insert_id(&conn), 3);
    }

    #[test]
    fn test_store_errors_surface() {
        let conn = setup();

        let result = Store::execute(&conn, "INSERT INTO missing_table (x) VALUES (:x)", &[param(":x", 1_i64)]);
        assert!(matches!(result, Err(MapperError::Store(_))));
    }
}
