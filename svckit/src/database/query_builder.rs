use crate::types::{BatchEntry, ColumnValue};

pub struct QueryBuilder;

impl QueryBuilder {
    /// Parameterised insert of `(id, name)` into `table` (`keyspace.table`).
    pub fn build_insert_query(table: &str) -> String {
        format!("insert into {} (id, name) values (?,?)", table)
    }

    /// Idempotent insert entry whose name mirrors the generated id.
    pub fn build_insert_entry(statement: &str, id: &str) -> BatchEntry {
        BatchEntry::new(
            statement,
            vec![
                ColumnValue::Text(id.to_string()),
                ColumnValue::Text(id.to_string()),
            ],
            true,
        )
    }
}
