//! In-memory table store.

use indexmap::IndexMap;
use tableflow_types::{ColumnSpec, ContextId, ResourceId, Row, TableName};

/// One simulated table.
#[derive(Debug, Clone)]
pub struct SimTable {
    /// Network-assigned id.
    pub id: ResourceId,
    /// Full table name.
    pub name: String,
    /// Schema as the network stores it.
    pub schema: Vec<ColumnSpec>,
    /// Rows in insertion order.
    pub rows: Vec<Row>,
    next_row_id: i64,
}

/// Tables of a single simulated network, in creation order.
#[derive(Debug)]
pub struct SimStorage {
    context: ContextId,
    tables: IndexMap<String, SimTable>,
    next_table_id: u64,
}

impl SimStorage {
    /// Empty storage for `context`.
    pub fn new(context: ContextId) -> Self {
        Self {
            context,
            tables: IndexMap::new(),
            next_table_id: 1,
        }
    }

    /// Create a table named `{prefix}_{context}_{id}`.
    pub fn create_table(&mut self, prefix: &str, schema: Vec<ColumnSpec>) -> &SimTable {
        let id = ResourceId(self.next_table_id);
        self.next_table_id += 1;

        let name = TableName::new(prefix, self.context, id).to_string();
        let table = SimTable {
            id,
            name: name.clone(),
            schema,
            rows: Vec::new(),
            next_row_id: 1,
        };
        self.tables.entry(name).or_insert(table)
    }

    /// Id the next created table will get.
    pub fn next_table_id(&self) -> ResourceId {
        ResourceId(self.next_table_id)
    }

    /// Append a demo row; `id` is assigned here.
    pub fn insert_row(
        &mut self,
        table: &str,
        name: &str,
        block: u64,
        tx: &str,
    ) -> Result<i64, String> {
        let table = self
            .tables
            .get_mut(table)
            .ok_or_else(|| format!("no such table: {table}"))?;

        let id = table.next_row_id;
        table.next_row_id += 1;
        table.rows.push(Row {
            id,
            name: name.to_string(),
            block: block.to_string(),
            tx: tx.to_string(),
        });
        Ok(id)
    }

    /// Look a table up by name.
    pub fn table(&self, name: &str) -> Option<&SimTable> {
        self.tables.get(name)
    }

    /// Look a table up by id.
    pub fn table_by_id(&self, id: ResourceId) -> Option<&SimTable> {
        self.tables.values().find(|t| t.id == id)
    }

    /// Whether a table with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no table exists.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_insert() {
        let mut storage = SimStorage::new(ContextId(1));
        let name = storage
            .create_table("t", vec![ColumnSpec::new("id", "integer")])
            .name
            .clone();
        assert_eq!(name, "t_1_1");
        assert_eq!(storage.next_table_id(), ResourceId(2));

        assert_eq!(storage.insert_row(&name, "a", 10, "0x01"), Ok(1));
        assert_eq!(storage.insert_row(&name, "b", 11, "0x02"), Ok(2));

        let table = storage.table(&name).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].block, "11");
        assert_eq!(storage.table_by_id(ResourceId(1)).unwrap().name, name);
    }

    #[test]
    fn test_insert_into_missing_table() {
        let mut storage = SimStorage::new(ContextId(1));
        assert_eq!(
            storage.insert_row("nope_1_1", "a", 1, "0x"),
            Err("no such table: nope_1_1".to_string())
        );
        assert!(storage.is_empty());
    }
}
