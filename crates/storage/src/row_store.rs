//! Row storage for a single record type.
//!
//! Rows are kept by id in a `BTreeMap`, so a scan returns them in insertion
//! order of their ids. The primary key and every unique column get a
//! value → row id index that enforces uniqueness on insert and update.
//! Null never takes part in a unique index.

use crate::constraint::ConstraintChecker;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use stagehand_core::schema::Table;
use stagehand_core::{Error, Result, Row, RowId, Value};

/// Extracts the key for `cols`; composite keys are joined into one string.
fn extract_key(row: &Row, cols: &[usize]) -> Value {
    if cols.len() == 1 {
        return row.get(cols[0]).cloned().unwrap_or(Value::Null);
    }
    let key_str = cols
        .iter()
        .map(|&i| row.get(i).map(|v| v.display_text()).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("|");
    Value::String(key_str)
}

/// A unique value → row id index over one or more columns.
struct UniqueIndex {
    label: String,
    columns: Vec<usize>,
    entries: BTreeMap<Value, RowId>,
}

impl UniqueIndex {
    fn key(&self, row: &Row) -> Option<Value> {
        let key = extract_key(row, &self.columns);
        (!key.is_null()).then_some(key)
    }

    /// Fails if `row` would collide with a row other than `row_id`.
    fn check(&self, row_id: RowId, row: &Row) -> Result<()> {
        if let Some(key) = self.key(row) {
            match self.entries.get(&key) {
                Some(&owner) if owner != row_id => {
                    return Err(Error::unique_constraint(self.label.clone(), key))
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn add(&mut self, row_id: RowId, row: &Row) {
        if let Some(key) = self.key(row) {
            self.entries.insert(key, row_id);
        }
    }

    fn remove(&mut self, row_id: RowId, row: &Row) {
        if let Some(key) = self.key(row) {
            if self.entries.get(&key) == Some(&row_id) {
                self.entries.remove(&key);
            }
        }
    }
}

/// Row storage for a single table.
pub struct RowStore {
    schema: Rc<Table>,
    rows: BTreeMap<RowId, Rc<Row>>,
    /// Primary key first (if any), then one entry per unique column.
    indices: Vec<UniqueIndex>,
}

impl RowStore {
    /// Creates a new row store for the given table schema.
    pub fn new(schema: Rc<Table>) -> Self {
        let mut indices = Vec::new();
        if !schema.primary_key().is_empty() {
            indices.push(UniqueIndex {
                label: ConstraintChecker::primary_key_label(&schema),
                columns: schema.primary_key().to_vec(),
                entries: BTreeMap::new(),
            });
        }
        for column in schema.unique_columns() {
            if schema.primary_key() == [column.index()] {
                continue;
            }
            indices.push(UniqueIndex {
                label: column.name().into(),
                columns: alloc::vec![column.index()],
                entries: BTreeMap::new(),
            });
        }

        Self {
            schema,
            rows: BTreeMap::new(),
            indices,
        }
    }

    /// Returns the table schema.
    pub fn schema(&self) -> &Rc<Table> {
        &self.schema
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Inserts a row into the store.
    pub fn insert(&mut self, row: Row) -> Result<RowId> {
        let row_id = row.id();
        if self.rows.contains_key(&row_id) {
            return Err(Error::invalid_operation("Row ID already exists"));
        }

        ConstraintChecker::check_row(&self.schema, &row)?;
        for index in &self.indices {
            index.check(row_id, &row)?;
        }

        for index in &mut self.indices {
            index.add(row_id, &row);
        }
        self.rows.insert(row_id, Rc::new(row));
        Ok(row_id)
    }

    /// Updates a row in the store.
    pub fn update(&mut self, row_id: RowId, new_row: Row) -> Result<()> {
        let old_row = self
            .rows
            .get(&row_id)
            .cloned()
            .ok_or_else(|| Error::not_found(self.schema.name(), Value::Int64(row_id as i64)))?;

        ConstraintChecker::check_row(&self.schema, &new_row)?;
        for index in &self.indices {
            index.check(row_id, &new_row)?;
        }

        for index in &mut self.indices {
            index.remove(row_id, &old_row);
            index.add(row_id, &new_row);
        }
        self.rows.insert(row_id, Rc::new(new_row));
        Ok(())
    }

    /// Deletes a row from the store.
    pub fn delete(&mut self, row_id: RowId) -> Result<Rc<Row>> {
        let row = self
            .rows
            .remove(&row_id)
            .ok_or_else(|| Error::not_found(self.schema.name(), Value::Int64(row_id as i64)))?;

        for index in &mut self.indices {
            index.remove(row_id, &row);
        }
        Ok(row)
    }

    /// Gets a row by ID.
    pub fn get(&self, row_id: RowId) -> Option<Rc<Row>> {
        self.rows.get(&row_id).cloned()
    }

    /// Returns an iterator over all rows, by ascending id.
    pub fn scan(&self) -> impl Iterator<Item = Rc<Row>> + '_ {
        self.rows.values().cloned()
    }

    /// Looks a row up by primary key value.
    pub fn get_by_pk(&self, pk_value: &Value) -> Option<Rc<Row>> {
        if self.schema.primary_key().is_empty() {
            return None;
        }
        self.indices
            .first()
            .and_then(|idx| idx.entries.get(pk_value))
            .and_then(|id| self.get(*id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use stagehand_core::schema::TableBuilder;
    use stagehand_core::DataType;

    fn test_schema() -> Rc<Table> {
        Rc::new(
            TableBuilder::new("skater")
                .unwrap()
                .add_column("id", DataType::Int64)
                .unwrap()
                .add_column("name", DataType::String)
                .unwrap()
                .add_column("email", DataType::String)
                .unwrap()
                .add_nullable(&["email"])
                .add_primary_key(&["id"])
                .unwrap()
                .add_unique("email")
                .unwrap()
                .build()
                .unwrap(),
        )
    }

    fn make_row(id: u64, name: &str, email: Option<&str>) -> Row {
        Row::new(
            id,
            vec![Value::Int64(id as i64), Value::from(name), Value::from(email)],
        )
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = RowStore::new(test_schema());
        store.insert(make_row(1, "Alice", Some("a@x"))).unwrap();
        store.insert(make_row(2, "Bob", None)).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(2).unwrap().get(1), Some(&Value::from("Bob")));
        assert!(store.get_by_pk(&Value::Int64(1)).is_some());
        assert_eq!(store.scan().map(|r| r.id()).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_duplicate_primary_key() {
        let mut store = RowStore::new(test_schema());
        store.insert(make_row(1, "Alice", None)).unwrap();

        let dup = Row::new(2, vec![Value::Int64(1), Value::from("Eve"), Value::Null]);
        let err = store.insert(dup).unwrap_err();
        assert!(matches!(err, Error::UniqueConstraint { ref column, .. } if column == "id"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unique_column_allows_many_nulls() {
        let mut store = RowStore::new(test_schema());
        store.insert(make_row(1, "Alice", None)).unwrap();
        store.insert(make_row(2, "Bob", None)).unwrap();

        store.insert(make_row(3, "Carol", Some("c@x"))).unwrap();
        let err = store.insert(make_row(4, "Dave", Some("c@x"))).unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_not_null() {
        let mut store = RowStore::new(test_schema());
        let row = Row::new(1, vec![Value::Int64(1), Value::Null, Value::Null]);
        assert!(matches!(
            store.insert(row),
            Err(Error::NullConstraint { .. })
        ));
    }

    #[test]
    fn test_update_checks_unique_against_other_rows() {
        let mut store = RowStore::new(test_schema());
        store.insert(make_row(1, "Alice", Some("a@x"))).unwrap();
        store.insert(make_row(2, "Bob", Some("b@x"))).unwrap();

        // Rewriting a row with its own key is fine.
        store.update(1, make_row(1, "Alicia", Some("a@x"))).unwrap();
        assert!(store.update(2, make_row(2, "Bob", Some("a@x"))).is_err());

        // The index follows updates.
        store.update(1, make_row(1, "Alicia", Some("new@x"))).unwrap();
        store.update(2, make_row(2, "Bob", Some("a@x"))).unwrap();
    }

    #[test]
    fn test_delete_releases_keys() {
        let mut store = RowStore::new(test_schema());
        store.insert(make_row(1, "Alice", Some("a@x"))).unwrap();
        store.delete(1).unwrap();
        assert!(store.is_empty());
        assert!(store.delete(1).is_err());

        store.insert(Row::new(5, vec![Value::Int64(1), Value::from("A"), Value::from("a@x")]))
            .unwrap();
        assert_eq!(store.get_by_pk(&Value::Int64(1)).unwrap().id(), 5);
    }
}
