use std::collections::HashSet;

use bitvec::prelude::*;

use crate::column::Column;
use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::value::Value;

/// A row, positionally aligned with its table's schema.
pub type Row = Vec<Value>;

/// Column definition in the schema
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub primary_key: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            primary_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub columns: Vec<ColumnDef>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    /// Rejects empty schemas, duplicate column names and more than one primary key.
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::semantic("a table needs at least one column"));
        }
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(Error::semantic(format!(
                    "duplicate column name {}",
                    column.name
                )));
            }
        }
        if self.columns.iter().filter(|c| c.primary_key).count() > 1 {
            return Err(Error::semantic("a table may have at most one primary key"));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of the column named exactly `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Like [Schema::index_of], failing with a semantic error for unknown columns.
    pub fn resolve(&self, name: &str) -> Result<usize> {
        self.index_of(name)
            .ok_or_else(|| Error::semantic(format!("unknown column {name}")))
    }

    pub fn primary_key_index(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.primary_key)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// A table stored column by column.
///
/// Every mutating method validates its whole batch before touching storage,
/// so a failing call leaves the table unchanged.
pub struct Table {
    pub name: String,
    pub schema: Schema,
    pub columns: Vec<Column>,
    pub row_count: usize,
    /// Values currently held by the primary-key column.
    primary_keys: HashSet<Value>,
}

impl Table {
    pub fn new(name: String, schema: Schema) -> Self {
        let columns = schema
            .columns
            .iter()
            .map(|column| Column::new(column.name.clone(), column.data_type))
            .collect();
        Self {
            name,
            schema,
            columns,
            row_count: 0,
            primary_keys: HashSet::new(),
        }
    }

    /// Checks width and column types of a full row.
    fn check_row(&self, row: &[Value]) -> Result<()> {
        if row.len() != self.schema.len() {
            return Err(Error::semantic(format!(
                "table {} has {} columns but {} values were supplied",
                self.name,
                self.schema.len(),
                row.len()
            )));
        }
        for (column, value) in self.columns.iter().zip(row) {
            column.check(value)?;
        }
        Ok(())
    }

    /// Extracts the primary-key value of `row`, rejecting `NULL`.
    fn key_of<'a>(&self, pk: usize, row: &'a [Value]) -> Result<&'a Value> {
        let key = &row[pk];
        if key.is_null() {
            return Err(Error::constraint(format!(
                "primary key {}.{} cannot be NULL",
                self.name, self.schema.columns[pk].name
            )));
        }
        Ok(key)
    }

    fn duplicate_key(&self, key: &Value) -> Error {
        Error::constraint(format!(
            "duplicate primary key {} in table {}",
            key, self.name
        ))
    }

    /// Inserts a single row.
    pub fn insert(&mut self, row: Row) -> Result<()> {
        self.insert_rows(vec![row]).map(|_| ())
    }

    /// Appends every row of the batch, or none of them.
    pub fn insert_rows(&mut self, rows: Vec<Row>) -> Result<usize> {
        let mut new_keys = Vec::new();
        for row in &rows {
            self.check_row(row)?;
            if let Some(pk) = self.schema.primary_key_index() {
                let key = self.key_of(pk, row)?;
                if self.primary_keys.contains(key) || new_keys.contains(&key) {
                    return Err(self.duplicate_key(key));
                }
                new_keys.push(key);
            }
        }
        let new_keys: Vec<Value> = new_keys.into_iter().cloned().collect();

        let count = rows.len();
        for row in rows {
            for (column, value) in self.columns.iter_mut().zip(row) {
                column.push(value)?;
            }
        }
        self.primary_keys.extend(new_keys);
        self.row_count += count;
        Ok(count)
    }

    pub fn get_row(&self, row_idx: usize) -> Option<Row> {
        if self.row_count <= row_idx {
            return None;
        }
        self.columns
            .iter()
            .map(|col| col.get(row_idx)) // -> Option<Value>
            .collect()
    }

    /// All rows in insertion order.
    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        (0..self.row_count).filter_map(|idx| self.get_row(idx))
    }

    pub fn get_col(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.name == name)
    }

    /// Replaces whole rows, given as `(row index, new row)` pairs.
    ///
    /// Types and primary-key uniqueness are checked against the state the
    /// table would have after the whole batch; on error nothing is written.
    pub fn update_rows(&mut self, changes: Vec<(usize, Row)>) -> Result<usize> {
        for (row_idx, row) in &changes {
            if *row_idx >= self.row_count {
                return Err(Error::semantic(format!(
                    "row {row_idx} does not exist in table {}",
                    self.name
                )));
            }
            self.check_row(row)?;
        }

        let new_keys = match self.schema.primary_key_index() {
            Some(pk) => Some(self.keys_after_update(pk, &changes)?),
            None => None,
        };

        for (row_idx, row) in &changes {
            for (column, value) in self.columns.iter_mut().zip(row) {
                column.set(*row_idx, value)?;
            }
        }
        if let Some(keys) = new_keys {
            self.primary_keys = keys;
        }
        Ok(changes.len())
    }

    /// Computes the primary-key set after applying `changes`, failing on a
    /// collision.
    fn keys_after_update(&self, pk: usize, changes: &[(usize, Row)]) -> Result<HashSet<Value>> {
        let mut keys = self.primary_keys.clone();
        for (row_idx, _) in changes {
            if let Some(old) = self.columns[pk].get(*row_idx) {
                keys.remove(&old);
            }
        }
        for (_, row) in changes {
            let key = self.key_of(pk, row)?;
            if !keys.insert(key.clone()) {
                return Err(self.duplicate_key(key));
            }
        }
        Ok(keys)
    }

    /// Removes the rows whose bit is set in `matches`, returning how many were removed.
    pub fn delete_rows(&mut self, matches: &BitSlice) -> Result<usize> {
        if matches.len() != self.row_count {
            return Err(Error::semantic(format!(
                "delete mask covers {} rows but table {} has {}",
                matches.len(),
                self.name,
                self.row_count
            )));
        }
        let removed = matches.count_ones();
        if removed == 0 {
            return Ok(0);
        }

        if let Some(pk) = self.schema.primary_key_index() {
            for row_idx in matches.iter_ones() {
                if let Some(key) = self.columns[pk].get(row_idx) {
                    self.primary_keys.remove(&key);
                }
            }
        }

        let keep = !matches.to_bitvec();
        for column in &mut self.columns {
            column.retain_rows(&keep);
        }
        self.row_count -= removed;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn users_schema() -> Schema {
        Schema::new(vec![
            ColumnDef::new("id", DataType::Integer).primary_key(),
            ColumnDef::new("name", DataType::Text),
        ])
    }

    fn user(id: i64, name: &str) -> Row {
        vec![Value::Integer(id), Value::from(name)]
    }

    fn users() -> Table {
        let mut table = Table::new("users".into(), users_schema());
        table
            .insert_rows(vec![user(1, "a"), user(2, "b"), user(3, "c")])
            .unwrap();
        table
    }

    #[test]
    fn test_table_creation() {
        let table = Table::new("users".into(), users_schema());
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.row_count, 0);
    }

    #[test]
    fn test_schema_validation() {
        assert!(users_schema().validate().is_ok());

        let duplicate = Schema::new(vec![
            ColumnDef::new("id", DataType::Integer),
            ColumnDef::new("id", DataType::Text),
        ]);
        assert_eq!(duplicate.validate().unwrap_err().kind(), ErrorKind::Semantic);

        let two_keys = Schema::new(vec![
            ColumnDef::new("a", DataType::Integer).primary_key(),
            ColumnDef::new("b", DataType::Integer).primary_key(),
        ]);
        assert_eq!(two_keys.validate().unwrap_err().kind(), ErrorKind::Semantic);

        // Column names are case-sensitive.
        let cased = Schema::new(vec![
            ColumnDef::new("id", DataType::Integer),
            ColumnDef::new("ID", DataType::Integer),
        ]);
        assert!(cased.validate().is_ok());
    }

    #[test]
    fn test_table_insert_and_get() {
        let schema = Schema::new(vec![
            ColumnDef::new("id", DataType::Integer),
            ColumnDef::new("age", DataType::Integer),
        ]);
        let mut table = Table::new("test".into(), schema);

        table.insert(vec![Value::Integer(1), Value::Integer(30)]).unwrap();
        table.insert(vec![Value::Integer(2), Value::Null]).unwrap();

        assert_eq!(table.row_count, 2);
        assert_eq!(
            table.get_row(0).unwrap(),
            vec![Value::Integer(1), Value::Integer(30)]
        );
        assert_eq!(table.get_row(1).unwrap(), vec![Value::Integer(2), Value::Null]);
        assert_eq!(table.get_row(2), None);
    }

    #[test]
    fn test_column_count_mismatch() {
        let mut table = Table::new("test".into(), users_schema());

        let err = table.insert(vec![Value::Integer(1)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Semantic);
        assert!(table.insert(vec![]).is_err());
        assert_eq!(table.row_count, 0);
    }

    #[test]
    fn test_type_mismatch_error() {
        let mut table = Table::new("test".into(), users_schema());

        let err = table
            .insert(vec![Value::from("1"), Value::from("x")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn test_primary_key_rejects_duplicate_and_null() {
        let mut table = users();

        let err = table.insert(user(2, "dup")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);

        let err = table
            .insert(vec![Value::Null, Value::from("nobody")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);

        assert_eq!(table.row_count, 3);
        assert_eq!(table.get_row(1).unwrap(), user(2, "b"));
    }

    #[test]
    fn test_insert_batch_is_atomic() {
        let mut table = users();

        // The second tuple collides with the first one of the same batch.
        let err = table
            .insert_rows(vec![user(4, "d"), user(4, "e")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);

        // The third tuple has the wrong type.
        let err = table
            .insert_rows(vec![
                user(5, "e"),
                user(6, "f"),
                vec![Value::Integer(7), Value::Integer(7)],
            ])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);

        assert_eq!(table.row_count, 3);
        assert_eq!(table.insert_rows(vec![user(4, "d"), user(5, "e")]).unwrap(), 2);
        assert_eq!(table.row_count, 5);
    }

    #[test]
    fn test_rows_in_insertion_order() {
        let table = users();
        let rows: Vec<Row> = table.rows().collect();
        assert_eq!(rows, vec![user(1, "a"), user(2, "b"), user(3, "c")]);
    }

    #[test]
    fn test_update_shifting_keys() {
        let mut table = users();

        // 1,2,3 -> 2,3,4 only collides if checked row by row.
        let changes = vec![(0, user(2, "a")), (1, user(3, "b")), (2, user(4, "c"))];
        assert_eq!(table.update_rows(changes).unwrap(), 3);

        let rows: Vec<Row> = table.rows().collect();
        assert_eq!(rows, vec![user(2, "a"), user(3, "b"), user(4, "c")]);

        // Key 1 is free again.
        table.insert(user(1, "z")).unwrap();
    }

    #[test]
    fn test_update_collision_leaves_table_unchanged() {
        let mut table = users();

        let err = table
            .update_rows(vec![(0, user(10, "a")), (2, user(2, "c"))])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);

        let rows: Vec<Row> = table.rows().collect();
        assert_eq!(rows, vec![user(1, "a"), user(2, "b"), user(3, "c")]);
        // Key 10 was never committed.
        table.insert(user(10, "j")).unwrap();
    }

    #[test]
    fn test_update_type_error_leaves_table_unchanged() {
        let mut table = users();
        let err = table
            .update_rows(vec![
                (0, user(1, "x")),
                (1, vec![Value::Integer(2), Value::Boolean(true)]),
            ])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert_eq!(table.get_row(0).unwrap(), user(1, "a"));
    }

    #[test]
    fn test_delete_rows() {
        let mut table = users();

        assert_eq!(table.delete_rows(bits![1, 0, 1]).unwrap(), 2);
        assert_eq!(table.row_count, 1);
        assert_eq!(table.get_row(0).unwrap(), user(2, "b"));

        // Deleted keys may be reused.
        table.insert(user(1, "again")).unwrap();
        assert!(table.insert(user(2, "dup")).is_err());
    }

    #[test]
    fn test_delete_mask_width() {
        let mut table = users();
        assert!(table.delete_rows(bits![1]).is_err());
        assert_eq!(table.row_count, 3);
    }

    #[test]
    fn test_get_col() {
        let table = Table::new("users".into(), users_schema());

        assert!(table.get_col("id").is_some());
        assert!(table.get_col("name").is_some());
        assert!(table.get_col("age").is_none());
    }
}
