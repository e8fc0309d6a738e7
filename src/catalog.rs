use std::collections::HashMap;

use bitvec::prelude::*;

use crate::error::{Error, Result};
use crate::table::{Row, Schema, Table};
use crate::value::Value;

/// The store owning every table of an engine instance.
///
/// A catalog is an explicit object rather than a global, so any number of
/// independent engines can live in one process.
#[derive(Default)]
pub struct Catalog {
    /// A map of table names to their respective [Table] structures.
    tables: HashMap<String, Table>,
}

impl Catalog {
    /// Creates a new, empty catalog.
    pub fn new() -> Self {
        Self {
            tables: HashMap::default(),
        }
    }

    /// Creates a new table in the catalog.
    ///
    /// # Errors
    /// Returns an error if a table with the same name already exists or if the
    /// schema is invalid.
    pub fn create_table(&mut self, name: String, schema: Schema) -> Result<()> {
        if self.tables.contains_key(&name) {
            return Err(Error::semantic(format!("table {name} already exists")));
        }
        schema.validate()?;
        let table = Table::new(name.clone(), schema);
        self.tables.insert(name, table);
        Ok(())
    }

    /// Removes a table from the catalog by its name.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        match self.tables.remove(name) {
            Some(_) => Ok(()),
            None => Err(Self::missing(name)),
        }
    }

    fn missing(name: &str) -> Error {
        Error::semantic(format!("table {name} does not exist"))
    }

    /// Retrieves a reference to a table by name.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Retrieves a mutable reference to a table by name.
    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Like [Catalog::get_table], failing with a semantic error for unknown tables.
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.get_table(name).ok_or_else(|| Self::missing(name))
    }

    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables.get_mut(name).ok_or_else(|| Self::missing(name))
    }

    /// Returns the names of all tables, sorted.
    pub fn list_tables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Appends rows to a table; the whole batch is inserted or none of it.
    pub fn insert(&mut self, name: &str, rows: Vec<Row>) -> Result<usize> {
        self.table_mut(name)?.insert_rows(rows)
    }

    /// Every row of a table, in insertion order.
    pub fn scan(&self, name: &str) -> Result<Vec<Row>> {
        Ok(self.table(name)?.rows().collect())
    }

    /// Rewrites every row for which `predicate` holds with the row returned
    /// by `assign`, which sees the row's values before the update.
    ///
    /// Either every matching row is rewritten or, on the first error, none is.
    pub fn update<P, A>(&mut self, name: &str, mut predicate: P, mut assign: A) -> Result<usize>
    where
        P: FnMut(&[Value]) -> Result<bool>,
        A: FnMut(&[Value]) -> Result<Row>,
    {
        let table = self.table_mut(name)?;

        let mut changes = Vec::new();
        for (row_idx, row) in table.rows().enumerate() {
            if predicate(&row)? {
                changes.push((row_idx, assign(&row)?));
            }
        }
        if changes.is_empty() {
            return Ok(0);
        }
        table.update_rows(changes)
    }

    /// Removes every row for which `predicate` holds and returns how many were removed.
    pub fn delete<P>(&mut self, name: &str, mut predicate: P) -> Result<usize>
    where
        P: FnMut(&[Value]) -> Result<bool>,
    {
        let table = self.table_mut(name)?;

        let mut matches = BitVec::<usize, Lsb0>::with_capacity(table.row_count);
        for row in table.rows() {
            matches.push(predicate(&row)?);
        }
        table.delete_rows(&matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;
    use crate::error::ErrorKind;
    use crate::table::ColumnDef;

    fn simple_schema() -> Schema {
        Schema::new(vec![
            ColumnDef::new("id", DataType::Integer).primary_key(),
            ColumnDef::new("name", DataType::Text),
        ])
    }

    fn populated() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.create_table("users".into(), simple_schema()).unwrap();
        catalog
            .insert(
                "users",
                (1..=4)
                    .map(|i| vec![Value::Integer(i), Value::from(format!("u{i}").as_str())])
                    .collect(),
            )
            .unwrap();
        catalog
    }

    fn ids(catalog: &Catalog) -> Vec<i64> {
        catalog
            .scan("users")
            .unwrap()
            .iter()
            .filter_map(|row| row[0].as_integer())
            .collect()
    }

    #[test]
    fn test_create_and_drop_table() {
        let mut catalog = Catalog::new();

        assert!(catalog.create_table("users".into(), simple_schema()).is_ok());
        assert!(catalog.get_table("users").is_some());

        assert!(catalog.drop_table("users").is_ok());
        assert!(catalog.get_table("users").is_none());
    }

    #[test]
    fn test_duplicate_table_error() {
        let mut catalog = Catalog::new();

        catalog.create_table("users".into(), simple_schema()).unwrap();
        let err = catalog
            .create_table("users".into(), simple_schema())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Semantic);
    }

    #[test]
    fn test_table_names_are_case_sensitive() {
        let mut catalog = Catalog::new();
        catalog.create_table("users".into(), simple_schema()).unwrap();
        catalog.create_table("Users".into(), simple_schema()).unwrap();
        assert!(catalog.table("USERS").is_err());
        assert_eq!(catalog.list_tables(), vec!["Users", "users"]);
    }

    #[test]
    fn test_missing_table() {
        let mut catalog = Catalog::new();

        assert_eq!(catalog.drop_table("unknown").unwrap_err().kind(), ErrorKind::Semantic);
        assert!(catalog.scan("unknown").is_err());
        assert!(catalog.insert("unknown", vec![]).is_err());
        assert!(catalog.delete("unknown", |_| Ok(true)).is_err());
    }

    #[test]
    fn test_update_sees_pre_update_values() {
        let mut catalog = populated();

        let updated = catalog
            .update(
                "users",
                |row| Ok(row[0].as_integer().is_some_and(|id| id % 2 == 0)),
                |row| {
                    let mut new_row = row.to_vec();
                    new_row[0] = Value::Integer(row[0].as_integer().unwrap_or(0) * 10);
                    Ok(new_row)
                },
            )
            .unwrap();

        assert_eq!(updated, 2);
        assert_eq!(ids(&catalog), vec![1, 20, 3, 40]);
    }

    #[test]
    fn test_update_error_in_assignment_is_atomic() {
        let mut catalog = populated();

        let err = catalog
            .update(
                "users",
                |_| Ok(true),
                |row| {
                    if row[0] == Value::Integer(3) {
                        Err(Error::type_error("boom"))
                    } else {
                        Ok(vec![Value::Integer(100), row[1].clone()])
                    }
                },
            )
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Type);
        assert_eq!(ids(&catalog), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_delete() {
        let mut catalog = populated();

        let removed = catalog
            .delete("users", |row| Ok(row[0].as_integer() > Some(2)))
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(ids(&catalog), vec![1, 2]);

        assert_eq!(catalog.delete("users", |_| Ok(false)).unwrap(), 0);
    }

    #[test]
    fn test_delete_predicate_error_removes_nothing() {
        let mut catalog = populated();

        let err = catalog
            .delete("users", |row| {
                if row[0] == Value::Integer(2) {
                    Err(Error::type_error("bad row"))
                } else {
                    Ok(true)
                }
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert_eq!(ids(&catalog), vec![1, 2, 3, 4]);
    }
}
