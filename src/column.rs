use std::sync::Arc;

use bitvec::prelude::*;

use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::value::Value;

/// Physical storage for column data.
/// Each variant wraps a collection of a specific type to ensure contiguous memory
/// allocation (columnar storage).
#[derive(Debug, Clone)]
pub enum ColumnData {
    /// Vector of 64-bit integers.
    Integer(Vec<i64>),
    /// Vector of thread-safe atomic reference-counted strings.
    Text(Vec<Arc<str>>),
    /// Compact bit-vector for boolean values.
    Boolean(BitVec),
}

/// Represents a column within a table.
/// It combines metadata (name, type) with actual data and a nullability tracker.
#[derive(Debug, Clone)]
pub struct Column {
    /// The name of the column.
    pub name: String,
    /// The logical data type of the column.
    pub data_type: DataType,
    /// The actual values stored in the column.
    pub data: ColumnData,
    /// A bitmap where a `true` bit indicates that the value at that index is `NULL`.
    pub null_bitmap: BitVec,
}

impl Column {
    /// Creates a new, empty column with the specified name and data type.
    /// The underlying data storage is initialized according to the data type.
    pub fn new(name: String, data_type: DataType) -> Self {
        let data = match data_type {
            DataType::Integer => ColumnData::Integer(vec![]),
            DataType::Boolean => ColumnData::Boolean(bitvec!()),
            DataType::Text => ColumnData::Text(vec![]),
        };
        Self {
            name,
            data_type,
            data,
            null_bitmap: bitvec!(),
        }
    }

    /// Checks that `value` may be stored in this column.
    pub fn check(&self, value: &Value) -> Result<()> {
        match value.data_type() {
            None => Ok(()),
            Some(t) if t == self.data_type => Ok(()),
            Some(t) => Err(Error::type_error(format!(
                "column {} has type {} but value {} has type {}",
                self.name, self.data_type, value, t
            ))),
        }
    }

    /// Appends a new value to the end of the column.
    ///
    /// # Errors
    /// Returns an error if the value's type does not match the column's data type.
    ///
    /// # Behavior
    /// - If the value is `Null`, a default "dummy" value is pushed to the data vector
    ///   to maintain index alignment with the `null_bitmap`.
    /// - If the value is not `Null`, it is added to the data vector and the bitmap is updated.
    ///
    /// # Example
    /// ```
    /// # use minisql::column::Column;
    /// # use minisql::data_type::DataType;
    /// # use minisql::value::Value;
    /// let mut col = Column::new("age".into(), DataType::Integer);
    /// col.push(Value::Integer(30)).unwrap();
    /// col.push(Value::Null).unwrap();
    ///
    /// assert_eq!(col.len(), 2);
    /// assert!(col.get(1).unwrap().is_null());
    /// ```
    pub fn push(&mut self, value: Value) -> Result<()> {
        self.check(&value)?;

        let is_null = value.is_null();
        match (&mut self.data, value) {
            // Add default value to keep alignment between the data vector and the bitmap
            (ColumnData::Integer(v), Value::Null) => v.push(0),
            (ColumnData::Text(v), Value::Null) => v.push(Arc::from("")),
            (ColumnData::Boolean(v), Value::Null) => v.push(false),

            (ColumnData::Integer(col), Value::Integer(v)) => col.push(v),
            (ColumnData::Text(col), Value::Text(v)) => col.push(v),
            (ColumnData::Boolean(col), Value::Boolean(v)) => col.push(v),

            _ => {
                return Err(Error::type_error("internal error: type mismatch"));
            }
        }
        self.null_bitmap.push(is_null);

        Ok(())
    }

    /// Returns the number of rows currently stored in the column.
    pub fn len(&self) -> usize {
        self.null_bitmap.len()
    }

    /// Returns true if there is no row in the column, else false.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieves the value at the specified row index.
    ///
    /// Returns `Some(Value)` if the index is valid, or `None` if it is out of bounds.
    /// If the `null_bitmap` indicates a null at the index, `Some(Value::Null)` is returned.
    pub fn get(&self, row_idx: usize) -> Option<Value> {
        if row_idx >= self.len() {
            return None;
        }
        if self.null_bitmap[row_idx] {
            return Some(Value::Null);
        }
        match &self.data {
            ColumnData::Integer(col) => Some(Value::Integer(col[row_idx])),
            ColumnData::Text(col) => Some(Value::Text(col[row_idx].clone())),
            ColumnData::Boolean(col) => Some(Value::Boolean(col[row_idx])),
        }
    }

    /// Replace a value in the column by a new value.
    ///
    /// # Errors
    /// Returns an error if the row_idx is too high or if the value's type does not match the
    /// column's data type.
    ///
    /// # Behavior
    /// - If the new value is `Null`, the previous value is not changed but only the null_bitmap to
    ///   be faster.
    pub fn set(&mut self, row_idx: usize, value: &Value) -> Result<()> {
        if self.len() <= row_idx {
            return Err(Error::semantic(format!(
                "row {row_idx} is out of bounds for column {}",
                self.name
            )));
        }
        self.check(value)?;

        // NULL handling
        if value.is_null() {
            self.null_bitmap.set(row_idx, true);
            // no need to change the value as null_bitmap is the first value checked at get.
            return Ok(());
        }

        self.null_bitmap.set(row_idx, false);
        match (&mut self.data, value) {
            (ColumnData::Integer(col), Value::Integer(v)) => col[row_idx] = *v,
            (ColumnData::Text(col), Value::Text(v)) => col[row_idx] = Arc::clone(v),
            (ColumnData::Boolean(col), Value::Boolean(v)) => col.set(row_idx, *v),
            _ => {
                return Err(Error::type_error("internal error: type mismatch"));
            }
        }
        Ok(())
    }

    /// Keeps only the rows whose bit is set in `keep`, preserving their order.
    ///
    /// `keep` must have exactly one bit per row.
    pub fn retain_rows(&mut self, keep: &BitSlice) {
        debug_assert_eq!(keep.len(), self.len());

        match &mut self.data {
            ColumnData::Integer(col) => retain_by_mask(col, keep),
            ColumnData::Text(col) => retain_by_mask(col, keep),
            ColumnData::Boolean(col) => *col = filter_bits(col, keep),
        }
        self.null_bitmap = filter_bits(&self.null_bitmap, keep);
    }
}

fn retain_by_mask<T>(values: &mut Vec<T>, keep: &BitSlice) {
    let mut idx = 0;
    values.retain(|_| {
        let kept = keep[idx];
        idx += 1;
        kept
    });
}

fn filter_bits(bits: &BitSlice, keep: &BitSlice) -> BitVec {
    bits.iter()
        .by_vals()
        .zip(keep.iter().by_vals())
        .filter_map(|(bit, kept)| kept.then_some(bit))
        .collect()
}
