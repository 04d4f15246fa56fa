//! Constraint checking for stored rows.
//!
//! Covers the constraints a record type can declare: column types,
//! not-null, primary key and single-column unique constraints. Key
//! uniqueness needs the store's indices and is checked by `RowStore`.

use alloc::string::ToString;
use stagehand_core::schema::Table;
use stagehand_core::{Error, Result, Row};

/// Constraint checker for validating rows against their schema.
pub struct ConstraintChecker;

impl ConstraintChecker {
    /// Checks the not-null constraint for a row.
    pub fn check_not_null(schema: &Table, row: &Row) -> Result<()> {
        for column in schema.not_nullable() {
            if let Some(value) = row.get(column.index()) {
                if value.is_null() {
                    return Err(Error::null_constraint(column.name()));
                }
            }
        }
        Ok(())
    }

    /// Checks the not-null constraint for multiple rows.
    pub fn check_not_null_rows(schema: &Table, rows: &[Row]) -> Result<()> {
        for row in rows {
            Self::check_not_null(schema, row)?;
        }
        Ok(())
    }

    /// Checks that the row has one value per column, each of the column type.
    pub fn check_types(schema: &Table, row: &Row) -> Result<()> {
        if row.len() != schema.columns().len() {
            return Err(Error::invalid_operation(alloc::format!(
                "Row has {} values, {} expects {}",
                row.len(),
                schema.name(),
                schema.columns().len()
            )));
        }
        for (column, value) in schema.columns().iter().zip(row.values()) {
            if !column.accepts(value) {
                if let Some(got) = value.data_type() {
                    return Err(Error::type_mismatch(column.data_type(), got));
                }
            }
        }
        Ok(())
    }

    /// Runs every row-local check.
    pub fn check_row(schema: &Table, row: &Row) -> Result<()> {
        Self::check_types(schema, row)?;
        Self::check_not_null(schema, row)
    }

    /// Label used when a primary key collides.
    pub fn primary_key_label(schema: &Table) -> alloc::string::String {
        let names: alloc::vec::Vec<&str> = schema
            .primary_key()
            .iter()
            .filter_map(|&i| schema.columns().get(i).map(|c| c.name()))
            .collect();
        if names.is_empty() {
            "primary_key".to_string()
        } else {
            names.join(",")
        }
    }
}
