//! Table (record type) definition.

use super::column::Column;
use crate::error::{Error, Result};
use crate::types::DataType;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// A table definition: the type of the records stored in it.
#[derive(Clone, Debug)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    /// Column positions of the primary key.
    primary_key: Vec<usize>,
}

impl Table {
    /// Returns the table name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the columns.
    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Gets a column by name.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Gets a column index by name.
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Returns the primary key column positions (empty if none).
    #[inline]
    pub fn primary_key(&self) -> &[usize] {
        &self.primary_key
    }

    /// Returns the names of all public attributes, in column order.
    pub fn attribute_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_public())
            .map(|c| c.name())
            .collect()
    }

    /// Returns the columns that must not hold Null.
    pub fn not_nullable(&self) -> impl Iterator<Item = &Column> + '_ {
        self.columns.iter().filter(|c| !c.is_nullable())
    }

    /// Returns the single-column unique constraints.
    pub fn unique_columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.columns.iter().filter(|c| c.is_unique())
    }
}

/// Builder for creating table definitions.
pub struct TableBuilder {
    name: String,
    columns: Vec<Column>,
    pk_columns: Vec<String>,
    unique_columns: Vec<String>,
}

impl TableBuilder {
    /// Creates a new table builder.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::check_naming_rules(&name)?;
        Ok(Self {
            name,
            columns: Vec::new(),
            pk_columns: Vec::new(),
            unique_columns: Vec::new(),
        })
    }

    fn check_naming_rules(name: &str) -> Result<()> {
        let mut chars = name.chars();
        let first = match chars.next() {
            Some(c) => c,
            None => return Err(Error::invalid_schema("Name cannot be empty")),
        };
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(Error::invalid_schema(format!(
                "Name must start with letter or underscore: {}",
                name
            )));
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::invalid_schema(format!(
                "Name contains invalid characters: {}",
                name
            )));
        }
        Ok(())
    }

    /// Adds a column to the table.
    pub fn add_column(mut self, name: impl Into<String>, data_type: DataType) -> Result<Self> {
        let name = name.into();
        Self::check_naming_rules(&name)?;
        if self.columns.iter().any(|c| c.name() == name) {
            return Err(Error::invalid_schema(format!(
                "Column already exists: {}",
                name
            )));
        }
        self.columns.push(Column::new(name, data_type));
        Ok(self)
    }

    /// Adds a fully configured column.
    pub fn add(mut self, column: Column) -> Result<Self> {
        Self::check_naming_rules(column.name())?;
        if self.columns.iter().any(|c| c.name() == column.name()) {
            return Err(Error::invalid_schema(format!(
                "Column already exists: {}",
                column.name()
            )));
        }
        self.columns.push(column);
        Ok(self)
    }

    /// Marks columns as nullable.
    pub fn add_nullable(mut self, columns: &[&str]) -> Self {
        for name in columns {
            if let Some(col) = self.columns.iter_mut().find(|c| c.name() == *name) {
                *col = col.clone().nullable(true);
            }
        }
        self
    }

    /// Sets the primary key.
    pub fn add_primary_key(mut self, columns: &[&str]) -> Result<Self> {
        for name in columns {
            match self.columns.iter().find(|c| c.name() == *name) {
                None => {
                    return Err(Error::invalid_schema(format!(
                        "Column not found: {}",
                        name
                    )))
                }
                Some(c) if !c.data_type().is_indexable() => {
                    return Err(Error::invalid_schema(format!(
                        "Column is not indexable: {}",
                        name
                    )))
                }
                _ => {}
            }
        }
        self.pk_columns = columns.iter().map(|c| c.to_string()).collect();
        Ok(self)
    }

    /// Adds a single-column unique constraint.
    pub fn add_unique(mut self, column: &str) -> Result<Self> {
        match self.columns.iter().find(|c| c.name() == column) {
            None => Err(Error::invalid_schema(format!(
                "Column not found: {}",
                column
            ))),
            Some(c) if !c.data_type().is_indexable() => Err(Error::invalid_schema(format!(
                "Column is not indexable: {}",
                column
            ))),
            Some(_) => {
                self.unique_columns.push(column.to_string());
                Ok(self)
            }
        }
    }

    /// Builds the table definition.
    pub fn build(self) -> Result<Table> {
        let unique = &self.unique_columns;
        let columns: Vec<Column> = self
            .columns
            .into_iter()
            .enumerate()
            .map(|(i, c)| {
                let is_unique = c.is_unique() || unique.iter().any(|u| u == c.name());
                c.unique(is_unique).with_index(i)
            })
            .collect();

        let primary_key = self
            .pk_columns
            .iter()
            .filter_map(|name| columns.iter().position(|c| c.name() == name))
            .collect();

        Ok(Table {
            name: self.name,
            columns,
            primary_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_builder() {
        let table = TableBuilder::new("users")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("name", DataType::String)
            .unwrap()
            .add_column("email", DataType::String)
            .unwrap()
            .add_primary_key(&["id"])
            .unwrap()
            .add_unique("email")
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(table.name(), "users");
        assert_eq!(table.columns().len(), 3);
        assert_eq!(table.primary_key(), &[0]);
        assert!(table.get_column("email").unwrap().is_unique());
        assert_eq!(table.get_column_index("name"), Some(1));
    }

    #[test]
    fn test_attribute_names_skip_private_columns() {
        let table = TableBuilder::new("skater")
            .unwrap()
            .add_column("first_name", DataType::String)
            .unwrap()
            .add_column("_revision", DataType::Int64)
            .unwrap()
            .add_column("last_name", DataType::String)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(table.attribute_names(), ["first_name", "last_name"]);
    }

    #[test]
    fn test_invalid_column_name() {
        let result = TableBuilder::new("test")
            .unwrap()
            .add_column("123invalid", DataType::Int32);

        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_column() {
        let result = TableBuilder::new("test")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("id", DataType::Int64);

        assert!(result.is_err());
    }

    #[test]
    fn test_primary_key_requires_known_column() {
        let result = TableBuilder::new("test")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_primary_key(&["missing"]);

        assert!(result.is_err());
    }
}
