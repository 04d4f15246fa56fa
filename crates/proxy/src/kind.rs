//! Proxy types: one per (record type, mode), reflected from the schema.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use hashbrown::HashMap;
use stagehand_core::schema::Table;
use stagehand_core::DataType;

/// How a proxy treats writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mode {
    /// Writes go straight through to the record.
    Transparent,
    /// Writes are buffered until flushed.
    Staged,
}

impl Mode {
    fn prefix(self) -> &'static str {
        match self {
            Mode::Transparent => "TransparentWrapped",
            Mode::Staged => "StagedWrapped",
        }
    }
}

/// One reflected attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    column: usize,
    data_type: DataType,
}

impl FieldDescriptor {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of the attribute in the record's column order.
    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

/// The shared description of every proxy of one record type and mode.
#[derive(Debug)]
pub struct ProxyType {
    name: String,
    source_type: String,
    mode: Mode,
    fields: Vec<FieldDescriptor>,
    by_name: HashMap<String, usize>,
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl ProxyType {
    /// Builds the descriptor table from the schema's public columns.
    pub fn reflect(schema: &Table, mode: Mode) -> Self {
        let fields: Vec<FieldDescriptor> = schema
            .columns()
            .iter()
            .filter(|c| c.is_public())
            .map(|c| FieldDescriptor {
                name: c.name().to_string(),
                column: c.index(),
                data_type: c.data_type(),
            })
            .collect();
        let by_name = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();

        Self {
            name: alloc::format!("{}{}", mode.prefix(), capitalize(schema.name())),
            source_type: schema.name().to_string(),
            mode,
            fields,
            by_name,
        }
    }

    /// The proxy type name, e.g. `StagedWrappedSkater`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wrapped record type name.
    #[inline]
    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Reflected attribute names in column order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|f| f.name())
    }
}
