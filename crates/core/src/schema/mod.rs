//! Schema module: record types are described as tables of typed columns.

mod column;
mod table;

pub use column::Column;
pub use table::{Table, TableBuilder};
