//! Queries over a session's stored records.
//!
//! A `Query` is an immutable description (record type, filters, ordering);
//! every builder method returns a new query. Evaluation scans the stored
//! rows, so uncommitted edits are not visible to filters, and results are
//! served through the session's identity map.

use crate::session::Session;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use stagehand_core::pattern_match::{ilike, like};
use stagehand_core::schema::Table;
use stagehand_core::{Error, QueryHandle, Record, RecordQuery, Result, Row, Value};

/// Sort direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Clone, Debug)]
enum Filter {
    Like {
        column: usize,
        pattern: String,
        fold_case: bool,
    },
    Equals {
        column: usize,
        value: Value,
    },
}

impl Filter {
    fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::Like {
                column,
                pattern,
                fold_case,
            } => match row.get(*column) {
                None | Some(Value::Null) => false,
                Some(Value::String(s)) if *fold_case => ilike(s, pattern),
                Some(Value::String(s)) => like(s, pattern),
                Some(other) if *fold_case => ilike(&other.display_text(), pattern),
                Some(other) => like(&other.display_text(), pattern),
            },
            Filter::Equals { column, value } => row.get(*column) == Some(value),
        }
    }
}

/// A query over one record type.
#[derive(Clone)]
pub struct Query {
    session: Session,
    schema: Rc<Table>,
    filters: Vec<Filter>,
    order: Vec<(usize, Order)>,
}

impl Query {
    pub(crate) fn new(session: Session, schema: Rc<Table>) -> Self {
        Self {
            session,
            schema,
            filters: Vec::new(),
            order: Vec::new(),
        }
    }

    /// The queried record type.
    pub fn type_name(&self) -> &str {
        self.schema.name()
    }

    fn column(&self, attribute: &str) -> Result<usize> {
        self.schema
            .get_column_index(attribute)
            .ok_or_else(|| Error::unknown_attribute(self.schema.name(), attribute))
    }

    fn with_filter(&self, filter: Filter) -> Self {
        let mut next = self.clone();
        next.filters.push(filter);
        next
    }

    /// Keeps records whose `attribute` matches the LIKE `pattern`.
    pub fn filter_like(&self, attribute: &str, pattern: &str) -> Result<Query> {
        let column = self.column(attribute)?;
        Ok(self.with_filter(Filter::Like {
            column,
            pattern: pattern.into(),
            fold_case: false,
        }))
    }

    /// Case-insensitive [`filter_like`](Self::filter_like).
    pub fn filter_ilike(&self, attribute: &str, pattern: &str) -> Result<Query> {
        let column = self.column(attribute)?;
        Ok(self.with_filter(Filter::Like {
            column,
            pattern: pattern.into(),
            fold_case: true,
        }))
    }

    /// Keeps records whose `attribute` equals `value`.
    pub fn filter_eq(&self, attribute: &str, value: impl Into<Value>) -> Result<Query> {
        let column = self.column(attribute)?;
        Ok(self.with_filter(Filter::Equals {
            column,
            value: value.into(),
        }))
    }

    /// Adds a sort key. Earlier keys take precedence; ties keep row id order.
    pub fn order_by(&self, attribute: &str, order: Order) -> Result<Query> {
        let column = self.column(attribute)?;
        let mut next = self.clone();
        next.order.push((column, order));
        Ok(next)
    }

    fn compare(&self, a: &Row, b: &Row) -> Ordering {
        for &(column, order) in &self.order {
            let ord = a.get(column).cmp(&b.get(column));
            let ord = match order {
                Order::Asc => ord,
                Order::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    fn matching_rows(&self) -> Result<Vec<Rc<Row>>> {
        let mut rows: Vec<Rc<Row>> = self.session.with_store(self.schema.name(), |store| {
            store
                .scan()
                .filter(|row| self.filters.iter().all(|f| f.matches(row)))
                .collect()
        })?;
        if !self.order.is_empty() {
            rows.sort_by(|a, b| self.compare(a, b));
        }
        Ok(rows)
    }

    /// Every matching record.
    pub fn all(&self) -> Result<Vec<Record>> {
        let rows = self.matching_rows()?;
        Ok(rows
            .iter()
            .map(|row| self.session.materialize(&self.schema, row))
            .collect())
    }

    /// The first matching record, if any.
    pub fn first(&self) -> Result<Option<Record>> {
        Ok(self.slice(0, 1)?.into_iter().next())
    }
}

impl RecordQuery for Query {
    fn count(&self) -> Result<usize> {
        Ok(self.matching_rows()?.len())
    }

    fn slice(&self, start: usize, stop: usize) -> Result<Vec<Record>> {
        let rows = self.matching_rows()?;
        let stop = stop.min(rows.len());
        if start >= stop {
            return Ok(Vec::new());
        }
        tracing::trace!(table = self.type_name(), start, stop, "slice");
        Ok(rows[start..stop]
            .iter()
            .map(|row| self.session.materialize(&self.schema, row))
            .collect())
    }

    fn filter_like(&self, attribute: &str, pattern: &str) -> Result<QueryHandle> {
        Ok(Rc::new(Query::filter_like(self, attribute, pattern)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use stagehand_core::schema::TableBuilder;
    use stagehand_core::{DataType, UnitOfWork};

    fn seeded(n: usize) -> Session {
        let session = Session::new();
        session
            .create_table(
                TableBuilder::new("skater")
                    .unwrap()
                    .add_column("name", DataType::String)
                    .unwrap()
                    .add_column("rank", DataType::Int32)
                    .unwrap()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        for i in 0..n {
            let r = session.create("skater").unwrap();
            r.set("name", format!("Skater {:03}", i)).unwrap();
            r.set("rank", (i % 7) as i32).unwrap();
            session.add(&r).unwrap();
        }
        session.commit().unwrap();
        session
    }

    #[test]
    fn test_count_and_slice() {
        let session = seeded(10);
        let query = session.query("skater").unwrap();
        assert_eq!(query.count().unwrap(), 10);

        let page = query.slice(3, 6).unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].get("name").unwrap(), Value::from("Skater 003"));

        assert_eq!(query.slice(8, 50).unwrap().len(), 2);
        assert!(query.slice(12, 20).unwrap().is_empty());
    }

    #[test]
    fn test_slices_share_records() {
        let session = seeded(5);
        let query = session.query("skater").unwrap();
        let a = query.slice(0, 3).unwrap();
        let b = query.slice(2, 5).unwrap();
        assert_eq!(a[2], b[0]);
    }

    #[test]
    fn test_filter_like() {
        let session = seeded(30);
        let query = session.query("skater").unwrap();
        assert_eq!(query.filter_like("name", "%02_").unwrap().count().unwrap(), 10);
        assert_eq!(query.filter_like("name", "skater%").unwrap().count().unwrap(), 0);
        assert_eq!(query.filter_ilike("name", "skater%").unwrap().count().unwrap(), 30);
        assert!(query.filter_like("nickname", "%").is_err());

        let handle: QueryHandle = Rc::new(query);
        assert_eq!(handle.filter_like("name", "%1%").unwrap().count().unwrap(), 12);
    }

    #[test]
    fn test_order_by() {
        let session = seeded(14);
        let query = session
            .query("skater")
            .unwrap()
            .order_by("rank", Order::Desc)
            .unwrap()
            .order_by("name", Order::Asc)
            .unwrap();

        let first = query.first().unwrap().unwrap();
        assert_eq!(first.get("name").unwrap(), Value::from("Skater 006"));
        assert_eq!(first.get("rank").unwrap(), Value::Int32(6));
    }

    #[test]
    fn test_filter_eq() {
        let session = seeded(14);
        let query = session
            .query("skater")
            .unwrap()
            .filter_eq("rank", 3)
            .unwrap();
        let names: Vec<Value> = query
            .all()
            .unwrap()
            .iter()
            .map(|r| r.get("name").unwrap())
            .collect();
        assert_eq!(names, alloc::vec![Value::from("Skater 003"), Value::from("Skater 010")]);
    }
}
