//! Predicate builder for index selections.
//!
//! A [`Query`] is an immutable tree of comparison leaves joined by `AND`/`OR`.
//! [`Query::build`] serializes it into a parameterized selection clause and the
//! arguments for its placeholders, in left-to-right order. Column names are not
//! validated here; the index rejects unknown columns when the query runs.

use std::fmt;

/// Column names of the media index.
pub mod columns {
    pub const ID: &str = "_id";
    pub const DATA: &str = "_data";
    pub const BUCKET_ID: &str = "bucket_id";
    pub const BUCKET_DISPLAY_NAME: &str = "bucket_display_name";
    pub const IS_FAVORITE: &str = "is_favorite";
    pub const IS_TRASHED: &str = "is_trashed";
    pub const MEDIA_TYPE: &str = "media_type";
    pub const MIME_TYPE: &str = "mime_type";
    pub const DATE_ADDED: &str = "date_added";
    pub const DATE_MODIFIED: &str = "date_modified";
    pub const ORIENTATION: &str = "orientation";

    /// Columns read for every media record.
    pub const MEDIA_PROJECTION: &[&str] = &[
        ID,
        BUCKET_ID,
        IS_FAVORITE,
        IS_TRASHED,
        MEDIA_TYPE,
        MIME_TYPE,
        DATE_ADDED,
        DATE_MODIFIED,
        ORIENTATION,
    ];

    /// Media columns plus the folder display name, for album queries.
    pub const ALBUMS_PROJECTION: &[&str] = &[
        BUCKET_DISPLAY_NAME,
        ID,
        BUCKET_ID,
        IS_FAVORITE,
        IS_TRASHED,
        MEDIA_TYPE,
        MIME_TYPE,
        DATE_ADDED,
        DATE_MODIFIED,
        ORIENTATION,
    ];

    /// Newest first.
    pub const SORT_DATE_ADDED_DESC: &str = "date_added DESC";
}

/// A typed cell value, used both for selection arguments and result rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Text(s) => s.parse().ok(),
            Value::Null => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Comparison operator of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    fn as_sql(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Compare {
        column: &'static str,
        op: Op,
        value: Value,
    },
    And(Box<Query>, Box<Query>),
    Or(Box<Query>, Box<Query>),
}

impl Query {
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Self::compare(column, Op::Eq, value)
    }

    pub fn compare(column: &'static str, op: Op, value: impl Into<Value>) -> Self {
        Query::Compare {
            column,
            op,
            value: value.into(),
        }
    }

    pub fn and(self, other: Query) -> Self {
        Query::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Query) -> Self {
        Query::Or(Box::new(self), Box::new(other))
    }

    /// Serialize into a selection clause with one `?` per argument.
    pub fn build(&self) -> Selection {
        let mut clause = String::new();
        let mut args = Vec::new();
        self.write(&mut clause, &mut args);
        Selection { clause, args }
    }

    fn write(&self, clause: &mut String, args: &mut Vec<Value>) {
        match self {
            Query::Compare { column, op, value } => {
                clause.push_str(column);
                // `= NULL` is never true in SQL. Ordering against NULL still
                // matches nothing.
                match (op, value) {
                    (Op::Eq, Value::Null) => clause.push_str(" IS NULL"),
                    (Op::Ne, Value::Null) => clause.push_str(" IS NOT NULL"),
                    _ => {
                        clause.push(' ');
                        clause.push_str(op.as_sql());
                        clause.push_str(" ?");
                        args.push(value.clone());
                    }
                }
            }
            Query::And(lhs, rhs) => Self::write_binary(lhs, "AND", rhs, clause, args),
            Query::Or(lhs, rhs) => Self::write_binary(lhs, "OR", rhs, clause, args),
        }
    }

    fn write_binary(
        lhs: &Query,
        keyword: &str,
        rhs: &Query,
        clause: &mut String,
        args: &mut Vec<Value>,
    ) {
        clause.push('(');
        lhs.write(clause, args);
        clause.push_str(") ");
        clause.push_str(keyword);
        clause.push_str(" (");
        rhs.write(clause, args);
        clause.push(')');
    }
}

/// Serialized selection: clause text plus positional arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    pub clause: String,
    pub args: Vec<Value>,
}

impl Selection {
    pub fn placeholder_count(&self) -> usize {
        self.clause.matches('?').count()
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.clause, self.args)
    }
}
