//! Cell values and record types for Excel export

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use std::fmt;

use crate::column::FieldPath;

/// Represents a single cell value in an Excel worksheet
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Empty cell
    Empty,
    /// String value
    String(String),
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Calendar date without a time component
    Date(NaiveDate),
    /// Date and time value
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Convert cell value to its display string
    pub fn as_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::String(s) => s.clone(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Date(d) => d.to_string(),
            CellValue::DateTime(dt) => dt.to_string(),
        }
    }

    /// Check if cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Try to convert to float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(f) => Some(*f),
            CellValue::Int(i) => Some(*i as f64),
            CellValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            CellValue::Int(i) => Some(*i != 0),
            CellValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<i32> for CellValue {
    fn from(i: i32) -> Self {
        CellValue::Int(i as i64)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::DateTime(dt)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => CellValue::Empty,
        }
    }
}

/// A field of a record: either a scalar cell value or a nested record
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Leaf value
    Value(CellValue),
    /// Nested record, addressed by the next field-path segment
    Nested(DataRecord),
}

/// A record that can be written as one row of an export.
///
/// Field extraction is resolved against a [`FieldPath`] parsed once per
/// column when the sheet is initialized. A record that cannot produce a
/// value for a path yields `None` and the cell is left blank.
pub trait Record {
    /// Extract the value addressed by `path`, or `None` if absent
    fn field(&self, path: &FieldPath) -> Option<CellValue>;

    /// Whether the row for this record should be written with zero height.
    ///
    /// Defaults to visible; record types opt in explicitly.
    fn is_hidden(&self) -> bool {
        false
    }
}

/// Conventional field name that marks a record's row as hidden
pub const HIDE_FIELD_NAME: &str = "hide";

/// A dynamic record backed by an ordered field map.
///
/// Supports nested fields addressed by dotted paths, and the conventional
/// boolean `"hide"` field for zero-height rows.
#[derive(Debug, Clone, Default)]
pub struct DataRecord {
    fields: IndexMap<String, FieldValue>,
}

impl DataRecord {
    /// Create an empty record
    pub fn new() -> Self {
        DataRecord {
            fields: IndexMap::new(),
        }
    }

    /// Set a scalar field, replacing any previous value
    pub fn set(mut self, name: &str, value: impl Into<CellValue>) -> Self {
        self.fields
            .insert(name.to_string(), FieldValue::Value(value.into()));
        self
    }

    /// Set a nested record field
    pub fn set_nested(mut self, name: &str, nested: DataRecord) -> Self {
        self.fields
            .insert(name.to_string(), FieldValue::Nested(nested));
        self
    }

    /// Insert a scalar field in place
    pub fn insert(&mut self, name: &str, value: impl Into<CellValue>) {
        self.fields
            .insert(name.to_string(), FieldValue::Value(value.into()));
    }

    /// Number of top-level fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn lookup(&self, segments: &[String]) -> Option<&FieldValue> {
        let (first, rest) = segments.split_first()?;
        let mut current = self.fields.get(first)?;
        for segment in rest {
            match current {
                FieldValue::Nested(record) => current = record.fields.get(segment)?,
                FieldValue::Value(_) => return None,
            }
        }
        Some(current)
    }
}

impl Record for DataRecord {
    fn field(&self, path: &FieldPath) -> Option<CellValue> {
        match self.lookup(path.segments())? {
            FieldValue::Value(v) => Some(v.clone()),
            // A nested record is not a cell value
            FieldValue::Nested(_) => None,
        }
    }

    fn is_hidden(&self) -> bool {
        match self.fields.get(HIDE_FIELD_NAME) {
            Some(FieldValue::Value(v)) => v.as_bool().unwrap_or(false),
            _ => false,
        }
    }
}

impl FromIterator<(String, FieldValue)> for DataRecord {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        DataRecord {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_conversions() {
        let val = CellValue::Int(42);
        assert_eq!(val.as_f64(), Some(42.0));

        let val = CellValue::String("true".to_string());
        assert_eq!(val.as_bool(), Some(true));

        let val: CellValue = Option::<i64>::None.into();
        assert!(val.is_empty());
    }

    #[test]
    fn test_nested_field_lookup() {
        let record = DataRecord::new()
            .set("name", "Alice")
            .set_nested("address", DataRecord::new().set("city", "Lisbon"));

        let path = FieldPath::parse("address.city");
        assert_eq!(
            record.field(&path),
            Some(CellValue::String("Lisbon".to_string()))
        );

        let missing = FieldPath::parse("address.zip");
        assert_eq!(record.field(&missing), None);

        let through_leaf = FieldPath::parse("name.first");
        assert_eq!(record.field(&through_leaf), None);
    }

    #[test]
    fn test_record_building_helpers() {
        let mut record = DataRecord::new();
        assert!(record.is_empty());

        record.insert("id", 7);
        record.insert("id", 8);
        assert_eq!(record.len(), 1);
        assert_eq!(
            record.field(&FieldPath::parse("id")),
            Some(CellValue::Int(8))
        );

        let collected: DataRecord = vec![
            ("name".to_string(), FieldValue::Value("Bob".into())),
            ("age".to_string(), FieldValue::Value(CellValue::Int(40))),
        ]
        .into_iter()
        .collect();
        assert!(!collected.is_empty());
        assert_eq!(collected.len(), 2);
        assert_eq!(
            collected.field(&FieldPath::parse("age")),
            Some(CellValue::Int(40))
        );
    }

    #[test]
    fn test_hide_field_convention() {
        let hidden = DataRecord::new().set("name", "x").set("hide", true);
        assert!(hidden.is_hidden());

        let visible = DataRecord::new().set("name", "x");
        assert!(!visible.is_hidden());

        // A non-boolean hide value keeps the row visible
        let odd = DataRecord::new().set("hide", 3.5);
        assert!(!odd.is_hidden());
    }
}
