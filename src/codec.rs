//! Conversion of extracted values into worksheet cells

use indexmap::IndexMap;
use log::warn;
use rust_xlsxwriter::{Format, Worksheet};

use crate::error::Result;
use crate::types::CellValue;

/// Discriminant used to key registered value mappers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// String values
    String,
    /// Integer values
    Int,
    /// Float values
    Float,
    /// Boolean values
    Bool,
    /// Calendar dates
    Date,
    /// Date-time values
    DateTime,
}

impl ValueKind {
    /// Kind of a non-empty cell value
    pub fn of(value: &CellValue) -> Option<ValueKind> {
        match value {
            CellValue::Empty => None,
            CellValue::String(_) => Some(ValueKind::String),
            CellValue::Int(_) => Some(ValueKind::Int),
            CellValue::Float(_) => Some(ValueKind::Float),
            CellValue::Bool(_) => Some(ValueKind::Bool),
            CellValue::Date(_) => Some(ValueKind::Date),
            CellValue::DateTime(_) => Some(ValueKind::DateTime),
        }
    }
}

type ValueMapper = Box<dyn Fn(CellValue) -> CellValue>;

/// Registry of type-keyed transforms applied before a value is written.
///
/// The default registry normalizes plain dates to midnight date-times so
/// every temporal cell carries the same representation.
pub struct ValueMapperRegistry {
    mappers: IndexMap<ValueKind, ValueMapper>,
}

impl ValueMapperRegistry {
    /// Registry with the default date normalization
    pub fn new() -> Self {
        let mut registry = ValueMapperRegistry {
            mappers: IndexMap::new(),
        };
        registry.register(ValueKind::Date, |value| match value {
            CellValue::Date(d) => match d.and_hms_opt(0, 0, 0) {
                Some(dt) => CellValue::DateTime(dt),
                None => CellValue::Date(d),
            },
            other => other,
        });
        registry
    }

    /// Registry with no transforms
    pub fn empty() -> Self {
        ValueMapperRegistry {
            mappers: IndexMap::new(),
        }
    }

    /// Register a transform for one value kind, replacing any previous one
    pub fn register<F>(&mut self, kind: ValueKind, mapper: F)
    where
        F: Fn(CellValue) -> CellValue + 'static,
    {
        self.mappers.insert(kind, Box::new(mapper));
    }

    fn apply(&self, value: CellValue) -> CellValue {
        match ValueKind::of(&value).and_then(|kind| self.mappers.get(&kind)) {
            Some(mapper) => mapper(value),
            None => value,
        }
    }
}

impl Default for ValueMapperRegistry {
    fn default() -> Self {
        ValueMapperRegistry::new()
    }
}

/// Writes extracted values into cells, degrading gracefully on failure.
pub struct CellCodec {
    registry: ValueMapperRegistry,
}

impl CellCodec {
    /// Codec with the default mapper registry
    pub fn new() -> Self {
        CellCodec {
            registry: ValueMapperRegistry::new(),
        }
    }

    /// Codec with a caller-supplied registry
    pub fn with_registry(registry: ValueMapperRegistry) -> Self {
        CellCodec { registry }
    }

    /// Set one cell.
    ///
    /// `None` and [`CellValue::Empty`] produce a blank cell that still
    /// carries the column's data format. A failure while writing the typed
    /// value is retried once as the value's display string; only a failing
    /// retry escapes as an error.
    pub fn set_value(
        &self,
        sheet: &mut Worksheet,
        row: u32,
        col: u16,
        value: Option<CellValue>,
        format: &Format,
    ) -> Result<()> {
        let value = match value {
            None | Some(CellValue::Empty) => {
                sheet.write_blank(row, col, format)?;
                return Ok(());
            }
            Some(v) => self.registry.apply(v),
        };

        if let Err(e) = write_typed(sheet, row, col, &value, format) {
            warn!(
                "failed to write typed cell at row {} col {} ({}), retrying as text",
                row, col, e
            );
            sheet.write_string_with_format(row, col, &value.as_string(), format)?;
        }
        Ok(())
    }
}

impl Default for CellCodec {
    fn default() -> Self {
        CellCodec::new()
    }
}

fn write_typed(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    format: &Format,
) -> std::result::Result<(), rust_xlsxwriter::XlsxError> {
    match value {
        CellValue::Empty => {
            sheet.write_blank(row, col, format)?;
        }
        CellValue::String(s) => {
            sheet.write_string_with_format(row, col, s, format)?;
        }
        // Integers widen to double, matching the workbook's numeric model
        CellValue::Int(i) => {
            sheet.write_number_with_format(row, col, *i as f64, format)?;
        }
        CellValue::Float(f) => {
            sheet.write_number_with_format(row, col, *f, format)?;
        }
        CellValue::Bool(b) => {
            sheet.write_boolean_with_format(row, col, *b, format)?;
        }
        CellValue::Date(d) => {
            sheet.write_datetime_with_format(row, col, d, format)?;
        }
        CellValue::DateTime(dt) => {
            sheet.write_datetime_with_format(row, col, dt, format)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_default_registry_normalizes_dates() {
        let registry = ValueMapperRegistry::new();
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

        let mapped = registry.apply(CellValue::Date(date));
        assert_eq!(
            mapped,
            CellValue::DateTime(date.and_hms_opt(0, 0, 0).unwrap())
        );

        // Non-registered kinds pass through untouched
        let text = registry.apply(CellValue::from("plain"));
        assert_eq!(text, CellValue::String("plain".to_string()));
    }

    #[test]
    fn test_custom_mapper_overrides_default() {
        let mut registry = ValueMapperRegistry::new();
        registry.register(ValueKind::Bool, |v| match v {
            CellValue::Bool(b) => CellValue::String(if b { "Y" } else { "N" }.to_string()),
            other => other,
        });

        assert_eq!(
            registry.apply(CellValue::Bool(true)),
            CellValue::String("Y".to_string())
        );
    }

    #[test]
    fn test_blank_cells_keep_format() {
        let codec = CellCodec::new();
        let mut sheet = Worksheet::new();
        let format = Format::new();

        codec.set_value(&mut sheet, 1, 0, None, &format).unwrap();
        codec
            .set_value(&mut sheet, 1, 1, Some(CellValue::Empty), &format)
            .unwrap();
    }

    #[test]
    fn test_oversized_string_fails_even_as_text() {
        let codec = CellCodec::new();
        let mut sheet = Worksheet::new();
        let format = Format::new();

        // Excel caps cell text at 32767 characters; the string fallback
        // cannot save this value either.
        let huge = "x".repeat(40_000);
        let result = codec.set_value(&mut sheet, 1, 0, Some(CellValue::String(huge)), &format);
        assert!(result.is_err());
    }
}
