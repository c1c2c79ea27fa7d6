//! Declarative column specifications and their resolved mappings

use log::debug;
use rust_xlsxwriter::Format;

use crate::style::StyleCache;
use crate::types::{CellValue, Record};

/// A parsed field-path expression, e.g. `"address.city"`.
///
/// Paths are parsed once per column when mappings are built, never per
/// record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted field-path expression
    pub fn parse(expr: &str) -> Self {
        let segments = expr
            .split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        FieldPath {
            raw: expr.to_string(),
            segments,
        }
    }

    /// The original path expression
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The path split into segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

/// Style attributes declared on a column specification.
///
/// Colors are `#RRGGBB` hex strings; `num_format` is an Excel number/date
/// format string such as `"#,##0.00"` or `"yyyy-mm-dd"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StyleAttrs {
    /// Header font color; defaults to blue when unset
    pub header_font_color: Option<String>,
    /// Header background fill color
    pub header_background_color: Option<String>,
    /// Data font color
    pub font_color: Option<String>,
    /// Bold data font
    pub font_bold: bool,
    /// Data background fill color
    pub background_color: Option<String>,
    /// Number or date format string
    pub num_format: Option<String>,
}

/// Declarative description of one export column
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnSpec {
    /// Display header written to row 0
    pub header: String,
    /// Field-path expression used to pull the value out of each record
    pub field: String,
    /// Style attributes for header and data cells
    #[cfg_attr(feature = "serde", serde(default))]
    pub style: StyleAttrs,
    /// Whether consecutive data rows in this column are merged vertically
    #[cfg_attr(feature = "serde", serde(default))]
    pub row_span: bool,
}

impl ColumnSpec {
    /// Create a column with default styling
    pub fn new(header: &str, field: &str) -> Self {
        ColumnSpec {
            header: header.to_string(),
            field: field.to_string(),
            style: StyleAttrs::default(),
            row_span: false,
        }
    }

    /// Set the style attributes
    pub fn with_style(mut self, style: StyleAttrs) -> Self {
        self.style = style;
        self
    }

    /// Flag the column for vertical row-span merging
    pub fn with_row_span(mut self, row_span: bool) -> Self {
        self.row_span = row_span;
        self
    }
}

/// A column specification resolved against the style cache.
///
/// One mapping per spec entry; `index` matches the entry's position in the
/// originally supplied list and is stable for the lifetime of the sheet.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    /// Zero-based sheet column index
    pub index: u16,
    /// Display header
    pub header: String,
    /// Parsed field path, bound once at mapping-build time
    pub field_path: FieldPath,
    /// Whether this column takes part in row-span merging
    pub row_span: bool,
    /// Cached data-cell format
    pub data_format: Format,
    /// Cached header-cell format
    pub header_format: Format,
}

impl ColumnMapping {
    /// Extract this column's value from a record.
    ///
    /// Extraction never fails past this boundary: an absent or unreadable
    /// field yields `None` and the cell is left blank.
    pub fn extract<R: Record>(&self, record: &R) -> Option<CellValue> {
        let value = record.field(&self.field_path);
        if value.is_none() {
            debug!(
                "no value for field '{}' - cell will be blank",
                self.field_path.raw()
            );
        }
        value
    }
}

/// Resolve an ordered list of column specifications into mappings.
///
/// Styles are memoized through the cache keyed by the declared attributes,
/// so columns sharing identical attributes share one format object.
pub fn resolve_columns(specs: &[ColumnSpec], styles: &mut StyleCache) -> Vec<ColumnMapping> {
    specs
        .iter()
        .enumerate()
        .map(|(i, spec)| ColumnMapping {
            index: i as u16,
            header: spec.header.clone(),
            field_path: FieldPath::parse(&spec.field),
            row_span: spec.row_span,
            data_format: styles.data_format(&spec.style, spec.row_span),
            header_format: styles.header_format(&spec.style),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_path_parsing() {
        let path = FieldPath::parse("address.city");
        assert_eq!(path.segments(), &["address", "city"]);
        assert_eq!(path.raw(), "address.city");

        let flat = FieldPath::parse("name");
        assert_eq!(flat.segments(), &["name"]);
    }

    #[test]
    fn test_resolve_preserves_order() {
        let specs = vec![
            ColumnSpec::new("Name", "name"),
            ColumnSpec::new("Age", "age"),
            ColumnSpec::new("City", "address.city").with_row_span(true),
        ];

        let mut styles = StyleCache::new();
        let mappings = resolve_columns(&specs, &mut styles);

        assert_eq!(mappings.len(), 3);
        for (i, mapping) in mappings.iter().enumerate() {
            assert_eq!(mapping.index, i as u16);
            assert_eq!(mapping.header, specs[i].header);
        }
        assert!(mappings[2].row_span);
    }

    #[test]
    fn test_identical_styles_share_cache_entries() {
        let style = StyleAttrs {
            font_bold: true,
            ..StyleAttrs::default()
        };
        let specs = vec![
            ColumnSpec::new("A", "a").with_style(style.clone()),
            ColumnSpec::new("B", "b").with_style(style),
        ];

        let mut styles = StyleCache::new();
        resolve_columns(&specs, &mut styles);

        // One header and one data entry despite two columns
        assert_eq!(styles.len(), 2);
    }
}
