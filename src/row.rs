//! Writing a single record as one worksheet row

use log::{debug, warn};
use rust_xlsxwriter::Worksheet;

use crate::codec::CellCodec;
use crate::column::ColumnMapping;
use crate::error::{ExportError, Result};
use crate::types::{CellValue, Record};

/// Write one record at `row`, one cell per column mapping.
///
/// Extraction failures degrade to blank cells that still carry the column's
/// data format. A cell the codec cannot write even as text wraps into
/// [`ExportError::RowWrite`] and propagates; the batch boundary upstream is
/// what isolates it.
///
/// Returns the extracted values in mapping order so the sheet writer can
/// track column widths and merge-group leaders without re-extracting.
pub fn write_record_row<R: Record>(
    sheet: &mut Worksheet,
    mappings: &[ColumnMapping],
    codec: &CellCodec,
    row: u32,
    record: &R,
) -> Result<Vec<Option<CellValue>>> {
    let values: Vec<_> = mappings.iter().map(|m| m.extract(record)).collect();

    for (mapping, value) in mappings.iter().zip(&values) {
        codec
            .set_value(sheet, row, mapping.index, value.clone(), &mapping.data_format)
            .map_err(|e| ExportError::RowWrite {
                row,
                message: format!("column '{}': {}", mapping.header, e),
            })?;
    }

    if record.is_hidden() {
        match sheet.set_row_hidden(row) {
            Ok(_) => debug!("row {} hidden by record's hide marker", row),
            // The row stays visible; hiding is cosmetic
            Err(e) => warn!("failed to hide row {}: {}", row, e),
        }
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{resolve_columns, ColumnSpec};
    use crate::style::StyleCache;
    use crate::types::DataRecord;

    fn mappings_for(specs: &[ColumnSpec]) -> Vec<ColumnMapping> {
        let mut styles = StyleCache::new();
        resolve_columns(specs, &mut styles)
    }

    #[test]
    fn test_missing_field_leaves_blank_cell_only() {
        let mappings = mappings_for(&[
            ColumnSpec::new("Name", "name"),
            ColumnSpec::new("Missing", "nope"),
            ColumnSpec::new("Age", "age"),
        ]);
        let codec = CellCodec::new();
        let mut sheet = Worksheet::new();

        let record = DataRecord::new().set("name", "Alice").set("age", 30);
        let values = write_record_row(&mut sheet, &mappings, &codec, 1, &record).unwrap();

        assert!(values[0].is_some());
        assert!(values[1].is_none());
        assert!(values[2].is_some());
    }

    #[test]
    fn test_unwritable_cell_propagates_row_error() {
        let mappings = mappings_for(&[ColumnSpec::new("Blob", "blob")]);
        let codec = CellCodec::new();
        let mut sheet = Worksheet::new();

        let record = DataRecord::new().set("blob", "x".repeat(40_000));
        let err = write_record_row(&mut sheet, &mappings, &codec, 1, &record).unwrap_err();
        assert!(matches!(err, ExportError::RowWrite { row: 1, .. }));
    }

    #[test]
    fn test_hidden_record_writes_without_error() {
        let mappings = mappings_for(&[ColumnSpec::new("Name", "name")]);
        let codec = CellCodec::new();
        let mut sheet = Worksheet::new();

        let record = DataRecord::new().set("name", "ghost").set("hide", true);
        write_record_row(&mut sheet, &mappings, &codec, 1, &record).unwrap();
    }
}
