//! Sheet lifecycle: initialization, row streaming, structural finishing

use indexmap::IndexMap;
use log::{debug, warn};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::codec::CellCodec;
use crate::column::{resolve_columns, ColumnMapping, ColumnSpec};
use crate::error::{ExportError, Result};
use crate::export::ExportConfig;
use crate::row::write_record_row;
use crate::style::StyleCache;
use crate::types::{CellValue, Record};

/// Narrowest column width applied during auto-sizing (Excel's default)
const MIN_COLUMN_WIDTH: f64 = 8.43;
/// Widest column width applied during auto-sizing
const MAX_COLUMN_WIDTH: f64 = 64.0;
/// Extra characters added so auto-sized content does not touch the border
const WIDTH_PADDING: f64 = 1.0;

/// Owns the workbook and the single target sheet of an export.
///
/// Headers, styles and column mappings are built once at construction; rows
/// stream through [`write_row`](SheetWriter::write_row); structural
/// finishing (column sizing, vertical merges) and serialization happen
/// exactly once in [`finish`](SheetWriter::finish), which consumes the
/// writer. Dropping the writer on any path releases the workbook.
pub struct SheetWriter {
    workbook: Workbook,
    sheet: Option<Worksheet>,
    mappings: Vec<ColumnMapping>,
    codec: CellCodec,
    row_span_quantity: u32,
    // Next data row; row 0 is the header
    cursor: u32,
    // Widest rendered content seen per column, in characters
    col_widths: Vec<f64>,
    // First value of each row-span group, per flagged column
    span_leaders: IndexMap<u16, Vec<Option<CellValue>>>,
}

impl SheetWriter {
    /// Create the sheet, write the header row, and apply freeze panes
    pub fn new(config: &ExportConfig, specs: &[ColumnSpec]) -> Result<Self> {
        SheetWriter::with_codec(config, specs, CellCodec::new())
    }

    /// Like [`new`](SheetWriter::new) with a caller-supplied codec, for
    /// exports that register their own value mappers
    pub fn with_codec(
        config: &ExportConfig,
        specs: &[ColumnSpec],
        codec: CellCodec,
    ) -> Result<Self> {
        let workbook = Workbook::new();
        let mut sheet = Worksheet::new();
        sheet.set_name(config.sheet_name())?;

        let mut styles = StyleCache::new();
        let mappings = resolve_columns(specs, &mut styles);

        for mapping in &mappings {
            sheet.write_string_with_format(
                0,
                mapping.index,
                &mapping.header,
                &mapping.header_format,
            )?;
        }
        sheet.set_freeze_panes(config.freeze_rows(), config.freeze_columns())?;

        let col_widths = mappings
            .iter()
            .map(|m| m.header.chars().count() as f64)
            .collect();

        debug!(
            "sheet '{}' initialized with {} columns",
            config.sheet_name(),
            mappings.len()
        );

        Ok(SheetWriter {
            workbook,
            sheet: Some(sheet),
            mappings,
            codec,
            row_span_quantity: config.row_span_quantity(),
            cursor: 1,
            col_widths,
            span_leaders: IndexMap::new(),
        })
    }

    /// Write one record at the current cursor.
    ///
    /// The cursor only advances when the row was fully written, so the k-th
    /// successfully written record always lands on row k.
    pub fn write_row<R: Record>(&mut self, record: &R) -> Result<()> {
        let sheet = self.sheet.as_mut().ok_or(ExportError::AlreadyFinished)?;
        let row = self.cursor;

        let values = write_record_row(sheet, &self.mappings, &self.codec, row, record)?;

        for (mapping, value) in self.mappings.iter().zip(&values) {
            if let Some(value) = value {
                let width = value.as_string().chars().count() as f64;
                let slot = &mut self.col_widths[mapping.index as usize];
                if width > *slot {
                    *slot = width;
                }
            }
        }

        if self.row_span_quantity > 1 && (row - 1) % self.row_span_quantity == 0 {
            for (mapping, value) in self.mappings.iter().zip(&values) {
                if mapping.row_span {
                    self.span_leaders
                        .entry(mapping.index)
                        .or_default()
                        .push(value.clone());
                }
            }
        }

        self.cursor += 1;
        Ok(())
    }

    /// Number of data rows written so far
    pub fn rows_written(&self) -> u64 {
        (self.cursor - 1) as u64
    }

    /// Column headers in sheet order
    pub fn headers(&self) -> Vec<&str> {
        self.mappings.iter().map(|m| m.header.as_str()).collect()
    }

    /// Apply deferred structural formatting and serialize the workbook.
    ///
    /// Column sizing and cell merging are best-effort: a column or group
    /// that fails is logged and skipped without blocking the rest. Only a
    /// serialization failure escapes; the workbook is released either way
    /// when the consumed writer drops.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let mut sheet = self.sheet.take().ok_or(ExportError::AlreadyFinished)?;

        self.auto_size_columns(&mut sheet);
        self.merge_row_span_groups(&mut sheet);

        self.workbook.push_worksheet(sheet);
        self.workbook
            .save_to_buffer()
            .map_err(|e| ExportError::Serialization(e.to_string()))
    }

    fn auto_size_columns(&self, sheet: &mut Worksheet) {
        for mapping in &self.mappings {
            let width = (self.col_widths[mapping.index as usize] + WIDTH_PADDING)
                .clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH);
            if let Err(e) = sheet.set_column_width(mapping.index, width) {
                warn!(
                    "failed to auto-size column {} ('{}'): {}",
                    mapping.index, mapping.header, e
                );
            }
        }
    }

    /// Merge consecutive groups of `row_span_quantity` data rows for every
    /// flagged column, rewriting each group's leading value into the merged
    /// range. Groups never overlap; a trailing group shorter than the
    /// quantity is merged as far as the last row; single-row groups are
    /// skipped.
    fn merge_row_span_groups(&self, sheet: &mut Worksheet) {
        let quantity = self.row_span_quantity;
        if quantity <= 1 || self.cursor <= 1 {
            return;
        }
        let last_row = self.cursor - 1;
        debug!("merging row-span groups of {} up to row {}", quantity, last_row);

        for mapping in self.mappings.iter().filter(|m| m.row_span) {
            let leaders = self.span_leaders.get(&mapping.index);
            let mut row = 1u32;
            let mut group = 0usize;

            while row <= last_row {
                // Saturating: a quantity larger than the row count merges
                // everything into one trailing group
                let end = row.saturating_add(quantity - 1).min(last_row);
                if row < end {
                    let leader = leaders.and_then(|l| l.get(group)).cloned().flatten();
                    if let Err(e) = self.merge_group(sheet, mapping, row, end, leader) {
                        warn!(
                            "failed to merge rows {}-{} in column {}: {}",
                            row, end, mapping.index, e
                        );
                    }
                }
                row = row.saturating_add(quantity);
                group += 1;
            }
        }
    }

    fn merge_group(
        &self,
        sheet: &mut Worksheet,
        mapping: &ColumnMapping,
        first_row: u32,
        last_row: u32,
        leader: Option<CellValue>,
    ) -> Result<()> {
        // merge_range blanks the whole range; the leading value is then
        // rewritten over the top cell through the codec
        sheet.merge_range(
            first_row,
            mapping.index,
            last_row,
            mapping.index,
            "",
            &mapping.data_format,
        )?;
        self.codec
            .set_value(sheet, first_row, mapping.index, leader, &mapping.data_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataRecord;

    fn specs() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("Group", "group").with_row_span(true),
            ColumnSpec::new("Name", "name"),
        ]
    }

    fn record(group: &str, name: &str) -> DataRecord {
        DataRecord::new().set("group", group).set("name", name)
    }

    #[test]
    fn test_empty_export_serializes_header_only() {
        let config = ExportConfig::default();
        let writer = SheetWriter::new(&config, &specs()).unwrap();

        assert_eq!(writer.rows_written(), 0);
        assert_eq!(writer.headers(), vec!["Group", "Name"]);

        let bytes = writer.finish().unwrap();
        // xlsx is a ZIP container
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_cursor_assigns_consecutive_rows() {
        let config = ExportConfig::default();
        let mut writer = SheetWriter::new(&config, &specs()).unwrap();

        for i in 0..5 {
            writer.write_row(&record("g", &format!("n{}", i))).unwrap();
            assert_eq!(writer.rows_written(), i + 1);
        }
    }

    #[test]
    fn test_span_leaders_follow_group_boundaries() {
        let config = ExportConfig::default().with_row_span(3);
        let mut writer = SheetWriter::new(&config, &specs()).unwrap();

        for i in 0..7 {
            writer.write_row(&record(&format!("g{}", i / 3), "n")).unwrap();
        }

        // Rows 1..=7 in groups of 3 start at rows 1, 4 and 7
        let leaders = writer.span_leaders.get(&0).unwrap();
        assert_eq!(leaders.len(), 3);
        assert_eq!(
            leaders[1],
            Some(CellValue::String("g1".to_string()))
        );
    }

    #[test]
    fn test_finish_consumes_writer_after_merges() {
        let config = ExportConfig::default().with_row_span(2);
        let mut writer = SheetWriter::new(&config, &specs()).unwrap();

        for i in 0..5 {
            writer.write_row(&record(&format!("g{}", i / 2), "n")).unwrap();
        }

        let bytes = writer.finish().unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_row_span_larger_than_row_count_merges_one_group() {
        let config = ExportConfig::default().with_row_span(u32::MAX);
        let mut writer = SheetWriter::new(&config, &specs()).unwrap();

        writer.write_row(&record("g0", "a")).unwrap();
        writer.write_row(&record("g0", "b")).unwrap();

        // All data rows fall into a single trailing group
        let bytes = writer.finish().unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_failed_row_does_not_advance_cursor() {
        let config = ExportConfig::default();
        let mut writer = SheetWriter::new(&config, &specs()).unwrap();

        writer.write_row(&record("g", "ok")).unwrap();
        let bad = DataRecord::new().set("group", "g").set("name", "x".repeat(40_000));
        assert!(writer.write_row(&bad).is_err());
        assert_eq!(writer.rows_written(), 1);

        writer.write_row(&record("g", "next")).unwrap();
        assert_eq!(writer.rows_written(), 2);
    }
}
