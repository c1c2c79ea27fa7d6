//! Batch export orchestration

use log::{debug, error, info};

use crate::column::ColumnSpec;
use crate::error::{ExportError, Result};
use crate::progress::{MonitoringContext, ProgressReporter};
use crate::sheet::SheetWriter;
use crate::types::Record;

const DEFAULT_BATCH_SIZE: usize = 1000;
const DEFAULT_SHEET_NAME: &str = "Data";
const DEFAULT_FREEZE_ROWS: u32 = 1;

/// Configuration knobs for one export
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExportConfig {
    batch_size: usize,
    sheet_name: String,
    freeze_columns: u16,
    freeze_rows: u32,
    row_span_quantity: u32,
    debug_enabled: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            freeze_columns: 0,
            freeze_rows: DEFAULT_FREEZE_ROWS,
            row_span_quantity: 1,
            debug_enabled: false,
        }
    }
}

impl ExportConfig {
    /// Configuration with all defaults
    pub fn new() -> Self {
        ExportConfig::default()
    }

    /// Records accumulated before a batch is flushed (minimum 1)
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Target sheet name; blank falls back to the default
    pub fn with_sheet_name(mut self, name: &str) -> Self {
        let trimmed = name.trim();
        self.sheet_name = if trimmed.is_empty() {
            DEFAULT_SHEET_NAME.to_string()
        } else {
            trimmed.to_string()
        };
        self
    }

    /// Number of columns and rows kept visible while scrolling
    pub fn with_freeze_pane(mut self, columns: u16, rows: u32) -> Self {
        self.freeze_columns = columns;
        self.freeze_rows = rows;
        self
    }

    /// Consecutive rows merged per group in row-span columns; 1 disables
    /// merging
    pub fn with_row_span(mut self, quantity: u32) -> Self {
        self.row_span_quantity = quantity.max(1);
        self
    }

    /// Enable chattier progress logging
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_enabled = enabled;
        self
    }

    /// Batch size in records
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Target sheet name
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Frozen column count
    pub fn freeze_columns(&self) -> u16 {
        self.freeze_columns
    }

    /// Frozen row count
    pub fn freeze_rows(&self) -> u32 {
        self.freeze_rows
    }

    /// Rows merged per row-span group
    pub fn row_span_quantity(&self) -> u32 {
        self.row_span_quantity
    }

    /// Whether verbose progress logging is on
    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled
    }
}

/// One export request: a single-pass record source plus identifiers.
///
/// `total_records` is only an estimate used to size progress reporting; the
/// real record count may differ and the batch estimate is never recomputed.
/// The source is consumed exactly once and dropped on every exit path.
pub struct ExportRequest<I> {
    /// Lazy record source, consumed once
    pub records: I,
    /// Expected record count (estimate, used for progress only)
    pub total_records: u64,
    /// Join key for the monitoring service
    pub correlation_id: String,
    /// Monitoring identifier
    pub monitoring_id: String,
    /// Opaque context forwarded to the monitoring collaborator
    pub context: MonitoringContext,
    /// Ordered column specification
    pub columns: Vec<ColumnSpec>,
}

/// Running totals for one export
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportStats {
    total_processed: u64,
}

impl ExportStats {
    /// Add successfully committed records
    pub fn add_processed(&mut self, count: u64) {
        self.total_processed += count;
    }

    /// Records committed to the sheet so far
    pub fn total_processed(&self) -> u64 {
        self.total_processed
    }
}

/// Typed result of an export run.
///
/// `bytes` is `Some` whenever a workbook could be serialized, including
/// runs where individual batches failed; `recovered_errors` lists those
/// failures in occurrence order. `fatal` marks runs where setup or
/// serialization failed and no output exists.
#[derive(Debug)]
pub struct ExportOutcome {
    /// Serialized workbook, absent on fatal failure
    pub bytes: Option<Vec<u8>>,
    /// Records committed to the sheet
    pub records_processed: u64,
    /// Batches flushed, including failed ones
    pub batches_written: u64,
    /// Batch and finishing failures survived during the run
    pub recovered_errors: Vec<String>,
    /// Whether the run ended without any output
    pub fatal: bool,
}

impl ExportOutcome {
    /// Output exists and nothing failed along the way
    pub fn is_complete(&self) -> bool {
        self.bytes.is_some() && self.recovered_errors.is_empty()
    }

    /// Output exists but some batches or finishing steps failed
    pub fn is_partial(&self) -> bool {
        self.bytes.is_some() && !self.recovered_errors.is_empty()
    }

    /// No output was produced
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }
}

/// Drives an export: drains the record source into fixed-size batches,
/// streams them to a [`SheetWriter`], reports progress after each flush,
/// and isolates batch failures so one bad batch never aborts the run.
pub struct ExcelExporter {
    config: ExportConfig,
    reporter: Option<Box<dyn ProgressReporter>>,
}

impl ExcelExporter {
    /// Exporter without a monitoring collaborator
    pub fn new(config: ExportConfig) -> Self {
        ExcelExporter {
            config,
            reporter: None,
        }
    }

    /// Attach a progress reporter
    pub fn with_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Run the export.
    ///
    /// Returns `Err` only for an invalid request, before any work starts.
    /// Every later failure degrades into the returned [`ExportOutcome`]:
    /// batch failures are recovered and listed, setup and serialization
    /// failures mark the outcome fatal with no bytes. Callers must inspect
    /// the outcome; partial output is not self-describing.
    pub fn export<I, R>(&self, request: ExportRequest<I>) -> Result<ExportOutcome>
    where
        I: IntoIterator<Item = R>,
        R: Record,
    {
        self.validate(&request)?;

        let batch_size = self.config.batch_size();
        let total_batches = estimate_total_batches(request.total_records, batch_size);

        info!(
            "starting export '{}': ~{} records in ~{} batches",
            request.correlation_id, request.total_records, total_batches
        );

        let mut sheet = match SheetWriter::new(&self.config, &request.columns) {
            Ok(sheet) => sheet,
            // Setup failed before any row; the record source drops with the
            // request on return
            Err(e) => {
                error!("export setup failed: {}", e);
                return Ok(ExportOutcome {
                    bytes: None,
                    records_processed: 0,
                    batches_written: 0,
                    recovered_errors: vec![format!("export setup failed: {}", e)],
                    fatal: true,
                });
            }
        };

        let mut stats = ExportStats::default();
        let mut errors: Vec<String> = Vec::new();
        let mut batches_flushed = 0u64;
        let mut batch: Vec<R> = Vec::with_capacity(batch_size);

        for record in request.records {
            batch.push(record);
            if batch.len() >= batch_size {
                batches_flushed += 1;
                self.flush_batch(&mut sheet, &mut batch, batches_flushed, &mut stats, &mut errors);
                self.report_progress(
                    &request.context,
                    &request.correlation_id,
                    &request.monitoring_id,
                    batches_flushed,
                    total_batches,
                );
            }
        }

        if !batch.is_empty() {
            batches_flushed += 1;
            self.flush_batch(&mut sheet, &mut batch, batches_flushed, &mut stats, &mut errors);
            self.report_progress(
                &request.context,
                &request.correlation_id,
                &request.monitoring_id,
                batches_flushed,
                total_batches,
            );
        }

        let (bytes, fatal) = match sheet.finish() {
            Ok(bytes) => (Some(bytes), false),
            Err(e) => {
                error!("failed to finalize export workbook: {}", e);
                errors.push(format!("failed to finalize workbook: {}", e));
                (None, true)
            }
        };

        info!(
            "export '{}' finished: {} records processed, {} batches, {} errors",
            request.correlation_id,
            stats.total_processed(),
            batches_flushed,
            errors.len()
        );

        Ok(ExportOutcome {
            bytes,
            records_processed: stats.total_processed(),
            batches_written: batches_flushed,
            recovered_errors: errors,
            fatal,
        })
    }

    fn validate<I>(&self, request: &ExportRequest<I>) -> Result<()> {
        if request.columns.is_empty() {
            return Err(ExportError::Validation(
                "at least one column must be specified".to_string(),
            ));
        }
        Ok(())
    }

    /// Write one batch, counting only the rows actually committed. A row
    /// failure abandons the rest of the batch and is recorded; the next
    /// batch proceeds normally.
    fn flush_batch<R: Record>(
        &self,
        sheet: &mut SheetWriter,
        batch: &mut Vec<R>,
        batch_number: u64,
        stats: &mut ExportStats,
        errors: &mut Vec<String>,
    ) {
        debug!("processing batch {} of {} records", batch_number, batch.len());

        let before = sheet.rows_written();
        let mut failure = None;

        for record in batch.drain(..) {
            if let Err(e) = sheet.write_row(&record) {
                failure = Some(e);
                break;
            }
        }

        stats.add_processed(sheet.rows_written() - before);

        if let Some(e) = failure {
            error!("failed to process batch {}: {}", batch_number, e);
            errors.push(format!("failed to process batch {}: {}", batch_number, e));
        }
    }

    /// Best-effort side channel: attempted only when every precondition
    /// holds, and never allowed to affect the export outcome.
    fn report_progress(
        &self,
        context: &MonitoringContext,
        correlation_id: &str,
        monitoring_id: &str,
        current_batch: u64,
        total_batches: u64,
    ) {
        let Some(reporter) = self.reporter.as_deref() else {
            return;
        };
        if total_batches == 0 || monitoring_id.is_empty() || correlation_id.is_empty() {
            return;
        }

        match reporter.update_progress(
            context,
            correlation_id,
            monitoring_id,
            current_batch,
            total_batches,
        ) {
            Ok(()) => {
                if self.config.debug_enabled() {
                    debug!(
                        "progress {}/{} reported for correlation id {}",
                        current_batch, total_batches, correlation_id
                    );
                }
            }
            Err(e) => error!(
                "failed to update export progress {}/{}: {}",
                current_batch, total_batches, e
            ),
        }
    }
}

/// `ceil(total_records / batch_size)`, computed once per export and never
/// corrected mid-stream
fn estimate_total_batches(total_records: u64, batch_size: usize) -> u64 {
    total_records.div_ceil(batch_size as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_total_batches() {
        assert_eq!(estimate_total_batches(0, 1000), 0);
        assert_eq!(estimate_total_batches(1, 1000), 1);
        assert_eq!(estimate_total_batches(1000, 1000), 1);
        assert_eq!(estimate_total_batches(2500, 1000), 3);
    }

    #[test]
    fn test_config_defaults_and_clamping() {
        let config = ExportConfig::default();
        assert_eq!(config.batch_size(), 1000);
        assert_eq!(config.sheet_name(), "Data");
        assert_eq!(config.freeze_rows(), 1);
        assert_eq!(config.freeze_columns(), 0);
        assert_eq!(config.row_span_quantity(), 1);

        let config = ExportConfig::new()
            .with_batch_size(0)
            .with_row_span(0)
            .with_sheet_name("   ");
        assert_eq!(config.batch_size(), 1);
        assert_eq!(config.row_span_quantity(), 1);
        assert_eq!(config.sheet_name(), "Data");
    }

    #[test]
    fn test_empty_columns_fail_validation() {
        let exporter = ExcelExporter::new(ExportConfig::default());
        let request: ExportRequest<Vec<crate::types::DataRecord>> = ExportRequest {
            records: Vec::new(),
            total_records: 0,
            correlation_id: "c-1".to_string(),
            monitoring_id: "m-1".to_string(),
            context: MonitoringContext::default(),
            columns: Vec::new(),
        };

        let err = exporter.export(request).unwrap_err();
        assert!(matches!(err, ExportError::Validation(_)));
    }
}
