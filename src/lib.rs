//! # excelport
//!
//! Streaming Excel export for large, paginated result sets with bounded
//! memory use.
//!
//! Records are pulled lazily from a single-pass source, accumulated into
//! fixed-size batches, and streamed into a single styled worksheet. After
//! each flushed batch the exporter reports progress to an optional
//! monitoring collaborator; a failing batch is recorded and skipped rather
//! than aborting the run. Structural formatting (column auto-sizing,
//! vertical row-span merges, freeze panes) is deferred to one finishing
//! pass, after which the workbook is serialized to bytes.
//!
//! ## Example
//!
//! ```no_run
//! use excelport::{ColumnSpec, DataRecord, ExcelExporter, ExportConfig,
//!     ExportRequest, MonitoringContext};
//!
//! let records = (0..5000).map(|i| {
//!     DataRecord::new()
//!         .set("id", i as i64)
//!         .set("name", format!("item {}", i))
//! });
//!
//! let request = ExportRequest {
//!     records,
//!     total_records: 5000,
//!     correlation_id: "corr-42".to_string(),
//!     monitoring_id: "mon-42".to_string(),
//!     context: MonitoringContext::new("org-1", "user-1"),
//!     columns: vec![
//!         ColumnSpec::new("Id", "id"),
//!         ColumnSpec::new("Name", "name"),
//!     ],
//! };
//!
//! let exporter = ExcelExporter::new(ExportConfig::default());
//! let outcome = exporter.export(request).unwrap();
//! assert!(outcome.is_complete());
//! let _bytes = outcome.bytes.unwrap();
//! ```

pub mod codec;
pub mod column;
pub mod error;
pub mod export;
pub mod progress;
pub mod row;
pub mod sheet;
pub mod style;
pub mod types;

pub use codec::{CellCodec, ValueKind, ValueMapperRegistry};
pub use column::{ColumnMapping, ColumnSpec, FieldPath, StyleAttrs};
pub use error::{ExportError, Result};
pub use export::{ExcelExporter, ExportConfig, ExportOutcome, ExportRequest, ExportStats};
pub use progress::{MonitoringContext, ProgressReporter};
pub use sheet::SheetWriter;
pub use style::StyleCache;
pub use types::{CellValue, DataRecord, FieldValue, Record};
