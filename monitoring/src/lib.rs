pub mod alerts;
pub mod report;

pub use alerts::{alert_message, AlertGenerator};
pub use report::{render_report, render_table, JsonLinesSink, ReportSink, TracingReportSink};
