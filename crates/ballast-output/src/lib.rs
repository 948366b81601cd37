#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/ballastlabs/ballast/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod report;

pub use export::{
    AllocationExport, ExportError, ExportFormat, Exporter, Placeholder, QuoteExport,
    SimulationExport,
};
pub use report::{Report, ReportBuilder, ReportError};
