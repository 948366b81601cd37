#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/ballastlabs/ballast/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod universe;

// Re-export main types from sub-crates
pub use ballast_data as data;
pub use ballast_model as model;
pub use ballast_output as output;
pub use ballast_sim as sim;

pub use config::EngineConfig;
pub use engine::{
    EngineError, InitializeOutcome, OptimizationResult, PortfolioEngine, SimulationRequest,
    SimulationResult,
};
pub use universe::{Constituent, CuratedUniverse, Universe};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
