#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/ballastlabs/ballast/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod metrics;
pub mod paths;

pub use error::SimError;
pub use metrics::{
    MetricsConfig, PortfolioStats, RiskCategory, TerminalDistribution, compute_stats,
    max_drawdown, terminal_distribution,
};
pub use paths::{GbmParams, PathSimulator, SimulatedPaths, SimulationConfig};
