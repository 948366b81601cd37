#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/ballastlabs/ballast/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod allocate;
pub mod error;
pub mod linalg;
pub mod posterior;
pub mod prior;
pub mod returns;
pub mod views;

pub use allocate::{AllocatorConfig, TangencyAllocator};
pub use error::ModelError;
pub use posterior::{BlackLittermanBlender, BlackLittermanConfig, Degradation, Posterior};
pub use prior::{equal_weights, equilibrium_returns};
pub use returns::{ReturnsConfig, ReturnsEstimate, ReturnsEstimator};
pub use views::{View, ViewSet};

/// Trading days per year used for annualization throughout the engine.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
