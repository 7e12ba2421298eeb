//! Derivative-free global optimization over bounded transform parameters.
//!
//! # Examples
//!
//! ```rust,ignore
//! use coreg_registration::optimizer::{GlobalOptimizer, OptimizerConfig, ParameterSpace, SearchMethod};
//!
//! let mut optimizer = GlobalOptimizer::new(space, OptimizerConfig::default())?;
//! let result = optimizer.get_solution(&objective, SearchMethod::BoxScan, how, 1e-3, 1e-2, "fit", None)?;
//! ```

mod annealing;
mod box_scan;
pub mod config;
mod cross_hair;
pub mod global;
mod nelder_mead;
pub mod parameter;
pub mod result;
mod search;

pub use config::{OptimizerConfig, SearchMethod};
pub use global::GlobalOptimizer;
pub use parameter::{ParameterDef, ParameterKind, ParameterSpace, ParameterVector};
pub use result::{OptimizationResult, OptimizerState, TerminationReason};
