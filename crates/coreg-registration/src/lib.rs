pub mod error;
pub mod progress;
pub mod validation;
pub mod optimizer;
pub mod objective;
pub mod schedule;
pub mod registration;
pub mod coregistration;

pub use error::{RegistrationError, Result};
pub use progress::{
    CancellationToken, ConsoleProgressCallback, HistoryCallback, ProgressCallback, ProgressInfo, ProgressSink,
    ProgressTracker, SinkCallback,
};
pub use optimizer::{
    GlobalOptimizer, OptimizationResult, OptimizerConfig, OptimizerState, ParameterKind, ParameterSpace,
    ParameterVector, SearchMethod, TerminationReason,
};
pub use objective::{EvaluationContext, Objective, MAX_EVALUATION};
pub use schedule::{FitSchedule, FitStage};
pub use registration::{
    find_guillotine_plane, find_sagittal_plane, find_transverse_plane, fit_points_to_volume, fit_volume_to_volume,
    FitOptions, FitOutcome,
};
pub use coregistration::CoregistrationTransform;
