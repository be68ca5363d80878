//! qsel execution quality evaluation.
//!
//! Scores finished executions by comparing their measurement histogram
//! against the calibration run of the same job: a noiseless simulator
//! execution of the identical circuit. The score is the histogram
//! intersection, in (0, 1], where 1 means the device reproduced the ideal
//! distribution exactly.
//!
//! Scoring is best effort. Calibration runs finish on their own schedule,
//! so the evaluator polls for them with a bounded budget; when the budget
//! runs out, or anything else goes wrong, the execution simply stays
//! unscored.

mod error;
mod histogram;
mod quality;

pub use error::{EvalError, EvalResult};
pub use histogram::histogram_intersection;
pub use quality::{EvaluatorConfig, QualityEvaluator};
