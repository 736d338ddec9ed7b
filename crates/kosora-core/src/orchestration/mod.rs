//! Correction orchestration.
//!
//! Turns one submission into one [`CorrectionReport`](crate::domain::CorrectionReport):
//! optional retrieval, concurrent dispatch to the selected agents, span
//! reconciliation and scoring.
//!
//! # Module layout
//!
//! - [`error`]: `EngineError`, `DispatchError`
//! - [`cancel`]: `CancellationHandle`, `CancelSignal`
//! - [`dispatch`]: `dispatch_agents`, `DispatchOutcome`, `AgentFailure`
//! - [`reconcile`]: `reconcile_findings`
//! - [`scoring`]: `overall_score`
//! - [`engine`]: `CorrectionEngine`

pub mod cancel;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod scoring;

pub use cancel::{cancellation, CancelSignal, CancellationHandle};
pub use dispatch::{dispatch_agents, AgentFailure, DispatchOutcome};
pub use engine::CorrectionEngine;
pub use error::{DispatchError, EngineError, EngineResult};
pub use reconcile::{noisy_or, reconcile_findings};
pub use scoring::{overall_score, SCORE_K};
