//! Governance Module
//!
//! The explicit coordinator on top of the pure engine:
//!
//! 1. **Batch**: chunked evaluation on blocking workers
//! 2. **Retry**: bounded backoff for transient commit failures
//! 3. **Service**: preview, commit, policy evaluation and drift, in caller order

pub mod batch;
pub mod retry;
pub mod service;

pub use batch::evaluate_chunked;
pub use retry::with_backoff;
pub use service::{
    CommitFailure, CommitReport, CycleReport, CycleRequest, DriftOverview, FailureKind,
    GovernanceService, LabelProposal,
};
