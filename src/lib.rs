//! LabelFlow - Label Governance & Drift Engine
//!
//! Pure evaluators for label pipelines, governance policies and drift,
//! plus the stores and HTTP surface that drive them.

pub mod audit;
pub mod config;
pub mod error;
pub mod governance;
pub mod inventory;
pub mod models;
pub mod pipeline;
pub mod policy;
pub mod routes;
pub mod snapshot;
pub mod state;
