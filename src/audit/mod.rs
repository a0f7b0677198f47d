//! Audit Module
//!
//! Label history: who changed which labels, when, and why.

pub mod recorder;

pub use recorder::HistoryArena;
