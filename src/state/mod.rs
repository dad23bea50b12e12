//! State module for tracking capture progress
//!
//! # Components
//!
//! - `TaskStatus`: The finalized status recorded for a capture task
//! - `TaskPhase`: The per-task state machine driven by the capture executor

mod task_state;

pub use task_state::{TaskPhase, TaskStatus};
