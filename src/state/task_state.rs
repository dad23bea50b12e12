/// Task state definitions for tracking capture progress
///
/// This module defines the status written to the checkpoint log and the
/// in-memory phase a task moves through while it is being attempted.
use std::fmt;

/// Represents the reported status of a capture task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Not yet finalized (never admitted, or interrupted mid-attempt)
    Pending,

    /// Screenshot captured
    Success,

    /// Every attempt failed
    Failed,
}

impl TaskStatus {
    /// Returns true if this status is written to the checkpoint log
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Success => "Success",
            Self::Failed => "Failed",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(Self::Pending),
            "Success" => Some(Self::Success),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Phase of a task inside the executor
///
/// `Pending -> Attempting(1) -> Attempting(n+1) ... -> Success | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    Pending,
    /// Currently on the given attempt, starting at 1
    Attempting(u32),
    Success,
    Failed,
}

impl TaskPhase {
    /// Moves to the next attempt
    ///
    /// Returns None from a terminal phase.
    pub fn next_attempt(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Attempting(1)),
            Self::Attempting(n) => Some(Self::Attempting(n + 1)),
            Self::Success | Self::Failed => None,
        }
    }

    /// Finalizes an in-progress attempt
    ///
    /// Only an attempting task can finish; any other phase is returned as is.
    pub fn finish(self, succeeded: bool) -> Self {
        match self {
            Self::Attempting(_) if succeeded => Self::Success,
            Self::Attempting(_) => Self::Failed,
            other => other,
        }
    }

    /// Number of attempts started so far
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Attempting(n) => *n,
            _ => 0,
        }
    }

    /// Status reported for this phase
    pub fn status(&self) -> TaskStatus {
        match self {
            Self::Success => TaskStatus::Success,
            Self::Failed => TaskStatus::Failed,
            Self::Pending | Self::Attempting(_) => TaskStatus::Pending,
        }
    }
}
