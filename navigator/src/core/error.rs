//! Rejection taxonomy for instruction batches and replay faults.

use thiserror::Error;

use crate::core::types::{Coord, Heading};

/// Why a single instruction line was rejected.
///
/// Any of these aborts the whole batch; the route is rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("malformed instruction: {reason}")]
    MalformedInstruction { reason: String },

    #[error("negative coordinate {position}")]
    NegativeCoordinate { position: Coord },

    #[error("unknown landmark \"{name}\"")]
    UnknownLandmark { name: String },

    #[error("landmark \"{name}\" at {landmark} is off the {heading} line through {position}")]
    UnreachableLandmark {
        name: String,
        landmark: Coord,
        position: Coord,
        heading: Heading,
    },

    #[error("landmark \"{name}\" at {landmark} lies behind heading {heading} from {position}")]
    WrongDirection {
        name: String,
        landmark: Coord,
        position: Coord,
        heading: Heading,
    },

    #[error("`{instruction}` needs a heading; give a direction first")]
    MissingDirectionContext { instruction: &'static str },
}

impl CompileError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInstruction {
            reason: reason.into(),
        }
    }

    /// Stable kind name for reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedInstruction { .. } => "MalformedInstruction",
            Self::NegativeCoordinate { .. } => "NegativeCoordinate",
            Self::UnknownLandmark { .. } => "UnknownLandmark",
            Self::UnreachableLandmark { .. } => "UnreachableLandmark",
            Self::WrongDirection { .. } => "WrongDirection",
            Self::MissingDirectionContext { .. } => "MissingDirectionContext",
        }
    }
}

/// A rejected batch: the offending line and the reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {}: {} ({:?})", .line_no + 1, .error, .line)]
pub struct Rejection {
    /// 0-based position among the non-blank lines of the batch.
    pub line_no: usize,
    pub line: String,
    pub error: CompileError,
}

/// A stored step that cannot be replayed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("step {index}: {start} + {heading} * {distance} overflows the grid")]
    Overflow {
        index: u32,
        start: Coord,
        heading: Coord,
        distance: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_display_names_line_and_reason() {
        let rejection = Rejection {
            line_no: 2,
            line: "go 8 blocks".to_string(),
            error: CompileError::NegativeCoordinate {
                position: Coord::new(-8, 5),
            },
        };
        assert_eq!(
            rejection.to_string(),
            "line 3: negative coordinate (-8, 5) (\"go 8 blocks\")"
        );
        assert_eq!(rejection.error.kind(), "NegativeCoordinate");
    }
}
