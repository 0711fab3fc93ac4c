use thiserror::Error;

/// Errors surfaced by the aggregation, ranking and scanning functions.
///
/// Empty inputs and unparsable timestamps are not errors; only parameters
/// that would make the output meaningless are rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid parameter {name}={value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: i64,
        reason: &'static str,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;

pub(crate) fn require_non_negative(name: &'static str, value: i64) -> EngineResult<usize> {
    usize::try_from(value).map_err(|_| EngineError::InvalidParameter {
        name,
        value,
        reason: "must not be negative",
    })
}

pub(crate) fn require_positive(name: &'static str, value: i64) -> EngineResult<usize> {
    if value <= 0 {
        return Err(EngineError::InvalidParameter {
            name,
            value,
            reason: "must be greater than zero",
        });
    }
    require_non_negative(name, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_values_are_rejected() {
        let err = require_non_negative("k", -1).unwrap_err();
        assert_eq!(err.to_string(), "invalid parameter k=-1: must not be negative");
        assert_eq!(require_non_negative("k", 0), Ok(0));
    }

    #[test]
    fn zero_is_not_positive() {
        assert!(require_positive("window_days", 0).is_err());
        assert_eq!(require_positive("threshold", 4), Ok(4));
    }
}
