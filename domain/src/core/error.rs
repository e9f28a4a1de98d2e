//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("At least 2 members are required to form squads (got {0})")]
    InsufficientMembers(usize),

    #[error("Squad size must be at least 1")]
    InvalidGroupSize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_members_display() {
        let error = DomainError::InsufficientMembers(1);
        assert_eq!(
            error.to_string(),
            "At least 2 members are required to form squads (got 1)"
        );
    }
}
