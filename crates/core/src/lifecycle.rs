//! Record lifecycle vocabulary: status, delete and restore modes.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Publication status shared by most record families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Status {
    #[default]
    Active,
    Inactive,
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Status::Active => write!(f, "Active"),
            Status::Inactive => write!(f, "Inactive"),
        }
    }
}

/// The `type` field of a Delete request.
///
/// | code | meaning                       |
/// |------|-------------------------------|
/// | 1    | soft delete the record        |
/// | 2    | soft delete + owned children  |
/// | 3    | hard delete the record        |
/// | 4    | hard delete + owned children  |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    Soft,
    SoftCascade,
    Hard,
    HardCascade,
}

impl DeleteMode {
    pub fn code(self) -> i64 {
        match self {
            DeleteMode::Soft => 1,
            DeleteMode::SoftCascade => 2,
            DeleteMode::Hard => 3,
            DeleteMode::HardCascade => 4,
        }
    }

    pub fn is_soft(self) -> bool {
        matches!(self, DeleteMode::Soft | DeleteMode::SoftCascade)
    }

    pub fn is_hard(self) -> bool {
        !self.is_soft()
    }

    pub fn cascades(self) -> bool {
        matches!(self, DeleteMode::SoftCascade | DeleteMode::HardCascade)
    }
}

impl TryFrom<i64> for DeleteMode {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DeleteMode::Soft),
            2 => Ok(DeleteMode::SoftCascade),
            3 => Ok(DeleteMode::Hard),
            4 => Ok(DeleteMode::HardCascade),
            other => Err(DomainError::validation(
                "type",
                format!("unsupported delete type {other}; expected 1, 2, 3 or 4"),
            )),
        }
    }
}

/// The `type` field of an UnDelete request: restore the record, or the record
/// together with its owned children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreMode {
    Single,
    Cascade,
}

impl TryFrom<i64> for RestoreMode {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RestoreMode::Single),
            2 => Ok(RestoreMode::Cascade),
            other => Err(DomainError::validation(
                "type",
                format!("unsupported undelete type {other}; expected 1 or 2"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_codes_round_to_modes() {
        for code in 1..=4 {
            let mode = DeleteMode::try_from(code).unwrap();
            assert_eq!(mode.code(), code);
        }
        assert!(DeleteMode::try_from(1).unwrap().is_soft());
        assert!(DeleteMode::try_from(2).unwrap().cascades());
        assert!(DeleteMode::try_from(3).unwrap().is_hard());
        assert!(!DeleteMode::try_from(3).unwrap().cascades());
    }

    #[test]
    fn out_of_range_types_are_validation_errors() {
        assert!(matches!(DeleteMode::try_from(0), Err(DomainError::Validation(_))));
        assert!(matches!(DeleteMode::try_from(5), Err(DomainError::Validation(_))));
        assert!(matches!(RestoreMode::try_from(3), Err(DomainError::Validation(_))));
    }
}
