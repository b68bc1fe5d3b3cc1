#![forbid(unsafe_code)]

pub mod duedate;
pub mod uncertainty;

use metrology_contracts::ContractViolation;

/// The only error the engines raise. Always a caller defect; never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ContractViolation),
}

impl EngineError {
    pub fn violation(&self) -> &ContractViolation {
        match self {
            EngineError::InvalidInput(v) => v,
        }
    }
}
