#![forbid(unsafe_code)]

pub mod common;
pub mod compliance;
pub mod uncertainty;

pub use common::{ContractViolation, ReasonCodeId, SchemaVersion, Validate};
