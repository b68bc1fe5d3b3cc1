#![forbid(unsafe_code)]

pub mod compliance;
pub mod uncertainty;

use serde::{Deserialize, Serialize};

use metrology_contracts::{ContractViolation, Validate};
use metrology_engines::duedate::DueDateConfig;
use metrology_engines::uncertainty::UncertaintyConfig;

pub const MAX_ALERTS_CEILING: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetrologyWiringConfig {
    pub due_date: DueDateConfig,
    pub uncertainty: UncertaintyConfig,
    /// Obligations without a due date are listed as alerts when set.
    pub alerts_include_unknown: bool,
    pub max_alerts: u32,
}

impl MetrologyWiringConfig {
    pub fn mvp_v1() -> Self {
        Self {
            due_date: DueDateConfig::mvp_v1(),
            uncertainty: UncertaintyConfig::mvp_v1(),
            alerts_include_unknown: false,
            max_alerts: 500,
        }
    }
}

impl Default for MetrologyWiringConfig {
    fn default() -> Self {
        Self::mvp_v1()
    }
}

impl Validate for MetrologyWiringConfig {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.due_date.validate()?;
        self.uncertainty.validate()?;
        if self.max_alerts == 0 || self.max_alerts > MAX_ALERTS_CEILING {
            return Err(ContractViolation::InvalidRange {
                field: "metrology_wiring_config.max_alerts",
                min: 1.0,
                max: f64::from(MAX_ALERTS_CEILING),
                got: f64::from(self.max_alerts),
            });
        }
        Ok(())
    }
}
