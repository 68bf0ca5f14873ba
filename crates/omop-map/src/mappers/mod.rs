//! Built-in instrument mappers.

mod als_history;
mod vital_signs;

pub use als_history::AlsHistoryCondition;
pub use vital_signs::VitalSignsMeasurement;

use crate::mapper::InstrumentMapper;

/// Every built-in mapper, in run order.
pub fn registry() -> Vec<Box<dyn InstrumentMapper>> {
    vec![
        Box::new(AlsHistoryCondition),
        Box::new(VitalSignsMeasurement::new()),
    ]
}
