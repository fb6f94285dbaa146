//! Pin lifecycle management.

pub mod decay;

pub use decay::{current_day, DecayClock, DecayReport, DecayState, ROLLOVER_LEAD_MINUTES};
