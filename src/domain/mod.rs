pub mod errors;
pub mod metrics;
pub mod ports;
pub mod scaler;
pub mod types;
pub mod windowing;
