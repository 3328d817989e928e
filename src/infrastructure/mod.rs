pub mod csv_rows;
pub mod forest;
pub mod model_store;
pub mod observability;
pub mod telemetry;
pub mod yahoo;
