pub mod controller;
pub mod loop_worker;
pub mod parser;

pub use controller::SensingController;
pub use parser::{parse, parse_at};
