pub mod command_executor;
pub mod config;
pub mod error;
pub mod kinematics;
pub mod logging;
pub mod positioner;

pub use error::PositionerError;
pub use positioner::Positioner;
