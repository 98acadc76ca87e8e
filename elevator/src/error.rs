use std::{io, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum PositionerError {
    #[error("Cannot connect to elevator: {0}")]
    Connection(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Position cannot be reached ({actual_deg:.2} deg is, {target_deg:.2} deg should)")]
    PositionNotReached { target_deg: f64, actual_deg: f64 },

    #[error("Home reference not found within {0:?}")]
    HomingTimeout(Duration),

    #[error("Motor driver error: {0}")]
    Driver(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, PositionerError>;
