#![allow(async_fn_in_trait)]

use std::io;

/// Rotational interface of a single motor axis.
///
/// Rotations are given in revolutions relative to the zero reference the
/// controller establishes when the motor is powered on.
pub trait MotorDriver {
    /// Commands a rotation of `revolutions` away from the zero reference,
    /// limited to `revolutions_per_second`. Returns once the controller has
    /// accepted the command, not when the motion is done.
    async fn move_by(&mut self, revolutions: f64, revolutions_per_second: f64) -> io::Result<()>;

    async fn rotation(&self) -> io::Result<f64>;

    /// Switches motor power and reports whether the controller confirms it.
    async fn set_power(&mut self, on: bool) -> io::Result<bool>;

    async fn is_home(&self) -> io::Result<bool>;

    async fn start_homing(&mut self, revolutions_per_second: f64) -> io::Result<()>;
}
