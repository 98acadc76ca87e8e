//! Conversions between belt travel and rotation of the gear that drives it.

use std::f64::consts::PI;

/// A requested platform move in linear units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveCommand {
    /// Absolute platform position in meters.
    pub target_position: f64,
    /// Meters per second.
    pub speed: f64,
}

/// A [`MoveCommand`] expressed in motor units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationCommand {
    /// Rotation away from the zero reference.
    pub revolutions: f64,
    pub revolutions_per_second: f64,
}

impl RotationCommand {
    pub fn degrees(&self) -> f64 {
        revolutions_to_degrees(self.revolutions)
    }

    pub fn degrees_per_second(&self) -> f64 {
        revolutions_to_degrees(self.revolutions_per_second)
    }
}

/// Belt travel per revolution.
pub fn circumference(diameter: f64) -> f64 {
    PI * diameter
}

pub fn length_to_revolutions(length: f64, diameter: f64) -> f64 {
    length / circumference(diameter)
}

pub fn revolutions_to_length(revolutions: f64, diameter: f64) -> f64 {
    revolutions * circumference(diameter)
}

pub fn revolutions_to_degrees(revolutions: f64) -> f64 {
    360.0 * revolutions
}

pub fn degrees_to_revolutions(degrees: f64) -> f64 {
    degrees / 360.0
}

/// `tar_start_pos` is the platform position that maps to zero rotation.
pub fn to_rotation(command: MoveCommand, diameter: f64, tar_start_pos: f64) -> RotationCommand {
    RotationCommand {
        revolutions: length_to_revolutions(command.target_position - tar_start_pos, diameter),
        revolutions_per_second: length_to_revolutions(command.speed, diameter),
    }
}
