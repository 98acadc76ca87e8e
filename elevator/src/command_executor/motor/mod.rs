use std::io;

use commands::MotorCommand;
use stepper_drive::StepperDrive;
use utilities::{command_executor::DeviceHandler, device_link::DeviceLink};

pub mod command_sender;
pub mod commands;

pub struct StepperHandler {
    link: Box<dyn DeviceLink>,
    drive: StepperDrive,
}

impl DeviceHandler for StepperHandler {
    type Command = MotorCommand;
}

impl StepperHandler {
    pub fn new(drive: StepperDrive, link: Box<dyn DeviceLink>) -> Self {
        Self { link, drive }
    }

    pub fn identify(&mut self) -> io::Result<String> {
        self.drive.identify(&mut self.link)
    }

    pub fn set_power(&mut self, on: bool) -> io::Result<()> {
        self.drive.set_power(&mut self.link, on)
    }

    pub fn is_powered(&mut self) -> io::Result<bool> {
        self.drive.is_powered(&mut self.link)
    }

    pub fn move_to(&mut self, degrees: f64, degrees_per_second: f64) -> io::Result<()> {
        self.drive
            .move_to(&mut self.link, degrees, degrees_per_second)
    }

    pub fn position(&mut self) -> io::Result<f64> {
        self.drive.position(&mut self.link)
    }

    pub fn start_homing(&mut self, degrees_per_second: f64) -> io::Result<()> {
        self.drive.home(&mut self.link, degrees_per_second)
    }

    pub fn is_home(&mut self) -> io::Result<bool> {
        self.drive.is_home(&mut self.link)
    }

    pub fn reconnect(&mut self) -> io::Result<()> {
        self.link.reconnect()
    }
}
