use std::io;

use utilities::{command_executor::CommandSender, motor_driver::MotorDriver};

use super::commands::{MotorCommand, MotorResponse};
use crate::kinematics::{degrees_to_revolutions, revolutions_to_degrees};

fn unexpected(response: MotorResponse) -> io::Error {
    io::Error::new(
        io::ErrorKind::Other,
        format!("Unexpected response type: {:?}", response),
    )
}

#[derive(Clone)]
pub struct StepperCommandSender {
    sender: CommandSender<MotorCommand>,
}

impl StepperCommandSender {
    pub fn new(sender: CommandSender<MotorCommand>) -> Self {
        Self { sender }
    }

    async fn expect_ok(&self, command: MotorCommand) -> io::Result<()> {
        match self.sender.send_command(command).await? {
            MotorResponse::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn expect_flag(&self, command: MotorCommand) -> io::Result<bool> {
        match self.sender.send_command(command).await? {
            MotorResponse::Flag(flag) => Ok(flag),
            other => Err(unexpected(other)),
        }
    }

    pub async fn identify(&self) -> io::Result<String> {
        match self.sender.send_command(MotorCommand::Identify).await? {
            MotorResponse::Name(name) => Ok(name),
            other => Err(unexpected(other)),
        }
    }

    pub async fn reconnect(&self) -> io::Result<()> {
        self.expect_ok(MotorCommand::Reconnect).await
    }

    /// Motor angle in degrees.
    pub async fn position_degrees(&self) -> io::Result<f64> {
        match self.sender.send_command(MotorCommand::GetPosition).await? {
            MotorResponse::Position(degrees) => Ok(degrees),
            other => Err(unexpected(other)),
        }
    }
}

/// The controller works in degrees, the conversion happens here.
impl MotorDriver for StepperCommandSender {
    async fn move_by(&mut self, revolutions: f64, revolutions_per_second: f64) -> io::Result<()> {
        self.expect_ok(MotorCommand::MoveTo {
            degrees: revolutions_to_degrees(revolutions),
            degrees_per_second: revolutions_to_degrees(revolutions_per_second),
        })
        .await
    }

    async fn rotation(&self) -> io::Result<f64> {
        self.position_degrees().await.map(degrees_to_revolutions)
    }

    async fn set_power(&mut self, on: bool) -> io::Result<bool> {
        self.expect_ok(MotorCommand::SetPower(on)).await?;
        let powered = self.expect_flag(MotorCommand::GetPower).await?;
        Ok(powered == on)
    }

    async fn is_home(&self) -> io::Result<bool> {
        self.expect_flag(MotorCommand::GetHome).await
    }

    async fn start_homing(&mut self, revolutions_per_second: f64) -> io::Result<()> {
        self.expect_ok(MotorCommand::StartHoming {
            degrees_per_second: revolutions_to_degrees(revolutions_per_second),
        })
        .await
    }
}
