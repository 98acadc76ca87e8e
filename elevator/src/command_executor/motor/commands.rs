use std::io;

use utilities::command_executor::Command;

use crate::command_executor::motor::StepperHandler;

#[derive(Debug, Clone)]
pub enum MotorCommand {
    Identify,
    SetPower(bool),
    GetPower,
    MoveTo {
        degrees: f64,
        degrees_per_second: f64,
    },
    GetPosition,
    StartHoming {
        degrees_per_second: f64,
    },
    GetHome,
    Reconnect,
}

#[derive(Debug)]
pub enum MotorResponse {
    Ok,
    Name(String),
    Flag(bool),
    Position(f64),
}

impl Command for MotorCommand {
    type Response = MotorResponse;
    type Handler = StepperHandler;

    fn execute(self, handler: &mut Self::Handler) -> io::Result<Self::Response> {
        match self {
            MotorCommand::Identify => Ok(MotorResponse::Name(handler.identify()?)),
            MotorCommand::SetPower(on) => {
                handler.set_power(on)?;
                Ok(MotorResponse::Ok)
            }
            MotorCommand::GetPower => Ok(MotorResponse::Flag(handler.is_powered()?)),
            MotorCommand::MoveTo {
                degrees,
                degrees_per_second,
            } => {
                handler.move_to(degrees, degrees_per_second)?;
                Ok(MotorResponse::Ok)
            }
            MotorCommand::GetPosition => Ok(MotorResponse::Position(handler.position()?)),
            MotorCommand::StartHoming { degrees_per_second } => {
                handler.start_homing(degrees_per_second)?;
                Ok(MotorResponse::Ok)
            }
            MotorCommand::GetHome => Ok(MotorResponse::Flag(handler.is_home()?)),
            MotorCommand::Reconnect => {
                handler.reconnect()?;
                Ok(MotorResponse::Ok)
            }
        }
    }
}
