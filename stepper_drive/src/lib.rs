use std::{
    io::{self, ErrorKind, Read, Result, Write},
    time::Duration,
};

use command::Command;
use tracing::debug;

pub mod command;

/// Pause between setting the rate limit and the target, the controller
/// drops the second line otherwise.
const SETTLE_TIME: Duration = Duration::from_millis(10);
const QUERY_RETRIES: u8 = 5;

#[derive(Debug, Clone, Copy)]
pub struct StepperDrive {
    axis: u8,
}

impl StepperDrive {
    pub fn new(axis: u8) -> Self {
        StepperDrive { axis }
    }

    pub fn identify(&self, sender: &mut (impl Write + Read)) -> Result<String> {
        query(sender, Command::Identify)
    }

    pub fn set_power(&self, sender: &mut (impl Write + Read), on: bool) -> Result<()> {
        Command::SetPower {
            axis: self.axis,
            on,
        }
        .send(sender)
        .map(|_| ())
    }

    pub fn is_powered(&self, sender: &mut (impl Write + Read)) -> Result<bool> {
        let reply = query_non_empty(sender, Command::GetPower { axis: self.axis })?;
        Ok(reply.contains("ON"))
    }

    pub fn set_rate_limit(
        &self,
        sender: &mut (impl Write + Read),
        degrees_per_second: f64,
    ) -> Result<()> {
        Command::SetRateLimit {
            axis: self.axis,
            degrees_per_second,
        }
        .send(sender)
        .map(|_| ())
    }

    pub fn set_position(&self, sender: &mut (impl Write + Read), degrees: f64) -> Result<()> {
        Command::SetPosition {
            axis: self.axis,
            degrees,
        }
        .send(sender)
        .map(|_| ())
    }

    /// Motor angle in degrees.
    pub fn position(&self, sender: &mut (impl Write + Read)) -> Result<f64> {
        let reply = query_non_empty(sender, Command::GetPosition { axis: self.axis })?;
        parse_reply(&reply)
    }

    pub fn move_to(
        &self,
        sender: &mut (impl Write + Read),
        degrees: f64,
        degrees_per_second: f64,
    ) -> Result<()> {
        self.set_rate_limit(sender, degrees_per_second)?;
        std::thread::sleep(SETTLE_TIME);
        self.set_position(sender, degrees)
    }

    /// Searches the reference switch in negative direction.
    pub fn start_homing(&self, sender: &mut (impl Write + Read)) -> Result<()> {
        Command::Home {
            axis: self.axis,
            direction: -1,
        }
        .send(sender)
        .map(|_| ())
    }

    /// Limits the rate, then starts the reference search.
    pub fn home(&self, sender: &mut (impl Write + Read), degrees_per_second: f64) -> Result<()> {
        self.set_rate_limit(sender, degrees_per_second)?;
        std::thread::sleep(SETTLE_TIME);
        self.start_homing(sender)
    }

    pub fn is_home(&self, sender: &mut (impl Write + Read)) -> Result<bool> {
        let reply = query_non_empty(sender, Command::GetHome { axis: self.axis })?;
        let flag: i64 = reply.parse().map_err(|_| invalid_reply(&reply))?;
        Ok(flag != 0)
    }
}

fn query(sender: &mut (impl Write + Read), command: Command) -> Result<String> {
    command
        .send(sender)?
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, format!("{} is not a query", command)))
}

fn query_non_empty(sender: &mut (impl Write + Read), command: Command) -> Result<String> {
    for attempt in 1..=QUERY_RETRIES {
        let reply = query(sender, command)?;
        if !reply.is_empty() {
            return Ok(reply);
        }
        debug!("Empty reply to {} (attempt {})", command, attempt);
    }

    Err(io::Error::new(
        ErrorKind::TimedOut,
        format!("No reply to {} after {} attempts", command, QUERY_RETRIES),
    ))
}

fn parse_reply(reply: &str) -> Result<f64> {
    reply.parse().map_err(|_| invalid_reply(reply))
}

fn invalid_reply(reply: &str) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, format!("Unexpected reply: {:?}", reply))
}
