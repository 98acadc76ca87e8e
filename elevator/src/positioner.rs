use std::time::Duration;

use stepper_drive::StepperDrive;
use tracing::{debug, error, info, warn};
use utilities::{
    command_executor::CommandExecutor, device_link::DeviceLink, lazy_serial::LazySerialPort,
    motor_driver::MotorDriver,
};

use crate::{
    command_executor::motor::{StepperHandler, command_sender::StepperCommandSender},
    config::{MotionConfig, PositionerConfig, SerialConfig},
    error::{PositionerError, Result},
    kinematics::{self, MoveCommand, RotationCommand, revolutions_to_degrees},
};

/// Upper bound for a single wait between position polls.
const MAX_POLL_INTERVAL_S: f64 = 10.0;

/// Moves the elevator platform to absolute positions.
///
/// Positions and speeds are linear (meters, meters per second); the driver
/// only ever sees rotations of the belt gear.
pub struct Positioner<D: MotorDriver> {
    config: PositionerConfig,
    motion: MotionConfig,
    driver: D,
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PositionerError::InvalidArgument(format!(
            "{} must be positive, got {}",
            name, value
        )))
    }
}

impl<D: MotorDriver> Positioner<D> {
    pub fn new(config: PositionerConfig, motion: MotionConfig, driver: D) -> Result<Self> {
        check_positive("diameter", config.diameter)?;
        if !config.tar_start_pos.is_finite() {
            return Err(PositionerError::InvalidArgument(format!(
                "start position must be finite, got {}",
                config.tar_start_pos
            )));
        }

        Ok(Self {
            config,
            motion,
            driver,
        })
    }

    pub fn config(&self) -> &PositionerConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Converts a platform move into motor units without sending anything.
    pub fn rotation_for(&self, target_position: f64, speed: f64) -> Result<RotationCommand> {
        check_positive("speed", speed)?;
        if !target_position.is_finite() {
            return Err(PositionerError::InvalidArgument(format!(
                "target position must be finite, got {}",
                target_position
            )));
        }

        Ok(kinematics::to_rotation(
            MoveCommand {
                target_position,
                speed,
            },
            self.config.diameter,
            self.config.tar_start_pos,
        ))
    }

    /// Sends the platform towards `target_position` (m) at `speed` (m/s).
    ///
    /// Returns as soon as the driver accepted the command; use
    /// [`Positioner::wait_for_position`] to block until the motor got there.
    pub async fn move_to_pos(&mut self, target_position: f64, speed: f64) -> Result<RotationCommand> {
        let rotation = self.rotation_for(target_position, speed)?;

        info!(
            "Moving target to {} m with {} mm/s",
            target_position,
            speed * 1000.0
        );
        debug!(
            "Commanding {:.4} rev at {:.4} rev/s",
            rotation.revolutions, rotation.revolutions_per_second
        );

        self.driver
            .move_by(rotation.revolutions, rotation.revolutions_per_second)
            .await?;

        Ok(rotation)
    }

    /// Polls the motor until it is within the configured tolerance of `rotation`.
    ///
    /// The move is sent once more after `resend_after_polls` polls, and the wait
    /// is abandoned after `give_up_after_polls`.
    pub async fn wait_for_position(&mut self, rotation: RotationCommand) -> Result<()> {
        check_positive("rotation speed", rotation.revolutions_per_second)?;

        let target_deg = rotation.degrees();
        let rate_deg = rotation.degrees_per_second();
        let mut polls = 0;

        loop {
            polls += 1;

            let actual_deg = revolutions_to_degrees(self.driver.rotation().await?);
            let delta = (target_deg - actual_deg).abs();

            if delta < self.motion.position_tolerance_deg {
                debug!("Position reached");
                return Ok(());
            }

            debug!(
                "Motor still not on position ({} deg is, {} deg should)",
                actual_deg, target_deg
            );

            if polls > self.motion.give_up_after_polls {
                error!(
                    "Position cannot be reached ({} deg is, {} deg should)",
                    actual_deg, target_deg
                );
                return Err(PositionerError::PositionNotReached {
                    target_deg,
                    actual_deg,
                });
            }

            let wait = Duration::from_secs_f64((delta / rate_deg).min(MAX_POLL_INTERVAL_S))
                + self.motion.poll_margin();
            debug!("Waiting {:.2} s for motor to reach position", wait.as_secs_f64());
            tokio::time::sleep(wait).await;

            if polls == self.motion.resend_after_polls {
                warn!("Re-sending position");
                self.driver
                    .move_by(rotation.revolutions, rotation.revolutions_per_second)
                    .await?;
            }
        }
    }

    pub async fn move_to_pos_and_wait(&mut self, target_position: f64, speed: f64) -> Result<()> {
        let rotation = self.move_to_pos(target_position, speed).await?;
        self.wait_for_position(rotation).await
    }

    /// Motor angle in revolutions away from the zero reference.
    pub async fn rotation(&self) -> Result<f64> {
        Ok(self.driver.rotation().await?)
    }

    /// Current platform position in meters.
    pub async fn position(&self) -> Result<f64> {
        let revolutions = self.driver.rotation().await?;
        Ok(self.config.tar_start_pos
            + kinematics::revolutions_to_length(revolutions, self.config.diameter))
    }

    /// Moves in negative direction until the reference switch is found.
    pub async fn home(&mut self, speed: f64) -> Result<()> {
        check_positive("homing speed", speed)?;

        if self.driver.is_home().await? {
            info!("Already at home");
            return Ok(());
        }

        let rate = kinematics::length_to_revolutions(speed, self.config.diameter);
        self.driver.start_homing(rate).await?;
        info!("Homing");

        let timeout = self.motion.homing_timeout();
        let poll_interval = self.motion.homing_poll_interval();
        let driver = &self.driver;

        tokio::time::timeout(timeout, async {
            loop {
                tokio::time::sleep(poll_interval).await;
                let on_home = driver.is_home().await?;
                debug!("Wait for homing done. Last reply: {}", on_home);
                if on_home {
                    return Ok::<(), PositionerError>(());
                }
            }
        })
        .await
        .map_err(|_| PositionerError::HomingTimeout(timeout))??;

        info!("Home reference found");
        Ok(())
    }

    /// Turns motor power on. This resets the motor's internal position, so
    /// the current platform position becomes the start position.
    pub async fn power_on(&mut self) -> Result<bool> {
        info!("Turning motor power on");
        let powered = self.driver.set_power(true).await?;
        if powered {
            debug!("Motor is ready");
        } else {
            error!("Motor is not powered");
        }
        Ok(powered)
    }

    pub async fn power_off(&mut self) -> Result<()> {
        info!("Turning motor power off");
        if !self.driver.set_power(false).await? {
            warn!("Controller still reports motor power on");
        }
        Ok(())
    }
}

impl Positioner<StepperCommandSender> {
    /// Opens the serial port, identifies the controller and powers the motor.
    ///
    /// On failure the serial port is closed again before returning.
    pub async fn connect(
        config: PositionerConfig,
        serial: &SerialConfig,
        motion: MotionConfig,
    ) -> Result<Self> {
        check_positive("diameter", config.diameter)?;

        let mut serial_port = LazySerialPort::new(
            config.port.clone(),
            serial.baud_rate,
            serial.timeout(),
            serial.max_retries,
        );
        serial_port.open().map_err(|e| {
            PositionerError::Connection(format!("cannot open {}: {}", config.port, e))
        })?;

        Self::connect_over(config, Box::new(serial_port), serial.identify_attempts, motion).await
    }

    /// Identifies the controller behind an already opened `link` and powers
    /// the configured axis.
    ///
    /// The link is dropped before an error is returned.
    pub async fn connect_over(
        config: PositionerConfig,
        link: Box<dyn DeviceLink>,
        identify_attempts: u32,
        motion: MotionConfig,
    ) -> Result<Self> {
        let handler = StepperHandler::new(StepperDrive::new(config.axis_id), link);
        let executor = CommandExecutor::new(handler);
        let sender = StepperCommandSender::new(executor.sender());
        let executor_handle = executor.spawn();

        let connected = async {
            let name = identify(&sender, identify_attempts).await?;
            info!("Connection opened to elevator via {}", name);

            let mut positioner = Positioner::new(config.clone(), motion, sender.clone())?;
            match positioner.power_on().await {
                Ok(true) => Ok(positioner),
                Ok(false) => Err(PositionerError::Connection(format!(
                    "axis {} does not power on",
                    config.axis_id
                ))),
                Err(e) => Err(PositionerError::Connection(format!(
                    "axis {} does not respond: {}",
                    config.axis_id, e
                ))),
            }
        }
        .await;

        drop(sender);

        if connected.is_err() {
            // Executor stops (and drops the link) once no sender is left.
            if let Err(e) = executor_handle.await {
                warn!("Serial executor did not shut down cleanly: {}", e);
            }
        }

        connected
    }
}

async fn identify(sender: &StepperCommandSender, attempts: u32) -> Result<String> {
    for attempt in 1..=attempts {
        match sender.identify().await {
            Ok(name) if !name.is_empty() => return Ok(name),
            Ok(_) => debug!("Empty identification reply (attempt {})", attempt),
            Err(e) => {
                warn!("Identification failed (attempt {}): {}", attempt, e);
                if let Err(e) = sender.reconnect().await {
                    return Err(PositionerError::Connection(format!(
                        "cannot reopen serial port: {}",
                        e
                    )));
                }
            }
        }
    }

    Err(PositionerError::Connection(format!(
        "controller did not identify itself after {} attempts",
        attempts
    )))
}
