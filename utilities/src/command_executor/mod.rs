use std::{
    io,
    sync::mpsc::{Receiver, Sender},
};

use tokio::sync::oneshot;
use tracing::{debug, warn};

pub trait Command: Send + std::fmt::Debug {
    type Response: Send;
    type Handler: DeviceHandler<Command = Self>;

    fn execute(self, handler: &mut Self::Handler) -> io::Result<Self::Response>;
}

pub trait DeviceHandler {
    type Command: Command<Handler = Self>;
}

pub struct GenericCommand<C: Command> {
    command: C,
    response_ch: oneshot::Sender<io::Result<C::Response>>,
}

impl<C: Command> GenericCommand<C> {
    pub fn new(command: C, response_ch: oneshot::Sender<io::Result<C::Response>>) -> Self {
        Self {
            command,
            response_ch,
        }
    }

    pub fn execute(self, handler: &mut C::Handler) -> io::Result<()> {
        let description = format!("{:?}", self.command);
        let result = self.command.execute(handler);

        if let Err(e) = &result {
            warn!("Command {} failed: {}", description, e);
        }

        self.response_ch
            .send(result)
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "Failed to send response"))?;

        Ok(())
    }
}

/// Owns a device handler and serves commands for it one at a time.
///
/// The loop ends once every [`CommandSender`] is gone, dropping the handler
/// (and with it the device link).
pub struct CommandExecutor<H: DeviceHandler + Send + 'static> {
    handler: H,
    commands_ch: Receiver<GenericCommand<H::Command>>,
    sender: Sender<GenericCommand<H::Command>>,
}

impl<H: DeviceHandler + Send + 'static> CommandExecutor<H> {
    pub fn new(handler: H) -> Self {
        let (sender, commands_ch) = std::sync::mpsc::channel();

        Self {
            handler,
            commands_ch,
            sender,
        }
    }

    pub fn sender(&self) -> CommandSender<H::Command> {
        CommandSender::new(self.sender.clone())
    }

    pub fn run(self) -> io::Result<()> {
        let Self {
            mut handler,
            commands_ch,
            sender,
        } = self;
        drop(sender);

        while let Ok(command) = commands_ch.recv() {
            if let Err(e) = command.execute(&mut handler) {
                debug!("Dropped command response: {}", e);
            }
        }

        debug!("All command senders closed, stopping executor");
        Ok(())
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<io::Result<()>> {
        tokio::task::spawn_blocking(move || self.run())
    }
}

#[derive(Clone)]
pub struct CommandSender<T: Command> {
    commands_ch: Sender<GenericCommand<T>>,
}

impl<C: Command> CommandSender<C> {
    pub fn new(commands_ch: Sender<GenericCommand<C>>) -> Self {
        Self { commands_ch }
    }

    pub async fn send_command(&self, command: C) -> io::Result<C::Response> {
        let (response_ch, response_rx) = oneshot::channel();
        let command = GenericCommand::new(command, response_ch);

        self.commands_ch
            .send(command)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "Failed to send command"))?;

        response_rx
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "Failed to receive response"))?
    }
}
