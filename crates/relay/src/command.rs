use lith_model::{BufferHandle, RelayClient};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Request the model hands to the connection layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RelayCommand {
    Input { buffer: BufferHandle, text: String },
    FetchLines { buffer: BufferHandle, count: usize },
}

impl RelayCommand {
    pub fn buffer(&self) -> BufferHandle {
        match self {
            Self::Input { buffer, .. } | Self::FetchLines { buffer, .. } => *buffer,
        }
    }
}

/// [`RelayClient`] that queues commands for a connection task to send.
#[derive(Debug, Clone)]
pub struct ChannelRelay {
    commands: mpsc::UnboundedSender<RelayCommand>,
}

impl ChannelRelay {
    pub fn new(commands: mpsc::UnboundedSender<RelayCommand>) -> Self {
        Self { commands }
    }

    fn send(&self, command: RelayCommand) {
        if let Err(error) = self.commands.send(command) {
            tracing::warn!(
                buffer = %error.0.buffer(),
                "relay command dropped because the connection side is gone"
            );
        }
    }
}

impl RelayClient for ChannelRelay {
    fn send_input(&self, buffer: BufferHandle, text: &str) {
        self.send(RelayCommand::Input {
            buffer,
            text: text.to_string(),
        });
    }

    fn request_lines(&self, buffer: BufferHandle, desired_count: usize) {
        self.send(RelayCommand::FetchLines {
            buffer,
            count: desired_count,
        });
    }
}

pub fn make_command_channel() -> (ChannelRelay, mpsc::UnboundedReceiver<RelayCommand>) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    (ChannelRelay::new(command_tx), command_rx)
}
