#![deny(unsafe_code)]

//! Glue between a relay connection and the buffer model: outbound commands,
//! inbound event envelopes, and the thread that owns the model.

mod command;
mod error;
mod event;
mod model_thread;

pub use command::{ChannelRelay, RelayCommand, make_command_channel};
pub use error::{RelayError, RelayResult};
pub use event::{RelayEvent, decode_event_log};
pub use model_thread::{EventSender, MODEL_THREAD_NAME, ModelThread};
