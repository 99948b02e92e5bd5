use std::path::PathBuf;

use lith_model::ModelError;
use lith_relay::RelayError;
use snafu::Snafu;

use crate::settings::SettingsError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AppError {
    #[snafu(display("missing event log path (or --write-config) on `{stage}`"))]
    MissingEventLog { stage: &'static str },
    #[snafu(display("missing value for argument '{arg}' on `{stage}`"))]
    MissingArgumentValue {
        stage: &'static str,
        arg: &'static str,
    },
    #[snafu(display("unknown argument '{raw}' on `{stage}`"))]
    UnknownArgument { stage: &'static str, raw: String },
    #[snafu(display("invalid buffer handle on `{stage}`: {source}"))]
    InvalidBufferArgument {
        stage: &'static str,
        source: ModelError,
    },
    #[snafu(display("failed to read event log at {path:?} on `{stage}`: {source}"))]
    ReadEventLog {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to decode event log at {path:?} on `{stage}`: {source}"))]
    DecodeEventLog {
        stage: &'static str,
        path: PathBuf,
        source: RelayError,
    },
    #[snafu(display("model thread failed on `{stage}`: {source}"))]
    ModelThread {
        stage: &'static str,
        source: RelayError,
    },
    #[snafu(display("failed to encode relay command on `{stage}`: {source}"))]
    EncodeCommand {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("settings operation failed on `{stage}`: {source}"))]
    Settings {
        stage: &'static str,
        source: SettingsError,
    },
}

pub type AppResult<T> = Result<T, AppError>;
