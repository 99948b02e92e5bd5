use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RelayError {
    #[snafu(display("failed to decode relay event on line {line_number}: {source}"))]
    DecodeEvent {
        stage: &'static str,
        line_number: usize,
        source: serde_json::Error,
    },
    #[snafu(display("failed to spawn model thread"))]
    ModelThreadSpawn {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("failed to initialize model thread runtime"))]
    ModelRuntimeInit {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("model thread panicked on `{stage}`"))]
    ModelThreadPanicked { stage: &'static str },
}

pub type RelayResult<T> = Result<T, RelayError>;
