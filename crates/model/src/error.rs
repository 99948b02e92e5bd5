use std::num::ParseIntError;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ModelError {
    #[snafu(display("relay handle '{raw}' is invalid for {handle_type}"))]
    InvalidHandle {
        stage: &'static str,
        handle_type: &'static str,
        raw: String,
        source: ParseIntError,
    },
    #[snafu(display("relay handle for {handle_type} is empty"))]
    EmptyHandle {
        stage: &'static str,
        handle_type: &'static str,
    },
}

pub type ModelResult<T> = Result<T, ModelError>;
