use std::path::PathBuf;

use boxxy_lambda_core::contract::ResponseError;

#[derive(Debug, thiserror::Error)]
pub enum LambdashError {
    #[error("aws request failed: {0}")]
    Aws(String),
    #[error("{operation} response did not include a function ARN")]
    MissingArn { operation: &'static str },
    #[error("invoke response had no payload")]
    EmptyPayload,
    #[error("failed to read deployment package '{}': {source}", .path.display())]
    Package {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed invoke payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Response(#[from] ResponseError),
    #[error(transparent)]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = LambdashError> = std::result::Result<T, E>;
