use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Input fed to the smoke run when the adapter is started outside Lambda.
pub const SMOKE_STDIN: &str = "id";

/// Event delivered to the adapter on every invocation.
///
/// Unknown keys are accepted and dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvocationEvent {
    pub stdin: String,
}

impl InvocationEvent {
    pub fn new(stdin: impl Into<String>) -> Self {
        Self {
            stdin: stdin.into(),
        }
    }

    pub fn smoke() -> Self {
        Self::new(SMOKE_STDIN)
    }
}

/// Response record: both captured streams, base64 encoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvocationResult {
    pub stdout: String,
    pub stderr: String,
}

impl InvocationResult {
    pub fn encode(stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            stdout: STANDARD.encode(stdout),
            stderr: STANDARD.encode(stderr),
        }
    }

    pub fn decode(&self) -> Result<DecodedOutput, ResponseError> {
        Ok(DecodedOutput {
            stdout: decode_field("stdout", &self.stdout)?,
            stderr: decode_field("stderr", &self.stderr)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Function error reported by the platform instead of a result record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaFailure {
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

impl std::fmt::Display for LambdaFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.error_type.as_deref().unwrap_or("UnknownError"),
            self.error_message.as_deref().unwrap_or("<no message>")
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("lambda error {0}")]
    Lambda(LambdaFailure),
    #[error("response is missing the `{0}` field")]
    MissingField(&'static str),
    #[error("response field `{field}` is not valid base64: {source}")]
    Base64 {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },
}

/// Invoke response payload as a client sees it.
///
/// The platform replaces the result record with `errorType`/`errorMessage`
/// when the handler fails, so every field is optional here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawInvocationResponse {
    #[serde(rename = "errorType", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(
        rename = "errorMessage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl RawInvocationResponse {
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    pub fn into_output(self) -> Result<DecodedOutput, ResponseError> {
        if self.error_type.is_some() || self.error_message.is_some() {
            return Err(ResponseError::Lambda(LambdaFailure {
                error_type: self.error_type,
                error_message: self.error_message,
            }));
        }

        let stdout = self.stdout.ok_or(ResponseError::MissingField("stdout"))?;
        let stderr = self.stderr.ok_or(ResponseError::MissingField("stderr"))?;
        InvocationResult { stdout, stderr }.decode()
    }
}

fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>, ResponseError> {
    STANDARD
        .decode(value)
        .map_err(|source| ResponseError::Base64 { field, source })
}
