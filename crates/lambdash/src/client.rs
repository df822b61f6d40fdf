use std::path::Path;

use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_lambda::error::DisplayErrorContext;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{FunctionCode, Runtime};
use boxxy_lambda_core::contract::{DecodedOutput, InvocationEvent, RawInvocationResponse};
use tracing::{debug, info};

use crate::errors::{LambdashError, Result};

pub const DEFAULT_PACKAGE_PATH: &str = "dist/boxxy_lambda.zip";
/// Entry point name inside the package for the `provided` runtimes.
pub const FUNCTION_HANDLER: &str = "bootstrap";
const ASSUME_ROLE_SESSION_NAME: &str = "lambdash";

/// What a completed `Invoke` call produced.
///
/// Transport and AWS API failures are errors; anything the function sent
/// back that cannot be shown as output is `Unusable`.
#[derive(Debug)]
pub enum InvokeOutcome {
    Output(DecodedOutput),
    Unusable(LambdashError),
}

pub struct BoxxyLambdaClient {
    client: aws_sdk_lambda::Client,
}

impl BoxxyLambdaClient {
    /// Builds a client from the default credential chain, or from an STS
    /// session for `assume_role` (which may live in another account).
    pub async fn connect(region: impl Into<String>, assume_role: Option<String>) -> Self {
        let region = Region::new(region.into());
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region.clone());
        if let Some(role_arn) = assume_role {
            info!(role_arn = %role_arn, "assuming role");
            let provider = AssumeRoleProvider::builder(role_arn)
                .session_name(ASSUME_ROLE_SESSION_NAME)
                .region(region)
                .build()
                .await;
            loader = loader.credentials_provider(provider);
        }

        let config = loader.load().await;
        Self {
            client: aws_sdk_lambda::Client::new(&config),
        }
    }

    /// Returns the function ARN, creating the function from `package` only
    /// when the lookup says it does not exist.
    pub async fn ensure_function_exists(
        &self,
        function_name: &str,
        role: &str,
        package: &Path,
    ) -> Result<String> {
        match self
            .client
            .get_function()
            .function_name(function_name)
            .send()
            .await
        {
            Ok(output) => {
                info!(function_name, "function already exists");
                output
                    .configuration()
                    .and_then(|configuration| configuration.function_arn())
                    .map(str::to_string)
                    .ok_or(LambdashError::MissingArn {
                        operation: "GetFunction",
                    })
            }
            Err(error) => {
                let service_error = error.into_service_error();
                if !service_error.is_resource_not_found_exception() {
                    return Err(LambdashError::Aws(format!(
                        "failed to look up function: {}",
                        DisplayErrorContext(&service_error)
                    )));
                }

                let zip = std::fs::read(package).map_err(|source| LambdashError::Package {
                    path: package.to_path_buf(),
                    source,
                })?;
                info!(function_name, package_bytes = zip.len(), "creating function");
                self.create_function(function_name, role, zip).await
            }
        }
    }

    async fn create_function(
        &self,
        function_name: &str,
        role: &str,
        zip: Vec<u8>,
    ) -> Result<String> {
        let output = self
            .client
            .create_function()
            .function_name(function_name)
            .role(role)
            .runtime(Runtime::Providedal2023)
            .handler(FUNCTION_HANDLER)
            .code(FunctionCode::builder().zip_file(Blob::new(zip)).build())
            .send()
            .await
            .map_err(|error| {
                LambdashError::Aws(format!(
                    "failed to create function: {}",
                    DisplayErrorContext(&error)
                ))
            })?;
        debug!(?output, "create_function response");

        output
            .function_arn()
            .map(str::to_string)
            .ok_or(LambdashError::MissingArn {
                operation: "CreateFunction",
            })
    }

    pub async fn invoke_boxxy(
        &self,
        function_name: &str,
        event: &InvocationEvent,
    ) -> Result<InvokeOutcome> {
        info!(function_name, stdin = %event.stdin, "invoking function");
        let payload = serde_json::to_vec(event)?;

        let output = self
            .client
            .invoke()
            .function_name(function_name)
            .payload(Blob::new(payload))
            .send()
            .await
            .map_err(|error| {
                LambdashError::Aws(format!(
                    "failed to invoke function: {}",
                    DisplayErrorContext(&error)
                ))
            })?;
        if let Some(function_error) = output.function_error() {
            debug!(function_error, "function reported an error");
        }

        Ok(classify_payload(output.payload().map(|blob| blob.as_ref())))
    }
}

pub fn classify_payload(payload: Option<&[u8]>) -> InvokeOutcome {
    let Some(payload) = payload else {
        return InvokeOutcome::Unusable(LambdashError::EmptyPayload);
    };
    match decode_invoke_payload(payload) {
        Ok(output) => InvokeOutcome::Output(output),
        Err(error) => InvokeOutcome::Unusable(error),
    }
}

pub fn decode_invoke_payload(payload: &[u8]) -> Result<DecodedOutput> {
    debug!(payload = %String::from_utf8_lossy(payload), "invoke response payload");
    let response = RawInvocationResponse::from_slice(payload)?;
    Ok(response.into_output()?)
}
