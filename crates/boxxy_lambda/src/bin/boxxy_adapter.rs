use boxxy_lambda::adapters::program::ProcessRunner;
use boxxy_lambda::config::{is_lambda_environment, AdapterConfig};
use boxxy_lambda::handlers::invocation::handle_invocation_event;
use boxxy_lambda::logging::{LogConfig, LogFormat};
use boxxy_lambda_core::contract::{InvocationEvent, InvocationResult};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::info;

async fn handle_request(
    event: LambdaEvent<Value>,
    config: &AdapterConfig,
) -> Result<InvocationResult, Error> {
    let (payload, context) = event.into_parts();
    info!(
        component = "runtime",
        request_id = %context.request_id,
        "request_received"
    );

    let result =
        tokio::task::block_in_place(|| handle_invocation_event(payload, config, &ProcessRunner))?;
    Ok(result)
}

fn run_smoke(config: &AdapterConfig) -> Result<(), Error> {
    let event = serde_json::to_value(InvocationEvent::smoke())?;
    let result =
        tokio::task::block_in_place(|| handle_invocation_event(event, config, &ProcessRunner))?;
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let in_lambda = is_lambda_environment();
    let format = if in_lambda {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    LogConfig::from_env(format)?.init()?;

    let config = AdapterConfig::from_env()?;
    info!(
        component = "runtime",
        program = %config.program.display(),
        in_lambda,
        "adapter_configured"
    );

    if !in_lambda {
        return run_smoke(&config);
    }

    let config = &config;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, config).await
    }))
    .await
}
