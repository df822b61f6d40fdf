use std::path::PathBuf;

use clap::Parser;
use lambdash::client::{BoxxyLambdaClient, DEFAULT_PACKAGE_PATH};
use lambdash::errors::Result;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "lambdash",
    about = "Deploy the boxxy lambda if needed and drive it from an interactive prompt"
)]
struct Args {
    /// Assume into this role to create the lambda, can be cross account
    #[arg(long = "assume-role")]
    assume_role: Option<String>,
    /// The role your lambda should use
    #[arg(long)]
    role: String,
    /// Deployment zip from `cargo run -p xtask -- serverless-package`
    #[arg(long, default_value = DEFAULT_PACKAGE_PATH)]
    package: PathBuf,
    /// The aws region name, eg eu-west-1
    region: String,
    /// The name of the lambda to create or reuse
    function_name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let lambda = BoxxyLambdaClient::connect(args.region, args.assume_role).await;
    let function_arn = lambda
        .ensure_function_exists(&args.function_name, &args.role, &args.package)
        .await?;
    println!("function {function_arn} is ready");

    lambdash::repl::run(&lambda, &args.function_name).await
}
