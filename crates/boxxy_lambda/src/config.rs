use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const PROGRAM_ENV: &str = "BOXXY_PROGRAM";
pub const TASK_ROOT_ENV: &str = "LAMBDA_TASK_ROOT";
pub const RUNTIME_API_ENV: &str = "AWS_LAMBDA_RUNTIME_API";
pub const DEFAULT_PROGRAM_NAME: &str = "boxxy";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "cannot locate the deployment directory; set LAMBDA_TASK_ROOT or BOXXY_PROGRAM to an absolute path"
    )]
    NoDeploymentDir,
    #[error("invalid log level '{0}', expected one of trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    pub program: PathBuf,
}

impl AdapterConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Reads the program location from the Lambda environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        Self::from_lookup(|key| std::env::var_os(key), exe_dir)
    }

    /// The deployment directory is `LAMBDA_TASK_ROOT` whenever it is set,
    /// even to an empty value; `exe_dir` is only used when it is absent.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<OsString>,
        exe_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let explicit = lookup(PROGRAM_ENV).map(|value| value.to_string_lossy().into_owned());
        let deployment_dir = lookup(TASK_ROOT_ENV).map(PathBuf::from).or(exe_dir);

        resolve_program(explicit.as_deref(), deployment_dir.as_deref()).map(Self::new)
    }
}

pub fn is_lambda_environment() -> bool {
    std::env::var_os(RUNTIME_API_ENV).is_some()
}

/// Anchors the program path to the deployment directory.
///
/// The result always carries a directory component, so spawning it never
/// falls back to a `PATH` lookup.
pub fn resolve_program(
    explicit: Option<&str>,
    deployment_dir: Option<&Path>,
) -> Result<PathBuf, ConfigError> {
    let requested = explicit
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(Path::new)
        .unwrap_or(Path::new(DEFAULT_PROGRAM_NAME));

    if requested.is_absolute() {
        return Ok(requested.to_path_buf());
    }

    match deployment_dir {
        Some(dir) if !dir.as_os_str().is_empty() => Ok(dir.join(requested)),
        _ => Err(ConfigError::NoDeploymentDir),
    }
}
