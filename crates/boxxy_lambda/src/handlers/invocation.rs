use std::time::Instant;

use boxxy_lambda_core::contract::{InvocationEvent, InvocationResult};
use serde_json::Value;
use tracing::{info, warn};

use crate::adapters::program::{ProgramRunner, RunError};
use crate::config::AdapterConfig;

const COMPONENT: &str = "invocation_handler";

#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("invalid invocation event: {0}")]
    InvalidEvent(#[from] serde_json::Error),
    #[error(transparent)]
    Run(#[from] RunError),
}

pub fn parse_invocation_event(event: Value) -> Result<InvocationEvent, InvocationError> {
    Ok(serde_json::from_value(event)?)
}

/// Runs the configured program once with the event's `stdin` text and
/// returns both captured streams. The child's exit status is logged, never
/// returned.
pub fn handle_invocation_event(
    event: Value,
    config: &AdapterConfig,
    runner: &impl ProgramRunner,
) -> Result<InvocationResult, InvocationError> {
    let event = parse_invocation_event(event)?;
    let started_at = Instant::now();
    info!(
        component = COMPONENT,
        program = %config.program.display(),
        stdin_bytes = event.stdin.len(),
        "invocation_started"
    );

    let output = runner.run_program(&config.program, event.stdin.as_bytes())?;

    let duration_ms = started_at.elapsed().as_millis() as u64;
    if output.exit_code == Some(0) {
        info!(
            component = COMPONENT,
            exit_code = 0,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            duration_ms,
            "invocation_completed"
        );
    } else {
        warn!(
            component = COMPONENT,
            exit_code = ?output.exit_code,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            duration_ms,
            "invocation_completed_with_failure_status"
        );
    }

    Ok(InvocationResult::encode(&output.stdout, &output.stderr))
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::adapters::program::CapturedOutput;
    use crate::logging::capture::capture;
    use crate::logging::{LogConfig, LogFormat};

    struct CapturingRunner {
        calls: Mutex<Vec<(PathBuf, Vec<u8>)>>,
        exit_code: Option<i32>,
    }

    impl CapturingRunner {
        fn exiting_with(exit_code: Option<i32>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                exit_code,
            }
        }

        fn calls(&self) -> Vec<(PathBuf, Vec<u8>)> {
            self.calls.lock().expect("poisoned mutex").clone()
        }
    }

    impl ProgramRunner for CapturingRunner {
        fn run_program(&self, program: &Path, stdin: &[u8]) -> Result<CapturedOutput, RunError> {
            self.calls
                .lock()
                .expect("poisoned mutex")
                .push((program.to_path_buf(), stdin.to_vec()));
            Ok(CapturedOutput {
                stdout: b"uid=0(root)\n".to_vec(),
                stderr: Vec::new(),
                exit_code: self.exit_code,
            })
        }
    }

    struct MissingProgramRunner;

    impl ProgramRunner for MissingProgramRunner {
        fn run_program(&self, program: &Path, _stdin: &[u8]) -> Result<CapturedOutput, RunError> {
            Err(RunError::Spawn {
                program: program.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            })
        }
    }

    fn config() -> AdapterConfig {
        AdapterConfig::new("/var/task/boxxy")
    }

    #[test]
    fn feeds_stdin_text_to_configured_program() {
        let runner = CapturingRunner::exiting_with(Some(0));
        let result = handle_invocation_event(
            json!({"stdin": "id", "source": "smoke"}),
            &config(),
            &runner,
        )
        .expect("invocation should succeed");

        assert_eq!(result.stdout, "dWlkPTAocm9vdCkK");
        assert_eq!(result.stderr, "");
        assert_eq!(
            runner.calls(),
            vec![(PathBuf::from("/var/task/boxxy"), b"id".to_vec())]
        );
    }

    #[test]
    fn rejects_event_without_stdin_before_spawning() {
        let runner = CapturingRunner::exiting_with(Some(0));
        let error = handle_invocation_event(json!({"command": "id"}), &config(), &runner)
            .expect_err("stdin is required");

        assert!(matches!(error, InvocationError::InvalidEvent(_)));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn rejects_non_string_stdin() {
        let runner = CapturingRunner::exiting_with(Some(0));
        let error = handle_invocation_event(json!({"stdin": ["id"]}), &config(), &runner)
            .expect_err("stdin must be a string");

        assert!(matches!(error, InvocationError::InvalidEvent(_)));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn exit_status_does_not_change_the_result() {
        let succeeded = handle_invocation_event(
            json!({"stdin": "id"}),
            &config(),
            &CapturingRunner::exiting_with(Some(0)),
        )
        .expect("zero exit");
        let failed = handle_invocation_event(
            json!({"stdin": "id"}),
            &config(),
            &CapturingRunner::exiting_with(Some(2)),
        )
        .expect("non-zero exit");
        let signalled = handle_invocation_event(
            json!({"stdin": "id"}),
            &config(),
            &CapturingRunner::exiting_with(None),
        )
        .expect("signal exit");

        assert_eq!(succeeded, failed);
        assert_eq!(succeeded, signalled);
    }

    #[test]
    fn every_call_runs_the_program_again() {
        let runner = CapturingRunner::exiting_with(Some(0));
        for _ in 0..2 {
            handle_invocation_event(json!({"stdin": "id"}), &config(), &runner)
                .expect("invocation should succeed");
        }

        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn startup_failure_is_propagated() {
        let error =
            handle_invocation_event(json!({"stdin": "id"}), &config(), &MissingProgramRunner)
                .expect_err("missing program should fail");

        assert!(matches!(error, InvocationError::Run(RunError::Spawn { .. })));
        assert!(error.to_string().contains("/var/task/boxxy"));
    }

    #[test]
    fn log_records_carry_component_and_exit_status() {
        let config_json = LogConfig {
            min_level: tracing::Level::INFO,
            format: LogFormat::Json,
        };
        let records = capture(config_json, || {
            handle_invocation_event(
                json!({"stdin": "id"}),
                &config(),
                &CapturingRunner::exiting_with(Some(4)),
            )
            .expect("non-zero exit is not an error");
        });

        let events: Vec<&str> = records
            .iter()
            .filter_map(|record| record["message"].as_str())
            .collect();
        assert_eq!(
            events,
            vec!["invocation_started", "invocation_completed_with_failure_status"]
        );
        assert!(records
            .iter()
            .all(|record| record["component"] == "invocation_handler"));
        assert_eq!(records[1]["level"], "WARN");
        assert_eq!(records[1]["exit_code"], "Some(4)");
    }
}
