use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

/// Everything a finished child left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the child was terminated by a signal.
    pub exit_code: Option<i32>,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to start '{}': {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to collect output of '{}': {source}", .program.display())]
    Io {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub trait ProgramRunner {
    fn run_program(&self, program: &Path, stdin: &[u8]) -> Result<CapturedOutput, RunError>;
}

/// Runs the program as a real child process, without arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProgramRunner for ProcessRunner {
    fn run_program(&self, program: &Path, stdin: &[u8]) -> Result<CapturedOutput, RunError> {
        let mut child = Command::new(program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunError::Spawn {
                program: program.to_path_buf(),
                source,
            })?;

        // Feed stdin from its own thread so a child that fills its output
        // pipes before reading cannot block us.
        let writer = child.stdin.take().map(|mut pipe| {
            let input = stdin.to_vec();
            thread::spawn(move || write_input(&mut pipe, &input))
        });

        let output = child.wait_with_output().map_err(|source| RunError::Io {
            program: program.to_path_buf(),
            source,
        })?;

        if let Some(writer) = writer {
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
            written.map_err(|source| RunError::Io {
                program: program.to_path_buf(),
                source,
            })?;
        }

        Ok(CapturedOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code(),
        })
    }
}

fn write_input(pipe: &mut impl Write, input: &[u8]) -> io::Result<()> {
    match pipe.write_all(input).and_then(|()| pipe.flush()) {
        // The child is free to exit without consuming all of its input.
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingPipe;

    impl Write for FailingPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::PermissionDenied))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn broken_pipe_while_feeding_input_is_ignored() {
        assert!(write_input(&mut ClosedPipe, b"id").is_ok());
    }

    #[test]
    fn other_write_failures_are_reported() {
        let error = write_input(&mut FailingPipe, b"id").expect_err("write should fail");
        assert_eq!(error.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn empty_input_is_written_without_touching_the_pipe() {
        let mut sink = Vec::new();
        write_input(&mut sink, b"").expect("empty write should succeed");
        assert!(sink.is_empty());
    }
}
