use std::fmt::{self, Display};
use std::io::{self, Write};

use boxxy_lambda_core::contract::InvocationEvent;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::error;

use crate::client::{BoxxyLambdaClient, InvokeOutcome};
use crate::errors::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Lines go to the boxxy shell verbatim.
    #[default]
    Boxxy,
    /// Lines are handed to `sh -c` through boxxy's `exec`.
    Exec,
}

impl Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Boxxy => f.write_str("boxxy"),
            Mode::Exec => f.write_str("boxxy/exec"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction {
    Skip,
    Exit,
    SwitchMode(Mode),
    UnknownMode(String),
    Send(InvocationEvent),
}

pub fn prompt(mode: Mode) -> String {
    format!("[lambda/{mode}]> ")
}

/// Every non-empty line is kept in history, including `exit` and bad
/// `enter` targets.
pub fn records_history(line: &str) -> bool {
    !line.is_empty()
}

pub fn interpret_line(line: &str, mode: Mode) -> LineAction {
    if line.is_empty() {
        return LineAction::Skip;
    }

    if let Some(target) = line.strip_prefix("enter ") {
        return if target.starts_with('b') {
            LineAction::SwitchMode(Mode::Boxxy)
        } else if target.starts_with('e') {
            LineAction::SwitchMode(Mode::Exec)
        } else {
            LineAction::UnknownMode(line.to_string())
        };
    }

    if line == "exit" {
        return LineAction::Exit;
    }

    let stdin = match mode {
        Mode::Boxxy => line.to_string(),
        Mode::Exec => format!("exec sh -c {}", escape_spaces(line)),
    };
    LineAction::Send(InvocationEvent::new(stdin))
}

/// boxxy splits arguments on unescaped spaces.
pub fn escape_spaces(line: &str) -> String {
    let mut escaped = String::with_capacity(line.len());
    for c in line.chars() {
        if c == ' ' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub async fn run(client: &BoxxyLambdaClient, function_name: &str) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let mut mode = Mode::default();

    println!("type \"enter {{boxxy,exec}}\" to change between modes");
    loop {
        let line = match editor.readline(&prompt(mode)) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(error) => return Err(error.into()),
        };
        if records_history(&line) {
            editor.add_history_entry(line.as_str())?;
        }

        let event = match interpret_line(&line, mode) {
            LineAction::Skip => continue,
            LineAction::Exit => break,
            LineAction::SwitchMode(next) => {
                mode = next;
                continue;
            }
            LineAction::UnknownMode(line) => {
                error!(line = %line, "unknown mode");
                continue;
            }
            LineAction::Send(event) => event,
        };

        match client.invoke_boxxy(function_name, &event).await? {
            InvokeOutcome::Output(output) => {
                stdout.write_all(&output.stdout)?;
                stdout.flush()?;
                stderr.write_all(&output.stderr)?;
                stderr.flush()?;
            }
            InvokeOutcome::Unusable(reason) => {
                error!(error = %reason, "lambda returned no usable output");
            }
        }
    }

    Ok(())
}
