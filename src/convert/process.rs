use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::MigrationError;

use super::{Converter, StructuredContent};

const STDERR_TAIL: usize = 400;

/// Runs an external converter as `program [args..] <html>` and reads JSON from stdout.
///
/// The markup is passed as its own argv entry, never through a shell.
#[derive(Clone, Debug)]
pub struct ProcessConverter {
    program: String,
    args: Vec<String>,
}

impl ProcessConverter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }
}

#[async_trait]
impl Converter for ProcessConverter {
    async fn convert(&self, html: &str) -> Result<StructuredContent, MigrationError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(html)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MigrationError::Conversion(format!("could not start {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MigrationError::Conversion(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                tail(stderr.trim(), STDERR_TAIL)
            )));
        }
        StructuredContent::parse(&output.stdout)
    }
}

fn tail(s: &str, max_chars: usize) -> &str {
    let count = s.chars().count();
    if count <= max_chars {
        return s;
    }
    let skip = count - max_chars;
    match s.char_indices().nth(skip) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
