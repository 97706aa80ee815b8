//! Speech output sinks

use crate::error::SpeechError;
use std::process::{Command, Stdio};

/// A synchronous text-to-speech output
///
/// `speak` blocks until the text has been played. Implementations are only
/// ever driven from one announcement at a time.
pub trait Speaker: Send + Sync {
    fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

/// Writes announcements to the log instead of speaking them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSpeaker;

impl Speaker for LogSpeaker {
    fn speak(&self, text: &str) -> Result<(), SpeechError> {
        tracing::info!(target: "announcement", "{}", text);
        Ok(())
    }
}

/// Speaks by running an external TTS program with the text as last argument
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
}

impl CommandSpeaker {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Result<Self, SpeechError> {
        let program = program.into();
        if program.trim().is_empty() {
            return Err(SpeechError::Unavailable("empty speech command".to_string()));
        }
        Ok(Self { program, args })
    }

    /// Splits a command line such as `"espeak -s 160"` on whitespace
    pub fn from_command_line(command_line: &str) -> Result<Self, SpeechError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| SpeechError::Unavailable("empty speech command".to_string()))?;
        Self::new(program, parts.collect())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| SpeechError::Playback(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(SpeechError::Playback(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}
