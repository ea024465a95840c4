//! On-device speech through a speech-dispatcher style command.
//!
//! The `CommandExecutor` trait keeps the process boundary mockable; the
//! speaking command itself (`spd-say --wait <text>` by default) is configured.

use crate::config::SpeechConfig;
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Trait for running external commands to completion.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command` with `args`, returning its stdout on success.
    ///
    /// The child is killed if the returned future is dropped.
    async fn execute(&self, command: &str, args: &[String]) -> Result<String>;
}

/// Production executor using `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor;

impl SystemCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for SystemCommandExecutor {
    async fn execute(&self, command: &str, args: &[String]) -> Result<String> {
        let output = tokio::process::Command::new(command)
            .args(args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MonitorError::SpeechToolNotFound {
                        tool: command.to_string(),
                    }
                } else {
                    MonitorError::SpeechFailed {
                        message: format!("Failed to execute {}: {}", command, e),
                    }
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MonitorError::SpeechFailed {
                message: format!(
                    "{} failed with status {:?}: {}",
                    command,
                    output.status,
                    stderr.trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Something that can speak text on this machine.
#[async_trait]
pub trait LocalSpeech: Send + Sync {
    /// Whether speaking can be attempted at all.
    fn is_available(&self) -> bool;

    /// Speak `text`, returning once speech has ended.
    async fn speak(&self, text: &str) -> Result<()>;
}

/// Speaks by running a command with `--` and the text as its last arguments.
pub struct CommandSpeech<E: CommandExecutor> {
    executor: E,
    command: String,
    args: Vec<String>,
}

impl CommandSpeech<SystemCommandExecutor> {
    /// Speech through the configured command.
    pub fn from_config(config: &SpeechConfig) -> Self {
        Self::new(
            SystemCommandExecutor::new(),
            &config.local_command,
            config.local_args.clone(),
        )
    }
}

impl<E: CommandExecutor> CommandSpeech<E> {
    pub fn new(executor: E, command: &str, args: Vec<String>) -> Self {
        Self {
            executor,
            command: command.to_string(),
            args,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl<E: CommandExecutor> LocalSpeech for CommandSpeech<E> {
    fn is_available(&self) -> bool {
        which::which(&self.command).is_ok()
    }

    async fn speak(&self, text: &str) -> Result<()> {
        let mut args = self.args.clone();
        // Text starting with '-' must not be read as an option.
        args.push("--".to_string());
        args.push(text.to_string());
        self.executor.execute(&self.command, &args).await?;
        Ok(())
    }
}

/// Speech that is never available (local speech disabled).
#[derive(Debug, Clone, Default)]
pub struct NullSpeech;

#[async_trait]
impl LocalSpeech for NullSpeech {
    fn is_available(&self) -> bool {
        false
    }

    async fn speak(&self, _text: &str) -> Result<()> {
        Err(MonitorError::SpeechToolNotFound {
            tool: "local speech disabled".to_string(),
        })
    }
}

/// Mock speech for testing: records texts and takes a fixed time.
pub struct MockSpeech {
    available: bool,
    fail: bool,
    duration: Duration,
    spoken: Mutex<Vec<String>>,
}

impl MockSpeech {
    pub fn new() -> Self {
        Self {
            available: true,
            fail: false,
            duration: Duration::from_millis(1500),
            spoken: Mutex::new(Vec::new()),
        }
    }

    /// Report the speech tool as missing.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Available, but every `speak` fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// How long each `speak` takes.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockSpeech {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalSpeech for MockSpeech {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn speak(&self, text: &str) -> Result<()> {
        self.spoken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
        tokio::time::sleep(self.duration).await;
        if self.fail {
            return Err(MonitorError::SpeechFailed {
                message: "mock speech failure".to_string(),
            });
        }
        Ok(())
    }
}
