use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::CommandError;

/// Captured result of a successful invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Builder for one invocation of an external program
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
    envs: Vec<(String, String)>,
    stdin: Option<String>,
    timeout: Option<Duration>,
}

impl ExternalCommand {
    /// Command for `binary_path`; `description` names it in logs and errors
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
            envs: Vec::new(),
            stdin: None,
            timeout: None,
        }
    }

    /// Add argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add a path argument
    pub fn path_arg<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Set an environment variable for the child
    pub fn env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Feed `input` on standard input
    pub fn stdin<S: Into<String>>(mut self, input: S) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Kill the child and fail after `timeout`
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run to completion and capture both output streams.
    ///
    /// The child is killed if the timeout elapses or the future is dropped.
    pub async fn execute(&self) -> Result<CommandOutput, CommandError> {
        debug!("Executing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        let stdin_pipe = child.stdin.take();

        // stdin is fed while the output streams are drained, all under the
        // timeout; dropping the future kills the child
        let interaction = async {
            let feed = async {
                let (Some(input), Some(mut pipe)) = (&self.stdin, stdin_pipe) else {
                    return Ok(());
                };
                match pipe.write_all(input.as_bytes()).await {
                    // the child exited without reading everything
                    Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
                    result => result,
                }
                // `pipe` is dropped here, closing stdin
            };
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            let output = output?;
            if output.status.success() {
                fed?;
            }
            Ok::<_, std::io::Error>(output)
        };

        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, interaction)
                .await
                .map_err(|_| CommandError::Timeout {
                    description: self.description.clone(),
                    timeout,
                })?,
            None => interaction.await,
        }
        .map_err(|e| self.io_error(e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(CommandError::Failed {
                description: self.description.clone(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }

    fn spawn_error(&self, err: std::io::Error) -> CommandError {
        if err.kind() == ErrorKind::NotFound {
            CommandError::NotFound {
                program: self.binary_path.clone(),
            }
        } else {
            self.io_error(err)
        }
    }

    fn io_error(&self, source: std::io::Error) -> CommandError {
        CommandError::Io {
            description: self.description.clone(),
            source,
        }
    }
}
