//! Spawns the metadata tool and reaps it independently of the reader.

use std::process::{ExitStatus, Stdio};

use log::{debug, error, info, warn};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::error::{ToolError, ToolResult};
use crate::config::ToolSettings;

/// Launches the external metadata tool with a fixed set of arguments.
///
/// # Example
///
/// ```ignore
/// use exiftags::tool::ToolLauncher;
///
/// let launcher = ToolLauncher::new("exiftool", ["-listx"]);
/// let run = launcher.launch()?;
/// // read run.stdout, call run.terminator.terminate() to stop early
/// ```
#[derive(Debug, Clone)]
pub struct ToolLauncher {
    program: String,
    args: Vec<String>,
}

impl ToolLauncher {
    /// Create a launcher for `program` with the given arguments.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a launcher from the `[tool]` settings section.
    pub fn from_settings(settings: &ToolSettings) -> ToolResult<Self> {
        let program = settings
            .resolved_program()
            .map_err(|e| ToolError::InvalidProgram(e.to_string()))?;
        Ok(Self::new(program, settings.args.iter().cloned()))
    }

    /// Program that will be executed.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the program.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Start the tool.
    ///
    /// Must be called from within a Tokio runtime: the returned run owns a
    /// spawned reaper task that waits for the process to exit, or kills it
    /// once the [`Terminator`] fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or its stdout pipe
    /// is missing.
    pub fn launch(&self) -> ToolResult<ToolRun> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::SpawnFailed {
                program: self.program.clone(),
                source,
            })?;

        let Some(stdout) = child.stdout.take() else {
            // kill_on_drop takes care of the orphaned process
            return Err(ToolError::StdoutUnavailable);
        };

        debug!(
            "[tool] started `{}` (pid {:?}) with args {:?}",
            self.program,
            child.id(),
            self.args
        );

        let (kill_tx, kill_rx) = oneshot::channel();
        let exit = spawn_reaper(child, self.program.clone(), kill_rx);

        Ok(ToolRun {
            stdout,
            terminator: Terminator { kill: Some(kill_tx) },
            exit,
        })
    }
}

/// A running tool process.
///
/// The three parts are meant to be split up: `stdout` goes to the reader,
/// `terminator` to whoever observes cancellation, and `exit` may be awaited
/// or simply dropped (the reaper keeps running detached).
#[derive(Debug)]
pub struct ToolRun {
    /// Standard output of the process.
    pub stdout: ChildStdout,

    /// Requests early termination of the process.
    pub terminator: Terminator,

    /// Reaper task; resolves once the process is gone.
    pub exit: JoinHandle<ToolResult<ToolExit>>,
}

/// How the tool process ended.
#[derive(Debug, Clone, Copy)]
pub struct ToolExit {
    /// Exit status reported by the OS.
    pub status: ExitStatus,

    /// True when the process was killed through a [`Terminator`].
    pub terminated: bool,
}

impl ToolExit {
    /// True for a normal, zero-status exit.
    pub fn is_clean(&self) -> bool {
        !self.terminated && self.status.success()
    }
}

/// One-shot handle asking the reaper to kill the process.
///
/// Dropping it without calling [`Terminator::terminate`] lets the process
/// run to completion.
#[derive(Debug)]
pub struct Terminator {
    kill: Option<oneshot::Sender<()>>,
}

impl Terminator {
    /// Ask the reaper to kill the process. Idempotent.
    pub fn terminate(&mut self) {
        if let Some(kill) = self.kill.take() {
            // The reaper is gone if the process already exited.
            let _ = kill.send(());
        }
    }
}

fn spawn_reaper(
    mut child: Child,
    program: String,
    mut kill_rx: oneshot::Receiver<()>,
) -> JoinHandle<ToolResult<ToolExit>> {
    tokio::spawn(async move {
        // A dropped Terminator fails the pattern and disables that branch.
        let exited = tokio::select! {
            status = child.wait() => Some(status),
            Ok(()) = &mut kill_rx => None,
        };

        let (status, terminated) = match exited {
            Some(status) => (status, false),
            None => {
                info!("[tool] terminating `{}`", program);
                if let Err(e) = child.start_kill() {
                    warn!("[tool] failed to kill `{}`: {}", program, e);
                }
                (child.wait().await, true)
            }
        };

        let status = status.map_err(|e| {
            error!("[tool] wait for `{}` failed: {}", program, e);
            ToolError::WaitFailed(e)
        })?;

        if !terminated && !status.success() {
            error!("[tool] `{}` exited with {}", program, status);
        } else {
            debug!("[tool] `{}` exited with {}", program, status);
        }

        Ok(ToolExit { status, terminated })
    })
}
