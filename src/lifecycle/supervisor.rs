//! Supervision of the optional child command.
//!
//! # Responsibilities
//! - Launch the command with inherited stdio and environment, in its own process group
//! - Wait for it on a dedicated task and map its status to an exit code
//! - Publish the exit code, then request proxy shutdown
//! - Kill the process group if the proxy stops first
//!
//! # Design Decisions
//! - The exit code travels on a oneshot channel, sent before shutdown is triggered
//! - State changes are published on a watch channel and only ever move forward
//! - Launch failures become exit codes (127 not found, 126 otherwise), never panics

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::Shutdown;

/// Exit code when the command could not be found.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit code when the command was found but could not be started.
pub const EXIT_CANNOT_EXECUTE: i32 = 126;

/// Base added to a terminating signal number.
const EXIT_SIGNAL_BASE: i32 = 128;

#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Where the supervised command is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    NotStarted,
    Running { pid: u32 },
    Exited(i32),
    ShutdownRequested,
    ShutdownComplete,
}

impl SupervisorState {
    fn rank(&self) -> u8 {
        match self {
            SupervisorState::NotStarted => 0,
            SupervisorState::Running { .. } => 1,
            SupervisorState::Exited(_) => 2,
            SupervisorState::ShutdownRequested => 3,
            SupervisorState::ShutdownComplete => 4,
        }
    }

    /// Transitions only move forward; a launch failure skips `Running`.
    pub fn can_transition_to(&self, next: &SupervisorState) -> bool {
        next.rank() > self.rank()
    }
}

fn advance(state: &watch::Sender<SupervisorState>, next: SupervisorState) -> bool {
    state.send_if_modified(|current| {
        if current.can_transition_to(&next) {
            *current = next;
            true
        } else {
            false
        }
    })
}

/// Map a child's termination status to the proxy's exit code.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return EXIT_SIGNAL_BASE + signal;
        }
    }
    1
}

/// Exit code reported when the command could not be launched.
pub fn launch_failure_code(error: &io::Error) -> i32 {
    match error.kind() {
        io::ErrorKind::NotFound => EXIT_NOT_FOUND,
        _ => EXIT_CANNOT_EXECUTE,
    }
}

/// Launches the command and ties the proxy's lifetime to it.
#[derive(Debug, Clone)]
pub struct Supervisor {
    command: Vec<String>,
    verbose: bool,
}

impl Supervisor {
    pub fn new(command: Vec<String>, verbose: bool) -> Self {
        Self { command, verbose }
    }

    /// Spawn the supervising task. `shutdown` fires after the command exits.
    pub fn start(self, shutdown: Shutdown) -> SupervisorHandle {
        let (state_tx, _) = watch::channel(SupervisorState::NotStarted);
        let state = Arc::new(state_tx);
        let (exit_tx, exit_rx) = oneshot::channel();
        let (kill_tx, kill_rx) = oneshot::channel();

        let task = tokio::spawn(supervise(
            self,
            Arc::clone(&state),
            exit_tx,
            kill_rx,
            shutdown,
        ));

        SupervisorHandle {
            state,
            exit_code: exit_rx,
            kill: Some(kill_tx),
            task,
        }
    }

    fn build_command(&self) -> Option<Command> {
        let (program, args) = self.command.split_first()?;
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        #[cfg(unix)]
        cmd.process_group(0);
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);

        Some(cmd)
    }

    async fn run_child(
        &self,
        state: &watch::Sender<SupervisorState>,
        kill: oneshot::Receiver<()>,
    ) -> i32 {
        let Some(mut cmd) = self.build_command() else {
            tracing::error!("No command to run");
            return EXIT_CANNOT_EXECUTE;
        };

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(command = ?self.command, error = %e, "Failed to start command");
                return launch_failure_code(&e);
            }
        };

        let pid = child.id().unwrap_or_default();
        advance(state, SupervisorState::Running { pid });
        if self.verbose {
            tracing::info!(command = ?self.command, pid, "Command started");
        }

        let status = tokio::select! {
            biased;
            status = child.wait() => status,
            _ = kill => {
                tracing::debug!(pid, "Killing command process group");
                kill_group(pid);
                if let Err(e) = child.start_kill() {
                    tracing::debug!(pid, error = %e, "Command already gone");
                }
                child.wait().await
            }
        };

        match status {
            Ok(status) => exit_code(status),
            Err(e) => {
                tracing::error!(pid, error = %e, "Failed to wait for command");
                1
            }
        }
    }
}

async fn supervise(
    supervisor: Supervisor,
    state: Arc<watch::Sender<SupervisorState>>,
    exit_tx: oneshot::Sender<i32>,
    kill: oneshot::Receiver<()>,
    shutdown: Shutdown,
) {
    let code = supervisor.run_child(&state, kill).await;
    advance(&state, SupervisorState::Exited(code));

    if code != 0 {
        tracing::warn!(exit_code = code, "Command exited with non-zero status");
    } else if supervisor.verbose {
        tracing::info!(exit_code = code, "Command exited");
    }

    // Publish before shutdown so the reader never observes a stopped server without a code.
    let _ = exit_tx.send(code);
    shutdown.trigger();
    advance(&state, SupervisorState::ShutdownRequested);
}

#[cfg(unix)]
fn kill_group(pid: u32) {
    signal_group(pid, libc::SIGKILL);
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

#[cfg(unix)]
fn signal_group(pid: u32, signal: i32) -> bool {
    let Ok(pgid) = i32::try_from(pid) else {
        return false;
    };
    if pgid <= 0 {
        return false;
    }
    // The child leads its own group, so its pid is the group id.
    unsafe { libc::kill(-pgid, signal) == 0 }
}

/// View of the running command used to forward signals.
#[derive(Debug, Clone)]
pub struct ChildGroup {
    state: watch::Receiver<SupervisorState>,
}

impl ChildGroup {
    /// Pid of the command while it runs.
    pub fn pid(&self) -> Option<u32> {
        match *self.state.borrow() {
            SupervisorState::Running { pid } => Some(pid),
            _ => None,
        }
    }

    /// Deliver `signal` to the command's process group. Returns false if
    /// the command is not running or delivery failed.
    #[cfg(unix)]
    pub fn signal(&self, signal: i32) -> bool {
        self.pid().is_some_and(|pid| signal_group(pid, signal))
    }
}

/// Handle to a started [`Supervisor`].
#[derive(Debug)]
pub struct SupervisorHandle {
    state: Arc<watch::Sender<SupervisorState>>,
    exit_code: oneshot::Receiver<i32>,
    kill: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SupervisorHandle {
    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    pub fn group(&self) -> ChildGroup {
        ChildGroup {
            state: self.state.subscribe(),
        }
    }

    /// Collect the command's exit code once the server has stopped.
    ///
    /// A command that is still running is killed first.
    pub async fn finish(mut self) -> i32 {
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::error!(error = %e, "Supervisor task failed");
        }

        let code = match self.exit_code.await {
            Ok(code) => code,
            Err(_) => 1,
        };
        advance(&self.state, SupervisorState::ShutdownComplete);
        code
    }
}
