//! Engine process supervisor
//!
//! Launches the external VPN engine, turns its output into status events
//! and takes care of shutdown, whether the engine exits by itself, crashes,
//! or is stopped from the outside.

use crate::error::SupervisorError;
use crate::status::{StateUpdate, StatusSink};
use crate::vpn::crash_dump;
use crate::vpn::library_path::{resolve_library_path, LIBRARY_PATH_VAR};
use crate::vpn::log_decoder::{LogLineDecoder, ParsedEvent};
use crate::vpn::output_stream::{merged_output, EngineOutput};
use crate::vpn::state::SupervisorState;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Default time the engine gets to exit after SIGTERM before it is killed
pub const DEFAULT_TERMINATION_GRACE: Duration = Duration::from_secs(5);

const TMPDIR_VAR: &str = "TMPDIR";

/// Whether the end of a run is announced to the rest of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownMode {
    /// Publish the "no process running" state and notify the lifecycle listener
    #[default]
    Announce,

    /// Stay quiet, the engine is being replaced by a new one
    Silent,
}

/// Listener told when the engine process is gone and cleanup is done
pub trait ProcessLifecycle: Send + Sync {
    fn process_stopped(&self);
}

impl<F> ProcessLifecycle for F
where
    F: Fn() + Send + Sync,
{
    fn process_stopped(&self) {
        self()
    }
}

/// Command line and environment for the engine process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    /// Program followed by its arguments
    pub argv: Vec<String>,
    /// Directory holding the engine's native libraries
    pub native_lib_dir: String,
    /// Scratch directory exported as `TMPDIR`
    pub tmp_dir: String,
}

impl EngineCommand {
    pub fn new(argv: Vec<String>, native_lib_dir: impl Into<String>, tmp_dir: impl Into<String>) -> Self {
        Self {
            argv,
            native_lib_dir: native_lib_dir.into(),
            tmp_dir: tmp_dir.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum StopRequest {
    None,
    Stop,
    Replace,
}

/// Cloneable remote control for a running supervisor
///
/// Safe to use from any thread, before, during or after the run.
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    stop_tx: Arc<watch::Sender<StopRequest>>,
}

impl SupervisorHandle {
    fn request(&self, request: StopRequest) {
        self.stop_tx.send_modify(|current| *current = (*current).max(request));
    }

    /// Terminate the engine process
    pub fn stop(&self) {
        self.request(StopRequest::Stop);
    }

    /// Terminate the engine process without announcing the disconnect
    pub fn replace(&self) {
        self.request(StopRequest::Replace);
    }

    /// Whether a stop or replace has been requested
    pub fn is_stop_requested(&self) -> bool {
        *self.stop_tx.borrow() != StopRequest::None
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    /// Exit value of the engine; 128 + N if it was killed by signal N
    pub exit_code: i32,
    /// The output loop ended because of a stop request or a read failure
    pub interrupted: bool,
    /// Crash dump log written during shutdown
    pub dump_log: Option<PathBuf>,
    pub state: SupervisorState,
}

/// Supervises a single run of the engine process
pub struct Supervisor {
    command: EngineCommand,
    sink: Arc<dyn StatusSink>,
    lifecycle: Option<Arc<dyn ProcessLifecycle>>,
    decoder: LogLineDecoder,
    shutdown_mode: ShutdownMode,
    termination_grace: Duration,
    stop_tx: Arc<watch::Sender<StopRequest>>,
    state: SupervisorState,
    dump_path: Option<PathBuf>,
}

impl Supervisor {
    /// Create a supervisor reporting to `sink`
    pub fn new(command: EngineCommand, sink: Arc<dyn StatusSink>) -> Self {
        let (stop_tx, _) = watch::channel(StopRequest::None);
        Self {
            command,
            sink,
            lifecycle: None,
            decoder: LogLineDecoder::new(),
            shutdown_mode: ShutdownMode::default(),
            termination_grace: DEFAULT_TERMINATION_GRACE,
            stop_tx: Arc::new(stop_tx),
            state: SupervisorState::NotStarted,
            dump_path: None,
        }
    }

    pub fn with_shutdown_mode(mut self, mode: ShutdownMode) -> Self {
        self.shutdown_mode = mode;
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn ProcessLifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    pub fn with_decoder(mut self, decoder: LogLineDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_termination_grace(mut self, grace: Duration) -> Self {
        self.termination_grace = grace;
        self
    }

    /// Handle for stopping this supervisor from elsewhere
    pub fn handle(&self) -> SupervisorHandle {
        SupervisorHandle {
            stop_tx: Arc::clone(&self.stop_tx),
        }
    }

    /// Run the engine to completion
    ///
    /// Only a failure to start the engine is returned as an error. Once the
    /// engine runs, every problem is reported through the status sink and
    /// shutdown always completes.
    #[tracing::instrument(name = "supervisor", skip_all)]
    pub async fn run(mut self) -> Result<ExitReport, SupervisorError> {
        info!("Starting engine process");
        let mut stop_rx = self.stop_tx.subscribe();

        let (mut child, output) = match self.spawn() {
            Ok(started) => started,
            Err(e) => {
                self.sink.log_exception("Starting engine process", &e);
                return Err(e);
            }
        };
        self.advance(SupervisorState::Running);

        let interrupted = self.pump(output, &mut stop_rx).await;
        self.advance(if interrupted {
            SupervisorState::Cancelled
        } else {
            SupervisorState::StreamEnded
        });

        let exit_code = self.reap(&mut child, &mut stop_rx, interrupted).await;
        self.advance(SupervisorState::Terminated(exit_code));
        info!(exit_code, "Engine process exited");

        if exit_code != 0 {
            self.sink
                .log_error(&format!("Process exited with exit value {}", exit_code));
        }

        if self.announces(&stop_rx) {
            self.sink.update_state(StateUpdate::no_process());
        }

        let dump_log = self
            .dump_path
            .as_deref()
            .and_then(|path| crash_dump::materialize(self.sink.as_ref(), path));

        if self.announces(&stop_rx) {
            if let Some(lifecycle) = &self.lifecycle {
                lifecycle.process_stopped();
            }
        }

        info!("Supervisor exiting");
        Ok(ExitReport {
            exit_code,
            interrupted,
            dump_log,
            state: self.state,
        })
    }

    fn advance(&mut self, next: SupervisorState) {
        let previous = self.state;
        if self.state.advance(next) {
            debug!("Supervisor state: {} -> {}", previous, next);
        } else {
            warn!("Ignored supervisor state transition {} -> {}", previous, next);
        }
    }

    fn announces(&self, stop_rx: &watch::Receiver<StopRequest>) -> bool {
        self.shutdown_mode == ShutdownMode::Announce && *stop_rx.borrow() != StopRequest::Replace
    }

    fn spawn(&self) -> Result<(Child, EngineOutput), SupervisorError> {
        let (program, args) = self
            .command
            .argv
            .split_first()
            .ok_or(SupervisorError::EmptyCommandLine)?;

        let inherited = std::env::var(LIBRARY_PATH_VAR).ok();
        let library_path =
            resolve_library_path(program, &self.command.native_lib_dir, inherited.as_deref());
        debug!(%library_path, tmp_dir = %self.command.tmp_dir, "Prepared engine environment");

        let (stdout, stderr, output) =
            merged_output().map_err(|e| SupervisorError::OutputCaptureFailed {
                reason: e.to_string(),
            })?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .env(LIBRARY_PATH_VAR, &library_path)
            .env(TMPDIR_VAR, &self.command.tmp_dir)
            .stdin(Stdio::piped())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true);

        let spawned = cmd.spawn();
        // The command holds our copies of the pipe's write end
        drop(cmd);

        let mut child = spawned.map_err(|e| SupervisorError::ProcessSpawnError {
            program: program.clone(),
            reason: e.to_string(),
        })?;
        debug!("Engine process spawned with PID: {:?}", child.id());

        // Nothing is ever written to the engine, close its input right away
        drop(child.stdin.take());

        Ok((child, output))
    }

    /// Forward engine output until it ends or a stop is requested
    ///
    /// Returns `true` if the loop was interrupted rather than reaching the
    /// end of the output.
    async fn pump(
        &mut self,
        mut output: EngineOutput,
        stop_rx: &mut watch::Receiver<StopRequest>,
    ) -> bool {
        loop {
            let next = tokio::select! {
                biased;
                _ = stop_requested(stop_rx) => Err(interrupted_error()),
                line = output.next_line() => line,
            };

            match next {
                Ok(Some(line)) => self.handle_line(&line),
                Ok(None) => {
                    debug!("Engine closed its output");
                    return false;
                }
                Err(e) => {
                    warn!("Stopped reading engine output: {}", e);
                    self.sink
                        .log_exception("Error reading from output of engine process", &e);
                    return true;
                }
            }

            if *stop_rx.borrow() != StopRequest::None {
                let e = interrupted_error();
                warn!("Stopped reading engine output: {}", e);
                self.sink
                    .log_exception("Error reading from output of engine process", &e);
                return true;
            }
        }
    }

    fn handle_line(&mut self, line: &str) {
        match self.decoder.decode(line) {
            ParsedEvent::DumpPath { path } => {
                info!("Engine announced crash dump at {}", path);
                self.dump_path = Some(PathBuf::from(path));
            }
            ParsedEvent::Status {
                level,
                verbosity,
                message,
            } => {
                self.sink.log_message(level, verbosity, &message);
                self.sink.add_extra_hints(&message);
            }
            ParsedEvent::Raw { text } => {
                self.sink.log_info(&ParsedEvent::passthrough_text(&text));
            }
        }
    }

    /// Collect the exit value of the child, terminating it first if needed
    ///
    /// A child that closed its output but keeps running is still terminated
    /// when a stop arrives while waiting for it.
    async fn reap(
        &self,
        child: &mut Child,
        stop_rx: &mut watch::Receiver<StopRequest>,
        interrupted: bool,
    ) -> i32 {
        let status = if interrupted {
            self.terminate(child).await
        } else {
            tokio::select! {
                status = child.wait() => status,
                _ = stop_requested(stop_rx) => {
                    info!("Stop requested while waiting for the engine to exit");
                    self.terminate(child).await
                }
            }
        };

        collected_exit_value(self.sink.as_ref(), status)
    }

    /// SIGTERM, then SIGKILL once the grace period runs out
    async fn terminate(&self, child: &mut Child) -> io::Result<ExitStatus> {
        if let Some(raw_pid) = child.id() {
            let pid = Pid::from_raw(raw_pid as i32);
            info!("Sending SIGTERM to engine process {}", pid);

            match kill(pid, Signal::SIGTERM) {
                Ok(()) => match tokio::time::timeout(self.termination_grace, child.wait()).await {
                    Ok(status) => return status,
                    Err(_) => warn!(
                        "Engine did not exit within {:?}, sending SIGKILL",
                        self.termination_grace
                    ),
                },
                Err(e) => debug!("SIGTERM to {} failed: {}", pid, e),
            }
        }

        if let Err(e) = child.start_kill() {
            debug!("Kill request not delivered: {}", e);
        }
        child.wait().await
    }
}

/// Resolves once a stop or replace has been requested
async fn stop_requested(stop_rx: &mut watch::Receiver<StopRequest>) {
    // The sender lives as long as the supervisor, so this only ends on a request
    let _ = stop_rx
        .wait_for(|request| *request != StopRequest::None)
        .await;
}

fn interrupted_error() -> io::Error {
    io::Error::new(
        io::ErrorKind::Interrupted,
        "engine process was stopped by the supervisor",
    )
}

/// Exit value of a reaped child
///
/// A status that could not be collected is reported to the sink and counts
/// as 0, so no second "exited with" error follows.
fn collected_exit_value(sink: &dyn StatusSink, status: io::Result<ExitStatus>) -> i32 {
    match status {
        Ok(status) => exit_value(status),
        Err(e) => {
            warn!("Failed to collect engine exit status: {}", e);
            sink.log_error(&format!("Failed to retrieve engine exit status: {}", e));
            0
        }
    }
}

/// Exit code, or 128 + signal number for a child killed by a signal
fn exit_value(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}
