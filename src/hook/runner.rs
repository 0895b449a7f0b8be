//! Fire-and-forget hook dispatch
//!
//! Hooks are spawned as detached child processes. The probing loop never
//! waits for them and never acts on their exit status. Each child is
//! handed to a short-lived reaper thread so exited hooks do not linger as
//! zombies.

use std::io;
use std::process::{Command, Stdio};
use std::thread;

use tracing::{debug, error, info, warn};

use crate::events::DetectorEvent;

/// A hook command: one program and at most one argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookSpec {
    pub program: String,
    pub argument: Option<String>,
}

impl HookSpec {
    /// Split a command string on whitespace.
    ///
    /// Returns `None` for an empty command. Tokens after the first argument
    /// are dropped.
    pub fn parse(command: &str) -> Option<Self> {
        let mut tokens = command.split_whitespace();
        let program = tokens.next()?.to_string();
        let argument = tokens.next().map(str::to_string);

        let extra = tokens.count();
        if extra > 0 {
            debug!(%program, extra, "ignoring extra hook arguments");
        }

        Some(Self { program, argument })
    }
}

impl std::fmt::Display for HookSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.argument {
            Some(arg) => write!(f, "{} {}", self.program, arg),
            None => write!(f, "{}", self.program),
        }
    }
}

/// Errors that can occur while spawning a hook
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("failed to spawn hook {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Capability to start a detached process
pub trait Spawner {
    /// Start the hook and return the child's process id
    fn spawn(&self, hook: &HookSpec) -> Result<u32, HookError>;
}

/// Spawns hooks as real child processes, resolved through `PATH`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessSpawner;

impl ProcessSpawner {
    /// Build the command for `hook`.
    ///
    /// Stdin is detached: with device `-` it carries the capture stream.
    fn command(hook: &HookSpec) -> Command {
        let mut command = Command::new(&hook.program);
        command.args(hook.argument.iter()).stdin(Stdio::null());
        command
    }
}

impl Spawner for ProcessSpawner {
    fn spawn(&self, hook: &HookSpec) -> Result<u32, HookError> {
        let mut child = Self::command(hook)
            .spawn()
            .map_err(|source| HookError::Spawn {
                program: hook.program.clone(),
                source,
            })?;

        let pid = child.id();

        let reaper = thread::Builder::new()
            .name(format!("hook-reaper-{pid}"))
            .spawn(move || match child.wait() {
                Ok(status) => debug!(pid, %status, "hook exited"),
                Err(e) => debug!(pid, error = %e, "failed to reap hook"),
            });

        if let Err(e) = reaper {
            warn!(pid, error = %e, "failed to start hook reaper");
        }

        Ok(pid)
    }
}

/// Maps detector events to the configured hooks
pub struct HookRunner<S = ProcessSpawner> {
    spawner: S,
    on_sound: Option<HookSpec>,
    on_silence: Option<HookSpec>,
}

impl<S: Spawner> HookRunner<S> {
    pub fn new(spawner: S, on_sound: Option<HookSpec>, on_silence: Option<HookSpec>) -> Self {
        Self {
            spawner,
            on_sound,
            on_silence,
        }
    }

    /// Start the hook for `event`, if one is configured.
    ///
    /// Never blocks on the child and never fails: spawn errors are logged
    /// and dropped.
    pub fn dispatch(&self, event: DetectorEvent) {
        let hook = match event {
            DetectorEvent::SoundDetected => self.on_sound.as_ref(),
            DetectorEvent::SilenceDetected => self.on_silence.as_ref(),
        };

        let Some(hook) = hook else {
            debug!(%event, "no hook configured");
            return;
        };

        info!(%event, %hook, "spawning hook");

        match self.spawner.spawn(hook) {
            Ok(pid) => debug!(pid, %hook, "hook started"),
            Err(e) => error!(error = %e, "hook dispatch failed"),
        }
    }
}
