//! Executable implementations: shell commands and in-process callbacks.

use async_trait::async_trait;
use cadence_core::{DispatchContext, Executable, HookError};
use futures::future::BoxFuture;
use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs a binding's command through the system shell.
///
/// `{project_root}`, `{subject}`, `{kind}`, `{predicted}`, `{confidence}` and
/// `{binding}` are substituted (shell-quoted) before execution and exported to
/// the child as `CADENCE_*` variables. On unix the shell leads its own
/// process group, and the whole group is killed if the run is dropped or
/// exceeds its timeout.
pub struct ShellExecutable {
    binding_id: String,
    command: String,
}

impl ShellExecutable {
    pub fn new(binding_id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            binding_id: binding_id.into(),
            command: command.into(),
        }
    }

    fn variables(&self, context: &DispatchContext) -> Vec<(&'static str, String)> {
        vec![
            ("project_root", context.project_root.clone()),
            ("subject", context.event.subject.clone()),
            ("kind", context.event.kind.to_string()),
            ("predicted", context.predicted.to_string()),
            ("confidence", format!("{:.3}", context.confidence)),
            ("binding", self.binding_id.clone()),
        ]
    }

    /// The command line with placeholders replaced.
    pub fn render(&self, context: &DispatchContext) -> String {
        let mut rendered = self.command.clone();
        for (name, value) in self.variables(context) {
            rendered = rendered.replace(&format!("{{{name}}}"), &shell_quote(&value));
        }
        rendered
    }
}

#[async_trait]
impl Executable for ShellExecutable {
    fn describe(&self) -> String {
        format!("shell: {}", self.command)
    }

    async fn run(&self, context: &DispatchContext, timeout: Duration) -> Result<String, HookError> {
        let command = self.render(context);
        debug!(binding = %self.binding_id, command = %command, "Executing hook command");

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", &command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", &command]);
            c
        };
        if !context.project_root.is_empty() {
            cmd.current_dir(&context.project_root);
        }
        for (name, value) in self.variables(context) {
            cmd.env(format!("CADENCE_{}", name.to_ascii_uppercase()), value);
        }
        // Own process group, so everything the shell forks can be killed with it
        #[cfg(unix)]
        {
            cmd.process_group(0);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| HookError::Spawn {
            binding: self.binding_id.clone(),
            reason: e.to_string(),
        })?;
        let mut group = ProcessGroup::new(child.id());

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Err(_) => {
                // `group` drops here and kills the whole tree
                return Err(HookError::Timeout {
                    binding: self.binding_id.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            Ok(Err(e)) => {
                return Err(HookError::ExecutionFailed {
                    binding: self.binding_id.clone(),
                    reason: e.to_string(),
                });
            }
            Ok(Ok(output)) => output,
        };
        group.release();

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            return Ok(stdout);
        }

        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!(binding = %self.binding_id, exit_code = code, "Hook command failed");
        Err(HookError::NonZeroExit {
            binding: self.binding_id.clone(),
            exit_code: code,
            stderr,
        })
    }
}

/// Kills a hook's process group when dropped, unless released.
///
/// Dropping happens on timeout and when the dispatcher aborts the run.
struct ProcessGroup {
    #[cfg_attr(not(unix), allow(dead_code))]
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    /// The shell exited on its own; leave the group alone.
    fn release(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            if let Some(pgid) = self.pgid.take() {
                // SAFETY: killpg has no memory-safety preconditions
                let rc = unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) };
                if rc == 0 {
                    debug!(pgid, "Killed hook process group");
                }
            }
        }
    }
}

/// Quote a value for `sh` unless it is made only of safe characters.
fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=,+@%".contains(c));
    if safe || cfg!(target_os = "windows") {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

type Callback = dyn Fn(DispatchContext) -> BoxFuture<'static, Result<String, HookError>> + Send + Sync;

/// Runs an async closure in-process. Used for built-in hooks and tests.
pub struct CallbackExecutable {
    name: String,
    callback: Arc<Callback>,
}

impl CallbackExecutable {
    pub fn new<F, Fut>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(DispatchContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, HookError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            callback: Arc::new(move |context| Box::pin(callback(context))),
        }
    }
}

#[async_trait]
impl Executable for CallbackExecutable {
    fn describe(&self) -> String {
        format!("callback: {}", self.name)
    }

    async fn run(&self, context: &DispatchContext, timeout: Duration) -> Result<String, HookError> {
        let fut = (self.callback)(context.clone());
        tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| HookError::Timeout {
                binding: self.name.clone(),
                timeout_ms: timeout.as_millis() as u64,
            })?
    }
}
