use crate::types::{ProbeResult, ProbeSpec};
use log::{debug, info, warn};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Run one probe to completion, or until `limit` elapses.
///
/// Never returns an error: spawn failures, non-zero exits and timeouts are all
/// reported as a failed `ProbeResult`. The child runs in its own process
/// group, and a timeout or dropping the returned future kills the whole group.
pub async fn run(name: &str, spec: &ProbeSpec, limit: Duration) -> ProbeResult {
    let started = Instant::now();
    let mut command = build_command(name, spec);

    debug!("Running probe {}: {:?}", name, spec);

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("Probe {} failed to start: {}", name, e);
            return ProbeResult::failed(
                name,
                format!("failed to start {}: {}", spec.command, e),
                started.elapsed(),
            );
        }
    };

    let mut group = ProcessGroupGuard::new(child.id());

    // On timeout the child is dropped with the future and killed, and the
    // guard takes down anything it left behind.
    let output = match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            group.disarm();
            output
        }
        Ok(Err(e)) => {
            warn!("Probe {} failed while collecting output: {}", name, e);
            return ProbeResult::failed(name, e.to_string(), started.elapsed());
        }
        Err(_) => {
            warn!("Probe {} timed out after {:?}", name, limit);
            return ProbeResult::failed(name, "timed out".to_string(), started.elapsed());
        }
    };

    let elapsed = started.elapsed();
    let stdout = String::from_utf8_lossy(&output.stdout);

    if output.status.success() {
        info!("Probe {} succeeded in {:?}", name, elapsed);
        ProbeResult {
            name: name.to_string(),
            succeeded: true,
            output: stdout.into_owned(),
            elapsed,
        }
    } else {
        warn!("Probe {} exited with {}", name, output.status);
        let stderr = String::from_utf8_lossy(&output.stderr);
        ProbeResult::failed(name, format!("{}{}", stdout, stderr), elapsed)
    }
}

fn build_command(name: &str, spec: &ProbeSpec) -> Command {
    let mut command = if spec.shell {
        let mut sh = Command::new("sh");
        // $0 is the probe name, args become $1..
        sh.arg("-c").arg(&spec.command).arg(name).args(&spec.args);
        sh
    } else {
        let mut direct = Command::new(&spec.command);
        direct.args(&spec.args);
        direct
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);
    command
}

/// Sends SIGKILL to a probe's process group when dropped, unless disarmed.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(pgid) = self.pgid.take() {
            debug!("Killing process group {}", pgid);
            // ESRCH just means the group is already gone.
            unsafe {
                libc::killpg(pgid as libc::pid_t, libc::SIGKILL);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_captures_stdout_only() {
        let spec = ProbeSpec::shell("echo out; echo err >&2");
        let result = run("echo", &spec, DEFAULT_PROBE_TIMEOUT).await;

        assert!(result.succeeded);
        assert_eq!(result.name, "echo");
        assert_eq!(result.output, "out\n");
    }

    #[tokio::test]
    async fn test_failure_combines_stdout_and_stderr() {
        let spec = ProbeSpec::shell("echo partial; echo broken >&2; exit 3");
        let result = run("bad", &spec, DEFAULT_PROBE_TIMEOUT).await;

        assert!(!result.succeeded);
        assert_eq!(result.output, "partial\nbroken\n");
    }

    #[tokio::test]
    async fn test_shell_args_are_positional_not_interpolated() {
        let mut spec = ProbeSpec::shell("printf '%s' \"$1\"");
        spec.args = vec!["; echo injected".to_string()];
        let result = run("printf", &spec, DEFAULT_PROBE_TIMEOUT).await;

        assert!(result.succeeded);
        assert_eq!(result.output, "; echo injected");
    }

    #[tokio::test]
    async fn test_direct_command_with_args() {
        let spec = ProbeSpec::new("echo", &["hello", "world"]);
        let result = run("echo", &spec, DEFAULT_PROBE_TIMEOUT).await;

        assert!(result.succeeded);
        assert_eq!(result.output, "hello world\n");
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported_as_failure() {
        let spec = ProbeSpec::new("definitely-not-a-real-probe-binary", &[]);
        let result = run("ghost", &spec, DEFAULT_PROBE_TIMEOUT).await;

        assert!(!result.succeeded);
        assert!(result.output.starts_with("failed to start definitely-not-a-real-probe-binary"));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timeout_kills_background_children() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("sleeper.pid");
        let mut spec = ProbeSpec::shell("sleep 30 & echo $! > \"$1\"; wait");
        spec.args = vec![pid_file.to_string_lossy().into_owned()];

        let result = run("sleeper", &spec, Duration::from_millis(500)).await;
        assert_eq!(result.output, "timed out");

        let pid = crate::test_support::read_pid(&pid_file);
        assert!(crate::test_support::exits_within(pid, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_timeout_kills_probe() {
        let spec = ProbeSpec::new("sleep", &["10"]);
        let started = Instant::now();
        let result = run("slow", &spec, Duration::from_millis(200)).await;

        assert!(!result.succeeded);
        assert_eq!(result.output, "timed out");
        assert!(result.elapsed >= Duration::from_millis(200));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
