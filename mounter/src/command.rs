//! `mount(8)` and `umount(8)` invocation.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{Error, Result};

/// Mount `source` on `target` with the given filesystem type and options.
///
/// Runs `mount -t <fs_type> [-o <options>] <source> <target>`. The options
/// are passed as a single comma-separated `-o` argument in the order given.
pub fn mount(source: &str, target: &Path, fs_type: &str, options: &[String]) -> Result<()> {
    debug_assert!(!source.is_empty(), "source must not be empty");

    let mut cmd = Command::new("mount");
    if !fs_type.is_empty() {
        cmd.args(["-t", fs_type]);
    }
    if !options.is_empty() {
        cmd.arg("-o").arg(options.join(","));
    }
    cmd.arg(source).arg(target);

    debug!(
        source,
        target = %target.display(),
        fs_type,
        ?options,
        "mounting"
    );
    run("mount", cmd)
}

/// Unmount whatever is mounted on `target`.
pub fn unmount(target: &Path) -> Result<()> {
    let mut cmd = Command::new("umount");
    cmd.arg(target);

    debug!(target = %target.display(), "unmounting");
    run("umount", cmd)
}

fn run(program: &'static str, mut cmd: Command) -> Result<()> {
    let output = cmd
        .output()
        .map_err(|source| Error::Spawn { program, source })?;

    if output.status.success() {
        return Ok(());
    }

    // Callers embed this text in single-line RPC messages.
    let stderr = String::from_utf8_lossy(&output.stderr)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("; ");

    Err(Error::Failed {
        program,
        status: output.status,
        stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_reports_missing_binary() {
        let cmd = Command::new("/nonexistent/definitely-not-mount");
        let err = run("mount", cmd).expect_err("spawn should fail");

        assert!(matches!(err, Error::Spawn { program: "mount", .. }));
        assert!(err.to_string().starts_with("failed to run mount: "));
    }

    #[test]
    fn run_collapses_multiline_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args([
            "-c",
            "printf 'first line\\n\\n  second line  \\n' >&2; exit 32",
        ]);

        let err = run("mount", cmd).expect_err("command should fail");
        match &err {
            Error::Failed { stderr, status, .. } => {
                assert_eq!(stderr, "first line; second line");
                assert_eq!(status.code(), Some(32));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!err.to_string().contains('\n'));
    }

    #[test]
    fn run_succeeds_on_zero_exit() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "exit 0"]);
        run("umount", cmd).expect("zero exit should succeed");
    }
}
