use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// An isolated project directory for running the `wit` binary.
pub struct WitWorkspace {
    pub temp_dir: TempDir,
}

impl WitWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `contents` to `name` inside the workspace and return its path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root().join(name);
        fs::write(&path, contents).expect("write file");
        path
    }

    /// A `wit` command running inside the workspace with a clean environment.
    pub fn wit(&self) -> Command {
        let mut cmd = Command::cargo_bin("wit").expect("wit binary");
        cmd.current_dir(self.root())
            .env("HOME", self.root())
            .env_remove("RUST_LOG")
            .env_remove("WIT_DB")
            .env_remove("WIT_LOCK_TIMEOUT")
            .env_remove("WIT_QUALIFY_COLUMNS");
        cmd
    }
}

/// Run `wit` with `--json` and parse stdout.
pub fn run_json<I, S>(workspace: &WitWorkspace, args: I) -> serde_json::Value
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let output = workspace
        .wit()
        .args(args)
        .arg("--json")
        .output()
        .expect("run wit");
    assert!(
        output.status.success(),
        "wit failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("parse json output")
}
