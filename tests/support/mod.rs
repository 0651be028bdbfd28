use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

pub const LOG_FILE: &str = "task_log.txt";

/// Isolated working directory for one tm test.
pub struct TestDir {
    dir: TempDir,
}

#[allow(dead_code)]
impl TestDir {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.path().join(LOG_FILE)
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_log(&self, lines: &[&str]) -> std::io::Result<PathBuf> {
        let mut body = lines.join("\n");
        body.push('\n');
        self.write_file(LOG_FILE, &body)
    }

    pub fn read_log(&self) -> std::io::Result<Vec<String>> {
        let path = self.log_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        Ok(fs::read_to_string(path)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    pub fn tm(&self) -> Command {
        let mut cmd = tm_cmd();
        cmd.current_dir(self.path());
        cmd
    }

    /// Run a command with `--json`, expect success and return the envelope.
    pub fn tm_json(&self, args: &[&str]) -> Result<Value, Box<dyn std::error::Error>> {
        let output = self.tm().args(args).arg("--json").output()?;
        if !output.status.success() {
            return Err(format!(
                "tm {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stdout)
            )
            .into());
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

pub fn tm_cmd() -> Command {
    let mut cmd = Command::cargo_bin("tm").expect("tm binary");
    cmd.env_remove("TM_DIR")
        .env_remove("TM_LOG")
        .env_remove("RUST_LOG");
    cmd
}
