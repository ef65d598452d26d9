#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, Command, ExitStatus, Output, Stdio};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use url::Url;

pub const PASSWORD: &str = "test-password";

/// Get live test settings from the environment.
/// Returns None if not set, causing tests to be skipped.
pub fn live_settings() -> Option<(String, String, String)> {
    let url = std::env::var("FILEDECK_TEST_URL").ok()?;
    let identity = std::env::var("FILEDECK_TEST_IDENTITY").ok()?;
    let password = std::env::var("FILEDECK_TEST_PASSWORD").ok()?;
    Some((url, identity, password))
}

/// An isolated home directory plus a local store for one test.
pub struct Sandbox {
    dir: TempDir,
    pub url: String,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let url = Url::from_directory_path(dir.path().join("store"))
            .expect("Failed to convert path to file URL")
            .to_string();
        std::fs::create_dir_all(dir.path().join("home")).unwrap();
        Self { dir, url }
    }

    pub fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_filedeck"));
        cmd.args(args);
        cmd.env("HOME", self.home());
        cmd.env("XDG_DATA_HOME", self.home().join("data"));
        cmd.env("FILEDECK_URL", &self.url);
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("FILEDECK_AUTH_COLLECTION");
        cmd.env_remove("FILEDECK_PASSWORD");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Run the CLI.
    pub fn run(&self, args: &[&str]) -> Output {
        self.command(args).output().expect("Failed to execute CLI")
    }

    /// Run the CLI and expect success, returning stdout.
    pub fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    /// Run the CLI and expect failure, returning stderr.
    pub fn run_err(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if output.status.success() {
            panic!("CLI command should have failed: {:?}", args);
        }
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    /// Run the CLI with `input` on stdin and expect success.
    pub fn run_with_stdin(&self, args: &[&str], input: &str) -> String {
        let mut cmd = self.command(args);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().expect("Failed to spawn CLI");
        child
            .stdin
            .as_mut()
            .expect("Failed to open stdin")
            .write_all(input.as_bytes())
            .expect("Failed to write to stdin");
        let output = child.wait_with_output().expect("Failed to wait for CLI");

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    /// Start the CLI in the background with piped output.
    pub fn spawn(&self, args: &[&str]) -> Child {
        self.command(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to spawn CLI")
    }

    /// Register `username` and log in as them.
    pub fn sign_in(&self, username: &str) {
        let email = format!("{}@example.com", username);
        self.run_ok(&[
            "register",
            "--username",
            username,
            "--email",
            &email,
            "--password",
            PASSWORD,
            "--password-confirm",
            PASSWORD,
        ]);
        self.run_ok(&["login", "--identity", username, "--password", PASSWORD]);
    }

    /// Id printed on an `Id: ...` line.
    pub fn printed_id(stdout: &str) -> String {
        stdout
            .lines()
            .find_map(|line| line.split_once("Id: "))
            .map(|(_, id)| id.trim().to_string())
            .expect("no id in output")
    }
}

/// JSON lines in stdout.
pub fn json_lines(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter(|l| l.starts_with('{'))
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

/// Reads stderr lines until one contains `needle`.
pub fn read_until(stderr: &mut BufReader<ChildStderr>, needle: &str) {
    let mut line = String::new();
    while !line.contains(needle) {
        line.clear();
        let read = stderr.read_line(&mut line).unwrap();
        assert!(read > 0, "CLI exited before printing '{}'", needle);
    }
}

/// Waits for a background CLI to exit, killing it after `secs`.
pub fn wait_exit(child: &mut Child, secs: u64) -> ExitStatus {
    let deadline = Instant::now() + Duration::from_secs(secs);
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("CLI did not exit within {}s", secs);
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

/// Everything left on a background CLI's stdout.
pub fn rest_of_stdout(child: &mut Child) -> String {
    let mut out = String::new();
    child
        .stdout
        .take()
        .expect("stdout not piped")
        .read_to_string(&mut out)
        .unwrap();
    out
}
