//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use linkguard::config::SupervisorConfig;
use linkguard::notify::{EventKind, Notifier, TransitionEvent};
use tempfile::TempDir;

/// Stand-in for the sync tool, driven by files in the control directory.
///
/// - `<kind>_exit` holds the exit code for `mirror`, `probe` (dry run)
///   or `reconcile` runs; missing means 0
/// - `sleep` holds seconds to sleep before exiting
/// - every run appends `<kind> <args>` to `calls` and its pid to `pid`
const FAKE_SYNC: &str = r#"
ctl="__CONTROL__"
kind=mirror
dry=0
for arg in "$@"; do
    case "$arg" in
        --update) kind=reconcile ;;
        --dry-run) dry=1 ;;
    esac
done
if [ "$dry" = 1 ]; then kind=probe; fi
echo "$kind $*" >> "$ctl/calls"
echo $$ > "$ctl/pid"
if [ -f "$ctl/sleep" ]; then sleep "$(cat "$ctl/sleep")"; fi
code=0
if [ -f "$ctl/${kind}_exit" ]; then code=$(cat "$ctl/${kind}_exit"); fi
exit "$code"
"#;

/// A temp tree with primary, secondary, control dir and the access link.
pub struct Fixture {
    pub dir: TempDir,
    pub primary: PathBuf,
    pub secondary: PathBuf,
    pub link: PathBuf,
    pub control: PathBuf,
    pub script: PathBuf,
}

impl Fixture {
    /// Link points at the primary.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let primary = root.join("primary");
        let secondary = root.join("secondary");
        let control = root.join("control");
        let link = root.join("current");
        fs::create_dir(&primary).unwrap();
        fs::create_dir(&secondary).unwrap();
        fs::create_dir(&control).unwrap();
        symlink(&primary, &link).unwrap();

        let script = control.join("fake-sync.sh");
        let body = FAKE_SYNC.replace("__CONTROL__", &control.display().to_string());
        fs::write(&script, body).unwrap();

        Self {
            dir,
            primary,
            secondary,
            link,
            control,
            script,
        }
    }

    /// Fast settings: short kill polls, short interval, write probe enabled.
    pub fn config(&self) -> SupervisorConfig {
        let mut config = SupervisorConfig::default();
        config.paths.link = self.link.clone();
        config.paths.primary = self.primary.clone();
        config.paths.secondary = self.secondary.clone();
        config.sync.program = "sh".to_string();
        config.sync.extra_args = vec![self.script.display().to_string()];
        config.sync.timeout_ms = 5_000;
        config.sync.interval_ms = 10;
        config.probe.command = Some(format!("test ! -f {}/write_fail", self.control.display()));
        config.probe.timeout_ms = 5_000;
        config.runner.kill_poll_base_ms = 20;
        config.runner.kill_poll_attempts = 4;
        config
    }

    pub fn set_exit(&self, kind: &str, code: i32) {
        fs::write(self.control.join(format!("{}_exit", kind)), code.to_string()).unwrap();
    }

    pub fn set_sleep(&self, seconds: u32) {
        fs::write(self.control.join("sleep"), seconds.to_string()).unwrap();
    }

    pub fn fail_writes(&self, fail: bool) {
        let marker = self.control.join("write_fail");
        if fail {
            fs::write(marker, "").unwrap();
        } else {
            let _ = fs::remove_file(marker);
        }
    }

    /// Kinds of sync runs so far, oldest first.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.control.join("calls"))
            .unwrap_or_default()
            .lines()
            .map(|line| line.split_whitespace().next().unwrap_or_default().to_string())
            .collect()
    }

    /// Full argument lines of sync runs so far.
    pub fn call_lines(&self) -> Vec<String> {
        fs::read_to_string(self.control.join("calls"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Pid of the most recent sync run.
    pub async fn last_sync_pid(&self) -> i32 {
        read_pid(&self.control.join("pid")).await
    }

    pub fn link_target(&self) -> PathBuf {
        fs::read_link(&self.link).unwrap()
    }

    pub fn point_link_at(&self, target: &Path) {
        fs::remove_file(&self.link).unwrap();
        symlink(target, &self.link).unwrap();
    }

    /// The link resolves to exactly one of the two replicas.
    pub fn assert_link_valid(&self) {
        let resolved = fs::canonicalize(&self.link).unwrap();
        assert!(
            resolved == self.primary || resolved == self.secondary,
            "link resolves to {}",
            resolved.display()
        );
    }
}

/// Dead, or a zombie waiting to be reaped.
pub fn process_gone(pid: i32) -> bool {
    match fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit(')')
            .next()
            .map(|rest| rest.trim_start().starts_with('Z'))
            .unwrap_or(false),
        Err(_) => true,
    }
}

pub async fn wait_until_gone(pid: i32) -> bool {
    for _ in 0..100 {
        if process_gone(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

/// Wait for a child to write its pid to `path`.
pub async fn read_pid(path: &Path) -> i32 {
    for _ in 0..100 {
        if let Ok(text) = fs::read_to_string(path) {
            if let Ok(pid) = text.trim().parse() {
                return pid;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("no pid written to {}", path.display());
}

/// Keeps every event instead of sending mail.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<TransitionEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<TransitionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().iter().map(|event| event.kind).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &TransitionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
