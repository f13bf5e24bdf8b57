#![cfg(unix)]

use std::{
    io::{BufRead, BufReader},
    process::{Child, Command, ExitStatus, Stdio},
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

const DEADLINE: Duration = Duration::from_secs(10);

struct Daemon {
    child: Child,
    lines: mpsc::Receiver<String>,
}

impl Daemon {
    fn spawn(args: &[&str]) -> Daemon {
        let mut child = Command::new(env!("CARGO_BIN_EXE_trapdoord"))
            .args(args)
            .env("RUST_LOG", "info")
            .env_remove("TRAPDOOR_TOLERATED_SIGNALS")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to spawn trapdoord");

        let stdout = child.stdout.take().expect("stdout is piped");
        let (tx, lines) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        let daemon = Daemon { child, lines };
        daemon.wait_for_line("daemon running");
        daemon
    }

    fn wait_for_line(&self, needle: &str) {
        let started = Instant::now();
        while let Some(remaining) = DEADLINE.checked_sub(started.elapsed()) {
            match self.lines.recv_timeout(remaining) {
                Ok(line) if line.contains(needle) => return,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
        panic!("daemon never logged {needle:?}");
    }

    fn signal(&self, name: &str) {
        let status = Command::new("kill")
            .args(["-s", name, &self.child.id().to_string()])
            .status()
            .expect("failed to run kill");
        assert!(status.success());
    }

    fn wait(mut self) -> ExitStatus {
        let started = Instant::now();
        while started.elapsed() < DEADLINE {
            if let Some(status) = self.child.try_wait().expect("failed to poll daemon") {
                return status;
            }
            thread::sleep(Duration::from_millis(20));
        }
        let _ = self.child.kill();
        panic!("daemon did not exit in time");
    }
}

#[test]
fn single_terminate_runs_cleanup_and_exits_zero() {
    let daemon = Daemon::spawn(&["serve", "100"]);

    daemon.signal("TERM");
    daemon.wait_for_line("cleanup finished");

    assert_eq!(daemon.wait().code(), Some(0));
}

#[test]
fn fourth_interrupt_forces_exit_past_hung_cleanup() {
    let daemon = Daemon::spawn(&["hang"]);

    daemon.signal("INT");
    daemon.wait_for_line("cleanup started");
    for _ in 0..3 {
        thread::sleep(Duration::from_millis(100));
        daemon.signal("INT");
    }

    assert_eq!(daemon.wait().code(), Some(130));
}

#[test]
fn third_interrupt_keeps_hung_daemon_alive() {
    let mut daemon = Daemon::spawn(&["hang"]);

    daemon.signal("INT");
    daemon.wait_for_line("cleanup started");
    for _ in 0..2 {
        thread::sleep(Duration::from_millis(100));
        daemon.signal("INT");
    }
    thread::sleep(Duration::from_millis(300));

    assert!(daemon.child.try_wait().unwrap().is_none());
    daemon.child.kill().unwrap();
    let _ = daemon.child.wait();
}
