//! Child process supervision: line streaming and interrupt polling.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use log::trace;
use rocker_core::{EngineError, Interrupt, Progress};

/// The most recent lines of a child's output.
#[derive(Debug, Clone)]
pub(crate) struct Tail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Tail {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub(crate) fn push(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub(crate) fn into_vec(self) -> Vec<String> {
        self.lines.into()
    }
}

/// How a supervised child ended.
#[derive(Debug)]
pub(crate) struct Finished {
    pub(crate) exit_code: i32,
    pub(crate) tail: Vec<String>,
}

impl Finished {
    pub(crate) fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub(crate) fn into_error(self) -> EngineError {
        EngineError::failed(self.exit_code, self.tail)
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn forward_lines<R: Read + Send + 'static>(reader: R, tx: Sender<String>) {
    thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Runs `cmd` with piped stdout and stderr, forwarding each line to `progress`.
///
/// Kills the child and returns [`EngineError::Interrupted`] once `interrupt`
/// is triggered.
pub(crate) fn run_streaming(
    mut cmd: Command,
    interrupt: &Interrupt,
    poll_interval: Duration,
    tail_lines: usize,
    progress: Progress<'_>,
) -> Result<Finished, EngineError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(EngineError::Spawn)?;

    let (tx, rx) = mpsc::channel();
    if let Some(stdout) = child.stdout.take() {
        forward_lines(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(stderr, tx.clone());
    }
    drop(tx);

    let mut tail = Tail::new(tail_lines);
    let mut readers_done = false;

    let status = loop {
        if interrupt.is_triggered() {
            kill(&mut child);
            return Err(EngineError::Interrupted);
        }

        if readers_done {
            thread::sleep(poll_interval);
        } else {
            match rx.recv_timeout(poll_interval) {
                Ok(line) => {
                    trace!("{}", line);
                    progress(&line);
                    tail.push(line);
                    continue;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => readers_done = true,
            }
        }

        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(err) => {
                kill(&mut child);
                return Err(EngineError::Io(err));
            }
        }
    };

    // Lines written just before exit may still be in the pipes. A grandchild
    // can keep them open, so stop after one quiet poll interval.
    while let Ok(line) = rx.recv_timeout(poll_interval) {
        progress(&line);
        tail.push(line);
    }

    Ok(Finished {
        exit_code: exit_code(status),
        tail: tail.into_vec(),
    })
}

/// Runs `cmd` with inherited stdio until it exits.
///
/// When `interrupt` is triggered, `on_interrupt` is called to stop whatever
/// the child started, then the child is killed.
pub(crate) fn run_attached(
    mut cmd: Command,
    interrupt: &Interrupt,
    poll_interval: Duration,
    on_interrupt: impl FnOnce(),
) -> Result<i32, EngineError> {
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    let mut child = cmd.spawn().map_err(EngineError::Spawn)?;

    loop {
        if interrupt.is_triggered() {
            on_interrupt();
            kill(&mut child);
            return Err(EngineError::Interrupted);
        }
        match child.try_wait() {
            Ok(Some(status)) => return Ok(exit_code(status)),
            Ok(None) => thread::sleep(poll_interval),
            Err(err) => {
                kill(&mut child);
                return Err(EngineError::Io(err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_keeps_last_lines() {
        let mut tail = Tail::new(3);
        for i in 0..5 {
            tail.push(format!("line {}", i));
        }
        assert_eq!(tail.into_vec(), vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn test_zero_capacity_tail() {
        let mut tail = Tail::new(0);
        tail.push("ignored".to_string());
        assert!(tail.into_vec().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_streaming_collects_both_streams() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo out; echo err 1>&2; exit 3");
        let mut seen = Vec::new();
        let finished = run_streaming(
            cmd,
            &Interrupt::new(),
            Duration::from_millis(10),
            10,
            &mut |l| seen.push(l.to_string()),
        )
        .unwrap();

        assert_eq!(finished.exit_code, 3);
        assert!(!finished.success());
        seen.sort();
        assert_eq!(seen, vec!["err", "out"]);
        assert_eq!(finished.tail.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_streaming_interrupt_kills_child() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("sleep 30");
        let interrupt = Interrupt::new();
        interrupt.trigger();
        let result = run_streaming(cmd, &interrupt, Duration::from_millis(10), 10, &mut |_| {});
        assert!(matches!(result, Err(EngineError::Interrupted)));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_attached_interrupt_calls_hook() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("sleep 30");
        let interrupt = Interrupt::new();
        interrupt.trigger();
        let mut called = false;
        let result = run_attached(cmd, &interrupt, Duration::from_millis(10), || called = true);
        assert!(matches!(result, Err(EngineError::Interrupted)));
        assert!(called);
    }

    #[test]
    fn test_spawn_failure() {
        let cmd = Command::new("/nonexistent/docker-binary");
        let result = run_streaming(cmd, &Interrupt::new(), Duration::from_millis(10), 10, &mut |_| {});
        assert!(matches!(result, Err(EngineError::Spawn(_))));
    }
}
