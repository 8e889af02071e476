//! External speech processes
//!
//! The synthesizer and the player are separate programs started once per
//! utterance. `ProcessRegistry` runs each one to completion and remembers it
//! while it is alive so that a hard stop can terminate it from another thread.
//!
//! The registry lock is only taken to insert, poll or remove a child. Waiting
//! happens by polling with the lock released, so `kill_all` never queues
//! behind a multi-second utterance.
//!
//! `halt` is the stop switch: it kills what is running and refuses to start
//! anything new until `resume` is called.

use log::{debug, warn};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::io::{self, Read};
use std::process::{Child, ChildStderr, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

/// How often a running child is polled for exit
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Most stderr kept for error messages; the rest is read and dropped
const MAX_STDERR: usize = 4096;

/// Result of one finished external process
#[derive(Debug)]
pub struct Finished {
    pub status: ExitStatus,

    /// Captured stderr, for error messages
    pub stderr: String,

    /// True if the process was terminated by `kill_all`
    pub killed: bool,
}

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    children: Mutex<HashMap<u64, Child>>,
    killed: Mutex<Vec<u64>>,

    /// Set by `halt`, cleared by `resume`; only changed with `children` locked
    halted: AtomicBool,
}

/// Tracks the speech processes currently running
#[derive(Clone, Default)]
pub struct ProcessRegistry {
    inner: Arc<Inner>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn children(&self) -> MutexGuard<'_, HashMap<u64, Child>> {
        self.inner
            .children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn killed(&self) -> MutexGuard<'_, Vec<u64>> {
        self.inner
            .killed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `cmd` and block until it exits
    ///
    /// stdout is discarded and stderr captured. Returns the spawn error if
    /// the program could not be started, or `Interrupted` if the registry
    /// is halted.
    pub fn run(&self, mut cmd: Command) -> io::Result<Finished> {
        if self.is_halted() {
            return Err(halted_error());
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::piped());

        debug!("Spawning {:?}", cmd);
        let mut child = cmd.spawn()?;
        let stderr = child.stderr.take().map(drain_stderr);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut children = self.children();
            if self.is_halted() {
                // Halted while spawning; `kill_all` could not have seen it
                drop(children);
                debug!("Registry halted during spawn; killing new process");
                let _ = child.kill();
                let status = child.wait()?;
                return Ok(Finished {
                    status,
                    stderr: join_stderr(stderr),
                    killed: true,
                });
            }
            children.insert(id, child);
        }

        let status = loop {
            {
                let mut children = self.children();
                let Some(child) = children.get_mut(&id) else {
                    return Err(io::Error::new(
                        io::ErrorKind::Other,
                        "speech process vanished from registry",
                    ));
                };
                match child.try_wait() {
                    Ok(Some(status)) => {
                        children.remove(&id);
                        break status;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        if let Some(mut child) = children.remove(&id) {
                            let _ = child.kill();
                            let _ = child.wait();
                        }
                        return Err(e);
                    }
                }
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let stderr = join_stderr(stderr);

        let killed = {
            let mut killed = self.killed();
            let before = killed.len();
            killed.retain(|k| *k != id);
            killed.len() != before
        };

        debug!("Speech process exited with {} (killed: {})", status, killed);
        Ok(Finished {
            status,
            stderr,
            killed,
        })
    }

    fn is_halted(&self) -> bool {
        self.inner.halted.load(Ordering::Acquire)
    }

    /// Kill everything running and refuse new processes until `resume`
    ///
    /// Returns how many processes were signalled.
    pub fn halt(&self) -> usize {
        {
            let _children = self.children();
            self.inner.halted.store(true, Ordering::Release);
        }
        self.kill_all()
    }

    /// Allow processes to be started again after `halt`
    pub fn resume(&self) {
        let _children = self.children();
        self.inner.halted.store(false, Ordering::Release);
    }

    /// Number of processes currently running
    pub fn running(&self) -> usize {
        self.children().len()
    }

    /// Terminate every running speech process
    ///
    /// Sends SIGTERM and returns without waiting; the thread blocked in
    /// `run` reaps the child. Returns how many processes were signalled.
    pub fn kill_all(&self) -> usize {
        let children = self.children();
        let mut signalled = Vec::new();

        for (id, child) in children.iter() {
            let Ok(raw) = i32::try_from(child.id()) else {
                continue;
            };
            match kill(Pid::from_raw(raw), Signal::SIGTERM) {
                Ok(()) => signalled.push(*id),
                Err(e) => warn!("Failed to signal speech process {}: {}", raw, e),
            }
        }
        drop(children);

        let count = signalled.len();
        if count > 0 {
            debug!("Sent SIGTERM to {} speech process(es)", count);
            self.killed().extend(signalled);
        }
        count
    }
}

fn halted_error() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, "speech stopped")
}

/// Read stderr on its own thread so a chatty child never blocks on a full pipe
fn drain_stderr(mut pipe: ChildStderr) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut kept = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    let room = MAX_STDERR.saturating_sub(kept.len());
                    kept.extend_from_slice(&chunk[..n.min(room)]);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("Failed to read speech process stderr: {}", e);
                    break;
                }
            }
        }
        String::from_utf8_lossy(&kept).trim().to_string()
    })
}

fn join_stderr(reader: Option<JoinHandle<String>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
