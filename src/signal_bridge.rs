/*
 * signal_bridge.rs
 *
 * Bridges POSIX signals into the orchestration world, where "kill the
 * portfolio" means closing over a Task and a command list, not calling
 * exit(). Signal handlers can only call async-signal-safe functions, so
 * the handler itself does nothing but write one byte to a self-pipe
 * (exactly the trick the teacher crate's runner.rs used for SIGCHLD/SIGINT
 * forwarding); a background thread blocks reading that pipe and runs the
 * real teardown logic outside handler context.
 *
 * jsi/cli.py's setup_signal_handlers does the same shape with Python-level
 * primitives: a threading.Event set by the signal handler, a background
 * thread waiting on it, and an atexit hook for the no-signal exit path. The
 * self-pipe here is the std analogue of that Event.
 */

use std::io::Read;
use std::os::fd::FromRawFd;
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Once, OnceLock};
use std::thread;
use std::thread::JoinHandle;

use crate::signal::{self, INTERRUPTION_SIGNALS};

static PIPE_WRITE_FD: AtomicI32 = AtomicI32::new(-1);
static INSTALLED: Once = Once::new();
static RECEIVED_SIGNAL: AtomicI32 = AtomicI32::new(0);
static SHUTDOWN: AtomicBool = AtomicBool::new(false);
static ATEXIT_CALLBACK: OnceLock<Box<dyn Fn(i32) + Send + Sync>> = OnceLock::new();

/// Registered via `libc::atexit` so a normal exit (every Command finished,
/// no signal ever arrived) still tears the portfolio down -- the same
/// backstop `jsi/cli.py`'s `atexit.register(cleanup)` gives the no-signal
/// path. `atexit` callbacks take no user data, so the real callback lives
/// in `ATEXIT_CALLBACK` instead of being captured here.
extern "C" fn run_atexit_callback() {
    if SHUTDOWN.swap(true, Ordering::SeqCst) {
        return;
    }
    if let Some(callback) = ATEXIT_CALLBACK.get() {
        tracing::debug!("process exiting without a signal, running portfolio cleanup");
        callback(0);
    }
}

extern "C" fn handle_signal(sig: i32) {
    RECEIVED_SIGNAL.store(sig, Ordering::SeqCst);
    let fd = PIPE_WRITE_FD.load(Ordering::SeqCst);
    if fd >= 0 {
        let byte: [u8; 1] = [1];
        // SAFETY: write(2) on a pipe fd is async-signal-safe; the result is
        // intentionally ignored (a full pipe buffer or an already-closed
        // read end just means a later signal will deliver the wakeup).
        unsafe {
            libc::write(fd, byte.as_ptr().cast(), 1);
        }
    }
}

fn install_handlers(write_fd: RawFd) {
    PIPE_WRITE_FD.store(write_fd, Ordering::SeqCst);

    for sig in INTERRUPTION_SIGNALS {
        // SAFETY: libc::sigaction is a C struct with no invalid bit
        // patterns; every field is set explicitly below before use.
        let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
        action.sa_sigaction = handle_signal as usize;
        // SAFETY: sigemptyset on a stack-local sigaction we own.
        unsafe {
            libc::sigemptyset(&raw mut action.sa_mask);
        }
        action.sa_flags = 0;

        // SAFETY: action is fully initialized and valid for the lifetime of
        // the process; sigaction with a function-pointer handler has no
        // other preconditions.
        unsafe {
            libc::sigaction(sig.as_raw(), &action, std::ptr::null_mut());
        }
    }
}

/// Installs handlers for SIGINT/SIGTERM/SIGQUIT/SIGHUP, plus an `atexit`
/// hook for the no-signal exit path, that invoke `on_signal` exactly once
/// from a dedicated background thread (never from signal-handler context).
/// Idempotent process-wide: only the first call actually installs anything.
///
/// Returns a join handle for the background thread; the caller does not
/// need to join it -- it's a daemon thread that exits once `on_signal`
/// returns and is dropped along with the process.
pub fn install<F>(on_signal: F) -> JoinHandle<()>
where
    F: Fn(i32) + Send + Sync + 'static,
{
    let on_signal = Arc::new(on_signal);

    let mut fds = [0i32; 2];
    // SAFETY: fds is a valid 2-element array for pipe(2) to fill.
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
    assert!(rc == 0, "failed to create self-pipe for signal bridge");
    let (read_fd, write_fd) = (fds[0], fds[1]);

    INSTALLED.call_once(|| {
        install_handlers(write_fd);
        let for_exit = Arc::clone(&on_signal);
        let _ = ATEXIT_CALLBACK.set(Box::new(move |sig| for_exit(sig)));
        // SAFETY: run_atexit_callback reads only the statics above and is
        // safe to invoke at normal process exit.
        unsafe {
            libc::atexit(run_atexit_callback);
        }
    });

    let callback = Arc::clone(&on_signal);
    thread::Builder::new()
        .name("signal-bridge".to_string())
        .spawn(move || {
            // SAFETY: read_fd was just returned by pipe(2) above and is
            // owned exclusively by this thread from here on.
            let mut file = unsafe { std::fs::File::from_raw_fd(read_fd) };
            let mut buf = [0u8; 1];
            if file.read_exact(&mut buf).is_ok() && !SHUTDOWN.swap(true, Ordering::SeqCst) {
                let sig = RECEIVED_SIGNAL.load(Ordering::SeqCst);
                tracing::info!(signal = signal::Signal::try_from_raw(sig).map(signal::signal_name).unwrap_or("?"), "signal received, tearing down portfolio");
                callback(sig);
            }
        })
        .expect("failed to spawn signal bridge thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn delivers_callback_on_signal() {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let _handle = install(move |sig| {
            let _ = tx.lock().unwrap_or_else(std::sync::PoisonError::into_inner).send(sig);
        });

        // SIGHUP's default disposition is "terminate", but install() above
        // replaced it with our handler, so raising it here just exercises
        // the self-pipe wakeup rather than ending the test process.
        // SAFETY: raise(2) targets only the current process.
        unsafe {
            libc::raise(libc::SIGHUP);
        }

        let received = rx
            .recv_timeout(Duration::from_millis(500))
            .expect("signal bridge did not deliver callback");
        assert_eq!(received, libc::SIGHUP);
    }
}
