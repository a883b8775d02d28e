use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Installs the SIGINT handler that flips the process-wide stop flag.
///
/// The handler only stores into the atomic; the accept loop notices the flag
/// between iterations and unwinds normally from there.
pub fn install() {
    let handler = on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t;
    unsafe {
        libc::signal(libc::SIGINT, handler);
    }
}

extern "C" fn on_sigint(_signum: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// The flag `install` wires the signal handler to.
pub fn flag() -> &'static AtomicBool {
    &SHUTDOWN
}
