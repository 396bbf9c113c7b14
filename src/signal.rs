//! SIGINT/SIGTERM handling
//!
//! The handler only flips a static flag; the process runner polls it
//! through a [`CancelToken`] and kills the running child.

use pkgkit::CancelToken;
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_signal(_signum: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Install the handlers and return the token they trip.
pub fn install() -> CancelToken {
    #[cfg(unix)]
    {
        let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        for signum in [libc::SIGINT, libc::SIGTERM] {
            // SAFETY: the handler only stores to an atomic, which is async-signal-safe
            let previous = unsafe { libc::signal(signum, handler) };
            if previous == libc::SIG_ERR {
                log::warn!("Could not install handler for signal {signum}");
            }
        }
    }

    CancelToken::from_static(&INTERRUPTED)
}

/// Whether a termination signal arrived.
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}
