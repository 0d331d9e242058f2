//! Puts the terminal back the way it was before the line editor started.
//!
//! The editor switches the terminal to raw mode for every read and only
//! switches it back when the read returns. When the session ends first, the
//! process exits with a read still pending and the editor's own cleanup never
//! runs.

#[cfg(unix)]
use std::io::Write;
#[cfg(unix)]
use std::os::fd::{AsFd, OwnedFd};

#[cfg(unix)]
use rustix::termios::{self, OptionalActions, Termios};
#[cfg(unix)]
use tracing::{debug, warn};

/// Undoes the editor's bracketed paste mode.
#[cfg(unix)]
const BRACKETED_PASTE_OFF: &str = "\x1b[?2004l";

#[cfg(unix)]
struct Saved {
    fd: OwnedFd,
    termios: Termios,
}

/// Terminal attributes captured up front, put back on [`restore`] and on
/// drop.
///
/// Inactive when the captured descriptor is not a terminal.
///
/// [`restore`]: TerminalGuard::restore
pub struct TerminalGuard {
    #[cfg(unix)]
    saved: Option<Saved>,
}

#[cfg(unix)]
impl TerminalGuard {
    /// Captures standard input.
    pub fn stdin() -> Self {
        match std::io::stdin().as_fd().try_clone_to_owned() {
            Ok(fd) => Self::capture(fd),
            Err(err) => {
                debug!(error = %err, "cannot duplicate stdin");
                Self { saved: None }
            }
        }
    }

    pub fn capture(fd: OwnedFd) -> Self {
        if !termios::isatty(&fd) {
            return Self { saved: None };
        }
        match termios::tcgetattr(&fd) {
            Ok(termios) => Self {
                saved: Some(Saved { fd, termios }),
            },
            Err(err) => {
                debug!(error = %err, "terminal attributes unavailable");
                Self { saved: None }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.saved.is_some()
    }

    /// Reapplies the captured attributes. Safe to call more than once.
    pub fn restore(&self) {
        let Some(saved) = &self.saved else {
            return;
        };
        if let Err(err) = termios::tcsetattr(&saved.fd, OptionalActions::Now, &saved.termios) {
            warn!(error = %err, "failed to restore terminal mode");
        }
        let mut out = std::io::stdout().lock();
        if termios::isatty(&out) {
            let _ = out
                .write_all(BRACKETED_PASTE_OFF.as_bytes())
                .and_then(|()| out.flush());
        }
    }
}

#[cfg(not(unix))]
impl TerminalGuard {
    pub fn stdin() -> Self {
        Self {}
    }

    pub fn is_active(&self) -> bool {
        false
    }

    pub fn restore(&self) {}
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use rustix::pty::{OpenptFlags, grantpt, openpt, ptsname, unlockpt};
    use rustix::termios::LocalModes;
    use std::fs::{File, OpenOptions};
    use std::os::unix::ffi::OsStrExt;

    /// Both ends of a fresh pseudo terminal; the second is the terminal side.
    fn pty_pair() -> (OwnedFd, File) {
        let controller = openpt(OpenptFlags::RDWR | OpenptFlags::NOCTTY).unwrap();
        grantpt(&controller).unwrap();
        unlockpt(&controller).unwrap();
        let name = ptsname(&controller, Vec::new()).unwrap();
        let path = std::ffi::OsStr::from_bytes(name.to_bytes());
        let terminal = OpenOptions::new().read(true).write(true).open(path).unwrap();
        (controller, terminal)
    }

    fn enter_raw(fd: &File) {
        let mut raw = termios::tcgetattr(fd).unwrap();
        raw.local_modes.remove(LocalModes::ECHO | LocalModes::ICANON);
        termios::tcsetattr(fd, OptionalActions::Now, &raw).unwrap();
    }

    fn local_modes(fd: &File) -> LocalModes {
        termios::tcgetattr(fd).unwrap().local_modes
    }

    #[test]
    fn test_restore_brings_back_echo_and_canonical_mode() {
        let (_controller, terminal) = pty_pair();
        let before = local_modes(&terminal);
        assert!(before.contains(LocalModes::ECHO | LocalModes::ICANON));

        let guard = TerminalGuard::capture(terminal.try_clone().unwrap().into());
        assert!(guard.is_active());

        enter_raw(&terminal);
        assert!(!local_modes(&terminal).contains(LocalModes::ECHO));

        guard.restore();
        assert_eq!(local_modes(&terminal), before);
    }

    #[test]
    fn test_drop_restores_terminal() {
        let (_controller, terminal) = pty_pair();
        let before = local_modes(&terminal);

        {
            let _guard = TerminalGuard::capture(terminal.try_clone().unwrap().into());
            enter_raw(&terminal);
        }

        assert_eq!(local_modes(&terminal), before);
    }

    #[test]
    fn test_non_terminal_is_inactive() {
        let file = tempfile::tempfile().unwrap();
        let guard = TerminalGuard::capture(file.into());
        assert!(!guard.is_active());
        guard.restore();
    }
}
