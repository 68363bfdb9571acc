//! Terminal mode around masked input
//!
//! The masked seed prompt turns echo off while it reads. If the process is
//! interrupted in the middle of it, [`restore`] puts back the mode that
//! [`save`] recorded before the prompt started.

#[cfg(unix)]
use std::sync::Mutex;

#[cfg(unix)]
static SAVED: Mutex<Option<libc::termios>> = Mutex::new(None);

/// Record the current mode of stdin, if it is a terminal
pub fn save() {
    #[cfg(unix)]
    {
        // SAFETY: tcgetattr only writes into the termios owned here
        let mut mode: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(libc::STDIN_FILENO, &mut mode) } == 0 {
            if let Ok(mut saved) = SAVED.lock() {
                *saved = Some(mode);
            }
        }
    }
}

/// Drop the recorded mode once the prompt has returned
pub fn clear() {
    #[cfg(unix)]
    {
        if let Ok(mut saved) = SAVED.lock() {
            *saved = None;
        }
    }
}

/// Put back the mode recorded by [`save`]. No-op outside a masked prompt.
pub fn restore() {
    #[cfg(unix)]
    {
        let mode = SAVED.lock().ok().and_then(|saved| *saved);
        if let Some(mode) = mode {
            // SAFETY: `mode` was filled in by tcgetattr on the same descriptor
            if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &mode) } != 0 {
                tracing::debug!("Failed to restore terminal mode");
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_save_restore_clear() {
        // Nothing recorded yet
        restore();
        assert!(SAVED.lock().unwrap().is_none());

        let is_tty = unsafe { libc::isatty(libc::STDIN_FILENO) } == 1;
        save();
        assert_eq!(SAVED.lock().unwrap().is_some(), is_tty);
        // Same mode as now, so the terminal is left unchanged
        restore();

        clear();
        assert!(SAVED.lock().unwrap().is_none());
    }
}
