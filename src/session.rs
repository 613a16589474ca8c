//! Session capturability probe.
//!
//! The change monitor skips sampling while the screen is locked or the
//! system is dozing — "no change" during intentional absence must not count
//! as staleness, and screenshotting a locked session wastes CPU.
//!
//! Platform support:
//! - Windows: `GetForegroundWindow()` returns null on the lock screen
//! - Linux: `loginctl show-session self -p LockedHint`
//! - macOS: no cheap public API; reported as capturable (a locked session
//!   makes capture fail, which resets the rank anyway)
//!
//! Every probe degrades to "capturable" on failure.

/// Whether the session is in a state worth sampling.
pub async fn session_is_capturable() -> bool {
    #[cfg(target_os = "windows")]
    {
        windows_session_unlocked()
    }

    #[cfg(target_os = "linux")]
    {
        linux_session_unlocked().await
    }

    #[cfg(target_os = "macos")]
    {
        true
    }
}

#[cfg(target_os = "windows")]
fn windows_session_unlocked() -> bool {
    use std::ffi::c_void;

    #[link(name = "user32")]
    extern "system" {
        fn GetForegroundWindow() -> *mut c_void;
    }

    // No foreground window means the secure desktop (lock screen) is up.
    unsafe { !GetForegroundWindow().is_null() }
}

#[cfg(target_os = "linux")]
async fn linux_session_unlocked() -> bool {
    use tracing::debug;

    match tokio::process::Command::new("loginctl")
        .args(["show-session", "self", "-p", "LockedHint"])
        .output()
        .await
    {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            !stdout.contains("LockedHint=yes")
        }
        Err(e) => {
            debug!("loginctl probe failed ({}), assuming session unlocked", e);
            true
        }
    }
}
