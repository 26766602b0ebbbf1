//! Geometry signals - the always-on subscription behind re-placement.
//!
//! Anchor rectangles move without any registry call: the terminal
//! resizes, a scroll region shifts, a layout pass lands. The host
//! forwards those moments here and every active follower re-resolves
//! its placement synchronously.
//!
//! Terminal size is kept on signals so a derived render pass can track
//! it, mirroring the rest of the reactive pipeline.

use spark_signals::{Signal, signal};

use crate::follower;

thread_local! {
    static TERMINAL_WIDTH: Signal<u16> = signal(80);
    static TERMINAL_HEIGHT: Signal<u16> = signal(24);
    static GEOMETRY_REVISION: Signal<u64> = signal(0);
}

/// Get the current terminal width.
pub fn terminal_width() -> u16 {
    TERMINAL_WIDTH.with(|w| w.get())
}

/// Get the current terminal height.
pub fn terminal_height() -> u16 {
    TERMINAL_HEIGHT.with(|h| h.get())
}

/// Set the terminal size without touching followers.
pub fn set_terminal_size(width: u16, height: u16) {
    TERMINAL_WIDTH.with(|w| w.set(width));
    TERMINAL_HEIGHT.with(|h| h.set(height));
}

/// Get the terminal width signal for reactive tracking.
pub fn terminal_width_signal() -> Signal<u16> {
    TERMINAL_WIDTH.with(|w| w.clone())
}

/// Get the terminal height signal for reactive tracking.
pub fn terminal_height_signal() -> Signal<u16> {
    TERMINAL_HEIGHT.with(|h| h.clone())
}

/// Monotonic counter of geometry changes observed so far.
pub fn geometry_revision() -> u64 {
    GEOMETRY_REVISION.with(|r| r.get())
}

/// Anchor geometry may have changed: bump the revision and re-resolve
/// every active follower now.
///
/// Call after resize, scroll, or a layout pass. Safe to call
/// spuriously; followers whose rectangle is unchanged re-place to the
/// same spot.
pub fn notify_geometry_changed() {
    GEOMETRY_REVISION.with(|r| {
        let next = r.get() + 1;
        r.set(next);
    });
    follower::refresh_all();
}

/// Route a terminal resize: record the size, then re-place followers.
pub fn handle_resize(width: u16, height: u16) {
    set_terminal_size(width, height);
    notify_geometry_changed();
}

/// Detect and set the actual terminal size from the environment.
///
/// Uses crossterm to query the terminal dimensions.
pub fn detect_terminal_size() {
    if let Ok((width, height)) = crossterm::terminal::size() {
        set_terminal_size(width, height);
    }
}

/// Reset all geometry state (for testing).
pub fn reset_geometry_state() {
    TERMINAL_WIDTH.with(|w| w.set(80));
    TERMINAL_HEIGHT.with(|h| h.set(24));
    GEOMETRY_REVISION.with(|r| r.set(0));
}
