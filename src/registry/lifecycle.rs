//! Deferred Cleanup - what happens when an anchor disappears.
//!
//! A record moves through three states:
//!
//! ```text
//! Active --anchor removed--> Grace --deadline expires--> Evicted
//!   ^                          |
//!   +----anchor re-registered--+
//! ```
//!
//! Removing an anchor hides its follower immediately, but the other
//! three facts survive a grace window. A caller that tears an anchor
//! down and recreates it elsewhere in the tree gets its follower back
//! with the same content and animation settings instead of a flash of
//! empty state. Only the deadline expiring, or the explicit [`evict`]
//! call, destroys a record.
//!
//! Eviction is never triggered directly from an anchor unmount. Wiring
//! teardown straight to unmount destroys records that are about to be
//! remounted; the grace window exists precisely to absorb that gap.
//!
//! Deadlines are checked from the host pump (`FollowRegistry::tick`),
//! which keeps all mutation on the owning thread.

use std::cell::Cell;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::follower;
use crate::registry::{bus, store};

/// Default time a vanished anchor's record survives awaiting
/// re-registration.
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_millis(200);

// =============================================================================
// Record State
// =============================================================================

/// Cleanup state of one identifier's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// A live anchor is registered.
    Active,
    /// The anchor vanished; the eviction deadline is pending.
    Grace,
    /// No live anchor and no pending deadline. Covers both records
    /// that were evicted and identifiers never anchored.
    Evicted,
}

enum Entry {
    Active,
    Grace { deadline: Instant },
}

thread_local! {
    static RECORDS: std::cell::RefCell<HashMap<String, Entry>> =
        std::cell::RefCell::new(HashMap::new());
    static GRACE_WINDOW: Cell<Duration> = const { Cell::new(DEFAULT_GRACE_WINDOW) };
}

/// Current grace window.
pub fn grace_window() -> Duration {
    GRACE_WINDOW.with(|w| w.get())
}

/// Change the grace window. Applies to deadlines scheduled after the
/// call; pending deadlines keep their original expiry.
pub fn set_grace_window(window: Duration) {
    GRACE_WINDOW.with(|w| w.set(window));
}

// =============================================================================
// Transitions
// =============================================================================

/// A live anchor was registered for `id`. Cancels a pending deadline.
pub fn note_anchor_registered(id: &str) {
    RECORDS.with(|records| {
        let previous = records.borrow_mut().insert(id.to_string(), Entry::Active);
        if matches!(previous, Some(Entry::Grace { .. })) {
            log::debug!("follow {id}: anchor re-registered, eviction cancelled");
        }
    });
}

/// The anchor for `id` was removed.
///
/// Schedules the eviction deadline only from the active state. An
/// identifier that never had an anchor gains no deadline, so a stray
/// detach cannot destroy a content-only record. Repeated removals keep
/// the original deadline.
pub fn note_anchor_removed(id: &str) {
    RECORDS.with(|records| {
        let mut records = records.borrow_mut();
        if let Some(entry) = records.get_mut(id) {
            if matches!(entry, Entry::Active) {
                let deadline = Instant::now() + grace_window();
                *entry = Entry::Grace { deadline };
                log::debug!("follow {id}: anchor removed, eviction pending");
            }
        }
    });
}

/// Evict every record whose deadline has passed. Called from the pump.
pub fn process_due_evictions() {
    let now = Instant::now();
    let due: Vec<String> = RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .filter_map(|(id, entry)| match entry {
                Entry::Grace { deadline } if *deadline <= now => Some(id.clone()),
                _ => None,
            })
            .collect()
    });

    for id in due {
        evict(&id);
    }
}

/// Destroy the whole record for `id` now: all four facts, every
/// subscription channel, and the follower unit. Also the manual
/// teardown path, bypassing the grace window.
pub fn evict(id: &str) {
    RECORDS.with(|records| {
        records.borrow_mut().remove(id);
    });
    store::clear_all(id);
    bus::drop_channels(id);
    follower::destroy_unit(id);
    log::debug!("follow {id}: evicted");
}

/// Cleanup state for `id`.
pub fn record_state(id: &str) -> RecordState {
    RECORDS.with(|records| match records.borrow().get(id) {
        Some(Entry::Active) => RecordState::Active,
        Some(Entry::Grace { .. }) => RecordState::Grace,
        None => RecordState::Evicted,
    })
}

/// Pending eviction deadline for `id`, if any.
pub fn grace_deadline(id: &str) -> Option<Instant> {
    RECORDS.with(|records| match records.borrow().get(id) {
        Some(Entry::Grace { deadline }) => Some(*deadline),
        _ => None,
    })
}

/// Reset all lifecycle state (for testing).
pub fn reset_lifecycle_state() {
    RECORDS.with(|records| records.borrow_mut().clear());
    GRACE_WINDOW.with(|w| w.set(DEFAULT_GRACE_WINDOW));
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn setup() {
        reset_lifecycle_state();
        store::reset_store_state();
        bus::reset_bus_state();
        follower::reset_follower_state();
        set_grace_window(Duration::from_millis(40));
    }

    #[test]
    fn test_registration_activates() {
        setup();

        assert_eq!(record_state("a"), RecordState::Evicted);
        note_anchor_registered("a");
        assert_eq!(record_state("a"), RecordState::Active);
        assert!(grace_deadline("a").is_none());
    }

    #[test]
    fn test_removal_schedules_deadline() {
        setup();

        note_anchor_registered("a");
        note_anchor_removed("a");

        assert_eq!(record_state("a"), RecordState::Grace);
        let deadline = grace_deadline("a").unwrap();
        assert!(deadline > Instant::now());
    }

    #[test]
    fn test_removal_without_anchor_is_inert() {
        setup();

        note_anchor_removed("never-anchored");
        assert_eq!(record_state("never-anchored"), RecordState::Evicted);
        assert!(grace_deadline("never-anchored").is_none());
    }

    #[test]
    fn test_repeated_removal_keeps_original_deadline() {
        setup();

        note_anchor_registered("a");
        note_anchor_removed("a");
        let first = grace_deadline("a").unwrap();

        thread::sleep(Duration::from_millis(5));
        note_anchor_removed("a");
        assert_eq!(grace_deadline("a"), Some(first));
    }

    #[test]
    fn test_reregistration_cancels_eviction() {
        setup();

        store::set_virtual_point("a", crate::types::Point::new(1.0, 1.0));
        note_anchor_registered("a");
        note_anchor_removed("a");

        // Come back inside the window.
        thread::sleep(Duration::from_millis(10));
        note_anchor_registered("a");
        assert_eq!(record_state("a"), RecordState::Active);

        // Even well past the original deadline nothing is evicted.
        thread::sleep(Duration::from_millis(60));
        process_due_evictions();
        assert_eq!(record_state("a"), RecordState::Active);
        assert!(store::virtual_point("a").is_some());
    }

    #[test]
    fn test_deadline_expiry_evicts_record() {
        setup();

        store::set_virtual_point("a", crate::types::Point::new(1.0, 1.0));
        store::set_animation("a", crate::types::AnimationConfig::default());
        note_anchor_registered("a");
        note_anchor_removed("a");

        thread::sleep(Duration::from_millis(60));
        process_due_evictions();

        assert_eq!(record_state("a"), RecordState::Evicted);
        assert_eq!(store::present_kinds("a"), crate::types::FactKinds::empty());
    }

    #[test]
    fn test_expiry_drops_subscriptions() {
        setup();

        note_anchor_registered("a");
        let _sub = bus::subscribe_anchor("a", |_| {});
        assert_eq!(bus::anchor_subscriber_count("a"), 1);

        note_anchor_removed("a");
        thread::sleep(Duration::from_millis(60));
        process_due_evictions();

        assert_eq!(bus::anchor_subscriber_count("a"), 0);
    }

    #[test]
    fn test_manual_evict_bypasses_grace() {
        setup();

        store::set_virtual_point("a", crate::types::Point::new(1.0, 1.0));
        note_anchor_registered("a");

        evict("a");
        assert_eq!(record_state("a"), RecordState::Evicted);
        assert_eq!(store::present_kinds("a"), crate::types::FactKinds::empty());
    }

    #[test]
    fn test_pump_leaves_pending_deadlines_alone() {
        setup();

        note_anchor_registered("a");
        note_anchor_removed("a");

        // Deadline not reached yet.
        process_due_evictions();
        assert_eq!(record_state("a"), RecordState::Grace);
    }

    #[test]
    fn test_window_is_configurable() {
        setup();

        set_grace_window(Duration::from_millis(5));
        note_anchor_registered("a");
        note_anchor_removed("a");

        thread::sleep(Duration::from_millis(15));
        process_due_evictions();
        assert_eq!(record_state("a"), RecordState::Evicted);
    }
}
