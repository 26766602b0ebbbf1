//! Subscription Bus - per-identifier fact-change notification.
//!
//! One channel per identifier per fact kind. Subscribing replays the
//! current value immediately, so a late subscriber never misses the last
//! update. Publishing invokes subscribers in registration order; a
//! subscriber that panics is isolated and logged without interrupting
//! delivery to the rest. Unsubscribing is idempotent, including after
//! the whole channel was dropped by an eviction.
//!
//! Ordering is guaranteed per identifier per kind only; nothing is
//! promised across identifiers.

use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::registry::store;
use crate::types::{AnchorHandle, AnimationConfig, Cleanup, Point};

// =============================================================================
// Generic Bus
// =============================================================================

struct Channel<T> {
    subscribers: Vec<(u64, Rc<dyn Fn(T)>)>,
}

impl<T> Channel<T> {
    fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

pub struct Bus<T> {
    channels: RefCell<HashMap<String, Channel<T>>>,
    next_token: std::cell::Cell<u64>,
}

impl<T: Clone + 'static> Bus<T> {
    pub fn new() -> Self {
        Self {
            channels: RefCell::new(HashMap::new()),
            next_token: std::cell::Cell::new(0),
        }
    }

    /// Register a callback and replay `current` to it once.
    ///
    /// Returns a token for [`Bus::unsubscribe`]. The replay happens
    /// after registration, outside any internal borrow, so the callback
    /// may itself subscribe or publish.
    pub fn subscribe(&self, id: &str, current: T, callback: impl Fn(T) + 'static) -> u64 {
        let token = self.next_token.get();
        self.next_token.set(token + 1);

        let callback: Rc<dyn Fn(T)> = Rc::new(callback);
        self.channels
            .borrow_mut()
            .entry(id.to_string())
            .or_insert_with(Channel::new)
            .subscribers
            .push((token, callback.clone()));

        deliver(&*callback, current);
        token
    }

    /// Invoke every subscriber for `id` with `value`, in registration
    /// order. The subscriber list is snapshotted first, so callbacks may
    /// subscribe or unsubscribe without tripping a borrow.
    pub fn publish(&self, id: &str, value: T) {
        let snapshot: Vec<Rc<dyn Fn(T)>> = self
            .channels
            .borrow()
            .get(id)
            .map(|channel| {
                channel
                    .subscribers
                    .iter()
                    .map(|(_, callback)| callback.clone())
                    .collect()
            })
            .unwrap_or_default();

        for callback in snapshot {
            deliver(&*callback, value.clone());
        }
    }

    /// Idempotent. Unknown tokens and missing channels are no-ops.
    pub fn unsubscribe(&self, id: &str, token: u64) {
        let mut channels = self.channels.borrow_mut();
        if let Some(channel) = channels.get_mut(id) {
            channel.subscribers.retain(|(t, _)| *t != token);
            if channel.subscribers.is_empty() {
                channels.remove(id);
            }
        }
    }

    /// Drop every subscriber for `id`. Later unsubscribes for the
    /// dropped channel are no-ops.
    pub fn drop_channel(&self, id: &str) {
        self.channels.borrow_mut().remove(id);
    }

    pub fn subscriber_count(&self, id: &str) -> usize {
        self.channels
            .borrow()
            .get(id)
            .map(|channel| channel.subscribers.len())
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        self.channels.borrow_mut().clear();
    }
}

/// Run one callback, isolating a panic so remaining subscribers still
/// get the value.
fn deliver<T>(callback: &dyn Fn(T), value: T) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(value)));
    if let Err(payload) = outcome {
        log::error!("follow subscriber panicked: {}", panic_message(&payload));
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

// =============================================================================
// Fact-Kind Channels
// =============================================================================

thread_local! {
    static ANCHOR_BUS: Bus<Option<AnchorHandle>> = Bus::new();
    static POINT_BUS: Bus<Option<Point>> = Bus::new();
    static ANIMATION_BUS: Bus<AnimationConfig> = Bus::new();
}

/// Subscribe to anchor changes for `id`; replays the current anchor.
pub fn subscribe_anchor(id: &str, callback: impl Fn(Option<AnchorHandle>) + 'static) -> Cleanup {
    let current = store::anchor(id);
    let token = ANCHOR_BUS.with(|bus| bus.subscribe(id, current, callback));
    let id = id.to_string();
    Box::new(move || ANCHOR_BUS.with(|bus| bus.unsubscribe(&id, token)))
}

pub fn publish_anchor(id: &str, value: Option<AnchorHandle>) {
    ANCHOR_BUS.with(|bus| bus.publish(id, value));
}

/// Subscribe to virtual point changes for `id`; replays the current point.
pub fn subscribe_virtual_point(id: &str, callback: impl Fn(Option<Point>) + 'static) -> Cleanup {
    let current = store::virtual_point(id);
    let token = POINT_BUS.with(|bus| bus.subscribe(id, current, callback));
    let id = id.to_string();
    Box::new(move || POINT_BUS.with(|bus| bus.unsubscribe(&id, token)))
}

pub fn publish_virtual_point(id: &str, value: Option<Point>) {
    POINT_BUS.with(|bus| bus.publish(id, value));
}

/// Subscribe to animation config changes for `id`; replays the current
/// config, defaulted when none was ever set.
pub fn subscribe_animation(id: &str, callback: impl Fn(AnimationConfig) + 'static) -> Cleanup {
    let current = store::animation(id).unwrap_or_default();
    let token = ANIMATION_BUS.with(|bus| bus.subscribe(id, current, callback));
    let id = id.to_string();
    Box::new(move || ANIMATION_BUS.with(|bus| bus.unsubscribe(&id, token)))
}

pub fn publish_animation(id: &str, value: AnimationConfig) {
    ANIMATION_BUS.with(|bus| bus.publish(id, value));
}

/// Drop every channel for `id` across all fact kinds (eviction path).
pub fn drop_channels(id: &str) {
    ANCHOR_BUS.with(|bus| bus.drop_channel(id));
    POINT_BUS.with(|bus| bus.drop_channel(id));
    ANIMATION_BUS.with(|bus| bus.drop_channel(id));
}

pub fn anchor_subscriber_count(id: &str) -> usize {
    ANCHOR_BUS.with(|bus| bus.subscriber_count(id))
}

/// Reset all bus state (for testing).
pub fn reset_bus_state() {
    ANCHOR_BUS.with(|bus| bus.clear());
    POINT_BUS.with(|bus| bus.clear());
    ANIMATION_BUS.with(|bus| bus.clear());
}

// =============================================================================
// Tests
// =============================================================================
