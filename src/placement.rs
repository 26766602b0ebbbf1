//! Placement strategy - computes where a follower lands.
//!
//! The engine never positions anything itself; it hands the resolved
//! source rectangle to the installed [`PlacementStrategy`] and renders
//! at whatever comes back. The default strategy overlays the source
//! exactly. Hosts with a real layout engine can install their own.

use std::cell::RefCell;
use std::rc::Rc;

use crate::types::Rect;

/// Computes the target rectangle for a follower.
///
/// `previous` is the follower's last target, for strategies that want
/// to keep placement stable across small source movements. The default
/// strategy ignores it.
pub trait PlacementStrategy {
    fn compute(&self, source: Rect, previous: Option<Rect>) -> Rect;
}

/// Exact overlay: same top-left, dimensions driven by the source.
pub struct OverlayPlacement;

impl PlacementStrategy for OverlayPlacement {
    fn compute(&self, source: Rect, _previous: Option<Rect>) -> Rect {
        source
    }
}

thread_local! {
    static STRATEGY: RefCell<Rc<dyn PlacementStrategy>> = RefCell::new(Rc::new(OverlayPlacement));
}

/// Install a placement strategy for all followers.
pub fn set_placement_strategy(strategy: Rc<dyn PlacementStrategy>) {
    STRATEGY.with(|s| *s.borrow_mut() = strategy);
}

/// Compute a target rectangle through the installed strategy.
pub fn compute_rect(source: Rect, previous: Option<Rect>) -> Rect {
    STRATEGY.with(|s| s.borrow().compute(source, previous))
}

/// Restore the default overlay strategy (for testing).
pub fn reset_placement_strategy() {
    STRATEGY.with(|s| *s.borrow_mut() = Rc::new(OverlayPlacement));
}
