//! Identifier-keyed Store - the four facts tracked per identifier.
//!
//! Plain associative storage for anchor handle, virtual point override,
//! projected content, and animation configuration. Mutation is
//! synchronous and visible to subsequent reads immediately; there are no
//! atomicity guarantees across fact kinds. Callers that need to observe
//! facts in step coordinate through the subscription bus instead of
//! direct reads.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::types::{AnchorHandle, AnimationConfig, FactKinds, Point, ProjectedContent};

thread_local! {
    static ANCHORS: RefCell<HashMap<String, AnchorHandle>> = RefCell::new(HashMap::new());
    static VIRTUAL_POINTS: RefCell<HashMap<String, Point>> = RefCell::new(HashMap::new());
    static CONTENTS: RefCell<HashMap<String, ProjectedContent>> = RefCell::new(HashMap::new());
    static ANIMATIONS: RefCell<HashMap<String, AnimationConfig>> = RefCell::new(HashMap::new());
}

// =============================================================================
// Anchor
// =============================================================================

pub fn set_anchor(id: &str, handle: AnchorHandle) {
    ANCHORS.with(|map| {
        map.borrow_mut().insert(id.to_string(), handle);
    });
}

pub fn anchor(id: &str) -> Option<AnchorHandle> {
    ANCHORS.with(|map| map.borrow().get(id).cloned())
}

/// Removing a missing key is a no-op.
pub fn remove_anchor(id: &str) {
    ANCHORS.with(|map| {
        map.borrow_mut().remove(id);
    });
}

// =============================================================================
// Virtual Point
// =============================================================================

pub fn set_virtual_point(id: &str, point: Point) {
    VIRTUAL_POINTS.with(|map| {
        map.borrow_mut().insert(id.to_string(), point);
    });
}

pub fn virtual_point(id: &str) -> Option<Point> {
    VIRTUAL_POINTS.with(|map| map.borrow().get(id).copied())
}

pub fn remove_virtual_point(id: &str) {
    VIRTUAL_POINTS.with(|map| {
        map.borrow_mut().remove(id);
    });
}

// =============================================================================
// Projected Content
// =============================================================================

pub fn set_projected_content(id: &str, content: ProjectedContent) {
    CONTENTS.with(|map| {
        map.borrow_mut().insert(id.to_string(), content);
    });
}

pub fn projected_content(id: &str) -> Option<ProjectedContent> {
    CONTENTS.with(|map| map.borrow().get(id).cloned())
}

pub fn remove_projected_content(id: &str) {
    CONTENTS.with(|map| {
        map.borrow_mut().remove(id);
    });
}

// =============================================================================
// Animation Config
// =============================================================================

pub fn set_animation(id: &str, config: AnimationConfig) {
    ANIMATIONS.with(|map| {
        map.borrow_mut().insert(id.to_string(), config);
    });
}

pub fn animation(id: &str) -> Option<AnimationConfig> {
    ANIMATIONS.with(|map| map.borrow().get(id).copied())
}

pub fn remove_animation(id: &str) {
    ANIMATIONS.with(|map| {
        map.borrow_mut().remove(id);
    });
}

// =============================================================================
// Record-Level Queries
// =============================================================================

/// Which facts are currently present for `id`.
pub fn present_kinds(id: &str) -> FactKinds {
    let mut kinds = FactKinds::empty();
    if anchor(id).is_some() {
        kinds |= FactKinds::ANCHOR;
    }
    if virtual_point(id).is_some() {
        kinds |= FactKinds::POINT;
    }
    if projected_content(id).is_some() {
        kinds |= FactKinds::CONTENT;
    }
    if animation(id).is_some() {
        kinds |= FactKinds::ANIMATION;
    }
    kinds
}

/// Remove all four facts for `id`. Only the cleanup machine and full
/// resets call this; anchor absence alone never does.
pub fn clear_all(id: &str) {
    remove_anchor(id);
    remove_virtual_point(id);
    remove_projected_content(id);
    remove_animation(id);
}

/// Reset all store state (for testing).
pub fn reset_store_state() {
    ANCHORS.with(|map| map.borrow_mut().clear());
    VIRTUAL_POINTS.with(|map| map.borrow_mut().clear());
    CONTENTS.with(|map| map.borrow_mut().clear());
    ANIMATIONS.with(|map| map.borrow_mut().clear());
}

// =============================================================================
// Tests
// =============================================================================
