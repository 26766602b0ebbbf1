//! Follow Registry - the process-wide anchor/content/animation record.
//!
//! Maps stable identifiers to four independent facts: the live anchor
//! handle, an optional virtual point override, the projected content,
//! and the animation configuration. Facts mutate independently; the
//! per-identifier buses notify position consumers without re-rendering
//! anything else; the deferred cleanup machine tolerates an anchor's
//! destroy-then-recreate cycle.
//!
//! All operations require an active registry created with
//! [`create_follow_registry`]; calling them without one is a caller bug
//! and panics immediately rather than silently doing nothing.
//!
//! # Example
//!
//! ```ignore
//! use tether_tui::registry::{self, FollowBinding};
//! use tether_tui::types::{AnchorHandle, ProjectedContent};
//!
//! let follow_registry = registry::create_follow_registry();
//!
//! let handle = registry::follow(
//!     FollowBinding::new("tooltip").content(ProjectedContent::new(|| { /* build */ })),
//! );
//! handle.attach(AnchorHandle::new(index, move || layout_rect(index)));
//!
//! // host event loop
//! loop {
//!     follow_registry.tick();
//!     // poll input, render ...
//! }
//! ```

pub mod bus;
pub mod lifecycle;
pub mod store;

use std::cell::Cell;
use std::time::{Duration, Instant};

use crate::follower;
use crate::geometry;
use crate::placement;
use crate::types::{AnchorHandle, AnimationConfig, Cleanup, Point, ProjectedContent};

pub use lifecycle::{DEFAULT_GRACE_WINDOW, RecordState, grace_window, set_grace_window};

// =============================================================================
// Registry Instance
// =============================================================================

thread_local! {
    static REGISTRY_ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// Handle to the active follow registry.
///
/// Created by [`create_follow_registry`]. The host event loop drives
/// deferred cleanup and spring motion through [`FollowRegistry::tick`].
/// Dropping the handle tears all registry state down.
pub struct FollowRegistry {
    last_tick: Cell<Option<Instant>>,
    active: Cell<bool>,
}

impl FollowRegistry {
    /// Advance time-driven work using the wall clock: expire grace
    /// deadlines, step spring motion by the time since the last tick.
    pub fn tick(&self) {
        let now = Instant::now();
        let dt = self
            .last_tick
            .get()
            .map(|last| now.duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last_tick.set(Some(now));
        self.advance(dt);
    }

    /// Advance by an explicit timestep. Deterministic variant of
    /// [`FollowRegistry::tick`] for hosts with their own frame clock.
    pub fn advance(&self, dt: Duration) {
        ensure_active();
        lifecycle::process_due_evictions();
        follower::advance_springs(dt.as_secs_f32());
    }

    /// Tear down the registry and every record in it.
    pub fn dispose(self) {
        // Drop does the work.
    }
}

impl Drop for FollowRegistry {
    fn drop(&mut self) {
        if self.active.get() {
            self.active.set(false);
            reset_follow_state();
            log::debug!("follow registry disposed");
        }
    }
}

/// Activate the follow registry for this thread.
///
/// # Panics
///
/// Panics if a registry is already active; dispose the previous handle
/// first.
pub fn create_follow_registry() -> FollowRegistry {
    REGISTRY_ACTIVE.with(|active| {
        if active.get() {
            panic!("a follow registry is already active; dispose it before creating another");
        }
        active.set(true);
    });
    log::debug!("follow registry activated");
    FollowRegistry {
        last_tick: Cell::new(None),
        active: Cell::new(true),
    }
}

fn ensure_active() {
    REGISTRY_ACTIVE.with(|active| {
        if !active.get() {
            panic!(
                "no active follow registry; call create_follow_registry() before using registry operations"
            );
        }
    });
}

/// Reset all registry state across every subsystem (for testing).
pub fn reset_follow_state() {
    follower::reset_follower_state();
    lifecycle::reset_lifecycle_state();
    bus::reset_bus_state();
    store::reset_store_state();
    geometry::reset_geometry_state();
    placement::reset_placement_strategy();
    REGISTRY_ACTIVE.with(|active| active.set(false));
}

// =============================================================================
// Registry Operations
// =============================================================================

/// Register or remove the live anchor for `id`.
///
/// Registering cancels a pending eviction; the surviving content and
/// animation facts are reused as-is. Removing publishes the absence
/// immediately, hiding the follower at once, while the rest of the
/// record survives the grace window.
pub fn register_anchor(id: &str, anchor: Option<AnchorHandle>) {
    ensure_active();
    match anchor {
        Some(handle) => {
            store::set_anchor(id, handle.clone());
            lifecycle::note_anchor_registered(id);
            bus::publish_anchor(id, Some(handle));
        }
        None => {
            store::remove_anchor(id);
            lifecycle::note_anchor_removed(id);
            bus::publish_anchor(id, None);
        }
    }
}

/// Set or clear the virtual point override for `id`.
///
/// While present it takes precedence over the anchor as the
/// positioning source.
pub fn set_virtual_point(id: &str, point: Option<Point>) {
    ensure_active();
    match point {
        Some(point) => store::set_virtual_point(id, point),
        None => store::remove_virtual_point(id),
    }
    bus::publish_virtual_point(id, point);
}

/// Set or clear the projected content for `id`.
///
/// The follower unit for `id` exists exactly while content is present;
/// both the spawn and the teardown happen within this call.
pub fn set_projected_content(id: &str, content: Option<ProjectedContent>) {
    ensure_active();
    match content {
        Some(content) => {
            store::set_projected_content(id, content.clone());
            if follower::has_unit(id) {
                follower::update_content(id, Some(content));
            } else {
                follower::spawn_unit(id);
            }
        }
        None => {
            store::remove_projected_content(id);
            follower::destroy_unit(id);
        }
    }
}

/// Set the animation configuration for `id`.
pub fn set_animation_config(id: &str, config: AnimationConfig) {
    ensure_active();
    store::set_animation(id, config);
    bus::publish_animation(id, config);
}

/// Destroy the whole record for `id` right now, bypassing the grace
/// window. For explicit teardown only; the normal path is anchor
/// removal followed by grace expiry.
pub fn evict(id: &str) {
    ensure_active();
    lifecycle::evict(id);
}

/// Cleanup state of the record for `id`.
pub fn record_state(id: &str) -> RecordState {
    ensure_active();
    lifecycle::record_state(id)
}

/// Identifiers with a live follower unit.
pub fn active_ids() -> Vec<String> {
    ensure_active();
    follower::active_ids()
}

// =============================================================================
// Subscriptions
// =============================================================================

/// Subscribe to anchor changes for `id`. The callback runs once with
/// the current value before any change-driven call.
pub fn subscribe_anchor(id: &str, callback: impl Fn(Option<AnchorHandle>) + 'static) -> Cleanup {
    ensure_active();
    bus::subscribe_anchor(id, callback)
}

/// Subscribe to virtual point changes for `id`.
pub fn subscribe_virtual_point(id: &str, callback: impl Fn(Option<Point>) + 'static) -> Cleanup {
    ensure_active();
    bus::subscribe_virtual_point(id, callback)
}

/// Subscribe to animation configuration changes for `id`.
pub fn subscribe_animation(id: &str, callback: impl Fn(AnimationConfig) + 'static) -> Cleanup {
    ensure_active();
    bus::subscribe_animation(id, callback)
}

// =============================================================================
// Follow Binding
// =============================================================================

/// Everything one caller-described follow relationship needs.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowBinding {
    pub id: String,
    pub content: Option<ProjectedContent>,
    pub point: Option<Point>,
    pub animation: AnimationConfig,
}

impl FollowBinding {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: None,
            point: None,
            animation: AnimationConfig::default(),
        }
    }

    pub fn content(mut self, content: ProjectedContent) -> Self {
        self.content = Some(content);
        self
    }

    pub fn point(mut self, point: Point) -> Self {
        self.point = Some(point);
        self
    }

    pub fn animation(mut self, animation: AnimationConfig) -> Self {
        self.animation = animation;
        self
    }

    /// Spring-driven motion with the given parameters.
    pub fn inertial(mut self, spring: crate::spring::SpringConfig) -> Self {
        self.animation = AnimationConfig::inertial(spring);
        self
    }
}

/// Register a complete follow binding in one call.
///
/// Performs all four fact registrations and returns a handle for
/// attaching the anchor surface and mutating the binding later.
pub fn follow(binding: FollowBinding) -> FollowHandle {
    ensure_active();
    let FollowBinding {
        id,
        content,
        point,
        animation,
    } = binding;

    // Animation and point land before content so the unit spawns with
    // its final settings.
    set_animation_config(&id, animation);
    set_virtual_point(&id, point);
    set_projected_content(&id, content);

    FollowHandle { id }
}

/// Handle returned by [`follow`], attached to the anchor surface.
#[derive(Debug, Clone)]
pub struct FollowHandle {
    id: String,
}

impl FollowHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Register the live anchor this binding follows.
    pub fn attach(&self, anchor: AnchorHandle) {
        register_anchor(&self.id, Some(anchor));
    }

    /// Remove the anchor. The follower hides immediately; the record
    /// survives the grace window.
    pub fn detach(&self) {
        register_anchor(&self.id, None);
    }

    pub fn set_point(&self, point: Point) {
        set_virtual_point(&self.id, Some(point));
    }

    pub fn clear_point(&self) {
        set_virtual_point(&self.id, None);
    }

    pub fn set_content(&self, content: ProjectedContent) {
        set_projected_content(&self.id, Some(content));
    }

    pub fn clear_content(&self) {
        set_projected_content(&self.id, None);
    }

    pub fn set_animation(&self, config: AnimationConfig) {
        set_animation_config(&self.id, config);
    }

    /// Tear the whole record down now.
    pub fn release(self) {
        evict(&self.id);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::follower::FollowerPhase;
    use crate::types::Rect;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::thread;

    fn setup() -> FollowRegistry {
        reset_follow_state();
        create_follow_registry()
    }

    fn anchor_at(rect: Rect) -> AnchorHandle {
        AnchorHandle::new(0, move || Some(rect))
    }

    #[test]
    #[should_panic(expected = "no active follow registry")]
    fn test_operations_require_active_registry() {
        reset_follow_state();
        register_anchor("a", None);
    }

    #[test]
    #[should_panic(expected = "already active")]
    fn test_second_registry_rejected() {
        let _registry = setup();
        let _second = create_follow_registry();
    }

    #[test]
    fn test_dispose_clears_everything() {
        let registry = setup();

        set_projected_content("a", Some(ProjectedContent::new(|| {})));
        assert_eq!(follower::unit_count(), 1);

        registry.dispose();
        assert_eq!(follower::unit_count(), 0);

        // A fresh registry starts empty.
        let _registry = create_follow_registry();
        assert!(store::projected_content("a").is_none());
    }

    #[test]
    fn test_unit_exists_iff_content_present() {
        let _registry = setup();

        assert!(!follower::has_unit("a"));

        set_projected_content("a", Some(ProjectedContent::new(|| {})));
        assert!(follower::has_unit("a"));
        assert_eq!(active_ids(), vec!["a".to_string()]);

        set_projected_content("a", None);
        assert!(!follower::has_unit("a"));
        assert!(active_ids().is_empty());
    }

    #[test]
    fn test_late_subscriber_gets_current_anchor() {
        let _registry = setup();

        let handle = anchor_at(Rect::new(1.0, 2.0, 3.0, 4.0));
        register_anchor("late", Some(handle.clone()));

        // Subscribe after the fact: replay delivers the anchor without
        // any further publish.
        let seen: Rc<RefCell<Vec<Option<AnchorHandle>>>> = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let _unsub = subscribe_anchor("late", move |value| {
            seen_clone.borrow_mut().push(value);
        });

        assert_eq!(*seen.borrow(), vec![Some(handle)]);
    }

    #[test]
    fn test_first_placement_snaps_then_transitions() {
        let _registry = setup();

        set_projected_content("a", Some(ProjectedContent::new(|| {})));
        let unit = follower::unit("a").unwrap();
        assert_eq!(unit.phase(), FollowerPhase::Hidden);
        assert!(!unit.is_showing());

        register_anchor("a", Some(anchor_at(Rect::new(10.0, 20.0, 100.0, 50.0))));
        let first = unit.placement().unwrap();
        assert_eq!(unit.phase(), FollowerPhase::Visible);
        assert!(unit.is_showing());
        assert_eq!(first.rect, Rect::new(10.0, 20.0, 100.0, 50.0));
        assert!(!first.animate);

        register_anchor("a", Some(anchor_at(Rect::new(40.0, 5.0, 100.0, 50.0))));
        let second = unit.placement().unwrap();
        assert_eq!(second.rect, Rect::new(40.0, 5.0, 100.0, 50.0));
        assert!(second.animate);
    }

    #[test]
    fn test_virtual_point_overrides_anchor() {
        let _registry = setup();

        set_projected_content("a", Some(ProjectedContent::new(|| {})));
        register_anchor("a", Some(anchor_at(Rect::new(10.0, 20.0, 100.0, 50.0))));

        set_virtual_point("a", Some(Point::new(300.0, 200.0)));
        let unit = follower::unit("a").unwrap();
        assert_eq!(
            unit.placement().unwrap().rect,
            Rect::new(300.0, 200.0, 0.0, 0.0)
        );

        // Clearing the override falls back to the anchor.
        set_virtual_point("a", None);
        assert_eq!(
            unit.placement().unwrap().rect,
            Rect::new(10.0, 20.0, 100.0, 50.0)
        );
    }

    #[test]
    fn test_detach_hides_immediately_but_preserves_record() {
        let _registry = setup();
        set_grace_window(Duration::from_millis(40));

        let content = ProjectedContent::new(|| {});
        set_projected_content("a", Some(content.clone()));
        register_anchor("a", Some(anchor_at(Rect::new(10.0, 20.0, 100.0, 50.0))));

        let unit = follower::unit("a").unwrap();
        assert!(unit.is_showing());

        register_anchor("a", None);
        assert!(!unit.is_showing());
        assert_eq!(record_state("a"), RecordState::Grace);

        // Content survives untouched while the deadline is pending.
        assert!(store::projected_content("a").unwrap().same_as(&content));
        assert_eq!(unit.phase(), FollowerPhase::Visible);
    }

    #[test]
    fn test_reattach_within_grace_window_keeps_content() {
        let _registry = setup();
        set_grace_window(Duration::from_millis(60));

        let content = ProjectedContent::new(|| {});

        set_projected_content("a", Some(content.clone()));
        register_anchor("a", Some(anchor_at(Rect::new(10.0, 20.0, 100.0, 50.0))));

        let unit = follower::unit("a").unwrap();

        register_anchor("a", None);
        thread::sleep(Duration::from_millis(20));

        // Recreated elsewhere in the tree, inside the window. The pump
        // running first must not evict anything.
        lifecycle::process_due_evictions();
        register_anchor("a", Some(anchor_at(Rect::new(200.0, 90.0, 100.0, 50.0))));

        assert!(unit.content().is_some());
        assert_eq!(record_state("a"), RecordState::Active);
        assert!(store::projected_content("a").unwrap().same_as(&content));

        // The follower reappears at the new anchor with the old content.
        assert!(unit.is_showing());
        assert_eq!(
            unit.placement().unwrap().rect,
            Rect::new(200.0, 90.0, 100.0, 50.0)
        );
    }

    #[test]
    fn test_grace_expiry_evicts_all_facts() {
        let registry = setup();
        set_grace_window(Duration::from_millis(30));

        set_projected_content("a", Some(ProjectedContent::new(|| {})));
        set_animation_config("a", AnimationConfig::default());
        register_anchor("a", Some(anchor_at(Rect::new(10.0, 20.0, 100.0, 50.0))));

        register_anchor("a", None);
        thread::sleep(Duration::from_millis(50));
        registry.tick();

        assert_eq!(record_state("a"), RecordState::Evicted);
        assert!(store::anchor("a").is_none());
        assert!(store::projected_content("a").is_none());
        assert!(store::animation("a").is_none());
        assert!(store::virtual_point("a").is_none());
        assert!(!follower::has_unit("a"));
        assert!(active_ids().is_empty());
    }

    #[test]
    fn test_follow_helper_registers_everything() {
        let _registry = setup();

        let handle = follow(
            FollowBinding::new("combined")
                .content(ProjectedContent::new(|| {}))
                .point(Point::new(5.0, 6.0))
                .animation(AnimationConfig::default()),
        );

        assert!(follower::has_unit("combined"));
        assert_eq!(store::virtual_point("combined"), Some(Point::new(5.0, 6.0)));
        assert!(store::animation("combined").is_some());

        // The point alone already places the follower.
        let unit = follower::unit("combined").unwrap();
        assert!(unit.is_showing());
        assert_eq!(
            unit.placement().unwrap().rect,
            Rect::new(5.0, 6.0, 0.0, 0.0)
        );

        handle.detach(); // no anchor registered: inert
        handle.clear_point();
        assert!(!unit.is_showing());

        handle.release();
        assert!(!follower::has_unit("combined"));
        assert_eq!(store::present_kinds("combined"), crate::types::FactKinds::empty());
    }

    #[test]
    fn test_content_replacement_during_grace_is_allowed() {
        let _registry = setup();
        set_grace_window(Duration::from_millis(40));

        set_projected_content("a", Some(ProjectedContent::new(|| {})));
        register_anchor("a", Some(anchor_at(Rect::new(0.0, 0.0, 10.0, 2.0))));
        register_anchor("a", None);

        let deadline = lifecycle::grace_deadline("a").unwrap();
        let replacement = ProjectedContent::new(|| {});
        set_projected_content("a", Some(replacement.clone()));

        // Replacement neither errors nor resets the pending deadline.
        assert!(store::projected_content("a").unwrap().same_as(&replacement));
        assert_eq!(lifecycle::grace_deadline("a"), Some(deadline));
    }

    #[test]
    fn test_inertial_follower_moves_through_intermediate_positions() {
        let registry = setup();

        let binding = FollowBinding::new("springy")
            .content(ProjectedContent::new(|| {}))
            .inertial(crate::spring::SpringConfig::default());
        let handle = follow(binding);

        handle.attach(anchor_at(Rect::new(0.0, 0.0, 10.0, 2.0)));
        let unit = follower::unit("springy").unwrap();

        // First placement snaps even in inertial mode.
        assert_eq!(unit.placement().unwrap().rect, Rect::new(0.0, 0.0, 10.0, 2.0));

        handle.attach(anchor_at(Rect::new(100.0, 0.0, 10.0, 2.0)));
        // Spring still at the old position at the retarget instant.
        assert_eq!(unit.placement().unwrap().rect.x, 0.0);
        assert!(!unit.placement().unwrap().animate);

        registry.advance(Duration::from_millis(50));
        let mid = unit.placement().unwrap().rect.x;
        assert!(mid > 0.0 && mid < 100.0, "expected motion, got {mid}");

        for _ in 0..40 {
            registry.advance(Duration::from_millis(50));
        }
        assert_eq!(unit.placement().unwrap().rect.x, 100.0);
    }
}
