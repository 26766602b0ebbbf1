//! Follower units - projected content kept positioned over its source.
//!
//! One [`FollowerUnit`] exists per identifier currently holding
//! projected content; units are spawned and destroyed in the same
//! synchronous step as the content fact changes. The active identifier
//! set is reactive, so a derived render pass re-runs when followers
//! come and go.
//!
//! # Render loop integration
//!
//! ```ignore
//! use tether_tui::follower;
//!
//! for id in follower::active_ids() {
//!     let Some(unit) = follower::unit(&id) else { continue };
//!     if !unit.is_showing() {
//!         continue;
//!     }
//!     if let (Some(placement), Some(content)) = (unit.placement(), unit.content()) {
//!         // draw `content` at `placement.rect`
//!     }
//! }
//! ```

mod source;
mod unit;

pub use source::{PositionSource, resolve};
pub use unit::{FollowerPhase, FollowerUnit, Placement};

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use spark_signals::ReactiveSet;

use crate::registry::{bus, store};
use crate::types::ProjectedContent;

thread_local! {
    /// Live units by identifier.
    static UNITS: RefCell<HashMap<String, Rc<FollowerUnit>>> = RefCell::new(HashMap::new());

    /// Identifiers the render layer iterates. Reactive so deriveds
    /// re-run when followers appear or disappear.
    static ACTIVE_IDS: RefCell<ReactiveSet<String>> = RefCell::new(ReactiveSet::new());
}

// =============================================================================
// Unit Lifecycle
// =============================================================================

/// Spawn the unit for `id` and wire it to the buses.
///
/// Each subscription replays the current fact, so a unit spawned while
/// its anchor is already registered places itself before this returns.
pub(crate) fn spawn_unit(id: &str) -> Rc<FollowerUnit> {
    let unit = Rc::new(FollowerUnit::new(
        id,
        store::animation(id).unwrap_or_default(),
        store::projected_content(id),
    ));

    UNITS.with(|units| {
        units.borrow_mut().insert(id.to_string(), unit.clone());
    });
    ACTIVE_IDS.with(|set| {
        set.borrow_mut().insert(id.to_string());
    });

    let tracked = unit.clone();
    let anchor_sub = bus::subscribe_anchor(id, move |_| unit::refresh(&tracked));
    let tracked = unit.clone();
    let point_sub = bus::subscribe_virtual_point(id, move |_| unit::refresh(&tracked));
    let tracked = unit.clone();
    let animation_sub =
        bus::subscribe_animation(id, move |config| unit::apply_animation(&tracked, config));

    unit.hold_cleanups(vec![anchor_sub, point_sub, animation_sub]);
    unit
}

/// Destroy the unit for `id`, if any. Safe to call when none exists.
pub(crate) fn destroy_unit(id: &str) {
    let unit = UNITS.with(|units| units.borrow_mut().remove(id));
    ACTIVE_IDS.with(|set| {
        let key = id.to_string();
        set.borrow_mut().remove(&key);
    });
    if let Some(unit) = unit {
        unit.retire();
    }
}

/// Swap the content a live unit projects.
pub(crate) fn update_content(id: &str, content: Option<ProjectedContent>) {
    if let Some(unit) = unit(id) {
        unit.set_content(content);
    }
}

// =============================================================================
// Queries
// =============================================================================

pub fn unit(id: &str) -> Option<Rc<FollowerUnit>> {
    UNITS.with(|units| units.borrow().get(id).cloned())
}

pub fn has_unit(id: &str) -> bool {
    UNITS.with(|units| units.borrow().contains_key(id))
}

/// Identifiers with a live follower unit.
///
/// Creates a reactive dependency when called from a derived or effect.
pub fn active_ids() -> Vec<String> {
    ACTIVE_IDS.with(|set| set.borrow().iter().cloned().collect())
}

pub fn unit_count() -> usize {
    UNITS.with(|units| units.borrow().len())
}

// =============================================================================
// Pumps
// =============================================================================

/// Re-resolve every unit's placement. Invoked on geometry changes.
pub(crate) fn refresh_all() {
    let units: Vec<Rc<FollowerUnit>> =
        UNITS.with(|units| units.borrow().values().cloned().collect());
    for unit in units {
        unit::refresh(&unit);
    }
}

/// Advance every spring-driven unit by `dt` seconds.
pub(crate) fn advance_springs(dt: f32) {
    let units: Vec<Rc<FollowerUnit>> =
        UNITS.with(|units| units.borrow().values().cloned().collect());
    for unit in units {
        unit::advance(&unit, dt);
    }
}

/// Reset all follower state (for testing).
pub fn reset_follower_state() {
    let units: Vec<Rc<FollowerUnit>> =
        UNITS.with(|units| units.borrow_mut().drain().map(|(_, unit)| unit).collect());
    for unit in units {
        unit.retire();
    }
    ACTIVE_IDS.with(|set| set.borrow_mut().clear());
}

// =============================================================================
// Tests
// =============================================================================
