//! Follower Unit - one projected rendering per identifier with content.
//!
//! A unit consumes anchor, virtual point, and animation changes from
//! the bus, resolves a positioning source, runs it through the
//! placement strategy, and exposes the result on signals the render
//! layer tracks.
//!
//! Phase machine: a unit starts `Hidden` and becomes `Visible` on its
//! first successful rectangle resolution, staying `Visible` for its
//! lifetime. The first placement snaps into position; later direct
//! placements are flagged as transitions. The separate `showing` signal
//! reflects whether a source is currently resolvable, which is what
//! hides the follower the instant its anchor vanishes.

use std::cell::{Cell, RefCell};

use spark_signals::{Signal, signal};

use crate::placement;
use crate::spring::PairedSprings;
use crate::types::{AnimationConfig, Cleanup, ProjectedContent, Rect};

use super::source;

// =============================================================================
// Types
// =============================================================================

/// Lifetime phase of a follower unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerPhase {
    /// No positioning source has resolved yet.
    Hidden,
    /// A rectangle has been computed at least once.
    Visible,
}

/// One computed placement.
///
/// `animate` tells the render layer whether to transition from the
/// previous position. The very first placement never animates, so a
/// freshly shown follower cannot fly in from the origin. Spring-driven
/// placements never set it either; the position itself already moves
/// continuously.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub rect: Rect,
    pub animate: bool,
}

// =============================================================================
// Follower Unit
// =============================================================================

/// A live projection of content positioned over its source.
pub struct FollowerUnit {
    id: String,
    phase: Cell<FollowerPhase>,
    showing: Signal<bool>,
    placement: Signal<Option<Placement>>,
    content: Signal<Option<ProjectedContent>>,
    /// Last placement-strategy output, also fed back as `previous`.
    target: Cell<Option<Rect>>,
    animation: Cell<AnimationConfig>,
    springs: RefCell<Option<PairedSprings>>,
    cleanups: RefCell<Vec<Cleanup>>,
}

impl FollowerUnit {
    pub(crate) fn new(
        id: &str,
        animation: AnimationConfig,
        content: Option<ProjectedContent>,
    ) -> Self {
        Self {
            id: id.to_string(),
            phase: Cell::new(FollowerPhase::Hidden),
            showing: signal(false),
            placement: signal(None),
            content: signal(content),
            target: Cell::new(None),
            animation: Cell::new(animation),
            springs: RefCell::new(None),
            cleanups: RefCell::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> FollowerPhase {
        self.phase.get()
    }

    /// Whether the render layer should draw this follower right now.
    pub fn is_showing(&self) -> bool {
        self.showing.get()
    }

    pub fn placement(&self) -> Option<Placement> {
        self.placement.get()
    }

    pub fn content(&self) -> Option<ProjectedContent> {
        self.content.get()
    }

    pub fn animation(&self) -> AnimationConfig {
        self.animation.get()
    }

    /// Signal for reactive tracking of visibility.
    pub fn showing_signal(&self) -> Signal<bool> {
        self.showing.clone()
    }

    /// Signal for reactive tracking of placement.
    pub fn placement_signal(&self) -> Signal<Option<Placement>> {
        self.placement.clone()
    }

    /// Signal for reactive tracking of content replacement.
    pub fn content_signal(&self) -> Signal<Option<ProjectedContent>> {
        self.content.clone()
    }

    pub(crate) fn set_content(&self, content: Option<ProjectedContent>) {
        self.content.set(content);
    }

    pub(crate) fn hold_cleanups(&self, cleanups: Vec<Cleanup>) {
        self.cleanups.borrow_mut().extend(cleanups);
    }

    /// Run held cleanups and stop showing. Called exactly once, when
    /// the unit is destroyed.
    pub(crate) fn retire(&self) {
        for cleanup in self.cleanups.borrow_mut().drain(..) {
            cleanup();
        }
        self.showing.set(false);
        self.content.set(None);
    }
}

// =============================================================================
// Placement Pipeline
// =============================================================================

/// Re-resolve the unit's source and place it.
///
/// Runs on every anchor or virtual point notification and on geometry
/// changes. With no resolvable source the unit stops showing but keeps
/// its phase and last placement, so a returning anchor animates from
/// where the follower was.
pub(crate) fn refresh(unit: &FollowerUnit) {
    let source_rect = source::resolve(&unit.id).and_then(|source| source.rect());
    let Some(source_rect) = source_rect else {
        unit.showing.set(false);
        return;
    };

    let target = placement::compute_rect(source_rect, unit.target.get());
    unit.target.set(Some(target));

    let config = unit.animation.get();
    match unit.phase.get() {
        FollowerPhase::Hidden => {
            // First placement snaps.
            if config.inertial {
                *unit.springs.borrow_mut() = Some(PairedSprings::at(target.origin(), config.spring));
            }
            unit.placement.set(Some(Placement {
                rect: target,
                animate: false,
            }));
            unit.phase.set(FollowerPhase::Visible);
        }
        FollowerPhase::Visible if config.inertial => {
            let position = {
                let mut springs = unit.springs.borrow_mut();
                let springs = springs.get_or_insert_with(|| {
                    // Engaged mid-life: start from wherever the
                    // follower currently renders.
                    let from = unit
                        .placement
                        .get()
                        .map(|placement| placement.rect.origin())
                        .unwrap_or_else(|| target.origin());
                    PairedSprings::at(from, config.spring)
                });
                springs.retarget(target.origin());
                springs.position()
            };
            unit.placement.set(Some(Placement {
                rect: Rect::new(position.x, position.y, target.width, target.height),
                animate: false,
            }));
        }
        FollowerPhase::Visible => {
            // Only a real move is a transition; re-resolving the same
            // rectangle (spurious geometry notification, second replay
            // during spawn) must not re-animate.
            let moved = unit
                .placement
                .get()
                .map(|placement| placement.rect != target)
                .unwrap_or(true);
            if moved {
                unit.placement.set(Some(Placement {
                    rect: target,
                    animate: true,
                }));
            }
        }
    }

    unit.showing.set(true);
}

/// Apply a new animation configuration.
///
/// Turning inertial off drops the spring and finishes any outstanding
/// motion as one discrete transition to the current target. Turning it
/// on engages a spring lazily at the next placement; an existing spring
/// picks the new parameters up on its next retarget.
pub(crate) fn apply_animation(unit: &FollowerUnit, config: AnimationConfig) {
    unit.animation.set(config);

    if config.inertial {
        if let Some(springs) = unit.springs.borrow_mut().as_mut() {
            springs.set_config(config.spring);
        }
        return;
    }

    let had_springs = unit.springs.borrow_mut().take().is_some();
    if !had_springs {
        return;
    }
    if let (Some(target), Some(placement)) = (unit.target.get(), unit.placement.get()) {
        if placement.rect != target {
            unit.placement.set(Some(Placement {
                rect: target,
                animate: true,
            }));
        }
    }
}

/// Advance spring motion by `dt` seconds.
pub(crate) fn advance(unit: &FollowerUnit, dt: f32) {
    if unit.phase.get() != FollowerPhase::Visible {
        return;
    }

    let position = {
        let mut springs = unit.springs.borrow_mut();
        let Some(springs) = springs.as_mut() else {
            return;
        };
        if springs.is_settled() {
            return;
        }
        springs.step(dt);
        springs.position()
    };

    if let Some(placement) = unit.placement.get() {
        unit.placement.set(Some(Placement {
            rect: Rect::new(position.x, position.y, placement.rect.width, placement.rect.height),
            animate: false,
        }));
    }
}
