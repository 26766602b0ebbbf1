//! Core types for tether-tui.
//!
//! These types define the foundation that everything builds on.
//! They flow through the registry, the subscription buses, and the
//! follower placement pipeline.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use crate::spring::SpringConfig;

// =============================================================================
// Cleanup Function
// =============================================================================

/// Cleanup function returned by subscriptions and bindings.
///
/// Call it exactly once to tear down what was registered. Calling the
/// underlying unsubscribe after the channel is already gone is a no-op.
pub type Cleanup = Box<dyn FnOnce()>;

// =============================================================================
// Geometry
// =============================================================================

/// A screen coordinate in cells.
///
/// Stored as `f32` so spring-animated positions can move between cells;
/// the render layer rounds when it draws.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned screen rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Zero-size rectangle at a point. Used for virtual positioning
    /// sources, where the caller supplies a coordinate but no extent.
    pub const fn from_point(point: Point) -> Self {
        Self::new(point.x, point.y, 0.0, 0.0)
    }

    /// Top-left corner.
    #[inline]
    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

// =============================================================================
// Anchor Handle
// =============================================================================

/// Handle to a mounted surface element a follower positions over.
///
/// Carries the component index of the anchored element plus a measure
/// function that returns its current layout rectangle. The measure
/// function returns `None` until the element has been laid out, which
/// keeps the follower hidden until a rectangle is known.
#[derive(Clone)]
pub struct AnchorHandle {
    component: usize,
    measure: Rc<dyn Fn() -> Option<Rect>>,
}

impl AnchorHandle {
    pub fn new(component: usize, measure: impl Fn() -> Option<Rect> + 'static) -> Self {
        Self {
            component,
            measure: Rc::new(measure),
        }
    }

    /// Index of the anchored component.
    pub fn component(&self) -> usize {
        self.component
    }

    /// Current layout rectangle of the anchored element.
    pub fn rect(&self) -> Option<Rect> {
        (self.measure)()
    }
}

impl fmt::Debug for AnchorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnchorHandle")
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}

impl PartialEq for AnchorHandle {
    fn eq(&self, other: &Self) -> bool {
        self.component == other.component && Rc::ptr_eq(&self.measure, &other.measure)
    }
}

// =============================================================================
// Projected Content
// =============================================================================

/// Deferred builder for the content a follower projects.
///
/// The registry treats the payload as opaque; the render layer invokes
/// the builder to produce the projected subtree. Compared by identity,
/// so replacing content is observable while re-setting the same payload
/// is not.
#[derive(Clone)]
pub struct ProjectedContent {
    build: Rc<dyn Fn()>,
}

impl ProjectedContent {
    pub fn new(build: impl Fn() + 'static) -> Self {
        Self {
            build: Rc::new(build),
        }
    }

    /// Invoke the builder.
    pub fn build(&self) {
        (self.build)()
    }

    /// Identity comparison (same underlying builder).
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.build, &other.build)
    }
}

impl fmt::Debug for ProjectedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectedContent").finish_non_exhaustive()
    }
}

impl PartialEq for ProjectedContent {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

// =============================================================================
// Animation Config
// =============================================================================

/// How a follower moves between computed positions.
///
/// Direct mode re-places the follower on each change; the render layer
/// may tween between placements. Inertial mode hands targets to a
/// spring and renders at the continuously integrated position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationConfig {
    /// Spring-integrated continuous motion instead of discrete placement.
    pub inertial: bool,
    /// Spring parameters used when `inertial` is set.
    pub spring: SpringConfig,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            inertial: false,
            spring: SpringConfig::default(),
        }
    }
}

impl AnimationConfig {
    /// Discrete placement with default spring parameters held in reserve.
    pub fn direct() -> Self {
        Self::default()
    }

    /// Spring-driven motion with the given parameters.
    pub fn inertial(spring: SpringConfig) -> Self {
        Self {
            inertial: true,
            spring,
        }
    }
}

// =============================================================================
// Fact Kinds
// =============================================================================

bitflags! {
    /// The four independent facts tracked per identifier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FactKinds: u8 {
        const ANCHOR = 1 << 0;
        const POINT = 1 << 1;
        const CONTENT = 1 << 2;
        const ANIMATION = 1 << 3;
    }
}

// =============================================================================
// Tests
// =============================================================================
