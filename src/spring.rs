//! Spring Path - continuous motion toward discrete targets.
//!
//! Converts a stream of discrete target coordinates into continuously
//! integrated coordinates. Retargeting keeps the current position and
//! velocity, so a follower chasing a moving anchor never jumps.
//!
//! Each axis is an independent damped harmonic oscillator:
//!
//! ```text
//! a = (stiffness * (target - position) - damping * velocity) / mass
//! ```
//!
//! integrated with semi-implicit Euler at a clamped substep.
//!
//! # Example
//!
//! ```ignore
//! use tether_tui::spring::{Spring, SpringConfig};
//!
//! let mut spring = Spring::new(0.0, SpringConfig::default());
//! spring.set_target(100.0);
//! spring.step(1.0 / 60.0);
//! assert!(spring.position() > 0.0 && spring.position() < 100.0);
//! ```

use crate::types::Point;

/// Largest integration substep. Stiff springs go unstable with big
/// steps; a long frame is split instead of integrated in one go.
const MAX_SUBSTEP: f32 = 1.0 / 120.0;

/// Thresholds below which a spring snaps to its target and rests.
const POSITION_EPSILON: f32 = 0.01;
const VELOCITY_EPSILON: f32 = 0.01;

// =============================================================================
// Spring Config
// =============================================================================

/// Parameters of the mass-spring-damper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringConfig {
    pub stiffness: f32,
    pub damping: f32,
    pub mass: f32,
}

impl SpringConfig {
    pub const fn new(stiffness: f32, damping: f32, mass: f32) -> Self {
        Self {
            stiffness,
            damping,
            mass,
        }
    }

    /// Looser parameters for slow organic motion.
    pub const GENTLE: Self = Self::new(170.0, 26.0, 1.0);
}

impl Default for SpringConfig {
    /// Tight tracking with little overshoot.
    fn default() -> Self {
        Self::new(400.0, 40.0, 1.0)
    }
}

// =============================================================================
// Single-Axis Spring
// =============================================================================

/// One axis of spring motion.
///
/// A new configuration set while motion is in flight is held pending and
/// applied on the next retarget, never mid-flight.
#[derive(Debug, Clone, Copy)]
pub struct Spring {
    position: f32,
    velocity: f32,
    target: f32,
    config: SpringConfig,
    pending_config: Option<SpringConfig>,
}

impl Spring {
    /// Spring at rest at `initial`.
    pub fn new(initial: f32, config: SpringConfig) -> Self {
        Self {
            position: initial,
            velocity: 0.0,
            target: initial,
            config,
            pending_config: None,
        }
    }

    /// Retarget, preserving current position and velocity.
    pub fn set_target(&mut self, target: f32) {
        if let Some(config) = self.pending_config.take() {
            self.config = config;
        }
        self.target = target;
    }

    /// Stage a new configuration; takes effect on the next retarget.
    pub fn set_config(&mut self, config: SpringConfig) {
        self.pending_config = Some(config);
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn config(&self) -> SpringConfig {
        self.config
    }

    /// At rest close enough to the target.
    pub fn is_settled(&self) -> bool {
        (self.target - self.position).abs() < POSITION_EPSILON
            && self.velocity.abs() < VELOCITY_EPSILON
    }

    /// Advance by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 || self.is_settled() {
            self.rest_if_settled();
            return;
        }

        let mass = self.config.mass.max(f32::EPSILON);
        let mut remaining = dt;
        while remaining > 0.0 {
            let h = remaining.min(MAX_SUBSTEP);
            let accel = (self.config.stiffness * (self.target - self.position)
                - self.config.damping * self.velocity)
                / mass;
            self.velocity += accel * h;
            self.position += self.velocity * h;
            remaining -= h;
        }

        self.rest_if_settled();
    }

    fn rest_if_settled(&mut self) {
        if self.is_settled() {
            self.position = self.target;
            self.velocity = 0.0;
        }
    }
}

// =============================================================================
// Paired Springs
// =============================================================================

/// Independent x/y springs driving a screen position.
#[derive(Debug, Clone, Copy)]
pub struct PairedSprings {
    x: Spring,
    y: Spring,
}

impl PairedSprings {
    /// Both axes at rest at `point`.
    pub fn at(point: Point, config: SpringConfig) -> Self {
        Self {
            x: Spring::new(point.x, config),
            y: Spring::new(point.y, config),
        }
    }

    /// Retarget both axes, preserving position and velocity.
    pub fn retarget(&mut self, target: Point) {
        self.x.set_target(target.x);
        self.y.set_target(target.y);
    }

    /// Stage a configuration change for the next retarget.
    pub fn set_config(&mut self, config: SpringConfig) {
        self.x.set_config(config);
        self.y.set_config(config);
    }

    pub fn step(&mut self, dt: f32) {
        self.x.step(dt);
        self.y.step(dt);
    }

    pub fn position(&self) -> Point {
        Point::new(self.x.position(), self.y.position())
    }

    pub fn velocity(&self) -> Point {
        Point::new(self.x.velocity(), self.y.velocity())
    }

    pub fn is_settled(&self) -> bool {
        self.x.is_settled() && self.y.is_settled()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn run(spring: &mut Spring, seconds: f32) {
        let mut elapsed = 0.0;
        while elapsed < seconds {
            spring.step(1.0 / 60.0);
            elapsed += 1.0 / 60.0;
        }
    }

    #[test]
    fn test_converges_to_target() {
        let mut spring = Spring::new(0.0, SpringConfig::default());
        spring.set_target(50.0);

        run(&mut spring, 2.0);

        assert!(spring.is_settled());
        assert_eq!(spring.position(), 50.0);
        assert_eq!(spring.velocity(), 0.0);
    }

    #[test]
    fn test_moves_toward_target_each_step() {
        let mut spring = Spring::new(0.0, SpringConfig::default());
        spring.set_target(100.0);

        spring.step(1.0 / 60.0);
        let first = spring.position();
        spring.step(1.0 / 60.0);
        let second = spring.position();

        assert!(first > 0.0);
        assert!(second > first);
        assert!(second < 100.0);
    }

    #[test]
    fn test_retarget_preserves_position_and_velocity() {
        let mut spring = Spring::new(0.0, SpringConfig::default());
        spring.set_target(100.0);
        run(&mut spring, 0.1);

        let position = spring.position();
        let velocity = spring.velocity();
        assert!(velocity.abs() > 0.0);

        // Mid-flight retarget: no instantaneous jump.
        spring.set_target(-40.0);
        assert_eq!(spring.position(), position);
        assert_eq!(spring.velocity(), velocity);

        run(&mut spring, 3.0);
        assert_eq!(spring.position(), -40.0);
    }

    #[test]
    fn test_config_applies_on_next_retarget() {
        let mut spring = Spring::new(0.0, SpringConfig::default());
        spring.set_target(10.0);

        spring.set_config(SpringConfig::GENTLE);
        assert_eq!(spring.config(), SpringConfig::default());

        spring.set_target(20.0);
        assert_eq!(spring.config(), SpringConfig::GENTLE);
    }

    #[test]
    fn test_settles_at_rest_without_target_change() {
        let mut spring = Spring::new(5.0, SpringConfig::default());
        assert!(spring.is_settled());

        spring.step(1.0);
        assert_eq!(spring.position(), 5.0);
    }

    #[test]
    fn test_long_frame_is_substepped() {
        let mut spring = Spring::new(0.0, SpringConfig::default());
        spring.set_target(30.0);

        // A single quarter-second frame must stay stable.
        spring.step(0.25);
        assert!(spring.position().is_finite());
        assert!(spring.position() <= 60.0);
    }

    #[test]
    fn test_paired_springs_track_independently() {
        let mut pair = PairedSprings::at(Point::new(0.0, 100.0), SpringConfig::default());
        pair.retarget(Point::new(100.0, 100.0));

        let mut elapsed = 0.0;
        while elapsed < 2.0 {
            pair.step(1.0 / 60.0);
            elapsed += 1.0 / 60.0;
        }

        assert!(pair.is_settled());
        assert_eq!(pair.position(), Point::new(100.0, 100.0));
    }
}
