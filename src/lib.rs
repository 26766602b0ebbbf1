//! # tether-tui
//!
//! Anchor-following overlay layer for reactive terminal UIs.
//!
//! Content described at one place in a rendering tree is drawn at an
//! independently-controlled screen location and kept positioned over a
//! movable anchor element, surviving the anchor's destroy-then-recreate
//! cycle without a flash of empty state.
//!
//! ## Architecture
//!
//! A process-wide registry maps stable identifiers to four independent
//! facts: anchor handle, virtual point override, projected content, and
//! animation configuration. Per-identifier subscription buses notify
//! position consumers without re-rendering the whole tree. A deferred
//! cleanup machine keeps a vanished anchor's record alive through a
//! grace window so re-registration restores the follower intact.
//!
//! ```text
//! registerAnchor → Store → Bus → FollowerUnit → PlacementStrategy → Placement
//!                                     └── inertial → Spring Path ──┘
//! ```
//!
//! The host event loop drives time with `FollowRegistry::tick()` and
//! forwards geometry changes to [`geometry::notify_geometry_changed`].
//!
//! ## Modules
//!
//! - [`types`] - Core types (Point, Rect, AnchorHandle, ProjectedContent)
//! - [`registry`] - Fact store, subscription buses, deferred cleanup
//! - [`follower`] - Follower units and positioning source resolution
//! - [`placement`] - Placement strategy seam (default: exact overlay)
//! - [`spring`] - Spring-integrated continuous motion
//! - [`geometry`] - Terminal size signals and geometry notifications

pub mod follower;
pub mod geometry;
pub mod placement;
pub mod registry;
pub mod spring;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use registry::{
    DEFAULT_GRACE_WINDOW, FollowBinding, FollowHandle, FollowRegistry, RecordState,
    create_follow_registry, evict, follow, grace_window, record_state, register_anchor,
    reset_follow_state, set_animation_config, set_grace_window, set_projected_content,
    set_virtual_point, subscribe_anchor, subscribe_animation, subscribe_virtual_point,
};

pub use follower::{FollowerPhase, FollowerUnit, Placement, PositionSource, active_ids};

pub use placement::{
    OverlayPlacement, PlacementStrategy, compute_rect, reset_placement_strategy,
    set_placement_strategy,
};

pub use spring::{PairedSprings, Spring, SpringConfig};

pub use geometry::{
    detect_terminal_size, geometry_revision, handle_resize, notify_geometry_changed,
    set_terminal_size, terminal_height, terminal_width,
};
