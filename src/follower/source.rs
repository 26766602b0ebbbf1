//! Positioning source resolution.
//!
//! A follower positions over exactly one source at a time: a caller
//! supplied virtual point when one is set, otherwise the live anchor.
//! Resolution happens here once, so the follower unit never branches on
//! presence checks itself.

use crate::registry::store;
use crate::types::{AnchorHandle, Point, Rect};

/// The thing a follower positions over.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionSource {
    /// Caller-supplied screen coordinate. Overrides the anchor.
    Virtual(Point),
    /// Live anchor element, measured on demand.
    Live(AnchorHandle),
}

impl PositionSource {
    /// Rectangle of the source right now.
    ///
    /// A virtual point has no extent; a live anchor reports `None`
    /// until it has been laid out.
    pub fn rect(&self) -> Option<Rect> {
        match self {
            Self::Virtual(point) => Some(Rect::from_point(*point)),
            Self::Live(handle) => handle.rect(),
        }
    }
}

/// Resolve the positioning source for `id`, virtual point first.
pub fn resolve(id: &str) -> Option<PositionSource> {
    if let Some(point) = store::virtual_point(id) {
        return Some(PositionSource::Virtual(point));
    }
    store::anchor(id).map(PositionSource::Live)
}
