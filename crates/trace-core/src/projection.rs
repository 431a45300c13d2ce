//! Mapping anchors into the flat surface frame the grid uses.

use serde::{Deserialize, Serialize};

use crate::point::SurfacePoint;

/// Anything that can report where it sits on the board surface.
pub trait SurfaceAnchor {
    fn surface_position(&self) -> SurfacePoint;
}

impl SurfaceAnchor for SurfacePoint {
    fn surface_position(&self) -> SurfacePoint {
        *self
    }
}

/// One level of nesting: an offset in the parent's frame plus a rotation about the board
/// normal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub offset: SurfacePoint,
    #[serde(default)]
    pub rotation_deg: f64,
}

impl Frame {
    pub fn new(offset: SurfacePoint, rotation_deg: f64) -> Self {
        Self {
            offset,
            rotation_deg,
        }
    }
}

/// Parent chain from the board's direct child (first) down to the anchor (last).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameChain {
    pub frames: Vec<Frame>,
}

impl FrameChain {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }
}

impl SurfaceAnchor for FrameChain {
    fn surface_position(&self) -> SurfacePoint {
        let mut position = SurfacePoint::default();
        let mut rotation = 0.0;
        for frame in &self.frames {
            position = position + frame.offset.rotated(rotation);
            rotation += frame.rotation_deg;
        }
        position
    }
}
