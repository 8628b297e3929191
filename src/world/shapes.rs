//! Shape factory
//!
//! Turns an abstract shape description into an engine collision shape.

use std::fmt;
use std::str::FromStr;

use rapier3d::prelude::SharedShape;
use tracing::debug;

use super::{PhysicsError, PhysicsResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Box,
    Sphere,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeKind::Box => write!(f, "box"),
            ShapeKind::Sphere => write!(f, "sphere"),
        }
    }
}

impl FromStr for ShapeKind {
    type Err = PhysicsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "box" | "cube" | "cuboid" => Ok(ShapeKind::Box),
            "sphere" | "ball" => Ok(ShapeKind::Sphere),
            _ => Err(PhysicsError::UnsupportedShapeKind { kind: s.to_string() }),
        }
    }
}

/// Shape request, in the units the renderable was authored in.
///
/// Dimensions are `f32` to match the engine's `Real` and the scene's
/// transforms; no extra precision survives the trip into the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeDescriptor {
    /// Half extents along x, y and z.
    Box { half_extents: (f32, f32, f32) },
    Sphere { radius: f32 },
}

impl ShapeDescriptor {
    /// Box from full edge lengths.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        ShapeDescriptor::Box {
            half_extents: (width * 0.5, height * 0.5, depth * 0.5),
        }
    }

    pub fn sphere(radius: f32) -> Self {
        ShapeDescriptor::Sphere { radius }
    }

    /// Parses a kind name plus its dimensions.
    ///
    /// Boxes take three full edge lengths (or one, for a cube); spheres take a
    /// radius.
    pub fn parse(kind: &str, dimensions: &[f32]) -> PhysicsResult<Self> {
        let shape_kind: ShapeKind = kind.parse()?;
        let descriptor = match (shape_kind, dimensions) {
            (ShapeKind::Box, [w, h, d]) => ShapeDescriptor::cuboid(*w, *h, *d),
            (ShapeKind::Box, [edge]) => ShapeDescriptor::cuboid(*edge, *edge, *edge),
            (ShapeKind::Sphere, [radius]) => ShapeDescriptor::sphere(*radius),
            (kind, dims) => {
                return Err(PhysicsError::InvalidDimensions {
                    kind: kind.to_string(),
                    reason: format!("unexpected dimension count {}", dims.len()),
                })
            }
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeDescriptor::Box { .. } => ShapeKind::Box,
            ShapeDescriptor::Sphere { .. } => ShapeKind::Sphere,
        }
    }

    pub fn validate(&self) -> PhysicsResult<()> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        let ok = match *self {
            ShapeDescriptor::Box { half_extents: (x, y, z) } => positive(x) && positive(y) && positive(z),
            ShapeDescriptor::Sphere { radius } => positive(radius),
        };
        if ok {
            Ok(())
        } else {
            Err(PhysicsError::InvalidDimensions {
                kind: self.kind().to_string(),
                reason: format!("{:?} must be finite and positive", self),
            })
        }
    }
}

/// Engine collision shape. Cheap to clone; the geometry is shared.
#[derive(Clone)]
pub struct ShapeHandle {
    kind: ShapeKind,
    shape: SharedShape,
}

impl ShapeHandle {
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub(crate) fn shared_shape(&self) -> &SharedShape {
        &self.shape
    }
}

impl fmt::Debug for ShapeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeHandle").field("kind", &self.kind).finish()
    }
}

/// Builds the engine shape for `descriptor`.
///
/// Boxes keep their requested outer extent: the convex radius is carved out
/// of the half extents and added back as a rounded border. The radius never
/// exceeds the thinnest half extent.
pub fn create_shape(descriptor: &ShapeDescriptor, convex_radius: f32) -> PhysicsResult<ShapeHandle> {
    descriptor.validate()?;
    let shape = match *descriptor {
        ShapeDescriptor::Box { half_extents: (hx, hy, hz) } => {
            let radius = convex_radius.max(0.0).min(hx.min(hy).min(hz));
            if radius > 0.0 {
                SharedShape::round_cuboid(hx - radius, hy - radius, hz - radius, radius)
            } else {
                SharedShape::cuboid(hx, hy, hz)
            }
        }
        ShapeDescriptor::Sphere { radius } => SharedShape::ball(radius),
    };
    debug!("Created {} shape from {:?}", descriptor.kind(), descriptor);
    Ok(ShapeHandle {
        kind: descriptor.kind(),
        shape,
    })
}
