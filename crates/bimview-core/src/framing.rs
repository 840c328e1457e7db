//! Post-load framing
//!
//! Models arrive in whatever units and placement their authoring tool used.
//! Framing rescales the model to a fixed size, centers it on the origin, sets
//! it on the ground plane and picks a camera pose that shows all of it.

use glam::Vec3;

use crate::config::FramingConfig;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bounds of a point set, `None` when there are no points
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = [f32; 3]>,
    {
        let mut points = points.into_iter().map(Vec3::from);
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn max_dimension(&self) -> f32 {
        self.size().max_element()
    }

    /// Box after scaling about the origin
    pub fn scaled(&self, factor: f32) -> Self {
        // A negative factor would swap min and max
        let a = self.min * factor;
        let b = self.max * factor;
        Self::new(a.min(b), a.max(b))
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        Self::new(self.min + offset, self.max + offset)
    }

    /// Sphere through the box corners
    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere {
            center: self.center(),
            radius: self.size().length() * 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Model placement and camera pose that frame a model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    /// Uniform scale applied to the model root
    pub scale: f32,
    /// Translation applied to the model root after scaling
    pub translation: Vec3,
    /// Model bounds after scale and translation
    pub bounds: Aabb,
    pub camera_position: Vec3,
    pub camera_target: Vec3,
    /// The model has no extent; it was left unscaled
    pub degenerate: bool,
}

impl Framing {
    pub fn compute(bounds: Aabb, config: &FramingConfig) -> Self {
        let max_dim = bounds.max_dimension();
        let degenerate = !(max_dim.is_finite() && max_dim > 0.0);

        let scale = if degenerate {
            1.0
        } else {
            config.target_size / max_dim
        };

        let scaled = bounds.scaled(scale);
        let center = scaled.center();
        let translation = Vec3::new(-center.x, config.ground_offset - scaled.min.y, -center.z);
        let placed = scaled.translated(translation);

        let sphere = placed.bounding_sphere();
        let distance = sphere.radius * config.camera_distance_factor;
        let camera_position = sphere.center + Vec3::from(config.camera_bias) * distance;

        Self {
            scale,
            translation,
            bounds: placed,
            camera_position,
            camera_target: sphere.center,
            degenerate,
        }
    }
}

/// Camera placement around a target in spherical coordinates (Y-up)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitPose {
    /// Angle around +Y, measured from +X toward +Z
    pub azimuth: f32,
    /// Angle above the ground plane
    pub elevation: f32,
    pub distance: f32,
}

impl OrbitPose {
    /// Pose whose offset from the target is `offset`
    pub fn from_offset(offset: Vec3) -> Self {
        let distance = offset.length();
        if distance <= f32::EPSILON {
            return Self {
                azimuth: 0.0,
                elevation: 0.0,
                distance: 0.0,
            };
        }
        Self {
            azimuth: offset.z.atan2(offset.x),
            elevation: (offset.y / distance).clamp(-1.0, 1.0).asin(),
            distance,
        }
    }

    pub fn to_offset(&self) -> Vec3 {
        let horizontal = self.distance * self.elevation.cos();
        Vec3::new(
            horizontal * self.azimuth.cos(),
            self.distance * self.elevation.sin(),
            horizontal * self.azimuth.sin(),
        )
    }
}
