//! Pinhole camera for ray generation.

use crate::sampling::gen_f32;
use lumen_math::{Ray, Vec3};
use rand::RngCore;

/// Camera for generating primary rays into the scene.
///
/// Normalized image coordinates `(u, v)` run from `(0, 0)` at the top-left
/// corner to `(1, 1)` at the bottom-right.
#[derive(Debug, Clone)]
pub struct Camera {
    // Image settings
    pub image_width: u32,
    pub image_height: u32,

    // Camera positioning
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,

    vfov: f32,         // Vertical field of view in degrees
    focal_length: f32, // Distance from the eye to the image plane

    // Cached computed values (set by initialize())
    center: Vec3,
    upper_left: Vec3,
    horizontal: Vec3,
    vertical: Vec3,
}

impl Camera {
    /// Create a camera at the origin looking down -Z.
    ///
    /// With the default 90 degree FOV and unit focal length the viewport is
    /// 2 units tall and `2 * aspect` wide.
    pub fn new() -> Self {
        let mut camera = Self {
            image_width: 1000,
            image_height: 562,
            look_from: Vec3::ZERO,
            look_at: Vec3::NEG_Z,
            vup: Vec3::Y,
            vfov: 90.0,
            focal_length: 1.0,
            center: Vec3::ZERO,
            upper_left: Vec3::ZERO,
            horizontal: Vec3::ZERO,
            vertical: Vec3::ZERO,
        };
        camera.initialize();
        camera
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width;
        self.image_height = height;
        self.initialize();
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self.initialize();
        self
    }

    /// Set vertical field of view (degrees) and focal length.
    pub fn with_fov(mut self, vfov: f32, focal_length: f32) -> Self {
        self.vfov = vfov;
        self.focal_length = focal_length;
        self.initialize();
        self
    }

    /// Recompute the cached viewport after a setting changed.
    fn initialize(&mut self) {
        self.center = self.look_from;

        // Calculate viewport dimensions
        let theta = self.vfov.to_radians();
        let h = (theta / 2.0).tan();
        let viewport_height = 2.0 * h * self.focal_length;
        let aspect = self.image_width.max(1) as f32 / self.image_height.max(1) as f32;
        let viewport_width = viewport_height * aspect;

        // Calculate camera basis vectors
        let w = (self.look_from - self.look_at).normalize_or_zero();
        let u = self.vup.cross(w).normalize_or_zero();
        let v = w.cross(u);

        // Rows go down the image, so the vertical edge points along -v
        self.horizontal = viewport_width * u;
        self.vertical = -viewport_height * v;

        self.upper_left =
            self.center - self.focal_length * w - self.horizontal / 2.0 - self.vertical / 2.0;
    }

    /// Ray through normalized image coordinates `(u, v)`.
    pub fn get_ray(&self, u: f32, v: f32) -> Ray {
        let target = self.upper_left + u * self.horizontal + v * self.vertical;
        Ray::new(self.center, target - self.center)
    }

    /// Ray through pixel `(i, j)` with a random offset inside the pixel.
    pub fn pixel_ray(&self, i: u32, j: u32, rng: &mut dyn RngCore) -> Ray {
        let u = (i as f32 + gen_f32(rng)) / (self.image_width.saturating_sub(1).max(1)) as f32;
        let v = (j as f32 + gen_f32(rng)) / (self.image_height.saturating_sub(1).max(1)) as f32;
        self.get_ray(u, v)
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
