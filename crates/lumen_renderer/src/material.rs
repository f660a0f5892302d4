//! Material trait for surface scattering.

use crate::hittable::HitRecord;
use crate::sampling::random_unit_vector;
use lumen_math::{Color, Ray, Vec3};
use rand::RngCore;

/// Outcome of a successful scatter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterResult {
    /// Per-channel color multiplier for light returning along `scattered`
    pub attenuation: Color,
    /// The outgoing ray
    pub scattered: Ray,
}

/// Trait for materials that describe how light interacts with surfaces.
///
/// The generator is passed in by the caller: `rand::thread_rng()` for the
/// global stream, a per-pixel `PcgHash` for reproducible renders.
pub trait Material: Send + Sync {
    /// Scatter an incoming ray.
    ///
    /// Returns `None` if the ray is absorbed.
    fn scatter(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> Option<ScatterResult>;

    /// Current albedo.
    fn albedo(&self) -> Color;

    /// Replace the albedo.
    fn set_albedo(&mut self, albedo: Color);

    /// Short tag for the inspection panel.
    fn type_name(&self) -> &'static str;
}

/// Lambertian (diffuse) material.
#[derive(Debug, Clone)]
pub struct Lambertian {
    albedo: Color,
}

impl Lambertian {
    /// Create a new Lambertian material with the given albedo color.
    pub fn new(albedo: Color) -> Self {
        Self { albedo }
    }
}

impl Material for Lambertian {
    fn scatter(&self, _ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> Option<ScatterResult> {
        let mut scatter_direction = rec.normal + random_unit_vector(rng);

        // Catch degenerate scatter direction
        if near_zero(scatter_direction) {
            scatter_direction = rec.normal;
        }

        Some(ScatterResult {
            attenuation: self.albedo,
            scattered: Ray::new(rec.p, scatter_direction),
        })
    }

    fn albedo(&self) -> Color {
        self.albedo
    }

    fn set_albedo(&mut self, albedo: Color) {
        self.albedo = albedo;
    }

    fn type_name(&self) -> &'static str {
        "lambertian"
    }
}

/// Metal (perfect mirror) material.
#[derive(Debug, Clone)]
pub struct Metal {
    albedo: Color,
}

impl Metal {
    /// Create a new Metal material with the given albedo color.
    pub fn new(albedo: Color) -> Self {
        Self { albedo }
    }
}

impl Material for Metal {
    fn scatter(&self, ray_in: &Ray, rec: &HitRecord, _rng: &mut dyn RngCore) -> Option<ScatterResult> {
        // No absorption at glancing angles
        let reflected = reflect(ray_in.direction(), rec.normal);
        Some(ScatterResult {
            attenuation: self.albedo,
            scattered: Ray::new(rec.p, reflected),
        })
    }

    fn albedo(&self) -> Color {
        self.albedo
    }

    fn set_albedo(&mut self, albedo: Color) {
        self.albedo = albedo;
    }

    fn type_name(&self) -> &'static str {
        "metal"
    }
}

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

#[inline]
fn near_zero(v: Vec3) -> bool {
    v.length_squared() < 1e-8
}
