//! Core path tracing renderer.
//!
//! Implements Monte Carlo path tracing with:
//! - Recursive ray tracing with a fixed depth budget
//! - A vertical sky gradient for rays that escape the scene
//! - Global-stream or per-pixel seeded sampling

use crate::sampling::PcgHash;
use crate::{Camera, Color, Hittable, RenderTask};
use lumen_math::{Interval, Ray};
use rand::RngCore;
use serde::Serialize;

/// Smallest ray parameter accepted as a hit; avoids self-intersection.
pub const T_MIN: f32 = 0.001;

/// Bounce budget for the global-stream renderer.
pub const GLOBAL_MAX_DEPTH: u32 = 10;

/// Bounce budget for the seeded renderers.
pub const SEEDED_MAX_DEPTH: u32 = 50;

/// Which generator drives sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sampling {
    /// Per-thread `rand::thread_rng()` stream; not reproducible.
    Global,
    /// `PcgHash` keyed by the pixel index; reproducible on any thread.
    Seeded,
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Samples per pixel for anti-aliasing
    pub samples_per_pixel: u32,
    /// Maximum ray bounce depth
    pub max_depth: u32,
    /// Frame number mixed into seeded pixel streams
    pub frame_seed: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples_per_pixel: 1,
            max_depth: SEEDED_MAX_DEPTH,
            frame_seed: 0,
        }
    }
}

impl RenderConfig {
    /// Configuration with the depth budget used by each sampling regime.
    pub fn for_sampling(sampling: Sampling, samples_per_pixel: u32) -> Self {
        let max_depth = match sampling {
            Sampling::Global => GLOBAL_MAX_DEPTH,
            Sampling::Seeded => SEEDED_MAX_DEPTH,
        };
        Self {
            samples_per_pixel,
            max_depth,
            frame_seed: 0,
        }
    }
}

/// Compute the color seen by a ray.
///
/// Walks scatter events until the depth budget runs out (black) or the ray
/// escapes to the sky.
pub fn ray_color(ray: &Ray, world: &dyn Hittable, depth: u32, rng: &mut dyn RngCore) -> Color {
    // Out of bounces: no light
    if depth == 0 {
        return Color::ZERO;
    }

    let Some(rec) = world.hit(ray, Interval::new(T_MIN, f32::INFINITY)) else {
        return sky_gradient(ray);
    };

    match rec.material.scatter(ray, &rec, rng) {
        Some(result) => result.attenuation * ray_color(&result.scattered, world, depth - 1, rng),
        // Ray was absorbed
        None => Color::ZERO,
    }
}

/// Compute sky gradient background.
pub fn sky_gradient(ray: &Ray) -> Color {
    let unit_direction = ray.direction().normalize_or_zero();
    let a = 0.5 * (unit_direction.y + 1.0);
    let white = Color::new(1.0, 1.0, 1.0);
    let blue = Color::new(0.5, 0.7, 1.0);
    white * (1.0 - a) + blue * a
}

/// Render a single pixel.
///
/// Returns the sum over all samples; tone mapping divides by the count.
/// Non-finite samples are dropped to black.
pub fn render_pixel(
    camera: &Camera,
    world: &dyn Hittable,
    x: u32,
    y: u32,
    config: &RenderConfig,
    rng: &mut dyn RngCore,
) -> Color {
    let mut pixel_color = Color::ZERO;

    for _ in 0..config.samples_per_pixel {
        let ray = camera.pixel_ray(x, y, rng);
        let sample = ray_color(&ray, world, config.max_depth, rng);
        if sample.is_finite() {
            pixel_color += sample;
        } else {
            log::debug!("Non-finite radiance at pixel ({}, {}), using black", x, y);
        }
    }

    pixel_color
}

/// Render the pixels of one task.
///
/// Returns pixels in row-major order within the task rectangle.
pub fn render_task(
    task: &RenderTask,
    camera: &Camera,
    world: &dyn Hittable,
    config: &RenderConfig,
    sampling: Sampling,
) -> Vec<Color> {
    let mut pixels = Vec::with_capacity(task.pixel_count());
    let mut thread_rng = rand::thread_rng();

    for y in task.start_y..task.end_y {
        for x in task.start_x..task.end_x {
            let color = match sampling {
                Sampling::Global => render_pixel(camera, world, x, y, config, &mut thread_rng),
                Sampling::Seeded => {
                    let mut rng = PcgHash::for_pixel(
                        x,
                        y,
                        camera.image_width,
                        camera.image_height,
                        config.frame_seed,
                    );
                    render_pixel(camera, world, x, y, config, &mut rng)
                }
            };
            pixels.push(color);
        }
    }

    pixels
}
