//! Lumen Renderer - interactive CPU path tracing
//!
//! A Monte Carlo path tracer for small sphere scenes, rendered every frame
//! and progressively refined while the scene holds still.
//!
//! - **Geometry**: `Sphere`, `HittableList` behind the `Hittable` trait
//! - **Materials**: `Lambertian` and `Metal` behind the `Material` trait
//! - **Sampling**: per-thread global stream or `PcgHash` per-pixel streams
//! - **Scheduling**: `TileScheduler`, a persistent worker pool fed by tiles
//! - **Film**: tone mapping, temporal accumulation and packed pixels
//! - **Engine**: the per-frame render-mode state machine
//!
//! # Example
//!
//! ```no_run
//! use lumen_core::Scene;
//! use lumen_renderer::{Engine, EngineConfig};
//!
//! let mut engine = Engine::new(EngineConfig::default(), Scene::default_scene())?;
//! let pixels = engine.render_frame()?;
//! assert_eq!(pixels.len(), 1000 * 562);
//! # Ok::<(), lumen_renderer::RenderError>(())
//! ```

mod bucket;
mod camera;
mod engine;
mod error;
mod film;
mod hittable;
mod material;
mod queue;
mod renderer;
mod sampling;
mod scheduler;
mod sphere;
mod world;

pub use bucket::{generate_tasks, tile_grid, RenderTask, TileResult, TILE_SUBDIVISION};
pub use camera::Camera;
pub use engine::{Engine, EngineConfig, Key, KeyState, RenderMode, MOVE_SPEED};
pub use error::{RenderError, RenderResult};
pub use film::{
    linear_to_gamma, pack_pixel, pack_pixels, pack_rgb, pack_tone_mapped, set_color, unpack_rgba,
    Accumulator, ALPHA_MASK, MAX_CHANNEL,
};
pub use hittable::{HitRecord, Hittable, HittableList};
pub use material::{reflect, Lambertian, Material, Metal, ScatterResult};
pub use queue::WorkQueue;
pub use renderer::{
    ray_color, render_pixel, render_task, sky_gradient, RenderConfig, Sampling, GLOBAL_MAX_DEPTH,
    SEEDED_MAX_DEPTH, T_MIN,
};
pub use sampling::{
    gen_f32, gen_range, random_in_unit_sphere, random_unit_vector, PcgHash, MAX_REJECTION_ATTEMPTS,
};
pub use scheduler::{worker_count, FrameJob, TileScheduler};
pub use sphere::Sphere;
pub use world::{build_world, material_from_desc};

/// Re-export math types from lumen_math
pub use lumen_math::{Color, Interval, Ray, Vec3};
