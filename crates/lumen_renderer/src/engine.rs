//! Per-frame orchestration.
//!
//! The [`Engine`] owns the scene, the frame buffers and the worker pool, and
//! runs the render-mode state machine. Each call to [`Engine::render_frame`]
//! snapshots the scene into intersectable geometry, renders it in the
//! selected mode, then tone maps and packs the result. Because a frame
//! completes before `render_frame` returns, the scene can be edited freely
//! between calls.

use crate::bucket::RenderTask;
use crate::error::{RenderError, RenderResult};
use crate::film::{pack_pixels, Accumulator};
use crate::renderer::{RenderConfig, Sampling};
use crate::scheduler::{FrameJob, TileScheduler};
use crate::{build_world, Camera, Color};
use lumen_core::Scene;
use lumen_math::Vec3;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// How frames are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Tiles spread over the worker pool
    Tiled,
    /// Single thread, global random stream
    Global,
    /// Single thread, seeded per-pixel streams, optionally accumulated
    Seeded,
}

impl RenderMode {
    pub const ALL: [RenderMode; 3] = [RenderMode::Tiled, RenderMode::Global, RenderMode::Seeded];

    /// Random stream used by this mode.
    pub fn sampling(self) -> Sampling {
        match self {
            RenderMode::Tiled | RenderMode::Seeded => Sampling::Seeded,
            RenderMode::Global => Sampling::Global,
        }
    }

    /// Numeric selector as used by the input layer.
    pub fn index(self) -> u32 {
        match self {
            RenderMode::Tiled => 0,
            RenderMode::Global => 1,
            RenderMode::Seeded => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RenderMode::Tiled => "multithreaded",
            RenderMode::Global => "single-threaded",
            RenderMode::Seeded => "single-threaded seeded",
        }
    }
}

impl TryFrom<u32> for RenderMode {
    type Error = RenderError;

    fn try_from(value: u32) -> RenderResult<Self> {
        match value {
            0 => Ok(RenderMode::Tiled),
            1 => Ok(RenderMode::Global),
            2 => Ok(RenderMode::Seeded),
            other => Err(RenderError::UnknownMode(other)),
        }
    }
}

/// Engine settings fixed for the session.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub width: u32,
    pub height: u32,
    /// Samples per pixel in the global and seeded modes; tiled mode takes one
    pub samples_per_pixel: u32,
    /// Blend successive frames in seeded mode
    pub accumulate: bool,
    /// Worker threads; `None` uses the hardware concurrency
    pub workers: Option<usize>,
    pub mode: RenderMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 562,
            samples_per_pixel: 1,
            accumulate: true,
            workers: None,
            mode: RenderMode::Seeded,
        }
    }
}

/// Keys the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Forward,
    Back,
    Left,
    Right,
    ModeTiled,
    ModeGlobal,
    ModeSeeded,
}

/// Snapshot of which keys are held this frame.
pub trait KeyState {
    fn is_down(&self, key: Key) -> bool;
}

impl KeyState for HashSet<Key> {
    fn is_down(&self, key: Key) -> bool {
        self.contains(&key)
    }
}

impl KeyState for [Key] {
    fn is_down(&self, key: Key) -> bool {
        self.contains(&key)
    }
}

/// Scene translation speed in world units per second.
pub const MOVE_SPEED: f32 = 1.0;

/// Interactive render loop state.
pub struct Engine {
    config: EngineConfig,
    scene: Scene,
    camera: Camera,
    scheduler: TileScheduler,
    color_buffer: Vec<Color>,
    accumulator: Accumulator,
    pixels: Vec<u32>,
    mode: RenderMode,
    switched: bool,
}

impl Engine {
    /// Create an engine and start its worker pool.
    pub fn new(config: EngineConfig, scene: Scene) -> RenderResult<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(RenderError::InvalidResolution {
                width: config.width,
                height: config.height,
            });
        }

        let pixel_count = config.width as usize * config.height as usize;
        let camera = Camera::new().with_resolution(config.width, config.height);
        let scheduler = TileScheduler::new(config.width, config.height, config.workers);

        log::info!(
            "Engine ready: {}x{}, {} spp, mode {} ({})",
            config.width,
            config.height,
            config.samples_per_pixel,
            config.mode.index(),
            config.mode.label()
        );

        Ok(Self {
            mode: config.mode,
            config,
            scene,
            camera,
            scheduler,
            color_buffer: vec![Color::ZERO; pixel_count],
            accumulator: Accumulator::new(pixel_count),
            pixels: vec![0; pixel_count],
            switched: true,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Select a render mode. Entering seeded mode restarts accumulation.
    pub fn set_mode(&mut self, mode: RenderMode) {
        if mode == self.mode {
            return;
        }
        log::info!("Render mode {} ({})", mode.index(), mode.label());
        if mode == RenderMode::Seeded {
            self.switched = true;
        }
        self.mode = mode;
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable scene access. Any edit restarts accumulation.
    pub fn scene_mut(&mut self) -> &mut Scene {
        self.switched = true;
        &mut self.scene
    }

    /// Hand input control to the next sphere.
    pub fn toggle_controlled(&mut self) -> RenderResult<usize> {
        let index = self.scene.toggle_controlled()?;
        log::info!("Controlling sphere {}", index);
        Ok(index)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn scheduler(&self) -> &TileScheduler {
        &self.scheduler
    }

    /// Whether the next frame restarts accumulation.
    pub fn is_switched(&self) -> bool {
        self.switched
    }

    /// Apply one frame of input.
    ///
    /// Movement keys translate the controlled sphere by `MOVE_SPEED * dt`
    /// along -z, +z, -x and +x. Mode keys select the render mode.
    pub fn update(&mut self, dt: f32, keys: &(impl KeyState + ?Sized)) {
        let step = MOVE_SPEED * dt;
        let mut delta = Vec3::ZERO;
        if keys.is_down(Key::Forward) {
            delta.z -= step;
        }
        if keys.is_down(Key::Back) {
            delta.z += step;
        }
        if keys.is_down(Key::Left) {
            delta.x -= step;
        }
        if keys.is_down(Key::Right) {
            delta.x += step;
        }

        if delta != Vec3::ZERO && self.scene.translate_controlled(delta) {
            self.switched = true;
        }

        if keys.is_down(Key::ModeTiled) {
            self.set_mode(RenderMode::Tiled);
        } else if keys.is_down(Key::ModeGlobal) {
            self.set_mode(RenderMode::Global);
        } else if keys.is_down(Key::ModeSeeded) {
            self.set_mode(RenderMode::Seeded);
        }
    }

    fn accumulating(&self) -> bool {
        self.mode == RenderMode::Seeded && self.config.accumulate
    }

    /// Samples per pixel for the current mode. Tiled mode always takes one.
    fn samples_per_pixel(&self) -> u32 {
        match self.mode {
            RenderMode::Tiled => 1,
            RenderMode::Global | RenderMode::Seeded => self.config.samples_per_pixel,
        }
    }

    /// Render, tone map and pack one frame.
    ///
    /// Returns the packed `0xAABBGGRR` pixels, row-major from the top-left.
    pub fn render_frame(&mut self) -> RenderResult<&[u32]> {
        let start = Instant::now();

        if self.switched {
            self.accumulator.reset();
            self.switched = false;
            log::info!("Accumulation reset");
        }

        let sampling = self.mode.sampling();
        let spp = self.samples_per_pixel();
        let mut render_config = RenderConfig::for_sampling(sampling, spp);
        if self.accumulating() {
            render_config.frame_seed = self.accumulator.frame_count();
        }

        let job = FrameJob::new(build_world(&self.scene), self.camera.clone(), render_config, sampling);

        match self.mode {
            RenderMode::Tiled => self.scheduler.render_frame(Arc::new(job), &mut self.color_buffer)?,
            RenderMode::Global | RenderMode::Seeded => {
                let task = RenderTask::full_frame(self.config.width, self.config.height);
                job.render(&task).write_into(&mut self.color_buffer, self.config.width);
            }
        }

        if self.accumulating() {
            self.accumulator.accumulate(&self.color_buffer, spp, &mut self.pixels)?;
        } else {
            pack_pixels(&self.color_buffer, &mut self.pixels, spp)?;
        }

        log::debug!(
            "Frame ({}) in {:.2?}, accumulated {}",
            self.mode.label(),
            start.elapsed(),
            self.accumulator.frame_count()
        );

        Ok(&self.pixels)
    }

    /// Packed pixels of the last frame.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Packed pixels as bytes (`r, g, b, a` per pixel) for texture upload.
    pub fn pixel_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Summed radiance of the last frame.
    pub fn color_buffer(&self) -> &[Color] {
        &self.color_buffer
    }

    /// Frames accumulated since the last reset.
    pub fn frame_count(&self) -> u32 {
        self.accumulator.frame_count()
    }
}
