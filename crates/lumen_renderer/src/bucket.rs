//! Tile decomposition for the worker pool.
//!
//! Divides the image into tiles that are rendered independently. The tile
//! set is generated once per resolution and resubmitted every frame.

use crate::Color;
use serde::Serialize;

/// Extra subdivision per axis beyond one tile per worker, so that slow
/// regions of the image are spread over several workers.
pub const TILE_SUBDIVISION: u32 = 16;

/// A half-open rectangle `[start_x, end_x) x [start_y, end_y)` of the image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderTask {
    pub start_x: u32,
    pub start_y: u32,
    pub end_x: u32,
    pub end_y: u32,
    /// Tells a worker to exit instead of rendering
    pub is_shutdown: bool,
}

impl RenderTask {
    /// Create a new task.
    pub fn new(start_x: u32, start_y: u32, end_x: u32, end_y: u32) -> Self {
        Self {
            start_x,
            start_y,
            end_x,
            end_y,
            is_shutdown: false,
        }
    }

    /// One task covering the whole image.
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Shutdown marker for pool teardown.
    pub fn shutdown() -> Self {
        Self {
            is_shutdown: true,
            ..Self::default()
        }
    }

    pub fn width(&self) -> u32 {
        self.end_x.saturating_sub(self.start_x)
    }

    pub fn height(&self) -> u32 {
        self.end_y.saturating_sub(self.start_y)
    }

    /// Get the total number of pixels in this task.
    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }
}

/// Split `workers` into a `num_tiles_x * num_tiles_y` grid.
///
/// Starts from the integer square root and widens until the count divides
/// evenly. Zero workers is treated as one.
pub fn tile_grid(workers: u32) -> (u32, u32) {
    let workers = workers.max(1);
    let mut num_tiles_x = ((workers as f64).sqrt() as u32).max(1);
    let mut num_tiles_y = workers / num_tiles_x;
    while num_tiles_x * num_tiles_y != workers {
        num_tiles_x += 1;
        num_tiles_y = workers / num_tiles_x;
    }
    (num_tiles_x, num_tiles_y)
}

/// Generate tiles covering `[0, width) x [0, height)` in row-major order.
///
/// Tiles are `width / num_tiles_x / TILE_SUBDIVISION` by
/// `height / num_tiles_y / TILE_SUBDIVISION` pixels (at least one), clipped
/// at the far edges. They never overlap and leave no gaps.
pub fn generate_tasks(width: u32, height: u32, workers: u32) -> Vec<RenderTask> {
    let (num_tiles_x, num_tiles_y) = tile_grid(workers);
    let stride_x = (width / num_tiles_x / TILE_SUBDIVISION).max(1);
    let stride_y = (height / num_tiles_y / TILE_SUBDIVISION).max(1);

    let mut tasks = Vec::new();

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let end_x = x.saturating_add(stride_x).min(width);
            let end_y = y.saturating_add(stride_y).min(height);
            tasks.push(RenderTask::new(x, y, end_x, end_y));
            x = end_x;
        }
        y = y.saturating_add(stride_y).min(height);
    }

    tasks
}

/// Result of rendering a task.
#[derive(Debug, Clone)]
pub struct TileResult {
    /// The task that was rendered
    pub task: RenderTask,
    /// Pixel colors in row-major order
    pub pixels: Vec<Color>,
}

impl TileResult {
    /// Create a new tile result.
    pub fn new(task: RenderTask, pixels: Vec<Color>) -> Self {
        Self { task, pixels }
    }

    /// Copy the tile into a full-frame buffer `width` pixels wide.
    pub fn write_into(&self, buffer: &mut [Color], width: u32) {
        let tile_width = self.task.width() as usize;
        if tile_width == 0 {
            return;
        }

        for (row, src) in self.pixels.chunks_exact(tile_width).enumerate() {
            let y = self.task.start_y as usize + row;
            let start = y * width as usize + self.task.start_x as usize;
            buffer[start..start + tile_width].copy_from_slice(src);
        }
    }
}
