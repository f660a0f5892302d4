//! Persistent worker pool that renders frames tile by tile.
//!
//! The pool is created once per session. Each frame the control thread
//! pushes every tile into the task queue together with a shared
//! [`FrameJob`], then blocks on the completion queue until every tile has
//! come back. Workers never touch the frame buffer: each returns its pixels
//! in a [`TileResult`] and the control thread copies them in, so writes never
//! alias.

use crate::bucket::{generate_tasks, RenderTask, TileResult};
use crate::error::{check_len, RenderResult};
use crate::queue::WorkQueue;
use crate::renderer::{render_task, RenderConfig, Sampling};
use crate::{Camera, Color, HittableList};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Everything a worker needs to render tiles of one frame.
pub struct FrameJob {
    pub world: HittableList,
    pub camera: Camera,
    pub config: RenderConfig,
    pub sampling: Sampling,
}

impl FrameJob {
    pub fn new(world: HittableList, camera: Camera, config: RenderConfig, sampling: Sampling) -> Self {
        Self {
            world,
            camera,
            config,
            sampling,
        }
    }

    /// Render one task of this frame.
    pub fn render(&self, task: &RenderTask) -> TileResult {
        let pixels = render_task(task, &self.camera, &self.world, &self.config, self.sampling);
        TileResult::new(*task, pixels)
    }
}

/// A tile plus the frame it belongs to. Shutdown markers carry no frame.
struct WorkItem {
    task: RenderTask,
    job: Option<Arc<FrameJob>>,
}

/// Number of workers to start: the requested count, or the host's hardware
/// concurrency, and never less than one.
pub fn worker_count(requested: Option<usize>) -> usize {
    requested.unwrap_or_else(num_cpus::get).max(1)
}

/// Fixed-size pool of render threads fed by a tile queue.
pub struct TileScheduler {
    task_queue: WorkQueue<WorkItem>,
    completion_queue: WorkQueue<TileResult>,
    thread_pool: Vec<JoinHandle<()>>,
    task_collection: Vec<RenderTask>,
    width: u32,
    height: u32,
}

impl TileScheduler {
    /// Start the pool and generate the tile set for a `width x height` image.
    pub fn new(width: u32, height: u32, workers: Option<usize>) -> Self {
        let thread_count = worker_count(workers);
        let task_queue = WorkQueue::new();
        let completion_queue = WorkQueue::new();

        let task_collection = generate_tasks(width, height, thread_count as u32);

        let mut thread_pool = Vec::with_capacity(thread_count);
        for id in 0..thread_count {
            let tasks = task_queue.clone();
            let completions = completion_queue.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("lumen-worker-{}", id))
                .spawn(move || worker_loop(id, tasks, completions));
            match spawned {
                Ok(handle) => thread_pool.push(handle),
                Err(e) => log::warn!("Failed to spawn render worker {}: {}", id, e),
            }
        }

        log::info!(
            "Started {} render workers, {} tiles for {}x{}",
            thread_pool.len(),
            task_collection.len(),
            width,
            height
        );

        Self {
            task_queue,
            completion_queue,
            thread_pool,
            task_collection,
            width,
            height,
        }
    }

    /// Number of live worker threads.
    pub fn thread_count(&self) -> usize {
        self.thread_pool.len()
    }

    /// The fixed tile set submitted every frame.
    pub fn tasks(&self) -> &[RenderTask] {
        &self.task_collection
    }

    /// Queue every tile of the frame. Returns the number submitted.
    pub fn push_tasks(&self, job: &Arc<FrameJob>) -> usize {
        for task in &self.task_collection {
            self.task_queue.push(WorkItem {
                task: *task,
                job: Some(Arc::clone(job)),
            });
        }
        self.task_collection.len()
    }

    /// Block until `submitted` tiles have completed, copying each into
    /// `buffer`. Returns immediately when nothing was submitted.
    ///
    /// Only `render_frame` calls this, after checking the buffer length and
    /// pushing exactly `submitted` tiles.
    fn wait_for_completion(&self, submitted: usize, buffer: &mut [Color]) -> usize {
        let mut completed = 0;
        while completed < submitted {
            let Some(result) = self.completion_queue.wait_and_pop() else {
                break;
            };
            result.write_into(buffer, self.width);
            completed += 1;
        }
        completed
    }

    /// Render a whole frame on the pool.
    ///
    /// Returns once every tile is written into `buffer`.
    pub fn render_frame(&self, job: Arc<FrameJob>, buffer: &mut [Color]) -> RenderResult<()> {
        check_len(self.width as usize * self.height as usize, buffer.len())?;

        // Without workers nothing would drain the queue
        if self.thread_pool.is_empty() {
            log::warn!("No render workers, rendering on the calling thread");
            for task in &self.task_collection {
                job.render(task).write_into(buffer, self.width);
            }
            return Ok(());
        }

        let submitted = self.push_tasks(&job);
        let completed = self.wait_for_completion(submitted, buffer);
        log::debug!("Frame barrier released after {}/{} tiles", completed, submitted);
        Ok(())
    }
}

impl Drop for TileScheduler {
    fn drop(&mut self) {
        for _ in 0..self.thread_pool.len() {
            self.task_queue.push(WorkItem {
                task: RenderTask::shutdown(),
                job: None,
            });
        }
        for handle in self.thread_pool.drain(..) {
            if handle.join().is_err() {
                log::warn!("Render worker panicked during shutdown");
            }
        }
        log::info!("Render workers stopped");
    }
}

fn worker_loop(id: usize, tasks: WorkQueue<WorkItem>, completions: WorkQueue<TileResult>) {
    while let Some(item) = tasks.wait_and_pop() {
        if item.task.is_shutdown {
            break;
        }
        let Some(job) = item.job else {
            continue;
        };

        // A panicking tile still reports back so the frame barrier can release
        let result = catch_unwind(AssertUnwindSafe(|| job.render(&item.task))).unwrap_or_else(|_| {
            log::error!("Worker {} panicked rendering {:?}, tile left black", id, item.task);
            TileResult::new(item.task, vec![Color::ZERO; item.task.pixel_count()])
        });
        completions.push(result);
    }
    log::debug!("Render worker {} exiting", id);
}
