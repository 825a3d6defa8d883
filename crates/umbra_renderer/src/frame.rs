//! Frame orchestration: one job per scanline, a pool of workers and live
//! progress statistics.

use crate::{
    Camera, Job, JobContext, JobQueue, OutputImage, RenderError, RenderSettings, Scene, Tracer,
    Worker,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// State shared by every job of a frame.
struct FrameShared {
    settings: RenderSettings,
    camera: Arc<Camera>,
    scene: Arc<Scene>,
    image: OutputImage,
    rays: AtomicU64,
}

/// Renders one scanline.
pub struct PixelJob {
    line: u32,
    shared: Arc<FrameShared>,
}

impl PixelJob {
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl Job for PixelJob {
    fn run(&mut self, ctx: &mut JobContext) {
        let shared = &*self.shared;
        let settings = &shared.settings;
        let size = (settings.width, settings.height);
        let mut tracer = Tracer::from_settings(&shared.scene, settings);

        for x in 0..settings.width {
            let color = tracer.sample_pixel(
                &shared.camera,
                size,
                (x, self.line),
                settings.samples,
                settings.color_tolerance,
                ctx.rng(),
            );
            shared.image.set_pixel(x, self.line, color);
            ctx.set_progress((x + 1) as f32 / settings.width as f32);
        }

        shared.rays.fetch_add(tracer.ray_count(), Ordering::Relaxed);
    }
}

/// Snapshot of a frame's progress.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    pub total_jobs: usize,
    /// Finished jobs, failed ones included
    pub completed_jobs: usize,
    pub active_jobs: usize,
    pub failed_jobs: usize,
    /// Fraction done in [0, 1], counting partial progress of running jobs
    pub progress: f32,
    pub elapsed: Duration,
    /// Linear extrapolation from progress so far
    pub time_to_finish: Option<Duration>,
    pub rays: u64,
    pub rays_per_second: f64,
    pub finished: bool,
}

/// A frame being rendered.
pub struct Frame {
    shared: Arc<FrameShared>,
    queue: Arc<JobQueue<PixelJob>>,
    workers: Vec<Worker>,
    started: Instant,
    stats: FrameStats,
}

impl Frame {
    /// Validate settings, queue one job per scanline and spawn the workers.
    pub fn start(
        settings: RenderSettings,
        camera: Arc<Camera>,
        scene: Arc<Scene>,
    ) -> Result<Self, RenderError> {
        settings.validate()?;

        log::info!(
            "Starting frame: {}x{}, {} samples, depth {}, {} workers",
            settings.width,
            settings.height,
            settings.samples,
            settings.max_depth,
            settings.workers
        );

        let shared = Arc::new(FrameShared {
            image: OutputImage::new(settings.width, settings.height),
            rays: AtomicU64::new(0),
            settings,
            camera,
            scene,
        });
        let settings = &shared.settings;

        let jobs: Vec<PixelJob> = (0..settings.height)
            .map(|line| PixelJob {
                line,
                shared: Arc::clone(&shared),
            })
            .collect();
        let total_jobs = jobs.len();

        let queue = Arc::new(JobQueue::new());
        if settings.shuffle {
            let mut rng = StdRng::seed_from_u64(settings.seed);
            queue.push_shuffled(jobs, &mut rng);
        } else {
            queue.push_all(jobs);
        }
        log::debug!("Queued {total_jobs} scanline jobs");

        let workers = (0..settings.workers)
            .map(|i| Worker::spawn(i, Arc::clone(&queue), settings.chunk_size, settings.seed))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            shared,
            queue,
            workers,
            started: Instant::now(),
            stats: FrameStats {
                total_jobs,
                ..Default::default()
            },
        })
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.shared.settings
    }

    /// Image as rendered so far.
    pub fn image(&self) -> &OutputImage {
        &self.shared.image
    }

    /// Last statistics computed by [`Frame::update_progress`].
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn is_finished(&self) -> bool {
        self.completed_jobs() >= self.stats.total_jobs
    }

    fn completed_jobs(&self) -> usize {
        self.workers.iter().map(Worker::completed_jobs).sum()
    }

    /// Aggregate worker counters into fresh statistics.
    pub fn update_progress(&mut self) -> &FrameStats {
        let total = self.stats.total_jobs.max(1);
        let completed = self.completed_jobs();

        let mut active = 0;
        let mut partial = 0.0;
        for worker in &self.workers {
            if worker.active_jobs() > 0 {
                active += 1;
                partial += worker.job_progress();
            }
        }

        let elapsed = self.started.elapsed();
        let progress = ((completed as f32 + partial) / total as f32).clamp(0.0, 1.0);
        let finished = completed >= self.stats.total_jobs;
        let time_to_finish = if finished {
            Some(Duration::ZERO)
        } else if progress > 0.0 {
            Some(elapsed.mul_f32((1.0 - progress) / progress))
        } else {
            None
        };
        let rays = self.shared.rays.load(Ordering::Relaxed);
        let seconds = elapsed.as_secs_f64();

        self.stats = FrameStats {
            total_jobs: self.stats.total_jobs,
            completed_jobs: completed,
            active_jobs: active,
            failed_jobs: self.workers.iter().map(Worker::failed_jobs).sum(),
            progress,
            elapsed,
            time_to_finish,
            rays,
            rays_per_second: if seconds > 0.0 { rays as f64 / seconds } else { 0.0 },
            finished,
        };
        &self.stats
    }

    /// Poll every `poll` until all jobs are done, reporting each update.
    pub fn wait(&mut self, poll: Duration, mut on_progress: impl FnMut(&FrameStats)) {
        loop {
            let stats = self.update_progress();
            on_progress(stats);
            if stats.finished {
                break;
            }
            thread::sleep(poll);
        }
    }

    /// Stop and join all workers and hand back the image.
    ///
    /// Calling this before the frame is finished abandons the remaining
    /// scanlines; they stay black.
    pub fn finish(mut self) -> OutputImage {
        for worker in &mut self.workers {
            worker.join();
        }
        self.queue.clear();

        let stats = self.update_progress().clone();
        if stats.failed_jobs > 0 {
            log::warn!("{} of {} jobs failed", stats.failed_jobs, stats.total_jobs);
        }
        log::info!(
            "Frame finished in {:.2?}: {} rays, {:.0} rays/s",
            stats.elapsed,
            stats.rays,
            stats.rays_per_second
        );

        let Frame { shared, workers, .. } = self;
        drop(workers);
        match Arc::try_unwrap(shared) {
            Ok(shared) => shared.image,
            Err(shared) => shared.image.snapshot(),
        }
    }
}
