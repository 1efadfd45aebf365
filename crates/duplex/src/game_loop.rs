//! # DUPLEX Main Loop
//!
//! Two threads, two fences, one publication per tick:
//! ```text
//!            SIMULATION THREAD                         RENDER THREAD
//! ┌──────────────────────────────────┐   ┌──────────────────────────────────┐
//! │ 1. wait swap_done, reset it      │   │ 1. wait commit_ready, reset it   │
//! │ 2. begin_tick (all stores)       │   │ 2. begin_frame (all stores swap) │
//! │ 3. drain to_sim messages         │   │ 3. signal swap_done ─────────────┼──┐
//! │ 4. Simulation::tick              │   │ 4. poll window, drain to_render  │  │
//! │ 5. end_tick (all stores)         │   │ 5. FrameRenderer::render         │  │
//! │ 6. signal commit_ready ──────────┼─┐ │ 6. submit to backend, end_frame  │  │
//! └──────────────────────────────────┘ │ └──────────────────────────────────┘  │
//!                  ^                   └──────────> render wakes              │
//!                  └──────────────────────────────── sim wakes <──────────────┘
//! ```
//!
//! Tick N+1 runs while frame N renders. Neither side ever waits for the
//! other's *work*, only for the swap.
//!
//! Shutdown: whichever thread leaves first (normally the simulation, on
//! window close or `max_ticks`) raises the stop flag and signals both
//! fences, so the other wakes, sees the flag and leaves too. A close arrives
//! either through `Window::should_close` or as a `CloseRequested` event the
//! render thread polls and hands to the simulation. The render
//! thread drains the backend with `wait_idle` on its way out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use duplex_core::{Fence, RenderThread, SimThread};
use duplex_shared::TICK_RATE;

use crate::config::LoopConfig;
use crate::context::EngineContext;
use crate::events::EngineMessage;
use crate::platform::{RenderBackend, Window, WindowEvent};

/// Target duration of one tick.
pub const TARGET_TICK_TIME: Duration = Duration::from_micros(1_000_000 / TICK_RATE as u64);

/// Frame time above which a frame is logged as slow.
pub const MAX_FRAME_TIME: Duration = Duration::from_millis(33);

/// Per-tick input to [`Simulation::tick`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickInfo {
    /// Zero-based tick index.
    pub tick: u64,
    /// Seconds since the previous tick, clamped to `max_delta_seconds`.
    pub delta_seconds: f32,
    /// Window clock at the start of the tick.
    pub time_seconds: f64,
}

/// Per-frame input to [`FrameRenderer::render`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInfo {
    /// Zero-based frame index.
    pub frame: u64,
    /// Window clock after the swap.
    pub time_seconds: f64,
}

/// Game logic, run on the simulation thread inside an open tick.
pub trait Simulation: Send {
    /// Handles a message from the render thread. Called inside the tick,
    /// before [`tick`](Self::tick), so stores may be edited.
    fn on_message(&mut self, engine: &EngineContext, sim: &mut SimThread, message: EngineMessage) {
        let _ = (engine, sim, message);
    }

    /// Advances the world by one tick.
    fn tick(&mut self, engine: &EngineContext, sim: &mut SimThread, info: &TickInfo);
}

/// Frame building, run on the render thread against published state.
pub trait FrameRenderer: Send {
    /// Handles a message from the simulation thread, before
    /// [`render`](Self::render).
    fn on_message(&mut self, engine: &EngineContext, rend: &RenderThread, message: EngineMessage) {
        let _ = (engine, rend, message);
    }

    /// Builds the frame from the last published tick.
    fn render(&mut self, engine: &EngineContext, rend: &RenderThread, info: &FrameInfo);
}

/// Min / max / average of a timed phase.
#[derive(Clone, Debug)]
pub struct TimingAccumulator {
    /// Samples recorded.
    pub samples: u64,
    /// Sum of all samples in microseconds.
    pub total_us_sum: u64,
    /// Shortest sample.
    pub min_us: u64,
    /// Longest sample.
    pub max_us: u64,
    /// Samples longer than the budget.
    pub over_budget: u64,
    budget_us: u64,
}

impl TimingAccumulator {
    /// Creates an empty accumulator with a per-sample budget.
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        Self {
            samples: 0,
            total_us_sum: 0,
            min_us: u64::MAX,
            max_us: 0,
            over_budget: 0,
            budget_us: micros(budget),
        }
    }

    /// Records one sample.
    pub fn record(&mut self, elapsed: Duration) {
        let us = micros(elapsed);
        self.samples += 1;
        self.total_us_sum += us;
        self.min_us = self.min_us.min(us);
        self.max_us = self.max_us.max(us);

        if us > self.budget_us {
            self.over_budget += 1;
        }
    }

    /// Average sample in milliseconds.
    #[must_use]
    pub fn avg_ms(&self) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.samples as f64) / 1000.0
    }

    /// Shortest sample in milliseconds, zero if none were recorded.
    #[must_use]
    pub fn min_ms(&self) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        self.min_us as f64 / 1000.0
    }

    /// Longest sample in milliseconds.
    #[must_use]
    pub fn max_ms(&self) -> f64 {
        self.max_us as f64 / 1000.0
    }

    /// Share of samples over budget, `0.0..=1.0`.
    #[must_use]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        self.over_budget as f64 / self.samples as f64
    }
}

/// What a finished [`MainLoop::run`] did.
#[derive(Clone, Debug)]
pub struct LoopReport {
    /// Ticks committed.
    pub ticks: u64,
    /// Frames rendered and submitted.
    pub frames: u64,
    /// Time inside the tick bracket.
    pub tick_time: TimingAccumulator,
    /// Time the simulation spent waiting for a swap.
    pub sim_wait_time: TimingAccumulator,
    /// Time spent in `begin_frame` (swap + dirty re-sync).
    pub swap_time: TimingAccumulator,
    /// Time from swap to `end_frame`.
    pub frame_time: TimingAccumulator,
    /// Messages dropped on a full ring during the run.
    pub dropped_messages: u64,
}

impl LoopReport {
    /// Logs the timing summary at info level.
    pub fn log_summary(&self) {
        tracing::info!(
            ticks = self.ticks,
            frames = self.frames,
            dropped_messages = self.dropped_messages,
            "main loop summary"
        );
        for (phase, timing) in [
            ("tick", &self.tick_time),
            ("sim_wait", &self.sim_wait_time),
            ("swap", &self.swap_time),
            ("frame", &self.frame_time),
        ] {
            tracing::info!(
                phase,
                samples = timing.samples,
                avg_ms = timing.avg_ms(),
                min_ms = timing.min_ms(),
                max_ms = timing.max_ms(),
                over_budget = timing.over_budget_ratio(),
                "phase timing"
            );
        }
    }
}

/// Runs a simulation and a renderer on their own threads over one
/// [`EngineContext`].
#[derive(Clone, Debug, Default)]
pub struct MainLoop {
    config: LoopConfig,
}

impl MainLoop {
    /// Creates a loop with the given pacing and termination settings.
    #[must_use]
    pub fn new(config: LoopConfig) -> Self {
        Self { config }
    }

    /// Returns the loop settings.
    #[must_use]
    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Runs until the window asks to close or `max_ticks` ticks have been
    /// committed, then joins both threads.
    ///
    /// The loop threads take the context's one simulation and one render
    /// token, so a context can be run once.
    ///
    /// # Panics
    ///
    /// Panics if the context's tokens were already handed out, and
    /// re-raises any panic from either loop thread.
    pub fn run<W, S, R, B>(
        &self,
        engine: &EngineContext,
        window: &W,
        simulation: &mut S,
        renderer: &mut R,
        backend: &mut B,
    ) -> LoopReport
    where
        W: Window + ?Sized,
        S: Simulation + ?Sized,
        R: FrameRenderer + ?Sized,
        B: RenderBackend + ?Sized,
    {
        tracing::info!(
            max_ticks = ?self.config.max_ticks,
            tick_rate = ?self.config.tick_rate,
            max_delta_seconds = self.config.max_delta_seconds,
            "main loop starting"
        );
        let pacing = Pacing::new();
        let dropped_before = engine.messages().dropped();

        let (sim, render) = thread::scope(|scope| {
            let sim = scope.spawn(|| self.simulation_thread(engine, window, simulation, &pacing));
            let render =
                scope.spawn(|| Self::render_thread(engine, window, renderer, backend, &pacing));
            let sim = sim.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            let render = render.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            (sim, render)
        });

        let report = LoopReport {
            ticks: sim.ticks,
            frames: render.frames,
            tick_time: sim.tick_time,
            sim_wait_time: sim.wait_time,
            swap_time: render.swap_time,
            frame_time: render.frame_time,
            dropped_messages: engine.messages().dropped() - dropped_before,
        };
        tracing::info!(ticks = report.ticks, frames = report.frames, "main loop stopped");
        report
    }

    fn simulation_thread<W, S>(
        &self,
        engine: &EngineContext,
        window: &W,
        simulation: &mut S,
        pacing: &Pacing,
    ) -> SimulationSide
    where
        W: Window + ?Sized,
        S: Simulation + ?Sized,
    {
        let _stop = StopOnExit(pacing);
        let mut sim = engine.registry().register_sim();
        let interval = self
            .config
            .tick_rate
            .map(|rate| Duration::from_secs_f64(1.0 / f64::from(rate.max(1))));

        let mut side = SimulationSide {
            ticks: 0,
            tick_time: TimingAccumulator::new(TARGET_TICK_TIME),
            wait_time: TimingAccumulator::new(TARGET_TICK_TIME),
        };
        let mut last_time = window.time_seconds();

        loop {
            let waiting = Instant::now();
            pacing.swap_done.wait_signaled();
            if pacing.is_stopped()
                || pacing.is_close_requested()
                || window.should_close()
                || self.config.max_ticks.is_some_and(|max| side.ticks >= max)
            {
                break;
            }
            pacing.swap_done.reset();
            side.wait_time.record(waiting.elapsed());

            let started = Instant::now();
            let now = window.time_seconds();
            let info = TickInfo {
                tick: side.ticks,
                delta_seconds: clamp_delta(now - last_time, self.config.max_delta_seconds),
                time_seconds: now,
            };
            last_time = now;

            engine.coordinator().begin_tick(&mut sim);
            engine
                .messages()
                .drain_to_sim(|message| simulation.on_message(engine, &mut sim, message));
            simulation.tick(engine, &mut sim, &info);
            engine.coordinator().end_tick(&mut sim);
            side.ticks += 1;
            pacing.commit_ready.signal();

            let spent = started.elapsed();
            side.tick_time.record(spent);
            if let Some(rest) = interval.and_then(|interval| interval.checked_sub(spent)) {
                thread::sleep(rest);
            }
        }

        tracing::debug!(ticks = side.ticks, "simulation thread leaving");
        side
    }

    fn render_thread<W, R, B>(
        engine: &EngineContext,
        window: &W,
        renderer: &mut R,
        backend: &mut B,
        pacing: &Pacing,
    ) -> RenderSide
    where
        W: Window + ?Sized,
        R: FrameRenderer + ?Sized,
        B: RenderBackend + ?Sized,
    {
        let _stop = StopOnExit(pacing);
        let mut rend = engine.registry().register_rend();
        let mut side = RenderSide {
            frames: 0,
            swap_time: TimingAccumulator::new(TARGET_TICK_TIME),
            frame_time: TimingAccumulator::new(TARGET_TICK_TIME),
        };

        loop {
            pacing.commit_ready.wait_signaled();
            if pacing.is_stopped() {
                break;
            }
            pacing.commit_ready.reset();

            let started = Instant::now();
            engine.coordinator().begin_frame(&mut rend);
            pacing.swap_done.signal();
            let swapped = Instant::now();
            side.swap_time.record(swapped - started);

            for event in window.poll_events() {
                match event {
                    WindowEvent::Resized { width, height } => {
                        engine
                            .messages()
                            .send_to_sim(EngineMessage::ViewportResized { width, height });
                    }
                    // The simulation stops before its next tick; this frame and
                    // the one for any tick already running are still drawn
                    WindowEvent::CloseRequested => pacing.request_close(),
                }
            }
            engine
                .messages()
                .drain_to_render(|message| renderer.on_message(engine, &rend, message));

            let frame = side.frames;
            renderer.render(
                engine,
                &rend,
                &FrameInfo {
                    frame,
                    time_seconds: window.time_seconds(),
                },
            );
            backend.submit_frame(frame);
            engine.coordinator().end_frame(&mut rend);
            engine
                .messages()
                .send_to_sim(EngineMessage::FramePresented { frame });
            side.frames += 1;

            let elapsed = swapped.elapsed();
            side.frame_time.record(elapsed);
            if elapsed > MAX_FRAME_TIME {
                tracing::debug!(frame, elapsed_us = micros(elapsed), "frame exceeded budget");
            }
        }

        backend.wait_idle();
        tracing::debug!(frames = side.frames, "render thread leaving");
        side
    }
}

/// Fences and stop flag shared by the two loop threads.
struct Pacing {
    /// Sim → render: a tick has been committed.
    commit_ready: Fence,
    /// Render → sim: the last commit has been swapped in.
    swap_done: Fence,
    stop: AtomicBool,
    /// Set by the render thread on [`WindowEvent::CloseRequested`].
    close_requested: AtomicBool,
}

impl Pacing {
    fn new() -> Self {
        Self {
            commit_ready: Fence::new(false),
            swap_done: Fence::new(true),
            stop: AtomicBool::new(false),
            close_requested: AtomicBool::new(false),
        }
    }

    fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    fn is_close_requested(&self) -> bool {
        self.close_requested.load(Ordering::Acquire)
    }

    fn request_close(&self) {
        if !self.close_requested.swap(true, Ordering::AcqRel) {
            tracing::debug!("window close requested");
        }
    }

    fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.commit_ready.signal();
        self.swap_done.signal();
    }
}

/// Stops the loop when its thread leaves, normally or by panic.
struct StopOnExit<'a>(&'a Pacing);

impl Drop for StopOnExit<'_> {
    fn drop(&mut self) {
        self.0.stop();
    }
}

struct SimulationSide {
    ticks: u64,
    tick_time: TimingAccumulator,
    wait_time: TimingAccumulator,
}

struct RenderSide {
    frames: u64,
    swap_time: TimingAccumulator,
    frame_time: TimingAccumulator,
}

/// Clamps a clock delta to `0..=max`. A clock that went backwards yields 0.
#[allow(clippy::cast_possible_truncation)]
fn clamp_delta(raw_seconds: f64, max_seconds: f32) -> f32 {
    raw_seconds.max(0.0).min(f64::from(max_seconds)) as f32
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}
