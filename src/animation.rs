//! Single-slot frame interpolator
//!
//! The engine lives inside the context it animates. Callbacks receive that
//! context mutably, so the free functions below take the running animation
//! out of the slot while a callback executes and only put it back when the
//! callback did not start or cancel another animation in the meantime.

/// Decelerate curve, `1 - (1 - t)^2`
#[inline]
pub fn decelerate(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

pub type Callback<C> = Box<dyn FnMut(&mut C)>;
pub type FrameCallback<C> = Box<dyn FnMut(&mut C, f32)>;

pub struct AnimationCallbacks<C> {
    on_start: Option<Callback<C>>,
    on_frame: Option<FrameCallback<C>>,
    on_end: Option<Callback<C>>,
    on_cancel: Option<Callback<C>>,
}

impl<C> AnimationCallbacks<C> {
    pub fn new() -> Self {
        Self {
            on_start: None,
            on_frame: None,
            on_end: None,
            on_cancel: None,
        }
    }

    pub fn on_start(mut self, f: impl FnMut(&mut C) + 'static) -> Self {
        self.on_start = Some(Box::new(f));
        self
    }

    /// Receives the eased progress in `[0, 1]`
    pub fn on_frame(mut self, f: impl FnMut(&mut C, f32) + 'static) -> Self {
        self.on_frame = Some(Box::new(f));
        self
    }

    pub fn on_end(mut self, f: impl FnMut(&mut C) + 'static) -> Self {
        self.on_end = Some(Box::new(f));
        self
    }

    pub fn on_cancel(mut self, f: impl FnMut(&mut C) + 'static) -> Self {
        self.on_cancel = Some(Box::new(f));
        self
    }
}

impl<C> Default for AnimationCallbacks<C> {
    fn default() -> Self {
        Self::new()
    }
}

struct Running<C> {
    generation: u64,
    start_ms: u64,
    duration_ms: u64,
    callbacks: AnimationCallbacks<C>,
}

impl<C> Running<C> {
    fn progress(&self, now_ms: u64) -> f32 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        let elapsed = now_ms.saturating_sub(self.start_ms) as f32;
        (elapsed / self.duration_ms as f32).clamp(0.0, 1.0)
    }
}

pub struct AnimationEngine<C> {
    active: Option<Running<C>>,
    generation: u64,
}

impl<C> AnimationEngine<C> {
    pub fn new() -> Self {
        Self {
            active: None,
            generation: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|running| running.generation == generation)
    }
}

impl<C> Default for AnimationEngine<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Implemented by whatever owns an [`AnimationEngine`] of itself
pub trait Animated: Sized {
    fn animator(&mut self) -> &mut AnimationEngine<Self>;
}

/// Begin a new animation, cancelling the active one first
pub fn start<C: Animated>(ctx: &mut C, now_ms: u64, duration_ms: u64, mut callbacks: AnimationCallbacks<C>) {
    cancel(ctx);

    let on_start = callbacks.on_start.take();
    let engine = ctx.animator();
    engine.generation = engine.generation.wrapping_add(1);
    engine.active = Some(Running {
        generation: engine.generation,
        start_ms: now_ms,
        duration_ms,
        callbacks,
    });

    if let Some(mut on_start) = on_start {
        on_start(ctx);
    }
}

/// Advance the active animation to `now_ms`. Returns whether one is still running.
pub fn tick<C: Animated>(ctx: &mut C, now_ms: u64) -> bool {
    let Some(running) = ctx.animator().active.as_mut() else {
        return false;
    };
    let generation = running.generation;
    let progress = running.progress(now_ms);
    let mut on_frame = running.callbacks.on_frame.take();

    if let Some(frame) = on_frame.as_mut() {
        frame(ctx, decelerate(progress));
    }

    let engine = ctx.animator();
    if !engine.is_current(generation) {
        // Pre-empted from inside the frame callback
        return engine.is_running();
    }
    if let Some(running) = engine.active.as_mut() {
        running.callbacks.on_frame = on_frame;
    }

    if progress >= 1.0 {
        if let Some(mut finished) = engine.active.take() {
            if let Some(mut on_end) = finished.callbacks.on_end.take() {
                on_end(ctx);
            }
        }
        return ctx.animator().is_running();
    }

    true
}

/// Stop the active animation where it is. Fires `on_cancel`, never `on_end`.
pub fn cancel<C: Animated>(ctx: &mut C) {
    if let Some(mut running) = ctx.animator().active.take() {
        if let Some(mut on_cancel) = running.callbacks.on_cancel.take() {
            on_cancel(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        engine: AnimationEngine<Recorder>,
        log: Vec<String>,
        frames: Vec<f32>,
    }

    impl Animated for Recorder {
        fn animator(&mut self) -> &mut AnimationEngine<Self> {
            &mut self.engine
        }
    }

    fn logging(name: &'static str) -> AnimationCallbacks<Recorder> {
        AnimationCallbacks::new()
            .on_start(move |p: &mut Recorder| p.log.push(format!("{name}:start")))
            .on_frame(|p: &mut Recorder, v| p.frames.push(v))
            .on_end(move |p: &mut Recorder| p.log.push(format!("{name}:end")))
            .on_cancel(move |p: &mut Recorder| p.log.push(format!("{name}:cancel")))
    }

    #[test]
    fn test_decelerate() {
        assert!((decelerate(0.0) - 0.0).abs() < 0.001);
        assert!((decelerate(0.5) - 0.75).abs() < 0.001);
        assert!((decelerate(1.0) - 1.0).abs() < 0.001);
        assert!((decelerate(2.0) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_start_fires_synchronously() {
        let mut recorder = Recorder::default();
        start(&mut recorder, 0, 100, logging("a"));
        assert_eq!(recorder.log, vec!["a:start"]);
        assert!(recorder.frames.is_empty());
        assert!(recorder.engine.is_running());
    }

    #[test]
    fn test_runs_to_completion_once() {
        let mut recorder = Recorder::default();
        start(&mut recorder, 1000, 100, logging("a"));

        assert!(tick(&mut recorder, 1000));
        assert!(tick(&mut recorder, 1050));
        assert!(!tick(&mut recorder, 1100));
        assert!(!tick(&mut recorder, 1200));

        assert_eq!(recorder.frames.len(), 3);
        assert!((recorder.frames[1] - 0.75).abs() < 0.001);
        assert_eq!(*recorder.frames.last().unwrap(), 1.0);
        assert_eq!(recorder.log, vec!["a:start", "a:end"]);
    }

    #[test]
    fn test_zero_duration_completes_on_first_tick() {
        let mut recorder = Recorder::default();
        start(&mut recorder, 10, 0, logging("a"));
        assert!(!tick(&mut recorder, 10));
        assert_eq!(recorder.frames, vec![1.0]);
        assert_eq!(recorder.log, vec!["a:start", "a:end"]);
    }

    #[test]
    fn test_start_cancels_active() {
        let mut recorder = Recorder::default();
        start(&mut recorder, 0, 100, logging("a"));
        tick(&mut recorder, 50);
        start(&mut recorder, 50, 100, logging("b"));

        assert_eq!(recorder.log, vec!["a:start", "a:cancel", "b:start"]);
        assert_eq!(recorder.frames.len(), 1);
        assert!(recorder.frames[0] < 1.0);
    }

    #[test]
    fn test_cancel_never_reaches_target() {
        let mut recorder = Recorder::default();
        start(&mut recorder, 0, 100, logging("a"));
        tick(&mut recorder, 30);
        cancel(&mut recorder);

        assert!(!recorder.engine.is_running());
        assert!(!tick(&mut recorder, 200));
        assert!(recorder.frames.iter().all(|v| *v < 1.0));
        assert_eq!(recorder.log, vec!["a:start", "a:cancel"]);
    }

    #[test]
    fn test_end_callback_may_chain() {
        let mut recorder = Recorder::default();
        let callbacks = AnimationCallbacks::new().on_end(|p: &mut Recorder| {
            p.log.push("first:end".to_string());
            start(p, 100, 100, logging("second"));
        });
        start(&mut recorder, 0, 100, callbacks);

        assert!(tick(&mut recorder, 100));
        assert_eq!(recorder.log, vec!["first:end", "second:start"]);
        assert!(!tick(&mut recorder, 200));
        assert_eq!(recorder.log.last().map(String::as_str), Some("second:end"));
    }

    #[test]
    fn test_frame_callback_preemption() {
        let mut recorder = Recorder::default();
        let callbacks = AnimationCallbacks::new()
            .on_frame(|p: &mut Recorder, _| cancel(p))
            .on_end(|p: &mut Recorder| p.log.push("end".to_string()))
            .on_cancel(|p: &mut Recorder| p.log.push("cancel".to_string()));
        start(&mut recorder, 0, 0, callbacks);

        assert!(!tick(&mut recorder, 0));
        assert_eq!(recorder.log, vec!["cancel"]);
    }

    #[test]
    fn test_restart_from_frame_callback_supersedes_old_run() {
        let mut recorder = Recorder::default();
        let callbacks = AnimationCallbacks::new()
            .on_frame(|p: &mut Recorder, _| start(p, 10, 100, logging("b")))
            .on_end(|p: &mut Recorder| p.log.push("a:end".to_string()))
            .on_cancel(|p: &mut Recorder| p.log.push("a:cancel".to_string()));
        start(&mut recorder, 0, 100, callbacks);

        assert!(tick(&mut recorder, 10));
        assert_eq!(recorder.log, vec!["a:cancel", "b:start"]);

        assert!(!tick(&mut recorder, 110));
        assert_eq!(recorder.log, vec!["a:cancel", "b:start", "b:end"]);
        assert_eq!(recorder.frames, vec![1.0]);
    }
}
