use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use anyhow::Result;
use log::{debug, warn};

use crate::game::{Activation, Game, Snapshot, Step};
use crate::render::InstanceData;
use crate::spawner::{GapSource, RandomGaps};
use crate::state::Phase;
use crate::timer::Scheduler;

struct Timers<H> {
    tick: H,
    spawn: H,
}

struct Shared<S: Scheduler, G: GapSource> {
    game: Game<G>,
    scheduler: S,
    timers: Option<Timers<S::Handle>>,
}

impl<S: Scheduler, G: GapSource> Shared<S, G> {
    fn stop_timers(&mut self) {
        if let Some(timers) = self.timers.take() {
            self.scheduler.cancel(timers.tick);
            self.scheduler.cancel(timers.spawn);
            debug!("tick and spawn timers stopped");
        }
    }
}

impl<S: Scheduler, G: GapSource> Drop for Shared<S, G> {
    fn drop(&mut self) {
        self.stop_timers();
    }
}

/// A `Game` driven by a fast tick timer and a slower spawn timer.
///
/// Both timers hold weak references, so dropping the last handle (or calling
/// [`Session::shutdown`]) releases them.
pub struct Session<S: Scheduler, G: GapSource = RandomGaps> {
    shared: Rc<RefCell<Shared<S, G>>>,
}

impl<S: Scheduler, G: GapSource> Clone for Session<S, G> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<S, G> Session<S, G>
where
    S: Scheduler + 'static,
    G: GapSource + 'static,
{
    pub fn new(game: Game<G>, scheduler: S) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                game,
                scheduler,
                timers: None,
            })),
        }
    }

    /// Routes the activate input. A new run gets a fresh pair of timers.
    pub fn activate(&self) -> Result<Activation> {
        let mut shared = self.shared.borrow_mut();
        let activation = shared.game.activate();
        if activation == Activation::Started {
            shared.stop_timers();
            self.start_timers(&mut shared)?;
        }
        Ok(activation)
    }

    fn start_timers(&self, shared: &mut Shared<S, G>) -> Result<()> {
        let tuning = *shared.game.tuning();

        let weak = Rc::downgrade(&self.shared);
        let tick = shared
            .scheduler
            .schedule_periodic(tuning.tick_interval, Box::new(move || on_tick(&weak)))?;

        let weak = Rc::downgrade(&self.shared);
        let spawn = match shared
            .scheduler
            .schedule_periodic(tuning.spawn_interval, Box::new(move || on_spawn(&weak)))
        {
            Ok(handle) => handle,
            Err(err) => {
                shared.scheduler.cancel(tick);
                return Err(err);
            }
        };

        shared.timers = Some(Timers { tick, spawn });
        debug!(
            "tick every {:?}, spawn every {:?}",
            tuning.tick_interval, tuning.spawn_interval
        );
        Ok(())
    }

    /// Stops both timers. The game state is left as it is.
    pub fn shutdown(&self) {
        self.shared.borrow_mut().stop_timers();
    }

    pub fn is_ticking(&self) -> bool {
        self.shared.borrow().timers.is_some()
    }

    /// Rejects sizes the field cannot be played at; see [`Game::resize`].
    pub fn resize(&self, width: f32, height: f32) -> Result<()> {
        self.shared.borrow_mut().game.resize(width, height)
    }

    pub fn phase(&self) -> Phase {
        self.shared.borrow().game.phase()
    }

    pub fn score(&self) -> u32 {
        self.shared.borrow().game.score()
    }

    pub fn high_score(&self) -> u32 {
        self.shared.borrow().game.high_score()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.borrow().game.snapshot()
    }

    pub fn instances(&self) -> Vec<InstanceData> {
        self.shared.borrow().game.instances()
    }
}

fn on_tick<S: Scheduler, G: GapSource>(shared: &Weak<RefCell<Shared<S, G>>>) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let Ok(mut shared) = shared.try_borrow_mut() else {
        warn!("tick skipped: session busy");
        return;
    };
    if let Step::Ended(_) = shared.game.tick() {
        shared.stop_timers();
    }
}

fn on_spawn<S: Scheduler, G: GapSource>(shared: &Weak<RefCell<Shared<S, G>>>) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let Ok(mut shared) = shared.try_borrow_mut() else {
        warn!("spawn skipped: session busy");
        return;
    };
    shared.game.spawn();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::{FieldConfig, Tuning};
    use crate::spawner::ScriptedGaps;
    use crate::timer::ManualScheduler;

    fn session() -> (Session<ManualScheduler, ScriptedGaps>, ManualScheduler) {
        let clock = ManualScheduler::new();
        let game = Game::with_gaps(
            FieldConfig::new(400.0, 600.0),
            Tuning::default(),
            ScriptedGaps::new([200.0]),
        );
        (Session::new(game, clock.clone()), clock)
    }

    #[test]
    fn timers_start_with_the_first_activation() {
        let (session, clock) = session();
        assert!(!session.is_ticking());
        assert_eq!(session.activate().unwrap(), Activation::Started);
        assert!(session.is_ticking());
        assert_eq!(clock.active(), 2);
    }

    #[test]
    fn jump_keeps_existing_timers() {
        let (session, clock) = session();
        session.activate().unwrap();
        assert_eq!(session.activate().unwrap(), Activation::Jumped);
        assert_eq!(clock.active(), 2);
    }

    #[test]
    fn tick_timer_advances_the_bird() {
        let (session, clock) = session();
        session.activate().unwrap();
        clock.advance(Duration::from_millis(20));
        let bird = session.snapshot().bird;
        assert_eq!(bird.velocity, -7.5);
        assert_eq!(bird.y, 277.0);
    }

    #[test]
    fn spawn_timer_adds_obstacles() {
        let (session, clock) = session();
        session.activate().unwrap();
        // Keep the bird hovering around mid-field until the first spawn.
        for _ in 0..75 {
            clock.advance(Duration::from_millis(20));
            let bird = session.snapshot().bird;
            if bird.y > 300.0 && bird.velocity > 0.0 {
                session.activate().unwrap();
            }
        }
        assert_eq!(session.phase(), Phase::Running);
        assert_eq!(session.snapshot().obstacles.len(), 1);
    }

    #[test]
    fn ending_a_run_stops_both_timers() {
        let (session, clock) = session();
        session.activate().unwrap();
        clock.advance(Duration::from_secs(5));
        assert_eq!(session.phase(), Phase::Over);
        assert!(!session.is_ticking());
        assert_eq!(clock.active(), 0);

        let frozen = session.snapshot();
        clock.advance(Duration::from_secs(5));
        assert_eq!(session.snapshot(), frozen);
    }

    #[test]
    fn restart_rearms_timers() {
        let (session, clock) = session();
        session.activate().unwrap();
        clock.advance(Duration::from_secs(5));
        assert_eq!(session.activate().unwrap(), Activation::Started);
        assert_eq!(session.phase(), Phase::Running);
        assert_eq!(clock.active(), 2);
    }

    #[test]
    fn resize_is_validated_before_the_next_run() {
        let (session, _clock) = session();
        assert!(session.resize(400.0, 120.0).is_err());
        session.resize(400.0, 800.0).unwrap();
        session.activate().unwrap();
        assert_eq!(session.snapshot().dimensions.field_height, 800.0);
    }

    #[test]
    fn shutdown_and_drop_release_timers() {
        let (session, clock) = session();
        session.activate().unwrap();
        session.shutdown();
        assert_eq!(clock.active(), 0);
        assert_eq!(session.phase(), Phase::Running);

        let (session, clock) = self::session();
        session.activate().unwrap();
        let copy = session.clone();
        drop(session);
        assert_eq!(clock.active(), 2);
        drop(copy);
        assert_eq!(clock.active(), 0);
    }
}
