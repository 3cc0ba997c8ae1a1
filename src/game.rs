use anyhow::{Context, Result};
use log::{debug, info};

use crate::config::{Dimensions, FieldConfig, Tuning};
use crate::obstacles;
use crate::physics::{self, Integration};
use crate::render::{self, InstanceData};
use crate::spawner::{self, GapSource, RandomGaps};
use crate::state::{Bird, Obstacle, Phase, SimState};

/// What an activate input did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Activation {
    /// A fresh run began (from `NotStarted` or `Over`).
    Started,
    /// The running bird jumped.
    Jumped,
}

/// Why a run ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EndCause {
    Boundary,
    Collision,
}

/// Outcome of one simulation tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Not running; nothing changed.
    Idle,
    Advanced { passed: u32 },
    Ended(EndCause),
}

/// Read-only copy of everything a renderer needs.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub phase: Phase,
    pub bird: Bird,
    pub obstacles: Vec<Obstacle>,
    pub score: u32,
    pub high_score: u32,
    pub dimensions: Dimensions,
}

/// Phase controller: owns the simulation state and the session high score.
#[derive(Debug)]
pub struct Game<G = RandomGaps> {
    tuning: Tuning,
    config: FieldConfig,
    dims: Dimensions,
    state: SimState,
    high_score: u32,
    gaps: G,
}

impl Game<RandomGaps> {
    pub fn new(config: FieldConfig) -> Self {
        Self::with_gaps(config, Tuning::default(), RandomGaps::from_entropy())
    }
}

impl<G: GapSource> Game<G> {
    pub fn with_gaps(config: FieldConfig, tuning: Tuning, gaps: G) -> Self {
        let dims = Dimensions::resolve(&config, &tuning);
        Self {
            tuning,
            config,
            dims,
            state: SimState::new(dims.initial_bird_y()),
            high_score: 0,
            gaps,
        }
    }

    /// Single logical input: starts a run when idle or over, jumps otherwise.
    pub fn activate(&mut self) -> Activation {
        match self.state.phase {
            Phase::NotStarted | Phase::Over => {
                self.restart();
                Activation::Started
            }
            Phase::Running => {
                self.jump();
                Activation::Jumped
            }
        }
    }

    /// Applies the jump impulse. Ignored unless a run is in progress.
    pub fn jump(&mut self) -> bool {
        if !self.state.is_running() {
            return false;
        }
        physics::jump(&mut self.state.bird, &self.tuning);
        true
    }

    fn restart(&mut self) {
        self.dims = Dimensions::resolve(&self.config, &self.tuning);
        self.state = SimState::new(self.dims.initial_bird_y());
        self.state.phase = Phase::Running;
        physics::jump(&mut self.state.bird, &self.tuning);
        info!(
            "run started on {}x{} field",
            self.dims.field_width, self.dims.field_height
        );
        debug!("resolved dimensions: {:?}", self.dims);
    }

    /// Advances the bird, then the obstacles. Stops at the first terminal event.
    pub fn tick(&mut self) -> Step {
        if !self.state.is_running() {
            return Step::Idle;
        }
        if physics::integrate(&mut self.state.bird, &self.tuning, &self.dims)
            == Integration::OutOfBounds
        {
            self.finish(EndCause::Boundary);
            return Step::Ended(EndCause::Boundary);
        }
        let sweep = obstacles::advance(&mut self.state, &self.tuning, &self.dims);
        if sweep.pruned > 0 {
            debug!("pruned {} obstacle(s)", sweep.pruned);
        }
        if sweep.collision {
            self.finish(EndCause::Collision);
            return Step::Ended(EndCause::Collision);
        }
        Step::Advanced {
            passed: sweep.passed,
        }
    }

    /// Adds one obstacle at the right edge while a run is in progress.
    pub fn spawn(&mut self) -> Option<Obstacle> {
        if !self.state.is_running() {
            return None;
        }
        Some(spawner::spawn(
            &mut self.state.obstacles,
            &self.dims,
            &mut self.gaps,
        ))
    }

    fn finish(&mut self, cause: EndCause) {
        self.state.phase = Phase::Over;
        info!("run over ({:?}) with score {}", cause, self.state.score);
        if self.state.score > self.high_score {
            info!(
                "new high score {} (was {})",
                self.state.score, self.high_score
            );
            self.high_score = self.state.score;
        }
    }

    /// Records a new field size. Size-derived constants pick it up at the next
    /// start; an idle bird is re-centred right away. A field that fails
    /// validation is rejected and the previous size kept.
    pub fn resize(&mut self, width: f32, height: f32) -> Result<()> {
        let config = FieldConfig {
            field_width: width,
            field_height: height,
            ..self.config
        };
        config
            .validate(&self.tuning)
            .with_context(|| format!("cannot resize field to {width}x{height}"))?;
        self.config = config;
        debug!("field resized to {width}x{height}");
        if self.state.phase == Phase::NotStarted {
            self.dims = Dimensions::resolve(&self.config, &self.tuning);
            self.state.bird = Bird::at_rest(self.dims.initial_bird_y());
        }
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn bird(&self) -> Bird {
        self.state.bird
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.state.obstacles
    }

    pub fn score(&self) -> u32 {
        self.state.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dims
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.state.phase,
            bird: self.state.bird,
            obstacles: self.state.obstacles.clone(),
            score: self.state.score,
            high_score: self.high_score,
            dimensions: self.dims,
        }
    }

    pub fn instances(&self) -> Vec<InstanceData> {
        render::instances(&self.dims, &self.state.bird, &self.state.obstacles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Sizing;
    use crate::spawner::ScriptedGaps;

    fn game() -> Game<ScriptedGaps> {
        Game::with_gaps(
            FieldConfig::new(400.0, 600.0),
            Tuning::default(),
            ScriptedGaps::new([200.0]),
        )
    }

    #[test]
    fn idle_game_holds_bird_at_rest() {
        let mut game = game();
        assert_eq!(game.phase(), Phase::NotStarted);
        assert_eq!(game.bird(), Bird::at_rest(285.0));
        assert_eq!(game.tick(), Step::Idle);
        assert_eq!(game.spawn(), None);
        assert!(!game.jump());
        assert_eq!(game.bird(), Bird::at_rest(285.0));
    }

    #[test]
    fn activate_starts_then_jumps() {
        let mut game = game();
        assert_eq!(game.activate(), Activation::Started);
        assert_eq!(game.phase(), Phase::Running);
        assert_eq!(game.bird().velocity, -8.0);

        game.tick();
        assert_eq!(game.bird().velocity, -7.5);
        assert_eq!(game.bird().y, 285.0 - 8.0);

        assert_eq!(game.activate(), Activation::Jumped);
        assert_eq!(game.bird().velocity, -8.0);
        assert_eq!(game.phase(), Phase::Running);
    }

    #[test]
    fn falling_out_ends_the_run() {
        let mut game = game();
        game.activate();
        let mut last = Step::Idle;
        for _ in 0..200 {
            last = game.tick();
            if matches!(last, Step::Ended(_)) {
                break;
            }
        }
        assert_eq!(last, Step::Ended(EndCause::Boundary));
        assert_eq!(game.phase(), Phase::Over);
        assert!(game.bird().y <= game.dimensions().max_bird_y());
        assert_eq!(game.tick(), Step::Idle);
    }

    #[test]
    fn restart_resets_run_but_keeps_high_score() {
        let mut game = game();
        game.activate();
        game.state.score = 4;
        game.finish(EndCause::Collision);
        assert_eq!(game.high_score(), 4);

        assert_eq!(game.activate(), Activation::Started);
        assert_eq!(game.score(), 0);
        assert!(game.obstacles().is_empty());
        assert_eq!(game.bird(), Bird { y: 285.0, velocity: -8.0 });
        assert_eq!(game.high_score(), 4);
    }

    #[test]
    fn high_score_only_grows() {
        let mut game = game();
        for (score, expected) in [(5, 5), (7, 7), (3, 7), (7, 7)] {
            game.activate();
            game.state.score = score;
            game.finish(EndCause::Collision);
            assert_eq!(game.high_score(), expected);
        }
    }

    #[test]
    fn spawn_uses_resolved_dimensions() {
        let mut game = game();
        game.activate();
        let obstacle = game.spawn().unwrap();
        assert_eq!(obstacle, Obstacle::new(400.0, 200.0));
        assert_eq!(game.obstacles().len(), 1);
    }

    #[test]
    fn resize_applies_at_next_start() {
        let mut game = Game::with_gaps(
            FieldConfig::new(400.0, 600.0).with_sizing(Sizing::relative()),
            Tuning::default(),
            ScriptedGaps::default(),
        );
        game.activate();
        game.resize(800.0, 1000.0).unwrap();
        assert_eq!(game.dimensions().field_width, 400.0);
        assert!((game.dimensions().bird_size - 30.0).abs() < 1e-3);

        game.state.phase = Phase::Over;
        game.activate();
        assert_eq!(game.dimensions().field_width, 800.0);
        assert!((game.dimensions().bird_size - 50.0).abs() < 1e-3);
    }

    #[test]
    fn resize_recentres_idle_bird() {
        let mut game = game();
        game.resize(400.0, 1000.0).unwrap();
        assert_eq!(game.bird(), Bird::at_rest(485.0));
    }

    #[test]
    fn resize_rejects_field_too_short_for_gap() {
        let mut game = game();
        // 150 gap + 2 * 50 margin needs 250 px.
        assert!(game.resize(400.0, 120.0).is_err());
        assert!(game.resize(0.0, 600.0).is_err());
        assert!(game.resize(400.0, f32::NAN).is_err());
        assert_eq!(game.bird(), Bird::at_rest(285.0));

        game.activate();
        assert_eq!(game.dimensions().field_height, 600.0);
        let obstacle = game.spawn().unwrap();
        let (_, high) = game.dimensions().gap_bounds();
        assert!(obstacle.gap_start <= high);
        assert!(obstacle.gap_start + game.dimensions().gap_size <= 600.0);
    }

    #[test]
    fn rejected_resize_mid_run_keeps_pending_size() {
        let mut game = game();
        game.activate();
        game.resize(400.0, 800.0).unwrap();
        assert!(game.resize(400.0, 120.0).is_err());
        game.state.phase = Phase::Over;
        game.activate();
        assert_eq!(game.dimensions().field_height, 800.0);
    }

    #[test]
    fn snapshot_mirrors_state() {
        let mut game = game();
        game.activate();
        game.spawn();
        let snapshot = game.snapshot();
        assert_eq!(snapshot.phase, Phase::Running);
        assert_eq!(snapshot.obstacles, game.obstacles());
        assert_eq!(snapshot.high_score, 0);
        assert_eq!(snapshot.dimensions, *game.dimensions());
    }
}
