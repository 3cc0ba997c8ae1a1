/// Discrete game state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    NotStarted,
    Running,
    Over,
}

/// The player. Horizontal position is fixed per run and lives in `Dimensions`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bird {
    /// Top edge, pixels from the top of the field.
    pub y: f32,
    /// Pixels per tick, positive is downward.
    pub velocity: f32,
}

impl Bird {
    pub fn at_rest(y: f32) -> Self {
        Self { y, velocity: 0.0 }
    }
}

/// A paired upper and lower barrier sharing one gap.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Obstacle {
    /// Left edge.
    pub x: f32,
    /// Top of the passable gap.
    pub gap_start: f32,
    /// Set once the bird has cleared the trailing edge. Never reverts.
    pub passed: bool,
}

impl Obstacle {
    pub fn new(x: f32, gap_start: f32) -> Self {
        Self {
            x,
            gap_start,
            passed: false,
        }
    }

    pub fn right(&self, width: f32) -> f32 {
        self.x + width
    }
}

/// Authoritative per-run snapshot, mutated by the tick and spawn timers.
#[derive(Clone, Debug, PartialEq)]
pub struct SimState {
    pub bird: Bird,
    /// Insertion order, oldest (leftmost) first.
    pub obstacles: Vec<Obstacle>,
    pub score: u32,
    pub phase: Phase,
}

impl SimState {
    pub fn new(bird_y: f32) -> Self {
        Self {
            bird: Bird::at_rest(bird_y),
            obstacles: Vec::new(),
            score: 0,
            phase: Phase::NotStarted,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }
}
