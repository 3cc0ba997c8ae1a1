use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_FIELD_WIDTH: f32 = 400.0;
const DEFAULT_FIELD_HEIGHT: f32 = 600.0;
const DEFAULT_BIRD_SIZE: f32 = 30.0;
const DEFAULT_OBSTACLE_WIDTH: f32 = 60.0;
const DEFAULT_GAP_SIZE: f32 = 150.0;

const RELATIVE_BIRD: f32 = 0.05;
const RELATIVE_OBSTACLE: f32 = 0.15;
const RELATIVE_GAP: f32 = 0.3;

/// How the size-derived constants are obtained.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Sizing {
    /// Absolute pixel sizes.
    Fixed {
        bird_size: f32,
        obstacle_width: f32,
        gap_size: f32,
    },
    /// Fractions of the field: bird and gap of its height, obstacle of its width.
    Relative { bird: f32, obstacle: f32, gap: f32 },
}

impl Sizing {
    pub fn relative() -> Self {
        Sizing::Relative {
            bird: RELATIVE_BIRD,
            obstacle: RELATIVE_OBSTACLE,
            gap: RELATIVE_GAP,
        }
    }
}

impl Default for Sizing {
    fn default() -> Self {
        Sizing::Fixed {
            bird_size: DEFAULT_BIRD_SIZE,
            obstacle_width: DEFAULT_OBSTACLE_WIDTH,
            gap_size: DEFAULT_GAP_SIZE,
        }
    }
}

/// Play-field configuration supplied at start time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FieldConfig {
    pub field_width: f32,
    pub field_height: f32,
    pub sizing: Sizing,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            field_width: DEFAULT_FIELD_WIDTH,
            field_height: DEFAULT_FIELD_HEIGHT,
            sizing: Sizing::default(),
        }
    }
}

impl FieldConfig {
    pub fn new(field_width: f32, field_height: f32) -> Self {
        Self {
            field_width,
            field_height,
            ..Self::default()
        }
    }

    pub fn with_sizing(mut self, sizing: Sizing) -> Self {
        self.sizing = sizing;
        self
    }

    /// Reads `width`, `height` and `sizing` (`fixed` | `relative`) from a URL
    /// query string such as `?width=400&height=600&sizing=relative`.
    pub fn from_query(query: &str) -> Result<Self> {
        let mut config = Self::default();
        let query = query.strip_prefix('?').unwrap_or(query);
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "width" => config.field_width = parse_px(key, value)?,
                "height" => config.field_height = parse_px(key, value)?,
                "sizing" => {
                    config.sizing = match value {
                        "fixed" => Sizing::default(),
                        "relative" => Sizing::relative(),
                        other => bail!("unknown sizing mode {other:?}"),
                    }
                }
                _ => {}
            }
        }
        Ok(config)
    }

    /// Rejects fields the simulation cannot be played in.
    pub fn validate(&self, tuning: &Tuning) -> Result<()> {
        for (name, value) in [("width", self.field_width), ("height", self.field_height)] {
            if !value.is_finite() || value <= 0.0 {
                bail!("field {name} must be a positive number, got {value}");
            }
        }
        let dims = Dimensions::resolve(self, tuning);
        for (name, value) in [
            ("bird size", dims.bird_size),
            ("obstacle width", dims.obstacle_width),
            ("gap size", dims.gap_size),
        ] {
            if !value.is_finite() || value <= 0.0 {
                bail!("{name} must be a positive number, got {value}");
            }
        }
        let needed = dims.gap_size + 2.0 * dims.gap_margin;
        if dims.field_height < needed {
            bail!(
                "field height {} is smaller than gap plus margins ({needed})",
                dims.field_height
            );
        }
        if dims.bird_size >= dims.gap_size {
            bail!(
                "bird size {} does not fit through gap {}",
                dims.bird_size,
                dims.gap_size
            );
        }
        if dims.bird_right() > dims.field_width {
            bail!("bird column extends past field width {}", dims.field_width);
        }
        Ok(())
    }
}

fn parse_px(key: &str, value: &str) -> Result<f32> {
    value
        .parse::<f32>()
        .with_context(|| format!("invalid {key} {value:?}"))
}

/// Physics and cadence constants.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tuning {
    /// Downward acceleration, px/tick².
    pub gravity: f32,
    /// Velocity set by a jump, px/tick. Negative is upward.
    pub jump_impulse: f32,
    /// Leftward obstacle speed, px/tick.
    pub obstacle_speed: f32,
    /// Minimum distance between a gap and the top or bottom edge.
    pub gap_margin: f32,
    /// Bird's left edge as a fraction of field width.
    pub bird_x_fraction: f32,
    pub tick_interval: Duration,
    pub spawn_interval: Duration,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            gravity: 0.5,
            jump_impulse: -8.0,
            obstacle_speed: 3.0,
            gap_margin: 50.0,
            bird_x_fraction: 0.25,
            tick_interval: Duration::from_millis(20),
            spawn_interval: Duration::from_millis(1500),
        }
    }
}

/// Size-derived constants, resolved once per start.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Dimensions {
    pub field_width: f32,
    pub field_height: f32,
    /// Bird's fixed left edge.
    pub bird_x: f32,
    pub bird_size: f32,
    pub obstacle_width: f32,
    pub gap_size: f32,
    pub gap_margin: f32,
}

impl Dimensions {
    pub fn resolve(config: &FieldConfig, tuning: &Tuning) -> Self {
        let (bird_size, obstacle_width, gap_size) = match config.sizing {
            Sizing::Fixed {
                bird_size,
                obstacle_width,
                gap_size,
            } => (bird_size, obstacle_width, gap_size),
            Sizing::Relative {
                bird,
                obstacle,
                gap,
            } => (
                config.field_height * bird,
                config.field_width * obstacle,
                config.field_height * gap,
            ),
        };
        Self {
            field_width: config.field_width,
            field_height: config.field_height,
            bird_x: config.field_width * tuning.bird_x_fraction,
            bird_size,
            obstacle_width,
            gap_size,
            gap_margin: tuning.gap_margin,
        }
    }

    pub fn bird_right(&self) -> f32 {
        self.bird_x + self.bird_size
    }

    /// Where the bird sits before a run and after each reset.
    pub fn initial_bird_y(&self) -> f32 {
        (self.field_height - self.bird_size) * 0.5
    }

    /// Largest top-edge position that keeps the bird inside the field.
    pub fn max_bird_y(&self) -> f32 {
        self.field_height - self.bird_size
    }

    /// Inclusive range a new gap's start is drawn from.
    pub fn gap_bounds(&self) -> (f32, f32) {
        let low = self.gap_margin;
        let high = self.field_height - self.gap_size - self.gap_margin;
        (low, high.max(low))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_sizing_is_used_verbatim() {
        let dims = Dimensions::resolve(&FieldConfig::new(400.0, 600.0), &Tuning::default());
        assert_eq!(dims.bird_x, 100.0);
        assert_eq!(dims.bird_size, 30.0);
        assert_eq!(dims.obstacle_width, 60.0);
        assert_eq!(dims.gap_size, 150.0);
        assert_eq!(dims.initial_bird_y(), 285.0);
        assert_eq!(dims.max_bird_y(), 570.0);
        assert_eq!(dims.gap_bounds(), (50.0, 400.0));
    }

    #[test]
    fn relative_sizing_scales_with_field() {
        let config = FieldConfig::new(800.0, 1000.0).with_sizing(Sizing::relative());
        let dims = Dimensions::resolve(&config, &Tuning::default());
        let close = |a: f32, b: f32| (a - b).abs() < 1e-3;
        assert!(close(dims.bird_size, 50.0));
        assert!(close(dims.obstacle_width, 120.0));
        assert!(close(dims.gap_size, 300.0));
        assert_eq!(dims.bird_x, 200.0);
    }

    #[test]
    fn query_overrides_defaults() {
        let config = FieldConfig::from_query("?width=320&height=480&sizing=relative&bg=ffffff")
            .unwrap();
        assert_eq!(config.field_width, 320.0);
        assert_eq!(config.field_height, 480.0);
        assert_eq!(config.sizing, Sizing::relative());
    }

    #[test]
    fn empty_query_gives_defaults() {
        assert_eq!(FieldConfig::from_query("").unwrap(), FieldConfig::default());
        assert_eq!(FieldConfig::from_query("?").unwrap(), FieldConfig::default());
    }

    #[test]
    fn query_rejects_garbage() {
        assert!(FieldConfig::from_query("?width=wide").is_err());
        assert!(FieldConfig::from_query("?sizing=stretchy").is_err());
    }

    #[test]
    fn validate_accepts_defaults() {
        let tuning = Tuning::default();
        assert!(FieldConfig::default().validate(&tuning).is_ok());
        let relative = FieldConfig::default().with_sizing(Sizing::relative());
        assert!(relative.validate(&tuning).is_ok());
    }

    #[test]
    fn validate_rejects_degenerate_fields() {
        let tuning = Tuning::default();
        assert!(FieldConfig::new(0.0, 600.0).validate(&tuning).is_err());
        assert!(FieldConfig::new(400.0, f32::NAN).validate(&tuning).is_err());
        // 150 gap + 2 * 50 margin does not fit in 200.
        assert!(FieldConfig::new(400.0, 200.0).validate(&tuning).is_err());
        // Bird column at 25% of 35 px plus a 30 px bird overflows.
        assert!(FieldConfig::new(35.0, 600.0).validate(&tuning).is_err());
    }
}
