use serde::{Deserialize, Serialize};

use construct_kernel::Tolerance;

use crate::types::{ElementId, EngineError};

/// Board-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Interval between animation ticks in milliseconds.
    pub animation_delay_ms: u64,
    pub tolerance: Tolerance,
    /// Circle and arc parameters are radians instead of fractions of a turn.
    pub legacy_full_turn: bool,
    /// Grid snapping never leaves the visible bounding box.
    pub snap_to_grid_clamped: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            animation_delay_ms: 35,
            tolerance: Tolerance::default(),
            legacy_full_turn: false,
            snap_to_grid_clamped: true,
        }
    }
}

impl BoardConfig {
    /// Parse a configuration; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json).map_err(|e| EngineError::InvalidConfig {
            reason: e.to_string(),
        })?;
        if config.animation_delay_ms == 0 {
            return Err(EngineError::InvalidConfig {
                reason: "animation_delay_ms must be positive".into(),
            });
        }
        Ok(config)
    }
}

/// Unit in which attraction and snapping distances are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttractorUnit {
    #[default]
    User,
    Screen,
}

/// Per-element behaviour of a positioned element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionAttributes {
    /// Skip the state recompute on updates.
    pub frozen: bool,
    /// Ignore drags and programmatic moves.
    pub fixed: bool,
    pub snap_to_grid: bool,
    /// Grid spacing; non-positive values fall back to one user unit.
    pub snap_size_x: f64,
    pub snap_size_y: f64,
    /// Snap to the grid only within `attractor_distance` of a grid point.
    pub attract_to_grid: bool,
    pub snap_to_points: bool,
    pub attractor_distance: f64,
    pub attractor_unit: AttractorUnit,
    /// A glider farther than this from an attractor carrier leaves it.
    pub snatch_distance: f64,
    pub ignored_snap_to_points: Vec<ElementId>,
    /// Elements that capture the point when it comes close.
    pub attractors: Vec<ElementId>,
    /// Round glider values to multiples of this when positive.
    pub snap_width: f64,
    pub snap_values: Vec<f64>,
    pub snap_value_distance: f64,
    /// Value range the carrier's parameter range is mapped onto for snapping.
    pub slider_range: Option<(f64, f64)>,
    pub is_label: bool,
    pub visible: bool,
}

impl Default for PositionAttributes {
    fn default() -> Self {
        Self {
            frozen: false,
            fixed: false,
            snap_to_grid: false,
            snap_size_x: 1.0,
            snap_size_y: 1.0,
            attract_to_grid: false,
            snap_to_points: false,
            attractor_distance: 0.0,
            attractor_unit: AttractorUnit::User,
            snatch_distance: 0.0,
            ignored_snap_to_points: Vec::new(),
            attractors: Vec::new(),
            snap_width: -1.0,
            snap_values: Vec::new(),
            snap_value_distance: 0.05,
            slider_range: None,
            is_label: false,
            visible: true,
        }
    }
}

impl PositionAttributes {
    /// A free point that follows the pointer.
    pub fn draggable() -> Self {
        Self::default()
    }

    /// Text placed relative to its anchor in screen pixels.
    pub fn label() -> Self {
        Self {
            is_label: true,
            ..Default::default()
        }
    }

    pub fn with_grid(mut self, size_x: f64, size_y: f64) -> Self {
        self.snap_to_grid = true;
        self.snap_size_x = size_x;
        self.snap_size_y = size_y;
        self
    }

    pub fn with_attractors(mut self, attractors: Vec<ElementId>, distance: f64, snatch: f64) -> Self {
        self.attractors = attractors;
        self.attractor_distance = distance;
        self.snatch_distance = snatch;
        self
    }
}
