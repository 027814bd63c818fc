//! Binding defaults and solver inputs.

use serde::{Deserialize, Serialize};

/// How the downstream evaluator orients the attachment frame on a surface
/// influence. Stored per influence; the engine does not interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TangentAlignment {
    #[default]
    None,
    U,
    V,
}

/// Defaults used when a binding or influence is created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinConfig {
    /// Weight given to components that enter a membership without a prior weight.
    pub default_weight: f64,
    /// Components farther than this from the driver are not bound. `0` disables the check.
    pub max_distance: f64,
    /// Parametric inset from the domain edges when storing coordinates.
    pub tolerance: f64,
    pub samples_u: usize,
    pub samples_v: usize,
    pub tangent_alignment: TangentAlignment,
    /// Whether transform influences get a locator base (otherwise the bind
    /// matrix is captured onto the influence itself).
    pub create_prebind_matrix: bool,
}

impl Default for SkinConfig {
    fn default() -> Self {
        Self {
            default_weight: 1.0,
            max_distance: 0.0,
            tolerance: 0.001,
            samples_u: 4,
            samples_v: 4,
            tangent_alignment: TangentAlignment::None,
            create_prebind_matrix: true,
        }
    }
}

impl SkinConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn default_weight(mut self, weight: f64) -> Self {
        self.default_weight = weight;
        self
    }

    #[must_use]
    pub const fn max_distance(mut self, distance: f64) -> Self {
        self.max_distance = distance;
        self
    }

    #[must_use]
    pub const fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub const fn samples(mut self, samples_u: usize, samples_v: usize) -> Self {
        self.samples_u = samples_u;
        self.samples_v = samples_v;
        self
    }

    #[must_use]
    pub const fn tangent_alignment(mut self, alignment: TangentAlignment) -> Self {
        self.tangent_alignment = alignment;
        self
    }

    #[must_use]
    pub const fn create_prebind_matrix(mut self, create: bool) -> Self {
        self.create_prebind_matrix = create;
        self
    }

    /// Solver inputs derived from these defaults.
    #[must_use]
    pub const fn solve_options(&self, use_pre_bind_pose: bool) -> SolveOptions {
        SolveOptions {
            max_distance: self.max_distance,
            use_pre_bind_pose,
            tolerance: self.tolerance,
        }
    }
}

/// Inputs to the coordinate solver for one membership update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveOptions {
    pub max_distance: f64,
    /// Project against the influence base (bind pose) instead of the live driver.
    pub use_pre_bind_pose: bool,
    pub tolerance: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SkinConfig::default().solve_options(false)
    }
}

impl SolveOptions {
    #[must_use]
    pub const fn max_distance(mut self, distance: f64) -> Self {
        self.max_distance = distance;
        self
    }

    #[must_use]
    pub const fn use_pre_bind_pose(mut self, enabled: bool) -> Self {
        self.use_pre_bind_pose = enabled;
        self
    }

    #[must_use]
    pub const fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}
