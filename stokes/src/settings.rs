use crate::Problem;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest field the solver will allocate, in texels along each side.
pub const MAX_FLUID_SIZE: u32 = 8192;

#[derive(Error, Debug, PartialEq)]
pub enum Invalid {
    #[error("fluidSize must be between 1 and {max}, got {size}")]
    FluidSize { size: u32, max: u32 },

    #[error("idleTimeout must be a non-negative number of milliseconds, got {0}")]
    IdleTimeout(f64),

    #[error("timestep must be positive, got {0}")]
    Timestep(f32),

    #[error("boundaryLineWidth must be non-negative, got {0}")]
    BoundaryLineWidth(f32),
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Width and height of every simulation field, in texels.
    pub fluid_size: u32,
    pub relaxation: Relaxation,
    pub activation: Activation,
    /// Milliseconds without pointer movement before the forcing is dropped.
    pub idle_timeout: f64,
    /// Advect velocity along itself before the pressure solve.
    pub self_advection: bool,

    pub timestep: f32,
    pub dissipation: f32,
    pub splat_radius: f32,
    pub force: f32,

    pub rest_color: [f32; 4],
    pub boundary_color: [f32; 4],
    pub boundary_line_width: f32,
}

/// How many Jacobi iterations the pressure solve gets each frame.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", tag = "policy")]
pub enum Relaxation {
    Fixed { iterations: u32 },
    /// Scale with the measured frame rate, within `[min, max]`.
    Adaptive { min: u32, max: u32 },
}

/// When pointer input starts driving the solver.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", tag = "policy")]
pub enum Activation {
    Always,
    OnInteraction,
    /// Only a pointer within `radius` of the centre of the domain activates.
    Proximity { radius: f32 },
}

impl Settings {
    /// Two relaxation steps, no velocity self-advection and wide boundary lines.
    pub fn simple() -> Self {
        Self {
            fluid_size: 512,
            relaxation: Relaxation::Fixed { iterations: 2 },
            activation: Activation::OnInteraction,
            idle_timeout: 25.0,
            self_advection: false,

            timestep: 1.0 / 60.0,
            dissipation: 1.0,
            splat_radius: 0.05,
            force: 60.0,

            rest_color: [0.0, 0.0, 0.0, 1.0],
            boundary_color: [0.0, 0.0, 0.0, 1.0],
            boundary_line_width: 64.0,
        }
    }

    /// Frame-rate adaptive relaxation with velocity self-advection.
    pub fn rich() -> Self {
        Self {
            relaxation: Relaxation::Adaptive { min: 20, max: 90 },
            self_advection: true,
            dissipation: 0.999,
            boundary_line_width: 64.0 / 10.0,
            ..Self::simple()
        }
    }

    /// Parse and validate.
    pub fn from_json(source: &str) -> Result<Self, Problem> {
        let settings: Self = serde_json::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), Invalid> {
        self.validate_fluid_size(MAX_FLUID_SIZE)?;

        if !self.idle_timeout.is_finite() || self.idle_timeout < 0.0 {
            return Err(Invalid::IdleTimeout(self.idle_timeout));
        }
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(Invalid::Timestep(self.timestep));
        }
        if self.boundary_line_width.is_nan() || self.boundary_line_width < 0.0 {
            return Err(Invalid::BoundaryLineWidth(self.boundary_line_width));
        }

        Ok(())
    }

    /// Check the field size against a device limit.
    pub fn validate_fluid_size(&self, max: u32) -> Result<(), Invalid> {
        if self.fluid_size == 0 || self.fluid_size > max {
            return Err(Invalid::FluidSize {
                size: self.fluid_size,
                max,
            });
        }
        Ok(())
    }

    pub fn texel_size(&self) -> [f32; 2] {
        let texel = 1.0 / self.fluid_size as f32;
        [texel, texel]
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::rich()
    }
}
