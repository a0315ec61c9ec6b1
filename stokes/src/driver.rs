use crate::settings::Relaxation;

/// What a single frame should do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FramePlan {
    /// Run the solver stages. The boundary stamp and composite always run.
    pub solve: bool,
    /// Jacobi iterations for the pressure solve.
    pub iterations: u32,
}

/// Plans each frame and keeps a smoothed frame-rate estimate.
#[derive(Debug)]
pub struct FrameDriver {
    relaxation: Relaxation,
    fps: f64,
    last_frame: Option<f64>,
}

impl FrameDriver {
    pub fn new(relaxation: Relaxation) -> Self {
        Self {
            relaxation,
            fps: 0.0,
            last_frame: None,
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn iterations(&self) -> u32 {
        match self.relaxation {
            Relaxation::Fixed { iterations } => iterations,
            Relaxation::Adaptive { min, max } => adaptive_iterations(self.fps, min, max),
        }
    }

    pub fn plan(&self, active: bool) -> FramePlan {
        FramePlan {
            solve: active,
            iterations: self.iterations(),
        }
    }

    /// Fold the time since the previous frame into the estimate. The first
    /// frame only starts the clock.
    pub fn finish(&mut self, timestamp: f64) {
        if let Some(last_frame) = self.last_frame {
            self.fps = smooth_fps(self.fps, timestamp - last_frame);
        }
        self.last_frame = Some(timestamp);
    }
}

pub fn adaptive_iterations(fps: f64, min: u32, max: u32) -> u32 {
    let (low, high) = (min.min(max), min.max(max));
    (fps * 2.0 - 60.0).round().clamp(low as f64, high as f64) as u32
}

pub fn smooth_fps(fps: f64, elapsed_ms: f64) -> f64 {
    fps * 0.95 + (1000.0 / elapsed_ms.max(0.1)) * 0.05
}
