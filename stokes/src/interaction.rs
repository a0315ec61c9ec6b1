use crate::settings::Activation;

const CENTER: [f32; 2] = [0.5, 0.5];

/// Turns normalized pointer samples into a forcing vector for the solver.
///
/// The forcing is the delta between the last two samples. It is dropped back
/// to zero once no sample has arrived for `idle_timeout` milliseconds.
#[derive(Clone, Debug)]
pub struct Interaction {
    activation: Activation,
    idle_timeout: f64,

    last: Option<[f32; 2]>,
    forcing: [f32; 2],
    active: bool,
    // Timestamp of the last sample, while the idle timer is running.
    moved_at: Option<f64>,
}

impl Interaction {
    pub fn new(activation: Activation, idle_timeout: f64) -> Self {
        Self {
            activation,
            idle_timeout,
            last: None,
            forcing: [0.0, 0.0],
            active: activation == Activation::Always,
            moved_at: None,
        }
    }

    /// Record a pointer sample. `position` is normalized to `[0, 1]²`, with
    /// the origin in the bottom-left corner.
    pub fn pointer_moved(&mut self, position: [f32; 2], timestamp: f64) {
        // The first sample only establishes where the pointer is.
        self.forcing = match self.last {
            Some(last) => [position[0] - last[0], position[1] - last[1]],
            None => [0.0, 0.0],
        };
        self.last = Some(position);
        self.moved_at = Some(timestamp);

        match self.activation {
            Activation::Always => (),
            Activation::OnInteraction => self.active = true,
            Activation::Proximity { radius } => {
                if distance(position, CENTER) <= radius {
                    self.active = true;
                }
            }
        }
    }

    /// Activate regardless of policy, e.g. on an explicit click.
    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Advance the idle timer.
    pub fn tick(&mut self, timestamp: f64) {
        if let Some(moved_at) = self.moved_at {
            if timestamp - moved_at >= self.idle_timeout {
                self.forcing = [0.0, 0.0];
                self.moved_at = None;
            }
        }
    }

    pub fn forcing(&self) -> [f32; 2] {
        self.forcing
    }

    pub fn last_position(&self) -> [f32; 2] {
        self.last.unwrap_or([0.0, 0.0])
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn on_interaction() -> Interaction {
        Interaction::new(Activation::OnInteraction, 25.0)
    }

    #[test]
    fn forcing_is_the_pointer_delta() {
        let mut interaction = on_interaction();
        interaction.pointer_moved([0.5, 0.5], 0.0);
        interaction.pointer_moved([0.6, 0.5], 16.0);

        let [dx, dy] = interaction.forcing();
        assert_abs_diff_eq!(dx, 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(dy, 0.0, epsilon = 1e-6);
        assert_eq!(interaction.last_position(), [0.6, 0.5]);
    }

    #[test]
    fn forcing_decays_to_exactly_zero() {
        let mut interaction = on_interaction();
        interaction.pointer_moved([0.5, 0.5], 0.0);
        interaction.pointer_moved([0.6, 0.5], 16.0);

        interaction.tick(30.0);
        assert_ne!(interaction.forcing(), [0.0, 0.0]);

        interaction.tick(16.0 + 25.0);
        assert_eq!(interaction.forcing(), [0.0, 0.0]);
    }

    #[test]
    fn movement_restarts_the_idle_timer() {
        let mut interaction = on_interaction();
        interaction.pointer_moved([0.2, 0.2], 0.0);
        interaction.pointer_moved([0.3, 0.2], 20.0);
        interaction.pointer_moved([0.3, 0.4], 40.0);

        interaction.tick(50.0);
        assert_abs_diff_eq!(interaction.forcing()[1], 0.2, epsilon = 1e-6);

        interaction.tick(65.0);
        assert_eq!(interaction.forcing(), [0.0, 0.0]);
    }

    #[test]
    fn first_sample_does_not_jump() {
        let mut interaction = on_interaction();
        interaction.pointer_moved([0.9, 0.9], 0.0);
        assert_eq!(interaction.forcing(), [0.0, 0.0]);
    }

    #[test]
    fn inactive_until_first_interaction() {
        let mut interaction = on_interaction();
        assert!(!interaction.is_active());

        interaction.pointer_moved([0.1, 0.1], 0.0);
        assert!(interaction.is_active());

        // Stays active for the rest of the session.
        interaction.tick(10_000.0);
        assert!(interaction.is_active());
    }

    #[test]
    fn always_active_from_the_start() {
        let interaction = Interaction::new(Activation::Always, 25.0);
        assert!(interaction.is_active());
    }

    #[test]
    fn proximity_gates_activation() {
        let mut interaction = Interaction::new(Activation::Proximity { radius: 0.1 }, 25.0);

        interaction.pointer_moved([0.9, 0.9], 0.0);
        assert!(!interaction.is_active());
        // Forcing is still tracked outside the activation radius.
        interaction.pointer_moved([0.8, 0.9], 5.0);
        assert_abs_diff_eq!(interaction.forcing()[0], -0.1, epsilon = 1e-6);

        interaction.pointer_moved([0.55, 0.5], 10.0);
        assert!(interaction.is_active());
    }

    #[test]
    fn explicit_activation() {
        let mut interaction = Interaction::new(Activation::Proximity { radius: 0.0 }, 25.0);
        interaction.activate();
        assert!(interaction.is_active());
    }
}
