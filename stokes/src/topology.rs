use crate::catalog;
use crate::driver::FramePlan;
use crate::pass;
use crate::render::Problem;
use crate::settings::Settings;
use crate::vocabulary::{State, Vocabulary};

/// One draw in a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Pass(&'static str),
    /// Stamp the constant boundary colour along the edges of a field.
    Boundary(&'static str),
}

/// The order in which passes run, described as data.
///
/// A full step is: advect, relax (repeated), inject, divergence, project.
/// The boundary stamps and the composite follow on every frame.
#[derive(Clone, Debug)]
pub struct Topology {
    seed: &'static str,
    advect: Vec<&'static str>,
    relax: Vec<&'static str>,
    inject: Vec<&'static str>,
    divergence: Vec<&'static str>,
    project: Vec<&'static str>,
    boundaries: Vec<&'static str>,
    composite: &'static str,
}

impl Topology {
    pub fn new(settings: &Settings) -> Self {
        let mut advect = vec!["advect", "copy-advect"];
        if settings.self_advection {
            advect.extend(["advect-velocity", "copy-velocity"]);
        }

        Self {
            seed: "init",
            advect,
            relax: vec!["jacobi", "copy-jacobi"],
            inject: vec!["input", "copy-input"],
            divergence: vec!["divergence"],
            project: vec!["gradient", "copy-gradient"],
            boundaries: vec!["velocity", "pressure"],
            composite: "final",
        }
    }

    pub fn seed(&self) -> &'static str {
        self.seed
    }

    pub fn boundaries(&self) -> &[&'static str] {
        &self.boundaries
    }

    /// Every pass this topology can schedule, seed and composite included.
    pub fn passes(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.seed)
            .chain(self.solver())
            .chain(std::iter::once(self.composite))
    }

    fn solver(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.advect
            .iter()
            .chain(&self.relax)
            .chain(&self.inject)
            .chain(&self.divergence)
            .chain(&self.project)
            .copied()
    }

    /// Check the graph against the catalog and vocabulary before any GPU
    /// work happens. Every input must resolve to a value whose shape matches
    /// the uniform its shader declares.
    pub fn validate(&self, vocabulary: &Vocabulary, state: &State) -> Result<(), Problem> {
        for name in self.passes() {
            let spec = catalog::lookup(name).ok_or_else(|| Problem::UnknownPass(name.to_string()))?;

            for input in spec.inputs.iter().chain(std::iter::once(&spec.output)) {
                if !vocabulary.contains(input) {
                    return Err(Problem::MissingMetadata {
                        pass: name.to_string(),
                        name: input.to_string(),
                    });
                }
            }

            for &input in spec.inputs {
                let value = vocabulary.resolve(name, input)?.provide(state);
                let declared = catalog::declared_type(spec.fragment, input).ok_or_else(|| {
                    Problem::MissingMetadata {
                        pass: name.to_string(),
                        name: input.to_string(),
                    }
                })?;
                pass::bind_value(input, value, Some(declared))?;
            }

            if spec.inputs.contains(&spec.output) {
                return Err(Problem::ReadWriteHazard {
                    pass: name.to_string(),
                    field: spec.output.to_string(),
                });
            }
        }

        for field in &self.boundaries {
            if !vocabulary.contains(field) {
                return Err(Problem::MissingMetadata {
                    pass: "boundary".to_string(),
                    name: field.to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn schedule(&self, plan: &FramePlan) -> Vec<Step> {
        let mut steps = Vec::new();

        if plan.solve {
            steps.extend(self.advect.iter().copied().map(Step::Pass));
            for _ in 0..plan.iterations {
                steps.extend(self.relax.iter().copied().map(Step::Pass));
            }
            steps.extend(
                self.inject
                    .iter()
                    .chain(&self.divergence)
                    .chain(&self.project)
                    .copied()
                    .map(Step::Pass),
            );
        }

        steps.extend(self.boundaries.iter().copied().map(Step::Boundary));
        steps.push(Step::Pass(self.composite));
        steps
    }
}
