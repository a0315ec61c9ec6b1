use crate::field::{self, Field};
use crate::interaction::Interaction;
use crate::render::Problem;
use crate::settings::Settings;

use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;

/// Name of the entry standing for the visible surface.
pub const SCREEN: &str = "screen";

/// Everything a provider can hand back to a pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Scalar(f32),
    Vec2([f32; 2]),
    Field(Field),
    Screen,
}

impl Value {
    pub fn shape(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Vec2(_) => "vec2",
            Value::Field(_) => "field",
            Value::Screen => "screen",
        }
    }
}

/// Frame-varying state read by the varying providers.
#[derive(Clone, Debug)]
pub struct State {
    /// Seconds since the first frame.
    pub time: f32,
    pub interaction: Interaction,
}

impl State {
    pub fn new(settings: &Settings) -> Self {
        Self {
            time: 0.0,
            interaction: Interaction::new(settings.activation, settings.idle_timeout),
        }
    }
}

pub trait Provider {
    fn provide(&self, state: &State) -> Value;
}

pub struct Constant(pub Value);

impl Provider for Constant {
    fn provide(&self, _state: &State) -> Value {
        self.0
    }
}

pub struct Varying(pub fn(&State) -> Value);

impl Provider for Varying {
    fn provide(&self, state: &State) -> Value {
        (self.0)(state)
    }
}

pub struct Resource(pub Field);

impl Provider for Resource {
    fn provide(&self, _state: &State) -> Value {
        Value::Field(self.0)
    }
}

/// Maps the names passes refer to onto providers.
#[derive(Default)]
pub struct Vocabulary {
    entries: FxHashMap<String, Rc<dyn Provider>>,
}

impl fmt::Debug for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Vocabulary").field("names", &names).finish()
    }
}

impl Vocabulary {
    /// The full table: every field, the pointer and clock, and the solver constants.
    pub fn new(settings: &Settings) -> Self {
        let mut vocabulary = Self::default();

        for (name, field) in field::field_handles() {
            vocabulary.insert(name, Resource(field));
        }

        vocabulary.insert(
            "mouse",
            Varying(|state| Value::Vec2(state.interaction.forcing())),
        );
        vocabulary.insert(
            "last",
            Varying(|state| Value::Vec2(state.interaction.last_position())),
        );
        vocabulary.insert("time", Varying(|state| Value::Scalar(state.time)));

        vocabulary.insert("timestep", Constant(Value::Scalar(settings.timestep)));
        vocabulary.insert("dissipation", Constant(Value::Scalar(settings.dissipation)));
        vocabulary.insert("texel", Constant(Value::Vec2(settings.texel_size())));
        vocabulary.insert("radius", Constant(Value::Scalar(settings.splat_radius)));
        vocabulary.insert("force", Constant(Value::Scalar(settings.force)));
        vocabulary.insert(SCREEN, Constant(Value::Screen));

        vocabulary
    }

    pub fn insert<P: Provider + 'static>(&mut self, name: &str, provider: P) {
        self.entries.insert(name.to_string(), Rc::new(provider));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Look up `name` on behalf of `pass`.
    pub fn resolve(&self, pass: &str, name: &str) -> Result<Rc<dyn Provider>, Problem> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| Problem::MissingMetadata {
                pass: pass.to_string(),
                name: name.to_string(),
            })
    }

    pub fn query(&self, name: &str, state: &State) -> Option<Value> {
        self.entries.get(name).map(|provider| provider.provide(state))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn setup() -> (Vocabulary, State) {
        let settings = Settings::default();
        (Vocabulary::new(&settings), State::new(&settings))
    }

    #[test]
    fn every_field_is_named() {
        let (vocabulary, state) = setup();
        for (name, field) in field::field_handles() {
            assert_eq!(vocabulary.query(name, &state), Some(Value::Field(field)));
        }
    }

    #[test]
    fn unknown_names_are_missing_metadata() {
        let (vocabulary, _) = setup();
        let problem = vocabulary.resolve("advect", "viscosity").err().unwrap();

        match problem {
            Problem::MissingMetadata { pass, name } => {
                assert_eq!(pass, "advect");
                assert_eq!(name, "viscosity");
            }
            other => panic!("unexpected problem: {}", other),
        }
    }

    #[test]
    fn varying_entries_follow_the_state() {
        let (vocabulary, mut state) = setup();
        let mouse = vocabulary.resolve("input", "mouse").unwrap();
        let time = vocabulary.resolve("final", "time").unwrap();

        assert_eq!(mouse.provide(&state), Value::Vec2([0.0, 0.0]));

        state.interaction.pointer_moved([0.5, 0.5], 0.0);
        state.interaction.pointer_moved([0.6, 0.5], 8.0);
        state.time = 2.5;

        match mouse.provide(&state) {
            Value::Vec2([dx, dy]) => {
                assert_abs_diff_eq!(dx, 0.1, epsilon = 1e-6);
                assert_abs_diff_eq!(dy, 0.0, epsilon = 1e-6);
            }
            other => panic!("unexpected value: {:?}", other),
        }
        assert_eq!(time.provide(&state), Value::Scalar(2.5));
    }

    #[test]
    fn idle_forcing_reads_as_zero() {
        let (vocabulary, mut state) = setup();
        state.interaction.pointer_moved([0.5, 0.5], 0.0);
        state.interaction.pointer_moved([0.6, 0.5], 10.0);
        state.interaction.tick(35.0);

        assert_eq!(
            vocabulary.query("mouse", &state),
            Some(Value::Vec2([0.0, 0.0]))
        );
    }

    #[test]
    fn screen_is_not_a_field() {
        let (vocabulary, state) = setup();
        assert_eq!(vocabulary.query(SCREEN, &state), Some(Value::Screen));
        assert_eq!(Value::Screen.shape(), "screen");
    }

    #[test]
    fn entries_can_be_replaced() {
        let (mut vocabulary, state) = setup();
        vocabulary.insert("force", Constant(Value::Scalar(1.0)));
        assert_eq!(vocabulary.query("force", &state), Some(Value::Scalar(1.0)));
    }
}
