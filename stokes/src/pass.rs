use crate::catalog::{self, PassSpec};
use crate::data::VERTEX_COMPONENTS;
use crate::field::{self, Field, Fields};
use crate::render::{
    self, Buffer, Context, Problem, Program, RenderTarget, UniformValue, VertexBufferLayout,
};
use crate::vocabulary::{Provider, State, Value, Vocabulary};

use glow::HasContext;
use std::rc::Rc;

/// Name of the position attribute in the shared vertex shader.
pub const POSITION: &str = "v";

pub fn position_layout() -> VertexBufferLayout {
    VertexBufferLayout {
        name: POSITION,
        size: VERTEX_COMPONENTS as u32,
        type_: glow::FLOAT,
        stride: 0,
        offset: 0,
    }
}

/// How a resolved value reaches its uniform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Upload {
    Float(f32),
    Vec2([f32; 2]),
    Sampler(Field),
    /// The compiler optimized the uniform away.
    Skip,
}

/// Match a value against the GLSL type of the uniform it feeds. `None` means
/// the uniform is not active in the linked program.
pub fn bind_value(name: &str, value: Value, uniform_type: Option<u32>) -> render::Result<Upload> {
    let unsupported = |value: Value| Problem::UnsupportedUniformType {
        name: name.to_string(),
        shape: value.shape(),
    };

    match (value, uniform_type) {
        (Value::Screen, _) => Err(unsupported(value)),
        (_, None) => Ok(Upload::Skip),
        (Value::Scalar(scalar), Some(glow::FLOAT)) => Ok(Upload::Float(scalar)),
        (Value::Vec2(vector), Some(glow::FLOAT_VEC2)) => Ok(Upload::Vec2(vector)),
        (Value::Field(field), Some(glow::SAMPLER_2D)) => Ok(Upload::Sampler(field)),
        (value, Some(_)) => Err(unsupported(value)),
    }
}

/// Where a pass draws. `None` is the visible surface.
pub fn output_target(name: &str, value: Value) -> render::Result<Option<Field>> {
    match value {
        Value::Field(field) => Ok(Some(field)),
        Value::Screen => Ok(None),
        other => Err(Problem::UnsupportedUniformType {
            name: name.to_string(),
            shape: other.shape(),
        }),
    }
}

/// Refuse to sample the field being drawn into.
pub fn check_hazard(pass: &str, output: Option<Field>, input: Value) -> render::Result<()> {
    match (output, input) {
        (Some(output), Value::Field(input)) if output == input => Err(Problem::ReadWriteHazard {
            pass: pass.to_string(),
            field: field::field_name(output).to_string(),
        }),
        _ => Ok(()),
    }
}

struct Input {
    name: &'static str,
    location: Option<glow::UniformLocation>,
    uniform_type: Option<u32>,
    provider: Rc<dyn Provider>,
}

/// One program and its fixed wiring to the vocabulary.
pub struct Pass {
    context: Context,
    pub name: &'static str,
    program: Program,
    inputs: Vec<Input>,
    output_name: &'static str,
    output: Rc<dyn Provider>,
}

impl Pass {
    pub fn new(context: &Context, spec: &PassSpec, vocabulary: &Vocabulary) -> render::Result<Self> {
        let program = Program::new(context, (catalog::VERTEX, spec.fragment))?;
        if program.attribute_location(POSITION).is_none() {
            log::debug!("Pass `{}` does not read `{}`", spec.name, POSITION);
        }

        let mut inputs = Vec::with_capacity(spec.inputs.len());
        for &name in spec.inputs {
            let provider = vocabulary.resolve(spec.name, name)?;
            let uniform = program.uniform(name);
            if uniform.is_none() {
                log::debug!("Pass `{}` does not use `{}`", spec.name, name);
            }

            inputs.push(Input {
                name,
                location: uniform.map(|info| info.location.clone()),
                uniform_type: uniform.map(|info| info.type_),
                provider,
            });
        }

        let output = vocabulary.resolve(spec.name, spec.output)?;

        Ok(Self {
            context: Rc::clone(context),
            name: spec.name,
            program,
            inputs,
            output_name: spec.output,
            output,
        })
    }

    /// Resolve every input and the output against the current state, then
    /// draw the quad into the output.
    pub fn draw(
        &self,
        target: &RenderTarget,
        fields: &Fields,
        state: &State,
        quad: &Buffer,
    ) -> render::Result<()> {
        let output = output_target(self.output_name, self.output.provide(state))?;

        self.program.use_program();
        render::bind_attributes(&self.context, &self.program, quad, &position_layout())?;

        for input in &self.inputs {
            let value = input.provider.provide(state);
            check_hazard(self.name, output, value)?;

            let location = input.location.as_ref();
            match bind_value(input.name, value, input.uniform_type)? {
                Upload::Float(scalar) => self
                    .program
                    .set_uniform_at(location, &UniformValue::Float(scalar)),
                Upload::Vec2(vector) => self
                    .program
                    .set_uniform_at(location, &UniformValue::Vec2(vector)),
                Upload::Sampler(field) => fields
                    .texture(field)
                    .assign_to_uniform(&self.program, location)?,
                Upload::Skip => (),
            }
        }

        target.use_as_output(output.map(|field| fields.texture(field)));

        let count = quad.size / (VERTEX_COMPONENTS * std::mem::size_of::<f32>());
        unsafe {
            self.context.draw_arrays(glow::TRIANGLE_STRIP, 0, count as i32);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn field(name: &str) -> Field {
        field::field_handles()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, field)| field)
            .unwrap()
    }

    #[test]
    fn dispatches_on_shape() {
        assert_eq!(
            bind_value("timestep", Value::Scalar(0.5), Some(glow::FLOAT)).unwrap(),
            Upload::Float(0.5)
        );
        assert_eq!(
            bind_value("mouse", Value::Vec2([0.1, 0.0]), Some(glow::FLOAT_VEC2)).unwrap(),
            Upload::Vec2([0.1, 0.0])
        );
        assert_eq!(
            bind_value("velocity", Value::Field(field("velocity")), Some(glow::SAMPLER_2D)).unwrap(),
            Upload::Sampler(field("velocity"))
        );
    }

    #[test]
    fn rejects_mismatched_shapes() {
        match bind_value("texel", Value::Scalar(1.0), Some(glow::FLOAT_VEC2)) {
            Err(Problem::UnsupportedUniformType { name, shape }) => {
                assert_eq!(name, "texel");
                assert_eq!(shape, "scalar");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let jacobi = catalog::lookup("jacobi").unwrap();
        let declared = catalog::declared_type(jacobi.fragment, "texel");
        assert!(bind_value("texel", Value::Scalar(1.0), declared).is_err());
        assert!(bind_value("pressure", Value::Vec2([0.0, 0.0]), Some(glow::SAMPLER_2D)).is_err());
        assert!(bind_value("force", Value::Field(field("scratch")), Some(glow::FLOAT)).is_err());
    }

    #[test]
    fn the_screen_is_never_an_input() {
        assert!(matches!(
            bind_value("screen", Value::Screen, Some(glow::SAMPLER_2D)),
            Err(Problem::UnsupportedUniformType { shape: "screen", .. })
        ));
        assert!(bind_value("screen", Value::Screen, None).is_err());
    }

    #[test]
    fn inactive_uniforms_upload_nothing() {
        assert_eq!(
            bind_value("time", Value::Scalar(3.0), None).unwrap(),
            Upload::Skip
        );
    }

    #[test]
    fn outputs_are_fields_or_the_screen() {
        assert_eq!(
            output_target("carrier", Value::Field(field("carrier"))).unwrap(),
            Some(field("carrier"))
        );
        assert_eq!(output_target("screen", Value::Screen).unwrap(), None);
        assert!(output_target("time", Value::Scalar(0.0)).is_err());
    }

    #[test]
    fn sampling_the_output_is_a_hazard() {
        let scratch = field("scratch");

        match check_hazard("jacobi", Some(scratch), Value::Field(scratch)) {
            Err(Problem::ReadWriteHazard { pass, field }) => {
                assert_eq!(pass, "jacobi");
                assert_eq!(field, "scratch");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(check_hazard("jacobi", Some(scratch), Value::Field(field("pressure"))).is_ok());
        assert!(check_hazard("final", None, Value::Field(scratch)).is_ok());
        assert!(check_hazard("input", Some(scratch), Value::Vec2([0.0, 0.0])).is_ok());
    }

    #[test]
    fn catalog_wiring_binds_cleanly() {
        let settings = crate::settings::Settings::rich();
        let vocabulary = Vocabulary::new(&settings);
        let state = State::new(&settings);

        for spec in catalog::PASSES.iter() {
            let output = vocabulary.resolve(spec.name, spec.output).unwrap();
            let output = output_target(spec.output, output.provide(&state)).unwrap();

            for name in spec.inputs {
                let value = vocabulary.query(name, &state).unwrap();
                check_hazard(spec.name, output, value).unwrap();

                let declared = catalog::declared_type(spec.fragment, name);
                assert!(declared.is_some(), "`{}` does not declare `{}`", spec.name, name);
                if let Err(problem) = bind_value(name, value, declared) {
                    panic!("`{}`: {}", spec.name, problem);
                }
            }
        }
    }
}
