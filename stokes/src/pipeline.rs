use crate::catalog;
use crate::data;
use crate::field::{Field, Fields};
use crate::pass::{self, Pass};
use crate::render::{
    self, Buffer, Context, Problem, Program, RenderTarget, UniformValue, VertexArrayObject,
};
use crate::settings::Settings;
use crate::topology::{Step, Topology};
use crate::vocabulary::{State, Vocabulary};

use glow::HasContext;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Owns the fields and every compiled pass, and runs scheduled steps.
pub struct Pipeline {
    context: Context,
    fields: Fields,
    passes: FxHashMap<&'static str, Pass>,

    stamp: Program,
    quad: Buffer,
    boundary: Buffer,
    vertex_array: VertexArrayObject,
    target: RenderTarget,

    rest_color: [f32; 4],
    boundary_color: [f32; 4],
}

impl Pipeline {
    pub fn new(
        context: &Context,
        settings: &Settings,
        vocabulary: &Vocabulary,
        topology: &Topology,
        state: &State,
        surface_width: u32,
        surface_height: u32,
    ) -> render::Result<Self> {
        topology.validate(vocabulary, state)?;

        let fields = Fields::new(context, settings.fluid_size)?;

        let mut passes = FxHashMap::default();
        for name in topology.passes() {
            if passes.contains_key(name) {
                continue;
            }
            let spec = catalog::lookup(name).ok_or_else(|| Problem::UnknownPass(name.to_string()))?;
            passes.insert(name, Pass::new(context, spec, vocabulary)?);
        }
        log::debug!("Compiled {} passes", passes.len());

        let stamp = Program::new(context, (catalog::VERTEX, catalog::STAMP))?;

        let quad = Buffer::from_f32(
            context,
            &data::QUAD_VERTICES,
            glow::ARRAY_BUFFER,
            glow::STATIC_DRAW,
        )?;
        let inset = data::boundary_inset(settings.boundary_line_width, settings.fluid_size);
        let boundary = Buffer::from_f32(
            context,
            &data::boundary_ring(inset),
            glow::ARRAY_BUFFER,
            glow::STATIC_DRAW,
        )?;

        let vertex_array = VertexArrayObject::empty(context)?;
        let target = RenderTarget::new(context, surface_width, surface_height)?;

        Ok(Self {
            context: Rc::clone(context),
            fields,
            passes,
            stamp,
            quad,
            boundary,
            vertex_array,
            target,
            rest_color: settings.rest_color,
            boundary_color: settings.boundary_color,
        })
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.target.resize_surface(width, height);
    }

    /// Fill velocity and pressure with the rest colour, then seed the carrier.
    pub fn seed(&self, topology: &Topology, state: &State) -> render::Result<()> {
        self.vertex_array.bind();

        for name in topology.boundaries() {
            let field = self.field(name)?;
            self.stamp(field, &self.quad, self.rest_color)?;
        }

        self.reseed(topology, state)
    }

    /// Copy the seed image into the carrier, leaving the flow untouched.
    pub fn reseed(&self, topology: &Topology, state: &State) -> render::Result<()> {
        self.vertex_array.bind();
        self.run(topology.seed(), state)
    }

    pub fn execute(&self, steps: &[Step], state: &State) -> render::Result<()> {
        self.vertex_array.bind();

        for step in steps {
            match *step {
                Step::Pass(name) => self.run(name, state)?,
                Step::Boundary(name) => {
                    let field = self.field(name)?;
                    self.stamp(field, &self.boundary, self.boundary_color)?;
                }
            }
        }

        Ok(())
    }

    fn run(&self, name: &str, state: &State) -> render::Result<()> {
        let pass = self
            .passes
            .get(name)
            .ok_or_else(|| Problem::UnknownPass(name.to_string()))?;
        pass.draw(&self.target, &self.fields, state, &self.quad)
    }

    fn field(&self, name: &str) -> render::Result<Field> {
        self.fields.lookup(name).ok_or_else(|| Problem::MissingMetadata {
            pass: "stamp".to_string(),
            name: name.to_string(),
        })
    }

    // Stamps sample nothing, so they can write any field directly.
    fn stamp(&self, field: Field, geometry: &Buffer, color: [f32; 4]) -> render::Result<()> {
        self.stamp.use_program();
        render::bind_attributes(&self.context, &self.stamp, geometry, &pass::position_layout())?;
        self.stamp
            .set_uniform_at(self.stamp.uniform_location("c").as_ref(), &UniformValue::Vec4(color));

        self.target.use_as_output(Some(self.fields.texture(field)));

        let count = geometry.size / (data::VERTEX_COMPONENTS * std::mem::size_of::<f32>());
        unsafe {
            self.context.draw_arrays(glow::TRIANGLE_STRIP, 0, count as i32);
        }

        Ok(())
    }
}
