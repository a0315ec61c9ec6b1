use glow::HasContext;
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

pub type Context = Rc<glow::Context>;
type GlDataType = u32;
pub type Result<T> = std::result::Result<T, Problem>;

#[derive(Error, Debug)]
pub enum Problem {
    #[error("Cannot create buffer")]
    CannotCreateBuffer,

    #[error("Cannot create texture")]
    CannotCreateTexture,

    #[error("Cannot create framebuffer")]
    CannotCreateFramebuffer,

    #[error("Cannot create vertex array")]
    CannotCreateVertexArray,

    #[error("Cannot create {0} shader")]
    CannotCreateShader(ShaderStage),

    #[error("Cannot create program")]
    CannotCreateProgram,

    #[error("Cannot compile {stage} shader: {log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("Cannot link program: {0}")]
    Link(String),

    #[error("No pass named `{0}` in the catalog")]
    UnknownPass(String),

    #[error("Pass `{pass}` refers to `{name}`, which is not in the vocabulary")]
    MissingMetadata { pass: String, name: String },

    #[error("Cannot bind a value of shape `{shape}` to `{name}`")]
    UnsupportedUniformType { name: String, shape: &'static str },

    #[error("Texture `{0}` has no sampling slot")]
    Binding(&'static str),

    #[error("Texture `{label}` is already bound to slot {slot}")]
    SlotTaken { label: &'static str, slot: u32 },

    #[error("Ran out of texture units")]
    NoFreeSlot,

    #[error("Pass `{pass}` reads from and writes to `{field}`")]
    ReadWriteHazard { pass: String, field: String },

    #[error("Unexpected data size. Expected: {expected:?}. Actual: {actual:?}")]
    WrongDataSize { expected: usize, actual: usize },

    #[error("Unsupported texture format")]
    UnsupportedTextureFormat,

    #[error("Vertex attribute type is not supported")]
    CannotBindUnsupportedVertexType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn gl_type(&self) -> GlDataType {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

pub struct Buffer {
    context: Context,
    pub id: glow::Buffer,
    pub size: usize,
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.context.delete_buffer(self.id);
        }
    }
}

impl Buffer {
    pub fn from_bytes(
        context: &Context,
        data: &[u8],
        buffer_type: u32,
        usage: u32,
    ) -> Result<Self> {
        let buffer = unsafe {
            let buffer = context
                .create_buffer()
                .map_err(|_| Problem::CannotCreateBuffer)?;

            context.bind_buffer(buffer_type, Some(buffer));
            context.buffer_data_u8_slice(buffer_type, data, usage);
            context.bind_buffer(buffer_type, None);

            buffer
        };

        Ok(Self {
            context: Rc::clone(context),
            id: buffer,
            size: data.len(),
        })
    }

    pub fn from_f32(context: &Context, data: &[f32], buffer_type: u32, usage: u32) -> Result<Self> {
        Self::from_bytes(context, bytemuck::cast_slice(data), buffer_type, usage)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TextureOptions {
    pub mag_filter: GlDataType,
    pub min_filter: GlDataType,
    pub wrap_s: GlDataType,
    pub wrap_t: GlDataType,
    pub format: GlDataType,
}

impl Default for TextureOptions {
    fn default() -> Self {
        TextureOptions {
            mag_filter: glow::LINEAR,
            min_filter: glow::LINEAR,
            wrap_s: glow::CLAMP_TO_EDGE,
            wrap_t: glow::CLAMP_TO_EDGE,
            format: glow::RGBA16F,
        }
    }
}

/// A 2D buffer on the GPU, sampled through a fixed texture unit.
///
/// The unit is assigned once with [`Texture::bind`] and never changes. Passes
/// read a texture by pointing a sampler uniform at that unit.
pub struct Texture {
    context: Context,
    pub id: glow::Texture,
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub options: TextureOptions,
    slot: Option<u32>,
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.context.delete_texture(self.id);
        }
    }
}

impl Texture {
    pub fn new(
        context: &Context,
        label: &'static str,
        width: u32,
        height: u32,
        options: TextureOptions,
    ) -> Result<Self> {
        let texture = unsafe {
            let texture = context
                .create_texture()
                .map_err(|_| Problem::CannotCreateTexture)?;

            context.bind_texture(glow::TEXTURE_2D, Some(texture));
            context.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                options.mag_filter as i32,
            );
            context.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                options.min_filter as i32,
            );
            context.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, options.wrap_s as i32);
            context.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, options.wrap_t as i32);

            texture
        };

        Ok(Self {
            context: Rc::clone(context),
            id: texture,
            label,
            width,
            height,
            options,
            slot: None,
        })
    }

    pub fn slot(&self) -> Option<u32> {
        self.slot
    }

    /// Assign the texture to a texture unit, or reassert the unit it already owns.
    pub fn bind(&mut self, slot: u32) -> Result<()> {
        match self.slot {
            Some(current) if current != slot => {
                return Err(Problem::SlotTaken {
                    label: self.label,
                    slot: current,
                })
            }
            _ => self.slot = Some(slot),
        }

        self.reassert().map(|_| ())
    }

    // Texture uploads bind to whichever unit happens to be active, so every
    // read goes through here to restore the texture's own unit first.
    fn reassert(&self) -> Result<u32> {
        let slot = self.slot.ok_or(Problem::Binding(self.label))?;

        unsafe {
            self.context.active_texture(glow::TEXTURE0 + slot);
            self.context.bind_texture(glow::TEXTURE_2D, Some(self.id));
        }

        Ok(slot)
    }

    pub fn assign_to_uniform(
        &self,
        program: &Program,
        location: Option<&glow::UniformLocation>,
    ) -> Result<()> {
        let slot = self.reassert()?;
        program.set_uniform_at(location, &UniformValue::Texture2D(slot));
        Ok(())
    }

    pub fn with_data<T: bytemuck::Pod>(&self, data: Option<&[T]>) -> Result<()> {
        let TextureFormat {
            internal_format,
            format,
            type_,
            size,
        } = detect_texture_format(self.options.format)?;

        let expected_size = data_len(size, self.width, self.height);
        if let Some(buffer) = data {
            if buffer.len() != expected_size {
                return Err(Problem::WrongDataSize {
                    expected: expected_size,
                    actual: buffer.len(),
                });
            }
        }

        unsafe {
            self.context.bind_texture(glow::TEXTURE_2D, Some(self.id));
            self.context.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal_format as i32,
                self.width as i32,
                self.height as i32,
                0,
                format,
                type_,
                data.map(|buffer| bytemuck::cast_slice(buffer)),
            );
        }

        if self.slot.is_some() {
            self.reassert()?;
        }

        Ok(())
    }

    /// Replace the contents with tightly packed RGBA8 pixels of the same size.
    pub fn populate(&self, pixels: &[u8]) -> Result<()> {
        if self.options.format != glow::RGBA8 {
            return Err(Problem::UnsupportedTextureFormat);
        }

        self.with_data(Some(pixels))
    }
}

/// Redirects draw calls to a texture, or to the visible surface.
pub struct RenderTarget {
    context: Context,
    framebuffer: glow::Framebuffer,
    surface_width: u32,
    surface_height: u32,
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        unsafe {
            self.context.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.context.delete_framebuffer(self.framebuffer);
        }
    }
}

impl RenderTarget {
    pub fn new(context: &Context, surface_width: u32, surface_height: u32) -> Result<Self> {
        let framebuffer = unsafe {
            context
                .create_framebuffer()
                .map_err(|_| Problem::CannotCreateFramebuffer)?
        };

        Ok(Self {
            context: Rc::clone(context),
            framebuffer,
            surface_width,
            surface_height,
        })
    }

    pub fn resize_surface(&mut self, width: u32, height: u32) {
        self.surface_width = width;
        self.surface_height = height;
    }

    pub fn use_as_output(&self, target: Option<&Texture>) {
        unsafe {
            match target {
                Some(texture) => {
                    self.context
                        .bind_framebuffer(glow::FRAMEBUFFER, Some(self.framebuffer));
                    self.context.framebuffer_texture_2d(
                        glow::FRAMEBUFFER,
                        glow::COLOR_ATTACHMENT0,
                        glow::TEXTURE_2D,
                        Some(texture.id),
                        0,
                    );
                    self.context
                        .viewport(0, 0, texture.width as i32, texture.height as i32);
                }

                None => {
                    self.context.bind_framebuffer(glow::FRAMEBUFFER, None);
                    self.context.viewport(
                        0,
                        0,
                        self.surface_width as i32,
                        self.surface_height as i32,
                    );
                }
            }
        }
    }
}

pub struct Program {
    context: Context,
    pub program: glow::Program,
    attributes: FxHashMap<String, AttributeInfo>,
    uniforms: FxHashMap<String, UniformInfo>,
}

impl Drop for Program {
    fn drop(&mut self) {
        unsafe {
            self.context.delete_program(self.program);
        }
    }
}

impl Program {
    pub fn new(context: &Context, shaders: (&str, &str)) -> Result<Self> {
        let vertex_shader = compile_shader(context, ShaderStage::Vertex, shaders.0)?;
        let fragment_shader = match compile_shader(context, ShaderStage::Fragment, shaders.1) {
            Ok(shader) => shader,
            Err(problem) => {
                unsafe { context.delete_shader(vertex_shader) };
                return Err(problem);
            }
        };

        let program = unsafe {
            let program = context
                .create_program()
                .map_err(|_| Problem::CannotCreateProgram)?;
            context.attach_shader(program, vertex_shader);
            context.attach_shader(program, fragment_shader);
            context.link_program(program);

            // The shaders are no longer needed once linked
            context.detach_shader(program, vertex_shader);
            context.detach_shader(program, fragment_shader);
            context.delete_shader(vertex_shader);
            context.delete_shader(fragment_shader);

            if !context.get_program_link_status(program) {
                let log = context.get_program_info_log(program);
                context.delete_program(program);
                return Err(Problem::Link(log));
            }

            program
        };

        let mut attributes = FxHashMap::default();
        unsafe {
            let attribute_count = context.get_active_attributes(program);
            for num in 0..attribute_count {
                if let Some(info) = context.get_active_attribute(program, num) {
                    if let Some(location) = context.get_attrib_location(program, &info.name) {
                        attributes.insert(
                            info.name,
                            AttributeInfo {
                                location,
                                enabled: std::cell::Cell::new(false),
                            },
                        );
                    }
                }
            }
        }

        let mut uniforms = FxHashMap::default();
        unsafe {
            let uniform_count = context.get_active_uniforms(program);
            for num in 0..uniform_count {
                if let Some(info) = context.get_active_uniform(program, num) {
                    if let Some(location) = context.get_uniform_location(program, &info.name) {
                        uniforms.insert(
                            info.name,
                            UniformInfo {
                                type_: info.utype,
                                location,
                            },
                        );
                    }
                }
            }
        }

        Ok(Program {
            context: Rc::clone(context),
            program,
            attributes,
            uniforms,
        })
    }

    pub fn use_program(&self) {
        unsafe {
            self.context.use_program(Some(self.program));
        }
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformInfo> {
        self.uniforms.get(name)
    }

    pub fn uniform_location(&self, name: &str) -> Option<glow::UniformLocation> {
        self.uniforms.get(name).map(|info| info.location.clone())
    }

    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).map(|info| info.location)
    }

    /// Upload a value to an already active program.
    pub fn set_uniform_at(&self, location: Option<&glow::UniformLocation>, value: &UniformValue) {
        let context = &self.context;

        unsafe {
            match *value {
                UniformValue::Float(value) => context.uniform_1_f32(location, value),

                UniformValue::Vec2(value) => context.uniform_2_f32(location, value[0], value[1]),

                UniformValue::Vec4(value) => {
                    context.uniform_4_f32(location, value[0], value[1], value[2], value[3])
                }

                UniformValue::Texture2D(slot) => context.uniform_1_i32(location, slot as i32),
            }
        }
    }

    // Enabling the attribute array only happens once per program.
    fn enable_attribute(&self, name: &str) -> Option<u32> {
        let info = self.attributes.get(name)?;
        if !info.enabled.get() {
            unsafe {
                self.context.enable_vertex_attrib_array(info.location);
            }
            info.enabled.set(true);
        }
        Some(info.location)
    }
}

struct AttributeInfo {
    location: u32,
    enabled: std::cell::Cell<bool>,
}

#[derive(Clone, Debug)]
pub struct UniformInfo {
    pub type_: u32,
    pub location: glow::UniformLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
    Texture2D(u32),
}

pub fn compile_shader(context: &Context, stage: ShaderStage, source: &str) -> Result<glow::Shader> {
    unsafe {
        let shader = context
            .create_shader(stage.gl_type())
            .map_err(|_| Problem::CannotCreateShader(stage))?;
        context.shader_source(shader, source);
        context.compile_shader(shader);

        if context.get_shader_compile_status(shader) {
            Ok(shader)
        } else {
            let log = context.get_shader_info_log(shader);
            context.delete_shader(shader);
            Err(Problem::Compile { stage, log })
        }
    }
}

#[derive(Default)]
pub struct VertexBufferLayout {
    pub name: &'static str,
    pub size: u32,
    pub type_: u32,
    pub stride: u32,
    pub offset: u32,
}

struct TextureFormat {
    internal_format: GlDataType,
    format: GlDataType,
    type_: GlDataType,
    size: usize,
}

/// Number of components in a `width` by `height` image with `components`
/// per texel.
pub fn data_len(components: usize, width: u32, height: u32) -> usize {
    components * width as usize * height as usize
}

// https://www.khronos.org/registry/webgl/specs/latest/2.0/#TEXTURE_TYPES_FORMATS_FROM_DOM_ELEMENTS_TABLE
fn detect_texture_format(internal_format: GlDataType) -> Result<TextureFormat> {
    match internal_format {
        glow::R16F => Ok(TextureFormat {
            internal_format,
            format: glow::RED,
            type_: glow::HALF_FLOAT,
            size: 1,
        }),
        glow::RG16F => Ok(TextureFormat {
            internal_format,
            format: glow::RG,
            type_: glow::HALF_FLOAT,
            size: 2,
        }),
        glow::RGBA16F => Ok(TextureFormat {
            internal_format,
            format: glow::RGBA,
            type_: glow::HALF_FLOAT,
            size: 4,
        }),
        glow::RGBA32F => Ok(TextureFormat {
            internal_format,
            format: glow::RGBA,
            type_: glow::FLOAT,
            size: 4,
        }),
        glow::RGBA8 => Ok(TextureFormat {
            internal_format,
            format: glow::RGBA,
            type_: glow::UNSIGNED_BYTE,
            size: 4,
        }),
        _ => Err(Problem::UnsupportedTextureFormat),
    }
}

pub struct VertexArrayObject {
    context: Context,
    pub id: glow::VertexArray,
}

impl Drop for VertexArrayObject {
    fn drop(&mut self) {
        unsafe {
            self.context.delete_vertex_array(self.id);
        }
    }
}

impl VertexArrayObject {
    pub fn empty(context: &Context) -> Result<Self> {
        let id = unsafe {
            context
                .create_vertex_array()
                .map_err(|_| Problem::CannotCreateVertexArray)?
        };

        Ok(Self {
            id,
            context: Rc::clone(context),
        })
    }

    pub fn bind(&self) {
        unsafe {
            self.context.bind_vertex_array(Some(self.id));
        }
    }
}

pub fn bind_attributes(
    context: &Context,
    program: &Program,
    buffer: &Buffer,
    buffer_layout: &VertexBufferLayout,
) -> Result<()> {
    unsafe {
        context.bind_buffer(glow::ARRAY_BUFFER, Some(buffer.id));

        if let Some(location) = program.enable_attribute(buffer_layout.name) {
            match buffer_layout.type_ {
                glow::FLOAT => context.vertex_attrib_pointer_f32(
                    location,
                    buffer_layout.size as i32,
                    buffer_layout.type_,
                    false,
                    buffer_layout.stride as i32,
                    buffer_layout.offset as i32,
                ),
                _ => return Err(Problem::CannotBindUnsupportedVertexType),
            };
        }

        context.bind_buffer(glow::ARRAY_BUFFER, None);
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn half_float_fields_have_four_channels() {
        let format = detect_texture_format(glow::RGBA16F).unwrap();
        assert_eq!(format.size, 4);
        assert_eq!(format.type_, glow::HALF_FLOAT);
        assert_eq!(format.format, glow::RGBA);
    }

    #[test]
    fn images_upload_as_bytes() {
        let format = detect_texture_format(glow::RGBA8).unwrap();
        assert_eq!(format.type_, glow::UNSIGNED_BYTE);
        assert_eq!(format.internal_format, glow::RGBA8);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn data_length_does_not_wrap() {
        assert_eq!(data_len(4, 512, 512), 1_048_576);
        assert_eq!(data_len(4, 65536, 65536), 4 * 65536 * 65536);
        assert_eq!(data_len(1, 3, 0), 0);
    }

    #[test]
    fn rejects_unknown_formats() {
        assert!(matches!(
            detect_texture_format(glow::DEPTH_COMPONENT24),
            Err(Problem::UnsupportedTextureFormat)
        ));
    }

    #[test]
    fn compile_errors_name_the_failing_stage() {
        let problem = Problem::Compile {
            stage: ShaderStage::Fragment,
            log: "0:3: 'colour' : undeclared identifier".to_string(),
        };
        assert_eq!(
            problem.to_string(),
            "Cannot compile fragment shader: 0:3: 'colour' : undeclared identifier"
        );
    }
}
