use crate::driver::FrameDriver;
use crate::field::IMAGE_FIELD;
use crate::pipeline::Pipeline;
use crate::render;
use crate::settings::{self, Settings};
use crate::source::ImageSource;
use crate::topology::Topology;
use crate::vocabulary::{State, Vocabulary};

use glow::HasContext;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Problem {
    #[error("Cannot read settings: {0}")]
    ReadSettings(#[from] serde_json::Error),

    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] settings::Invalid),

    #[error("Failed to decode image: {0}")]
    DecodeImage(#[from] image::ImageError),

    #[error("The image loader stopped before delivering")]
    ImageWorkerGone,

    #[error(transparent)]
    Render(#[from] render::Problem),
}

/// The whole simulation: fields, passes and the per-frame schedule.
pub struct Stokes {
    settings: Settings,
    state: State,
    topology: Topology,
    driver: FrameDriver,
    pipeline: Pipeline,
    image: Option<ImageSource>,

    // Host timestamp of the first frame, in milliseconds.
    started_at: Option<f64>,
}

impl Stokes {
    pub fn new(
        context: &render::Context,
        width: u32,
        height: u32,
        settings: &Settings,
    ) -> Result<Self, Problem> {
        log::info!("🌊 Initialising Stokes");

        settings.validate()?;
        let max_texture_size = unsafe { context.get_parameter_i32(glow::MAX_TEXTURE_SIZE) };
        if max_texture_size > 0 {
            settings.validate_fluid_size(max_texture_size as u32)?;
        }

        unsafe {
            context.disable(glow::BLEND);
            context.disable(glow::DEPTH_TEST);
        }

        let vocabulary = Vocabulary::new(settings);
        log::debug!("{:?}", vocabulary);

        let topology = Topology::new(settings);
        let state = State::new(settings);
        let pipeline = Pipeline::new(
            context,
            settings,
            &vocabulary,
            &topology,
            &state,
            width,
            height,
        )?;

        pipeline.seed(&topology, &state)?;

        Ok(Self {
            settings: settings.clone(),
            state,
            topology,
            driver: FrameDriver::new(settings.relaxation),
            pipeline,
            image: None,
            started_at: None,
        })
    }

    /// Draw one frame. `timestamp` is the host clock in milliseconds.
    pub fn animate(&mut self, timestamp: f64) -> Result<(), Problem> {
        let started_at = *self.started_at.get_or_insert(timestamp);
        self.state.time = (0.001 * (timestamp - started_at)) as f32;
        self.state.interaction.tick(timestamp);

        self.receive_image()?;

        let plan = self.driver.plan(self.state.interaction.is_active());
        let steps = self.topology.schedule(&plan);
        self.pipeline.execute(&steps, &self.state)?;

        self.driver.finish(timestamp);
        Ok(())
    }

    /// `position` is normalized to `[0, 1]²` with the origin bottom-left.
    pub fn pointer_moved(&mut self, position: [f32; 2], timestamp: f64) {
        self.state.interaction.pointer_moved(position, timestamp);
    }

    pub fn activate(&mut self) {
        self.state.interaction.activate();
    }

    pub fn is_active(&self) -> bool {
        self.state.interaction.is_active()
    }

    pub fn fps(&self) -> f64 {
        self.driver.fps()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.pipeline.resize(width, height);
    }

    /// Decode an image in the background. It replaces the seed image once it
    /// arrives; until then the previous contents stay.
    pub fn load_image(&mut self, path: PathBuf) {
        log::info!("Loading {}", path.display());
        self.image = Some(ImageSource::spawn(path, self.settings.fluid_size));
    }

    fn receive_image(&mut self) -> Result<(), Problem> {
        let Some(source) = self.image.as_mut() else {
            return Ok(());
        };
        let Some(delivery) = source.try_receive() else {
            return Ok(());
        };
        let path = source.path().to_path_buf();
        self.image = None;

        match delivery {
            Ok(pixels) => {
                let fields = self.pipeline.fields();
                if let Some(field) = fields.lookup(IMAGE_FIELD) {
                    fields.populate(field, &pixels)?;
                    self.pipeline.reseed(&self.topology, &self.state)?;
                    log::debug!("Seeded from {}", path.display());
                }
            }
            Err(problem) => {
                log::warn!("Cannot load {}: {}", path.display(), problem);
            }
        }

        Ok(())
    }
}
