use stokes::{Settings, Stokes};

use glutin::config::{ConfigTemplateBuilder, GlConfig};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentGlContext, PossiblyCurrentContext,
    Version,
};
use glutin::display::{Display, DisplayApiPreference, GlDisplay};
use glutin::surface::{GlSurface, Surface, SwapInterval, WindowSurface};
use glutin_winit::GlWindow;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawWindowHandle};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::event::{ElementState, TouchPhase, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use std::error::Error;
use std::ffi::CString;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;
use std::{fs, ptr};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => read_settings(Path::new(&path))?,
        None => Settings::default(),
    };
    let image = args.next().map(PathBuf::from);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(settings, image);
    event_loop.run_app(&mut app)?;

    match app.failure {
        Some(problem) => Err(problem),
        None => Ok(()),
    }
}

fn read_settings(path: &Path) -> Result<Settings, Box<dyn Error>> {
    let source = fs::read_to_string(path)?;
    let settings = Settings::from_json(&source)?;
    log::info!("Read settings from {}", path.display());
    Ok(settings)
}

// Milliseconds between frame rate reports.
const REPORT_INTERVAL: f64 = 1000.0;

// Fields drop in order: the simulation's GL objects go before the context.
struct Renderer {
    stokes: Stokes,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    window: Window,
    status: Status,
}

/// What the host logs about the running simulation.
#[derive(Debug, Default)]
struct Status {
    last_report: Option<f64>,
    active: bool,
}

#[derive(Debug, PartialEq)]
struct Report {
    /// Set when the simulation switched between idle and active.
    activity: Option<bool>,
    fps_due: bool,
}

impl Status {
    fn observe(&mut self, timestamp: f64, active: bool) -> Report {
        let activity = (active != self.active).then_some(active);
        self.active = active;

        let fps_due = match self.last_report {
            Some(last) => timestamp - last >= REPORT_INTERVAL,
            None => true,
        };
        if fps_due {
            self.last_report = Some(timestamp);
        }

        Report { activity, fps_due }
    }
}

impl Renderer {
    fn report(&mut self, timestamp: f64) {
        let report = self.status.observe(timestamp, self.stokes.is_active());
        match report.activity {
            Some(true) => log::info!("Simulation active"),
            Some(false) => log::info!("Simulation idle"),
            None => (),
        }
        if report.fps_due {
            log::debug!("{:.1} fps", self.stokes.fps());
        }
    }
}

struct App {
    settings: Settings,
    image: Option<PathBuf>,
    start: Instant,
    renderer: Option<Renderer>,
    failure: Option<Box<dyn Error>>,
}

impl App {
    fn new(settings: Settings, image: Option<PathBuf>) -> Self {
        Self {
            settings,
            image,
            start: Instant::now(),
            renderer: None,
            failure: None,
        }
    }

    fn timestamp(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, problem: Box<dyn Error>) {
        log::error!("{}", problem);
        self.failure = Some(problem);
        event_loop.exit();
    }

    fn create_renderer(&self, event_loop: &ActiveEventLoop) -> Result<Renderer, Box<dyn Error>> {
        let window_attributes = Window::default_attributes()
            .with_title("Stokes")
            .with_inner_size(LogicalSize::new(1024.0, 1024.0));

        let window = event_loop.create_window(window_attributes)?;
        let raw_window_handle = window.window_handle()?.as_raw();

        let gl_display = unsafe {
            Display::new(
                event_loop.display_handle()?.as_raw(),
                display_preference(raw_window_handle),
            )?
        };
        let template = ConfigTemplateBuilder::new()
            .compatible_with_native_window(raw_window_handle)
            .build();
        let configs = unsafe { gl_display.find_configs(template)? };
        let gl_config = fewest_samples(configs, |config| config.num_samples())
            .ok_or("The display offers no GL config for this window")?;

        let context_attributes = ContextAttributesBuilder::new()
            .with_profile(GlProfile::Core)
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .build(Some(raw_window_handle));

        let not_current = unsafe { gl_display.create_context(&gl_config, &context_attributes)? };
        let surface_attributes = window.build_surface_attributes(Default::default())?;
        let surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attributes)? };
        let context = not_current.make_current(&surface)?;

        if let Err(problem) = surface.set_swap_interval(&context, SwapInterval::Wait(NonZeroU32::MIN)) {
            log::warn!("Cannot enable vsync: {}", problem);
        }

        let gl = unsafe {
            glow::Context::from_loader_function(|symbol| match CString::new(symbol) {
                Ok(symbol) => gl_display.get_proc_address(&symbol),
                Err(_) => ptr::null(),
            })
        };

        let size = window.inner_size();
        let mut stokes = Stokes::new(&Rc::new(gl), size.width, size.height, &self.settings)?;
        if let Some(path) = &self.image {
            stokes.load_image(path.clone());
        }

        Ok(Renderer {
            stokes,
            surface,
            context,
            window,
            status: Status::default(),
        })
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        match self.create_renderer(event_loop) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(problem) => self.fail(event_loop, problem),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let timestamp = self.timestamp();
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                if let (Some(width), Some(height)) =
                    (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
                {
                    renderer.surface.resize(&renderer.context, width, height);
                    renderer.stokes.resize(size.width, size.height);
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                let position = normalize(&renderer.window, position);
                renderer.stokes.pointer_moved(position, timestamp);
            }

            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                ..
            } => renderer.stokes.activate(),

            WindowEvent::Touch(touch) => {
                let position = normalize(&renderer.window, touch.location);
                renderer.stokes.pointer_moved(position, timestamp);
                if touch.phase == TouchPhase::Started {
                    renderer.stokes.activate();
                }
            }

            WindowEvent::DroppedFile(path) => renderer.stokes.load_image(path),

            WindowEvent::RedrawRequested => {
                if let Err(problem) = renderer.stokes.animate(timestamp) {
                    self.fail(event_loop, problem.into());
                    return;
                }
                if let Err(problem) = renderer.surface.swap_buffers(&renderer.context) {
                    self.fail(event_loop, problem.into());
                    return;
                }
                renderer.report(timestamp);
            }

            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = &self.renderer {
            renderer.window.request_redraw();
        }
    }
}

/// Window pixels to `[0, 1]²`, origin bottom-left.
fn normalize(window: &Window, position: PhysicalPosition<f64>) -> [f32; 2] {
    let size = window.inner_size();
    let width = f64::from(size.width.max(1));
    let height = f64::from(size.height.max(1));
    [
        (position.x / width) as f32,
        (1.0 - position.y / height) as f32,
    ]
}

/// The first candidate with the fewest samples per pixel.
fn fewest_samples<T>(candidates: impl Iterator<Item = T>, samples: impl Fn(&T) -> u8) -> Option<T> {
    candidates.min_by_key(|candidate| samples(candidate))
}

#[cfg(target_os = "windows")]
fn display_preference(window: RawWindowHandle) -> DisplayApiPreference {
    DisplayApiPreference::Wgl(Some(window))
}

#[cfg(target_os = "macos")]
fn display_preference(_window: RawWindowHandle) -> DisplayApiPreference {
    DisplayApiPreference::Cgl
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn display_preference(_window: RawWindowHandle) -> DisplayApiPreference {
    DisplayApiPreference::Egl
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prefers_the_fewest_samples() {
        let configs = [(4, 'a'), (0, 'b'), (8, 'c'), (0, 'd')];
        assert_eq!(
            fewest_samples(configs.into_iter(), |config| config.0),
            Some((0, 'b'))
        );
    }

    #[test]
    fn no_configs_is_not_a_panic() {
        assert_eq!(fewest_samples(std::iter::empty::<u8>(), |samples| *samples), None);
    }

    #[test]
    fn reports_fps_once_per_interval() {
        let mut status = Status::default();
        assert!(status.observe(0.0, false).fps_due);
        assert!(!status.observe(16.0, false).fps_due);
        assert!(!status.observe(999.0, false).fps_due);
        assert!(status.observe(1000.0, false).fps_due);
        assert!(!status.observe(1500.0, false).fps_due);
    }

    #[test]
    fn reports_activity_changes_once() {
        let mut status = Status::default();
        assert_eq!(status.observe(0.0, false).activity, None);
        assert_eq!(status.observe(16.0, true).activity, Some(true));
        assert_eq!(status.observe(32.0, true).activity, None);
        assert_eq!(status.observe(58.0, false).activity, Some(false));
    }
}
