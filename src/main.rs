//! Vibescope - An audio-reactive layered visualizer
//!
//! Sound becomes motion: particles drift with the energy, a fractal tree
//! grows with the treble, and loud moments burst into shockwaves and
//! lightning across a spinning kaleidoscope.

use std::error::Error;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

use vibescope::audio::{open_source, FrameSource};
use vibescope::cli::Args;
use vibescope::clock::FrameClock;
use vibescope::error::SinkError;
use vibescope::params::{ExportConfig, RenderConfig};
use vibescope::pipeline::{info_text, run_headless, ControlFlags, PipelineState};
use vibescope::present::Presenter;
use vibescope::sink::{FrameSink, PngSequenceSink};

const TITLE: &str = "Vibescope";

/// Main application state
struct App {
    // Window and presentation
    window: Option<Arc<Window>>,
    presenter: Option<Presenter>,
    title: String,

    // Frame pipeline
    pipeline: PipelineState,
    source: Box<dyn FrameSource>,
    controls: ControlFlags,

    // Configuration
    render_config: RenderConfig,

    // Time tracking
    clock: FrameClock,

    /// Fatal setup error, returned from `main` once the loop exits
    failure: Option<Box<dyn Error>>,
}

impl App {
    fn new(
        pipeline: PipelineState,
        source: Box<dyn FrameSource>,
        controls: ControlFlags,
        render_config: RenderConfig,
    ) -> Self {
        let clock = FrameClock::new(render_config.target_fps, Instant::now());
        Self {
            window: None,
            presenter: None,
            title: String::new(),
            pipeline,
            source,
            controls,
            render_config,
            clock,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: Box<dyn Error>) {
        error!("{}", err);
        self.failure = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.clock.is_due(Instant::now()) {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.clock.next_deadline()));
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        // Create window
        let window_attributes = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        // Initialize presentation (no display means nothing to fall back to)
        let presenter = match pollster::block_on(Presenter::new(Arc::clone(&window))) {
            Ok(presenter) => presenter,
            Err(e) => return self.fail(event_loop, e.into()),
        };

        let size = window.inner_size();
        if size.width > 0 && size.height > 0 {
            let _ = self.pipeline.resize(size.width, size.height);
        }

        println!("\nVibescope is running!");
        println!("ESC quit | F fullscreen | SPACE pause | C crazy | X extra crazy | I info | R reset\n");

        self.window = Some(window);
        self.presenter = Some(presenter);
        self.clock = FrameClock::new(self.render_config.target_fps, Instant::now());
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, code),
            WindowEvent::Resized(size) => {
                if size.width == 0 || size.height == 0 {
                    return; // Minimized
                }
                // On failure the previous layers keep rendering
                let _ = self.pipeline.resize(size.width, size.height);
                if let Some(presenter) = &mut self.presenter {
                    presenter.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                self.render_frame(event_loop);
            }
            _ => {}
        }
    }
}

impl App {
    fn handle_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode) {
        let on_off = |flag: bool| if flag { "ON" } else { "OFF" };
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::KeyF => {
                if let Some(window) = &self.window {
                    let fullscreen = match window.fullscreen() {
                        Some(_) => None,
                        None => Some(Fullscreen::Borderless(None)),
                    };
                    info!("Fullscreen: {}", on_off(fullscreen.is_some()));
                    window.set_fullscreen(fullscreen);
                }
            }
            KeyCode::Space => {
                self.controls.paused = !self.controls.paused;
                info!("Paused: {}", on_off(self.controls.paused));
            }
            KeyCode::KeyC => {
                self.controls.crazy = !self.controls.crazy;
                info!("Crazy mode: {}", on_off(self.controls.crazy));
            }
            KeyCode::KeyX => {
                self.controls.extra_crazy = !self.controls.extra_crazy;
                info!("Extra crazy mode: {}", on_off(self.controls.extra_crazy));
            }
            KeyCode::KeyI => {
                self.controls.show_info = !self.controls.show_info;
            }
            KeyCode::KeyR => self.pipeline.reset(),
            _ => {}
        }
    }

    /// Run one pipeline tick and present the result
    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some(presenter) = &mut self.presenter else {
            return;
        };

        let now = Instant::now();
        let time_s = self.clock.elapsed_s(now);

        // Paused: the last frame stays on screen
        self.pipeline
            .tick(self.source.as_mut(), &self.controls, time_s);

        match presenter.present(self.pipeline.frame()) {
            Ok(()) => {}
            Err(SinkError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                presenter.reconfigure();
            }
            Err(SinkError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                error!("Out of GPU memory, exiting");
                event_loop.exit();
            }
            Err(e) => warn!("Present failed: {}", e),
        }

        self.clock.tick(now);
        self.update_title();
    }

    fn update_title(&mut self) {
        let Some(window) = &self.window else {
            return;
        };
        let title = if self.controls.show_info {
            format!(
                "{} | {}",
                TITLE,
                info_text(self.pipeline.snapshot(), &self.controls, self.clock.fps())
            )
        } else {
            TITLE.to_string()
        };
        if title != self.title {
            window.set_title(&title);
            self.title = title;
        }
    }
}

/// Render a fixed number of frames to PNG files
fn run_export(
    mut pipeline: PipelineState,
    mut source: Box<dyn FrameSource>,
    export: ExportConfig,
    render_config: &RenderConfig,
    controls: &ControlFlags,
) -> Result<(), Box<dyn Error>> {
    let frames = export.frames as u64;
    let mut sink = PngSequenceSink::new(export)?;
    let stop = AtomicBool::new(false);

    println!("Rendering {} frames headless...", frames);
    let started = Instant::now();
    let presented = run_headless(
        &mut pipeline,
        source.as_mut(),
        &mut sink,
        frames,
        render_config.target_fps,
        controls,
        &stop,
    )?;

    println!(
        "Wrote {} frames in {:.1}s",
        presented,
        started.elapsed().as_secs_f32()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    println!("Vibescope - Audio-reactive layered visualizer");
    println!("Initializing systems...\n");

    let kind = args.parse_source()?;
    let render_config = args.render_config()?;
    let mut config = args.pipeline_config()?;

    // Live capture waits at most one frame for a block
    let source = open_source(
        &kind,
        args.device.as_deref(),
        &config.analysis,
        render_config.frame_interval(),
        config.seed,
    )?;

    // Analyze at the rate the source actually delivers
    let format = source.format();
    config.analysis.sample_rate_hz = format.sample_rate_hz;
    config.analysis.channels = format.channels;

    let controls = args.control_flags();
    let pipeline = PipelineState::new(
        config,
        render_config.window_width,
        render_config.window_height,
    )?;

    if let Some(export) = args.export_config() {
        return run_export(pipeline, source, export, &render_config, &controls);
    }

    let mut app = App::new(pipeline, source, controls, render_config);
    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
