/// Terminal-based OBJ viewer
use anyhow::{Context, Result};
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use log::{debug, info, warn, LevelFilter};
use objview_core::{ArcballRotator, Camera, FlatMesh, Transform};
use std::io::{stdout, Write};
use std::path::Path;
use std::time::{Duration, Instant};

pub mod config;
pub mod renderer;

pub use config::{Cli, ViewerConfig};
pub use renderer::{AsciiRenderer, Lighting};

/// Turns the global log level off until dropped
struct MutedLogs {
    previous: LevelFilter,
}

impl MutedLogs {
    fn engage() -> Self {
        let previous = log::max_level();
        log::set_max_level(LevelFilter::Off);
        Self { previous }
    }
}

impl Drop for MutedLogs {
    fn drop(&mut self) {
        log::set_max_level(self.previous);
    }
}

/// Main application struct for the terminal viewer
pub struct TerminalApp {
    mesh: FlatMesh,
    rotator: ArcballRotator,
    camera: Camera,
    renderer: AsciiRenderer,
    lighting: Lighting,
    config: ViewerConfig,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(mesh: FlatMesh, config: ViewerConfig) -> Result<Self> {
        let (columns, rows) = terminal::size().context("failed to query terminal size")?;
        Ok(Self::with_size(mesh, config, columns, rows))
    }

    /// Build the viewer for a terminal of `columns x rows` cells
    pub fn with_size(mesh: FlatMesh, config: ViewerConfig, columns: u16, rows: u16) -> Self {
        let viewport = config.viewport(columns, rows);
        let mut camera = Camera::new(viewport.width, viewport.height);
        camera.mode = config.projection;
        let rotator =
            ArcballRotator::new(viewport).with_orientation(Transform::uniform_scale(mesh.scale()));

        Self {
            mesh,
            rotator,
            camera,
            renderer: AsciiRenderer::new(columns as usize, rows as usize),
            lighting: Lighting::default(),
            config,
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        }
    }

    pub fn rotator(&self) -> &ArcballRotator {
        &self.rotator
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn run(&mut self) -> Result<()> {
        info!(
            "Starting viewer: {}x{} cells, {} faces, {} fps cap",
            self.renderer.width(),
            self.renderer.height(),
            self.mesh.face_count(),
            self.config.fps
        );
        // stderr is the same terminal as the alternate screen
        let _muted = self.config.mute_logs.then(MutedLogs::engage);
        terminal::enable_raw_mode().context("failed to enable raw mode")?;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide
        )?;

        let result = self.main_loop();

        // Cleanup
        let restored = execute!(
            stdout(),
            DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show
        );
        terminal::disable_raw_mode()?;
        restored?;

        result
    }

    fn main_loop(&mut self) -> Result<()> {
        let target_frame_time = self.config.frame_time();

        while self.running {
            let frame_start = Instant::now();

            // Handle everything queued since the last frame
            while event::poll(Duration::ZERO)? {
                self.handle_event(event::read()?);
            }
            if !self.running {
                break;
            }

            // Render
            self.render()?;

            // Keep handling input while waiting out the frame budget
            loop {
                let elapsed = frame_start.elapsed();
                if elapsed >= target_frame_time || !self.running {
                    break;
                }
                if event::poll(target_frame_time - elapsed)? {
                    self.handle_event(event::read()?);
                }
            }

            // Update FPS counter
            self.frame_count += 1;
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                debug!("{:.1} fps", self.fps);
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    /// Apply one terminal event to the viewer state
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(columns, rows) => self.resize(columns, rows),
            _ => {}
        }
    }

    fn handle_key(&mut self, KeyEvent { code, modifiers, kind, .. }: KeyEvent) {
        if kind != KeyEventKind::Press {
            return;
        }
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.running = false;
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, MouseEvent { kind, column, row, .. }: MouseEvent) {
        let pixel = self.config.cell_to_pixel(column, row);
        match kind {
            MouseEventKind::Down(MouseButton::Left) => self.rotator.release(pixel),
            MouseEventKind::Drag(MouseButton::Left) => {
                self.rotator.cursor_moved(pixel, true);
            }
            MouseEventKind::Up(MouseButton::Left) | MouseEventKind::Moved => {
                self.rotator.cursor_moved(pixel, false);
            }
            MouseEventKind::ScrollUp => self.rotator.scroll(1.0),
            MouseEventKind::ScrollDown => self.rotator.scroll(-1.0),
            _ => {}
        }
    }

    pub fn resize(&mut self, columns: u16, rows: u16) {
        if columns == 0 || rows == 0 {
            warn!("Ignoring resize to {}x{}", columns, rows);
            return;
        }
        let viewport = self.config.viewport(columns, rows);
        debug!(
            "Resize to {}x{} cells ({}x{} px)",
            columns, rows, viewport.width, viewport.height
        );
        self.renderer = AsciiRenderer::new(columns as usize, rows as usize);
        self.camera.set_aspect(viewport.width, viewport.height);
        self.rotator.resize(viewport);
    }

    fn render(&mut self) -> Result<()> {
        let model = *self.rotator.orientation();

        // Clear renderer
        self.renderer.clear();

        // Render mesh
        self.renderer
            .render_mesh(&self.mesh, &model, &self.camera, &self.lighting);

        // Output to terminal
        let mut stdout = stdout();
        self.renderer.draw(&mut stdout, self.config.color)?;

        // Draw UI overlay
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "objview | {} faces | zoom {:.2} | FPS: {:.1} | Drag=Rotate Scroll=Zoom Q=Quit",
                self.mesh.face_count(),
                self.rotator.scale_factor() / self.mesh.scale(),
                self.fps
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

/// Human readable mesh statistics for `--summary`
pub fn summary(path: &Path, mesh: &FlatMesh) -> String {
    let extent = mesh.extent();
    let center = mesh.center();
    format!(
        "{}\n  faces:        {}\n  vertices:     {}\n  min:          ({:.4}, {:.4}, {:.4})\n  max:          ({:.4}, {:.4}, {:.4})\n  center:       ({:.4}, {:.4}, {:.4})\n  scale:        {:.6}",
        path.display(),
        mesh.face_count(),
        mesh.vertex_count(),
        extent.min.x,
        extent.min.y,
        extent.min.z,
        extent.max.x,
        extent.max.y,
        extent.max.z,
        center.x,
        center.y,
        center.z,
        mesh.scale()
    )
}
