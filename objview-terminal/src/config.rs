/// Command line and viewer configuration
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use nalgebra::Point2;
use objview_core::{ProjectionMode, Viewport};

#[derive(Parser, Debug)]
#[command(name = "objview")]
#[command(about = "Interactive terminal viewer for triangulated OBJ meshes")]
pub struct Cli {
    /// Path to a triangulated .obj file
    pub model: PathBuf,

    /// Frame rate cap
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..=240))]
    pub fps: u32,

    /// Width of one terminal cell in virtual pixels
    #[arg(long, default_value_t = 8.0, value_parser = positive_f32)]
    pub cell_width: f32,

    /// Height of one terminal cell in virtual pixels
    #[arg(long, default_value_t = 16.0, value_parser = positive_f32)]
    pub cell_height: f32,

    /// Draw with plain characters only
    #[arg(long)]
    pub no_color: bool,

    /// Use an orthographic instead of a perspective projection
    #[arg(long)]
    pub orthographic: bool,

    /// Print mesh statistics and exit without opening the viewer
    #[arg(long)]
    pub summary: bool,

    /// Append log records to this file; without it logging is muted while the viewer is open
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

fn positive_f32(value: &str) -> Result<f32, String> {
    let parsed: f32 = value
        .parse()
        .map_err(|e| format!("`{value}` is not a number: {e}"))?;
    if parsed > 0.0 && parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(format!("`{value}` must be a positive number"))
    }
}

/// Runtime settings of the terminal viewer
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub fps: u32,
    pub cell_width: f32,
    pub cell_height: f32,
    pub color: bool,
    pub projection: ProjectionMode,
    /// Logs share the terminal with the frame unless redirected
    pub mute_logs: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            cell_width: 8.0,
            cell_height: 16.0,
            color: true,
            projection: ProjectionMode::Perspective,
            mute_logs: true,
        }
    }
}

impl ViewerConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            fps: cli.fps,
            cell_width: cli.cell_width,
            cell_height: cli.cell_height,
            color: !cli.no_color,
            projection: if cli.orthographic {
                ProjectionMode::Orthographic
            } else {
                ProjectionMode::Perspective
            },
            mute_logs: cli.log_file.is_none(),
        }
    }

    pub fn frame_time(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.fps.max(1)))
    }

    /// Center of a terminal cell in virtual pixels
    pub fn cell_to_pixel(&self, column: u16, row: u16) -> Point2<f32> {
        Point2::new(
            (column as f32 + 0.5) * self.cell_width,
            (row as f32 + 0.5) * self.cell_height,
        )
    }

    /// Virtual pixel viewport covering `columns x rows` cells
    pub fn viewport(&self, columns: u16, rows: u16) -> Viewport {
        Viewport::new(
            columns as f32 * self.cell_width,
            rows as f32 * self.cell_height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["objview", "bunny.obj"]).unwrap();
        assert_eq!(cli.model, PathBuf::from("bunny.obj"));
        assert!(!cli.summary);
        assert_eq!(ViewerConfig::from_cli(&cli), ViewerConfig::default());
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "objview",
            "teapot.obj",
            "--fps",
            "30",
            "--cell-width",
            "10",
            "--no-color",
            "--orthographic",
            "--log-file",
            "objview.log",
        ])
        .unwrap();
        let config = ViewerConfig::from_cli(&cli);
        assert_eq!(config.fps, 30);
        assert_eq!(config.cell_width, 10.0);
        assert_eq!(config.cell_height, 16.0);
        assert!(!config.color);
        assert_eq!(config.projection, ProjectionMode::Orthographic);
        assert_eq!(cli.log_file, Some(PathBuf::from("objview.log")));
        assert!(!config.mute_logs);
    }

    #[test]
    fn test_model_argument_is_required() {
        assert!(Cli::try_parse_from(["objview"]).is_err());
        assert!(Cli::try_parse_from(["objview", "a.obj", "b.obj"]).is_err());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Cli::try_parse_from(["objview", "a.obj", "--fps", "0"]).is_err());
        assert!(Cli::try_parse_from(["objview", "a.obj", "--cell-height", "-2"]).is_err());
        assert!(Cli::try_parse_from(["objview", "a.obj", "--cell-width", "wide"]).is_err());
    }

    #[test]
    fn test_cell_mapping() {
        let config = ViewerConfig::default();
        assert_eq!(config.cell_to_pixel(0, 0), Point2::new(4.0, 8.0));
        assert_eq!(config.cell_to_pixel(10, 2), Point2::new(84.0, 40.0));
        assert_eq!(config.viewport(80, 24), Viewport::new(640.0, 384.0));
    }

    #[test]
    fn test_frame_time() {
        let config = ViewerConfig {
            fps: 50,
            ..ViewerConfig::default()
        };
        assert_eq!(config.frame_time(), Duration::from_millis(20));
    }
}
