/// objview - interactive terminal viewer for triangulated OBJ meshes
///
/// Controls:
///   - Left drag: Rotate the model (arcball)
///   - Scroll: Zoom in/out
///   - Q/ESC: Quit
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use objview_terminal::{summary, Cli, TerminalApp, ViewerConfig};
use std::fs::OpenOptions;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // The viewer owns stdout; logs go to stderr at warn+ unless RUST_LOG says otherwise
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    logger.format_timestamp_secs();
    if let Some(path) = &cli.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        logger.target(env_logger::Target::Pipe(Box::new(file)));
    }
    logger.init();

    let mesh = objview_core::load_mesh(&cli.model)
        .with_context(|| format!("failed to load {}", cli.model.display()))?;
    info!(
        "Loaded {} faces from {}",
        mesh.face_count(),
        cli.model.display()
    );

    if cli.summary {
        println!("{}", summary(&cli.model, &mesh));
        return Ok(());
    }

    let mut app = TerminalApp::new(mesh, ViewerConfig::from_cli(&cli))?;
    app.run()
}
