//! Quadview - desktop viewer entry point

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::main()
}

// The browser build mounts through `mount_viewer`
#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use anyhow::{Context, Result};
    use clap::Parser;
    use quadview_core::{load_config, PartCatalog, ViewerStatus};
    use quadview_viewer::{build_app, HostBridge, StatusListener, ViewerOptions};
    use std::path::PathBuf;
    use tracing::{info, Level};
    use tracing_subscriber::FmtSubscriber;

    #[derive(Parser, Debug)]
    #[command(name = "quadview")]
    #[command(about = "Interactive 3D viewer for the team quadcopter")]
    #[command(version)]
    struct Args {
        /// Path to configuration file
        #[arg(short, long, default_value = "quadview.toml")]
        config: PathBuf,

        /// Model path (relative to --assets) or URL
        #[arg(short, long)]
        model: Option<String>,

        /// Part catalog TOML replacing the built-in one
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Show every part label regardless of distance
        #[arg(long)]
        show_labels: bool,

        /// Asset root directory
        #[arg(long, default_value = "assets")]
        assets: String,

        /// Log level (trace, debug, info, warn, error)
        #[arg(short, long, default_value = "info")]
        log_level: String,
    }

    pub fn main() -> Result<()> {
        let args = Args::parse();

        // Initialize logging
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .finish();

        tracing::subscriber::set_global_default(subscriber)?;

        info!("Quadview v{}", env!("CARGO_PKG_VERSION"));

        // Load configuration
        let mut config = load_config(&args.config)
            .with_context(|| format!("loading {}", args.config.display()))?;

        if let Some(model) = args.model {
            config.asset.url = model;
        }
        if args.show_labels {
            config.markers.show_all = true;
        }
        config.validate()?;

        let catalog_path = args.catalog.or_else(|| config.catalog.as_ref().map(PathBuf::from));
        let catalog = match catalog_path {
            Some(path) => PartCatalog::from_file(&path)
                .with_context(|| format!("loading part catalog {}", path.display()))?,
            None => PartCatalog::builtin(),
        };

        info!(
            model = %config.asset.url,
            parts = catalog.len(),
            assets = %args.assets,
            "Configuration loaded"
        );

        let mut app = build_app(ViewerOptions {
            config,
            catalog,
            canvas: None,
            asset_root: args.assets,
            host: HostBridge::default(),
        });
        app.insert_non_send_resource(StatusListener::new(|status| {
            if let ViewerStatus::Failed(message) = status {
                eprintln!("{}", message);
            }
        }));

        let exit = app.run();
        if exit.is_error() {
            anyhow::bail!("viewer exited with an error");
        }
        Ok(())
    }
}
