use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::runtime::Handle;
use watermark_cli::commands;
use watermark_cli::logging;
use watermark_cli::readline;
use watermark_cli::CliContext;
use watermark_core::{ConfigStore, OptionsProvider};

/// Startup arguments
#[derive(Parser)]
#[command(version, about = "Editor watermark overlay host")]
struct Args {
    /// Options file to use instead of the platform default
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let _log_guard = logging::init();
    let args = Args::parse();

    let store = match args.config {
        Some(path) => ConfigStore::at_path(path, Handle::current()),
        None => ConfigStore::new(Handle::current()),
    };
    let mut ctx = CliContext::new(store);
    ctx.store.request_initialize();

    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        ctx.poll_config();
        let result = respond(line, &mut ctx);
        ctx.settle();

        match result {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                writeln!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(version, about = "cli")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a surface showing a document
    Open {
        path: Option<PathBuf>,
        #[arg(long, default_value_t = 1000.0)]
        width: f64,
        #[arg(long, default_value_t = 600.0)]
        height: f64,
    },
    Close {
        id: u32,
    },
    Resize {
        id: u32,
        width: f64,
        height: f64,
    },
    /// Pin the measured content size; omit both to estimate again
    Measure {
        id: u32,
        width: Option<f64>,
        height: Option<f64>,
    },
    Rename {
        id: u32,
        path: PathBuf,
    },
    /// Set one option, e.g. `set text_color Blue`
    Set {
        field: String,
        value: String,
    },
    Reset,
    Refresh,
    Show {
        id: u32,
    },
    /// Resolve a color spec
    Color {
        spec: Option<String>,
        #[arg(long)]
        list: bool,
    },
    Config,
    Surfaces,
    Exit,
}

fn respond(line: &str, ctx: &mut CliContext) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "watermark".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match cli.command {
        Some(Commands::Open {
            path,
            width,
            height,
        }) => commands::open(ctx, path, width, height),
        Some(Commands::Close { id }) => commands::close(ctx, id)?,
        Some(Commands::Resize { id, width, height }) => commands::resize(ctx, id, width, height)?,
        Some(Commands::Measure { id, width, height }) => {
            commands::measure(ctx, id, width, height)?
        }
        Some(Commands::Rename { id, path }) => commands::rename(ctx, id, path)?,
        Some(Commands::Set { field, value }) => commands::set(ctx, &field, &value)?,
        Some(Commands::Reset) => commands::reset(ctx)?,
        Some(Commands::Refresh) => commands::refresh(ctx),
        Some(Commands::Show { id }) => commands::show(ctx, id)?,
        Some(Commands::Color { spec, list }) => commands::color(spec.as_deref(), list)?,
        Some(Commands::Config) => commands::show_config(ctx)?,
        Some(Commands::Surfaces) => commands::list_surfaces(ctx),
        Some(Commands::Exit) => {
            commands::exit()?;
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}
