use qsql::cli::{Cli, Commands};
use qsql::commands::bench::{self, BenchOptions};
use qsql::commands::render::{self, RenderOptions, RenderTarget};
use qsql::commands::init;
use std::process;
use tracing_subscriber::EnvFilter;

// Allow println in main CLI binary
#[allow(clippy::disallowed_methods)]
fn main() {
    init_logging();

    let cli = Cli::parse();
    tracing::info!("qsql CLI initialized");

    match cli.command {
        Some(Commands::Init { path }) => {
            if let Err(e) = init::handle_init(&path) {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
        Some(Commands::Render {
            dialect,
            single_line,
            literals,
            count,
            merge,
        }) => {
            let target = if merge {
                RenderTarget::Merge
            } else if count {
                RenderTarget::Count
            } else {
                RenderTarget::Select
            };
            let options = RenderOptions {
                dialect,
                single_line,
                literals,
                target,
            };
            if let Err(e) = render::handle_render(&options) {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
        Some(Commands::Bench {
            config,
            iterations,
            rows,
            offline,
            scenario,
            json,
        }) => {
            let options = BenchOptions {
                config,
                iterations,
                rows,
                offline,
                scenarios: scenario,
            };
            if let Err(e) = bench::handle_bench(&options, json) {
                eprintln!("Error: {e:#}");
                process::exit(1);
            }
        }
        None => {
            println!("qsql - Use --help for available commands");
        }
    }
}

/// Initialize logging based on environment variables
fn init_logging() {
    // Default to INFO level, can be overridden by RUST_LOG environment variable
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qsql=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .init();
}
