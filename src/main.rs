use clap::Parser;
use veo_studio::cli::{self, Args, Command};

/// Load .env file
///
/// Does not override existing environment variables.
fn load_env() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();
}

/// Install the log subscriber. `RUST_LOG` overrides the verbosity flag.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("{}={},reqwest=warn,hyper=warn", env!("CARGO_CRATE_NAME"), level).into()
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    load_env();

    let args = Args::parse();
    init_logging(args.verbose);

    let config_path = args.config.as_deref();
    let result = match args.command {
        Command::Generate(generate) => cli::run_generate(generate, config_path),
        Command::Config { action } => cli::handle_config_action(action, config_path),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
