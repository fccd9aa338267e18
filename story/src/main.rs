//! Adaptive story adventures on the command line.
//!
//! A line-oriented front end over `story-core`: each part of the adventure
//! is printed, the child types an answer, and the next part adapts.
//!
//! ```bash
//! cargo run -p story -- --name Maya --theme dragons --focus math
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

mod headless;

use headless::RunConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    if std::env::var("ANTHROPIC_API_KEY").is_err() {
        eprintln!("Error: ANTHROPIC_API_KEY environment variable not set.");
        eprintln!("Please set it in .env file or with: export ANTHROPIC_API_KEY=your_key_here");
        std::process::exit(1);
    }

    let config = match RunConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Run with --help for usage.");
            std::process::exit(2);
        }
    };

    headless::run(config).await.map_err(|e| e.into())
}

fn print_help() {
    println!("story - adaptive educational story adventures");
    println!();
    println!("USAGE:");
    println!("    story [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --name <NAME>      Child's name (default: Explorer)");
    println!("    --theme <THEME>    dragons, pirates or princesses (default: dragons)");
    println!("    --focus <FOCUS>    math, vocabulary or problem_solving (default: math)");
    println!("    --config <PATH>    TOML pipeline configuration");
    println!("    -h, --help         Print this help");
    println!();
    println!("While playing:");
    println!("    #status            Show progress and difficulty");
    println!("    #quit              Stop the adventure");
}
