//! guidegen - UI guide generator
//!
//! Main entry point for the CLI application.

use clap::{Parser, Subcommand};
use guidegen::cli::commands;
use guidegen::core::logging;
use guidegen::{Config, ProviderType};

/// guidegen - turn "how do I ..." questions into screenshot guides
#[derive(Parser, Debug)]
#[command(name = "guidegen")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug output
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    /// Run the browser in headed mode (visible window)
    #[arg(long, global = true, conflicts_with = "headless")]
    headed: bool,

    /// Run the browser without a window
    #[arg(long, global = true)]
    headless: bool,

    /// LLM provider: ollama or openai
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model used to parse the question
    #[arg(long, global = true)]
    parser_model: Option<String>,

    /// Model that drives the browser
    #[arg(long, global = true)]
    navigator_model: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a guide for a question
    Ask {
        /// e.g. "How do I create a project in Linear?"
        question: String,

        /// Open the generated workflow.md when done
        #[arg(long)]
        open: bool,
    },
    /// Start the HTTP/WebSocket API
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long, short = 'p')]
        port: Option<u16>,

        /// Open the API root in a browser
        #[arg(long)]
        open: bool,
    },
    /// Regenerate every workflow.md plus the dataset summary and README
    Docs,
    /// Show the active configuration
    Config {
        /// Write the current configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(ref name) = args.provider {
        config.llm.provider = ProviderType::parse(name)
            .ok_or_else(|| anyhow::anyhow!("unknown provider '{}' (expected ollama or openai)", name))?;
    }

    if let Some(ref model) = args.parser_model {
        config.models.parser = model.clone();
    }

    if let Some(ref model) = args.navigator_model {
        config.models.navigator = model.clone();
    }

    if args.debug {
        config.agent.debug = true;
    }

    if args.headed {
        config.browser.headed = true;
    }

    if args.headless {
        config.browser.headed = false;
    }

    logging::init(config.agent.debug);

    match args.command {
        Command::Ask { question, open } => commands::ask(config, &question, open).await?,
        Command::Serve { host, port, open } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            commands::serve(config, open).await?
        }
        Command::Docs => commands::docs(&config)?,
        Command::Config { init } => commands::config(&config, init)?,
    }

    Ok(())
}
