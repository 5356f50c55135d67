use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use veriforge_messaging::{HandleMessageArgs, MessageHandlerApi};
use veriforge_runtime::Bootstrap;
use veriforge_schema::ApiInfo;

#[derive(Parser)]
#[command(name = "veriforge")]
#[command(about = "Veriforge: pluggable decentralized identity agent")]
#[command(version)]
struct Cli {
    /// Config file (defaults to agent.yaml in $VERIFORGE_CONFIG_DIR or ~/.veriforge)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the methods the configured agent exposes
    Methods,
    /// Print the OpenAPI description of the exposed methods
    Openapi,
    /// Run a raw message through the handler chain and print the result
    Handle {
        raw: String,
        /// Save the message after classification
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let bootstrap = Bootstrap::load(cli.config.as_deref()).await?;
    bootstrap.init_logging();
    let agent = bootstrap.build()?;
    info!(methods = agent.available_methods().len(), "Agent ready");

    match cli.command {
        Commands::Methods => {
            for method in agent.available_methods() {
                println!("{method}");
            }
        }
        Commands::Openapi => {
            let doc = agent.openapi(&ApiInfo::default());
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        Commands::Handle { raw, save } => {
            let message = agent.handle_message(&HandleMessageArgs::new(raw).save(save)).await?;
            println!("{}", serde_json::to_string_pretty(&message)?);
        }
    }

    Ok(())
}
