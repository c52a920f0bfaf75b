use clap::{Parser, Subcommand};
use dotenv::dotenv;
use staking_deployer::{
    config::{self, FileConfig, NetworkConfig, Overrides, RPC_URL_VAR},
    logging, Contract, DeploymentState, Env, Guard, Orchestrator, SavedDeployment, Signer,
};
use std::{error::Error, path::PathBuf, process::ExitCode};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "staking-deployer")]
#[command(about = "Deploy, fund and start a locked staking rewards farm")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the deployment pipeline
    Run {
        /// Network preset or `[networks.<name>]` entry of the config file
        #[arg(short, long)]
        network: Option<String>,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Node endpoint, overrides the network's
        #[arg(long, env = RPC_URL_VAR)]
        rpc_url: Option<String>,

        /// Compiled factory artifact (Truffle or Foundry JSON)
        #[arg(long)]
        factory_artifact: Option<String>,

        /// Deployment state is read from here if present and written back on exit
        #[arg(long)]
        resume_file: Option<PathBuf>,

        /// Retry a failed step that may already have reached the chain
        #[arg(long)]
        confirm_retry: bool,
    },

    /// List the built-in networks
    Networks,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    dotenv().ok();
    logging::init_logging(logging::DEFAULT_LOG_FILTER);

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            network,
            config,
            rpc_url,
            factory_artifact,
            resume_file,
            confirm_retry,
        } => {
            let file = match &config {
                Some(path) => FileConfig::load(&path.to_string_lossy(), None)?,
                None => FileConfig::default(),
            };
            let overrides = Overrides {
                network,
                rpc_url,
                factory_artifact,
            };
            run(&file, &overrides, resume_file, confirm_retry).await
        }
        Commands::Networks => {
            for name in ["boba_mainnet", "boba_rinkeby", "local"] {
                if let Some(network) = NetworkConfig::preset(name) {
                    println!("{:<14} {:>6}  {}", name, network.chain_id, network.rpc_url);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run(
    file: &FileConfig,
    overrides: &Overrides,
    resume_file: Option<PathBuf>,
    confirm_retry: bool,
) -> Result<ExitCode, Box<dyn Error>> {
    let resolved = config::resolve(file, overrides)?;
    let signer = Signer::from_private_key(&config::private_key_from_env()?)?;
    let factory = Contract::new(&resolved.factory_artifact, None)?;

    let saved = match &resume_file {
        Some(path) if path.exists() => {
            let saved: SavedDeployment = serde_json::from_slice(&std::fs::read(path)?)?;
            let state = saved.into_state_for(&resolved.env)?;
            tracing::info!(path = %path.display(), %state, "loaded deployment state");
            state
        }
        _ => DeploymentState::NotStarted,
    };

    tracing::info!(
        network = %resolved.env.network,
        rpc_url = %resolved.env.rpc_url,
        deployer = %signer.address(),
        "connecting"
    );
    let mut env = Env::connect(resolved.env.clone(), &signer).await?;
    env.add_guard(Guard::NumberOfAllowedCalls(saved.remaining_transactions()));

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping after the current wait");
            on_ctrl_c.cancel();
        }
    });

    let mut orchestrator = Orchestrator::new(env, factory, resolved.params, resolved.orchestrator)
        .with_cancellation(cancel)
        .resume(saved, confirm_retry)?;

    let result = orchestrator.run().await;

    let state_json = serde_json::to_string_pretty(&orchestrator.snapshot())?;
    if let Some(path) = &resume_file {
        std::fs::write(path, &state_json)?;
    }

    match result {
        Ok(summary) => {
            println!("{}", summary);
            println!("Farm Started");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("Deployment failed at {}: {}", err.step, err.cause);
            if resume_file.is_none() {
                println!("{}", state_json);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
