mod bindings;
mod config;
mod orchestrate;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use relay_kit::a2a::AgentClient;
use relay_kit::a2ui::{ConnectionRegistry, SurfaceEmitter};

use crate::config::Cli;
use crate::orchestrate::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let addr = cli
        .socket_addr()
        .with_context(|| format!("Invalid bind address {:?}", cli.bind))?;

    let mut bindings = bindings::load_bindings(&cli.bindings)?;
    bindings.apply_overrides(&cli.agents);
    let catalog = bindings::load_catalog(&cli.catalog)?;
    let catalog = bindings::surface_catalog(catalog, &bindings);

    ::log::info!(
        "Catalog {}: {} components, root {:?}; {} agents",
        cli.catalog.display(),
        catalog.components.len(),
        catalog.root,
        bindings.agents.len()
    );
    for agent in &bindings.agents {
        ::log::info!("Agent {} at {}", agent.name, agent.url);
    }

    let emitter = SurfaceEmitter::new(ConnectionRegistry::new(cli.heartbeat_interval()), catalog);
    let client = AgentClient::new(reqwest::Client::new());
    let orchestrator = Orchestrator::new(emitter, client, bindings, cli.rpc_timeout());

    server::run_server(addr, orchestrator).await
}
