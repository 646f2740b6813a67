//! Direct fabric controller commands.

use fabric_agent::{AgentConfig, FabricAgentClient, FabricOperation, RemoteShellExecutor};
use std::sync::Arc;
use tracing::info;

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn client(config: &AgentConfig) -> FabricAgentClient<RemoteShellExecutor> {
    FabricAgentClient::new(Arc::new(RemoteShellExecutor::new(config.clone())))
}

/// Prints whether `member` belongs to `fabric`.
pub fn port_status(config: &AgentConfig, fabric: &str, member: &str) -> CliResult {
    let status = client(config).port_status(fabric, member)?;
    println!("{} {}: {}", fabric, member, status);
    Ok(())
}

/// Prints whether `fabric` exists.
pub fn exists(config: &AgentConfig, fabric: &str) -> CliResult {
    let found = client(config).fabric_exists(fabric)?;
    println!("{}: {}", fabric, if found { "exists" } else { "not found" });
    Ok(())
}

/// Sends a management command and fails on a non-zero status.
pub fn management(config: &AgentConfig, operation: FabricOperation) -> CliResult {
    info!("Sending {} to {}", operation, config.address);
    let status = client(config).management(operation)?;
    if !status.is_success() {
        return Err(format!("{} returned {}", operation, status).into());
    }
    println!("✓ {}", operation);
    Ok(())
}
