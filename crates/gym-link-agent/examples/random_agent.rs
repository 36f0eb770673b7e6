//! Run a few episodes against a remote gym server with a random policy.
//!
//! ```sh
//! cargo run --example random_agent -- http://localhost:8000 [episodes]
//! ```

use std::sync::Arc;

use gym_link_agent::{AgentFn, EpisodeResults, EpisodeRunner};
use gym_link_client::{ServerClient, ToolTransport};
use gym_link_tools::ToolFactory;
use rand::Rng;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .unwrap_or_else(|| "http://localhost:8000".to_string());
    let episodes: usize = args.next().as_deref().unwrap_or("3").parse()?;

    let transport: Arc<dyn ToolTransport> = Arc::new(ServerClient::new(&url)?);
    let mut factory = ToolFactory::new(transport);
    let tools = factory.create_tools(None).await?;
    info!(url, tools = tools.len(), "connected");

    let agent = AgentFn::blocking(|_prompt| {
        let action: u8 = rand::thread_rng().gen_range(0..2);
        format!("step_env({action})")
    });
    let runner = EpisodeRunner::new(agent).with_max_steps(100);

    let results = EpisodeResults::new(runner.run_episodes(&tools, episodes).await);
    println!("{}", serde_json::to_string_pretty(&results.summary())?);
    Ok(())
}
