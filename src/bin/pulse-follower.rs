use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulse::cli::FollowerCli;
use pulse::follower::{FollowerAgent, HttpTransport, ProcessIdentity};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = FollowerCli::parse();
    let jitter = args.jitter()?;
    let identity = match args.advertise_address.clone() {
        Some(address) => ProcessIdentity::new(address, i64::from(std::process::id())),
        None => ProcessIdentity::discover(&args.leader).await?,
    };
    let transport = HttpTransport::new(&args.leader)?;
    info!(
        "Reporting as {}/{} to {}",
        identity.address,
        identity.process_id,
        transport.endpoint()
    );

    let agent = FollowerAgent::new(transport, identity, jitter);
    if let Err(err) = agent.run(None).await {
        error!("Heartbeat delivery failed, exiting: {}", err);
        return Err(err.into());
    }
    Ok(())
}
