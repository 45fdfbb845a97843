use clap::Parser;
use lore_cli::LoreCli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    LoreCli::parse().run().await
}
