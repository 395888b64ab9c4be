use env_logger::Env;

mod cli;
mod config;
mod device;
mod gateways;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    cli::run().await
}
