#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gamecheck_cli::cli::run().await
}
