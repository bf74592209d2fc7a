#[tokio::main]
async fn main() -> anyhow::Result<()> {
    medlog_lib::run().await
}
