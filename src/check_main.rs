use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    faithcheck::eval::main().await
}
