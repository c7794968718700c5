mod host;
mod mqtt;
mod sim;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
