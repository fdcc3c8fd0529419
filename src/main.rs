#[tokio::main]
async fn main() -> anyhow::Result<()> {
    wastechat_server::run().await
}
