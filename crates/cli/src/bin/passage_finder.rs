use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    passage_cli::main_entry().await
}
