use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    column_cli::main_entry().await
}
