use anyhow::Result;
use argonbox::cli;

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    let action = cli::start()?;

    let code = action.execute().await?;
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}
