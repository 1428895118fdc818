use portal_app::{cli, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli::command().get_matches();

    let config = cli::load_config(&matches)?;
    logging::init(&config.logging)?;

    for line in cli::execute(config, &matches).await? {
        println!("{line}");
    }
    Ok(())
}
