use crate::cmd::{async_runtime, ConfigArgs};
use crate::config;
use crate::startup;

#[derive(clap::Args, Debug)]
pub struct Args {
    #[clap(flatten)]
    config: ConfigArgs,
}

/// Runs the HTTP server: loads settings, loads the catalog synchronously
/// (a failure here is process-fatal per spec §6), then hands off to the
/// async runtime for the life of the process.
pub fn run(args: Args) -> anyhow::Result<()> {
    config::load_settings(args.config.config_path)?;
    let settings = config::settings();

    let catalog_path = settings.catalog.path().to_path_buf();
    let registry = startup::load_initial_registry(&catalog_path)?;

    let runtime = async_runtime()?;
    runtime.block_on(async move {
        let server = startup::run(settings, registry, catalog_path).await?;
        server.await
    })
}
