use std::path::PathBuf;

use tokio::runtime::Runtime;

pub mod serve;

#[derive(clap::Parser, Debug)]
#[clap(name = "moniker-service")]
pub struct Args {
    #[clap(subcommand)]
    pub cmd: Cmd,
}

#[derive(Debug, clap::Subcommand)]
pub enum Cmd {
    /// Runs the HTTP server.
    Serve(serve::Args),
}

pub fn run(args: Args) -> anyhow::Result<()> {
    match args.cmd {
        Cmd::Serve(args) => serve::run(args),
    }
}

#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Load application configuration from the supplied path, overriding the
    /// usual `config/base` + `config/<APP_ENV>` layering.
    #[clap(short, long = "config")]
    pub config_path: Option<PathBuf>,
}

pub fn async_runtime() -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}
