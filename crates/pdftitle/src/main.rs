use crate::prelude::*;
use clap::Parser;

mod batch;
mod error;
mod inspect;
mod options;
mod prelude;
mod validate;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Extract document titles and heading outlines from PDF layout metadata"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Log candidate rankings and sample elements, and hide the progress bar.
    #[clap(long, env = "PDFTITLE_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Process every PDF in the input directory and write one JSON file each
    Run(crate::batch::RunOptions),

    /// Show scored title candidates for a single PDF
    Inspect(crate::inspect::InspectOptions),

    /// Check JSON files against the output schema
    Validate(crate::validate::ValidateOptions),
}

fn init_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let app = App::parse();
    init_logger(app.global.verbose);

    match app.command {
        SubCommands::Run(options) => crate::batch::run(options, app.global),
        SubCommands::Inspect(options) => crate::inspect::run(options, app.global),
        SubCommands::Validate(options) => crate::validate::run(options, app.global),
    }
}
