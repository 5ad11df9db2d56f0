use crate::demo::{run_catalog, run_demo, CatalogArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use job_portal::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Job Portal Subscriptions",
    about = "Run and demonstrate the job portal recharge and subscription service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk a candidate and a recruiter through recharges and the subscription gate
    Demo(DemoArgs),
    /// Print the package catalog grouped by account kind
    Catalog(CatalogArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Catalog(args) => run_catalog(args),
    }
}
