use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;
use quick_transfer::cli::Cli;
use quick_transfer::{display, input, logging, Result, ServeOnce};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let options = cli.input_options();
    let file = input::resolve(&cli.files, &options).await?;
    let basename = file.basename();

    let server = ServeOnce::new(file)
        .bind(SocketAddr::new(cli.address.into(), cli.port))
        .await?;
    let bound = server.local_addr();

    info!(%bound, "server listening");

    // A display failure after a successful bind still tears the server
    // down: `?` drops it along with the listener and the file content.
    let host = display::pick_host(cli.display, bound.ip())?;
    let info = display::connection_info(host, bound.port(), &basename)?;

    println!("{}", info.uri);
    println!("{}", info.qr);

    let outcome = server.serve().await?;

    debug!(?outcome, "server stopped");

    Ok(())
}
