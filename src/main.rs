use anyhow::anyhow;
use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use slog::info;
use std::path::PathBuf;
use visitor_counter::config::Config;
use visitor_counter::http;
use visitor_counter::lambda;
use visitor_counter::store;
use visitor_counter::CounterResponse;
use visitor_counter::Handler;

/// Count visits in a single-record key-value table
#[derive(Debug, Parser)]
struct Args {
    /// path to the TOML configuration file
    #[arg(long, short)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the counter over HTTP
    Serve,
    /// Run as an AWS Lambda function
    Lambda,
    /// Count one visit and print the new total
    Invoke,
    /// Print the current total without counting a visit
    Show,
    /// Create the counter record if it does not exist
    Seed {
        #[arg(long, default_value_t = 0)]
        initial: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_file(&args.config)?;
    let log =
        config.log.to_logger("visitor-counter").context("creating logger")?;
    let store = store::from_config(&config.store, &log)
        .await
        .context("setting up counter store")?;
    let handler = Handler::new(store, config.read_mode, log.clone());

    match args.command {
        Command::Serve => {
            info!(&log, "setting up dropshot server");
            let server =
                http::create_dropshot_server(config.http, log.clone(), handler)
                    .await?;
            info!(&log, "set up dropshot server";
                "local_address" => ?server.local_addr());
            server
                .await
                .map_err(|error| anyhow!("waiting for server: {:#}", error))
        }
        Command::Lambda => {
            info!(&log, "starting lambda runtime");
            lambda::run(&handler, &log).await
        }
        Command::Invoke => {
            let total_count = handler.invoke((), ()).await?;
            print_count(total_count)
        }
        Command::Show => {
            let total_count = handler.current().await?;
            print_count(total_count)
        }
        Command::Seed { initial } => {
            if !handler.seed(initial).await? {
                info!(&log, "counter record already exists");
            }
            Ok(())
        }
    }
}

fn print_count(total_count: i64) -> anyhow::Result<()> {
    let body = serde_json::to_string(&CounterResponse::from(total_count))
        .context("serializing response")?;
    println!("{}", body);
    Ok(())
}
