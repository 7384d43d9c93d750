use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::CarbonMarketClient;
use rpc_wallet::JsonRpcWallet;
use shared::protocol::ClientCommand;
use tokio::{
    io::{self, AsyncBufReadExt, BufReader},
    task::JoinHandle,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
mod repl;

use config::load_settings;
use repl::{parse_line, render_event, render_market, Input, HELP};

#[derive(Parser, Debug)]
#[command(about = "Terminal front-end for the carbon credit validator market")]
struct Args {
    /// JSON-RPC endpoint of the node that holds the signing account.
    #[arg(long)]
    rpc_url: Option<String>,
    /// Address of the deployed market contract.
    #[arg(long)]
    contract: Option<String>,
    #[arg(long, default_value = "carbon.toml")]
    config: PathBuf,
    #[arg(long)]
    log_filter: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = load_settings(&args.config)?;
    if let Some(v) = args.rpc_url {
        settings.rpc_url = v;
    }
    if let Some(v) = args.contract {
        settings.contract_address = Some(v);
    }
    if let Some(v) = args.log_filter {
        settings.log_filter = v;
    }

    let filter = EnvFilter::try_new(&settings.log_filter)
        .with_context(|| format!("invalid log filter '{}'", settings.log_filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let resolved = settings.resolve()?;
    info!(
        rpc_url = %resolved.wallet.endpoint,
        contract = %resolved.contract,
        "starting carbon market client"
    );

    let wallet = JsonRpcWallet::new(resolved.wallet).context("failed to build rpc client")?;
    wallet.start_watching();
    let client = CarbonMarketClient::new(wallet, resolved.contract);

    let mut events = client.subscribe_events();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{}", render_event(&event));
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match parse_line(&line) {
            Ok(Input::Quit) => break,
            Ok(Input::Empty) => {}
            Ok(Input::Help) => println!("{HELP}"),
            Ok(Input::Status) => print_status(&client).await,
            Ok(Input::Quote(credits)) => match client.quote(credits).await {
                Some(cost) => println!("quote: {credits} credits cost {cost}"),
                None => println!("quote: no market data yet; run 'refresh'"),
            },
            Ok(Input::Command(command)) => {
                spawn_dispatch(&client, command);
            }
            Err(message) => println!("{message}"),
        }
    }

    drop(client);
    printer.abort();
    info!("bye");
    Ok(())
}

/// Runs a command without holding up the input loop. Outcomes, failures included, arrive
/// through the event printer.
fn spawn_dispatch(client: &Arc<CarbonMarketClient>, command: ClientCommand) -> JoinHandle<()> {
    let client = Arc::clone(client);
    tokio::spawn(async move {
        let name = command.name();
        if let Err(err) = client.dispatch(command).await {
            debug!(command = name, "command failed: {err}");
        }
    })
}

async fn print_status(client: &Arc<CarbonMarketClient>) {
    println!("{}", client.session().await.status_line());
    match client.market_snapshot().await {
        Some(snapshot) => println!("{}", render_market(&snapshot)),
        None => println!("market: not loaded"),
    }
    if let Some(record) = client.validator_record().await {
        println!("{}", repl::render_validator(&record));
    }
    println!("transaction: {:?}", client.transaction_state());
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
