//! Command-line access to the counter, round and username programs.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chain_sol::{find_program_address, Address, InstructionCatalog, Keypair};
use clap::{Parser, Subcommand};
use program_client::{
    init_tracing, send_and_confirm_airdrop, ClientConfig, ClientError, CounterClient,
    HttpRpcClient, PollSchedule, ProgramContext, ProgramIds, RoundClient, RpcAdapter, Submission,
    UsernameClient,
};

#[derive(Parser)]
#[command(name = "programctl", version, about = "Drive the counter, round and username programs")]
struct Cli {
    /// JSON-RPC endpoint. Defaults to SOLANA_HOST or a local validator.
    #[arg(long, global = true, env = "SOLANA_RPC_URL")]
    rpc_url: Option<String>,

    /// Debug logging for the client crates.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Derive a program address. Seeds are `str:`, `address:`, `u64:` or `hex:`.
    Pda {
        program_id: Address,
        #[arg(required = true)]
        seeds: Vec<String>,
    },
    /// Print an instruction discriminator.
    Discriminator { program: String, instruction: String },
    #[command(subcommand)]
    Counter(CounterCommand),
    #[command(subcommand)]
    Round(RoundCommand),
    #[command(subcommand)]
    Username(UsernameCommand),
    Balance { address: Address },
    Airdrop {
        address: Address,
        #[arg(long, default_value_t = 1_000_000_000)]
        lamports: u64,
    },
}

#[derive(Subcommand)]
enum CounterCommand {
    Get { user: Address },
    /// Create the counter owned by the key in `keypair`.
    Init { keypair: PathBuf },
    Increment { keypair: PathBuf },
}

#[derive(Subcommand)]
enum RoundCommand {
    Get { authority: Address },
}

#[derive(Subcommand)]
enum UsernameCommand {
    Get { user: Address },
    Record { user: Address, change_index: u64 },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let catalog = InstructionCatalog::bundled()?;

    match &cli.command {
        Command::Pda { program_id, seeds } => {
            let seeds = seeds
                .iter()
                .map(|s| parse_seed(s))
                .collect::<Result<Vec<_>, _>>()?;
            let refs: Vec<&[u8]> = seeds.iter().map(Vec::as_slice).collect();
            let (address, bump) = find_program_address(&refs, program_id)?;
            println!("{address} (bump {bump})");
            return Ok(());
        }
        Command::Discriminator {
            program,
            instruction,
        } => {
            let disc = catalog.get_discriminator(program, instruction)?;
            println!("{}", hex::encode(disc));
            return Ok(());
        }
        _ => {}
    }

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.rpc_url {
        config.rpc_url = url;
        config.validate()?;
    }
    let ids = ProgramIds::from_env(&catalog)?;
    let rpc = HttpRpcClient::from_config(&config)?;
    let ctx = ProgramContext::with_config(&rpc, &catalog, &config);

    match cli.command {
        Command::Pda { .. } | Command::Discriminator { .. } => {}
        Command::Counter(cmd) => {
            let counter = CounterClient::new(ctx, ids.counter);
            match cmd {
                CounterCommand::Get { user } => println!("{}", counter.get_count(&user).await?),
                CounterCommand::Init { keypair } => {
                    report(counter.initialize(&read_keypair(&keypair)?).await?)
                }
                CounterCommand::Increment { keypair } => {
                    report(counter.increment(&read_keypair(&keypair)?).await?)
                }
            }
        }
        Command::Round(RoundCommand::Get { authority }) => {
            let round = RoundClient::new(ctx, ids.round)
                .get_round_account(&authority)
                .await?;
            println!("{round:#?}");
        }
        Command::Username(cmd) => {
            let client = UsernameClient::new(ctx, ids.username);
            match cmd {
                UsernameCommand::Get { user } => {
                    println!("{:#?}", client.get_username_account(&user).await?)
                }
                UsernameCommand::Record { user, change_index } => {
                    println!(
                        "{:#?}",
                        client.get_username_record_account(&user, change_index).await?
                    )
                }
            }
        }
        Command::Balance { address } => println!("{}", rpc.get_balance(&address).await?),
        Command::Airdrop { address, lamports } => {
            let signature = send_and_confirm_airdrop(
                &rpc,
                &address,
                lamports,
                PollSchedule::confirmation(&config),
            )
            .await?;
            println!("{signature}");
        }
    }

    Ok(())
}

fn report(submission: Submission) {
    if submission.confirmed {
        println!("{}", submission.signature);
    } else {
        println!("{} (not yet confirmed)", submission.signature);
    }
}

fn parse_seed(raw: &str) -> Result<Vec<u8>, ClientError> {
    let bad = |reason: String| ClientError::Config(format!("seed {raw:?}: {reason}"));

    let (kind, value) = raw
        .split_once(':')
        .ok_or_else(|| bad("expected kind:value".into()))?;
    match kind {
        "str" => Ok(value.as_bytes().to_vec()),
        "address" => value
            .parse::<Address>()
            .map(|a| a.as_ref().to_vec())
            .map_err(|e| bad(e.to_string())),
        "u64" => value
            .parse::<u64>()
            .map(|n| n.to_le_bytes().to_vec())
            .map_err(|e| bad(e.to_string())),
        "hex" => hex::decode(value).map_err(|e| bad(e.to_string())),
        other => Err(bad(format!("unknown seed kind {other}"))),
    }
}

/// Key files hold the 64 key bytes as a JSON array.
fn read_keypair(path: &Path) -> Result<Keypair, ClientError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ClientError::Config(format!("{}: {e}", path.display())))?;
    let bytes: Vec<u8> = serde_json::from_str(&raw)
        .map_err(|e| ClientError::Config(format!("{}: {e}", path.display())))?;
    Ok(Keypair::from_bytes(&bytes)?)
}
