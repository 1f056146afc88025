use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use solana_client::rpc_client::RpcClient;
use solana_greeter::config::Config;
use solana_greeter::gateway::WaitConfig;
use solana_greeter::instruction::{GreetAccounts, TransferAccounts};
use solana_greeter::Client;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::signer::keypair::{read_keypair_file, Keypair};
use solana_sdk::signer::Signer;
use solana_transaction_status::option_serializer::OptionSerializer;
use solana_transaction_status::UiTransactionEncoding;


type Result<T = (), E = Error> = core::result::Result<T, E>;


/// Talks to the greeter program.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Address of the greeter program.
    #[arg(long, short = 'p')]
    program_id: Pubkey,

    /// Solana CLI configuration file.  Defaults to the CLI’s own.
    #[arg(long, short = 'C')]
    config: Option<String>,

    /// RPC URL overriding the configuration.
    #[arg(long, short = 'u')]
    url: Option<String>,

    /// Payer keypair file overriding the configuration.
    #[arg(long, short = 'k')]
    keypair: Option<String>,

    /// Commitment level overriding the configuration.
    #[arg(long)]
    commitment: Option<CommitmentConfig>,

    /// Seconds to wait for a transaction to be confirmed.
    #[arg(long, default_value_t = 90)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Checks the program is deployed and the payer can cover rent and fees.
    Check,

    /// Transfers lamports from the payer to the greeting account.
    SendMoney { lamports: u64 },

    /// Greets the greeting account and reports its state.
    SayHello {
        /// Keypair file of the greeting user.
        #[arg(long)]
        user: String,
        #[arg(long)]
        mint: Pubkey,
        #[arg(long)]
        authority: Pubkey,
        #[arg(long)]
        program_token: Pubkey,
        #[arg(long)]
        user_token: Pubkey,
    },

    /// Has the program transfer tokens from its token account.
    TransferTokens {
        /// Token account receiving the tokens.
        #[arg(long)]
        destination: Pubkey,
        #[arg(long)]
        token_program: Pubkey,
        /// The program’s token account.
        #[arg(long)]
        source: Pubkey,
        #[arg(long)]
        authority: Pubkey,
    },

    /// Reports state of the greeting account.
    Report,
}


fn main() -> ExitCode {
    solana_logger::setup_with_default("warn,solana_greeter=info");
    if let Err(err) = run(Args::parse()) {
        eprintln!("{err}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}


/// Executes the program.
fn run(args: Args) -> Result {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(url) = args.url {
        config.json_rpc_url = url;
    }
    if let Some(keypair) = args.keypair {
        config.keypair_path = keypair;
    }
    if let Some(commitment) = args.commitment {
        config.commitment = commitment;
    }

    let payer = config.load_payer()?;
    let rpc = config.rpc_client();
    let version = rpc.get_version()?;
    eprintln!(
        "Connection to cluster established: {} {}",
        config.json_rpc_url, version.solana_core
    );

    let wait = WaitConfig {
        timeout: Duration::from_secs(args.timeout),
        ..WaitConfig::default()
    };
    let client = Client::new(&rpc, args.program_id, &payer)
        .with_commitment(config.commitment)
        .with_wait(wait);
    client.check_program()?;

    match args.command {
        Command::Check => check(&client, &payer),
        Command::SendMoney { lamports } => {
            check(&client, &payer)?;
            client.ensure_greeting_account()?;
            let sig = with_timeout_report(&client, client.send_money(lamports))?;
            print_logs(&rpc, &sig)
        }
        Command::SayHello {
            user,
            mint,
            authority,
            program_token,
            user_token,
        } => {
            check(&client, &payer)?;
            let greeting = client.ensure_greeting_account()?;
            let user = read_keypair(&user)?;
            let accounts = GreetAccounts {
                greeting,
                user: user.pubkey(),
                payer: payer.pubkey(),
                mint,
                authority,
                program_token,
                user_token,
            };
            let sig = with_timeout_report(
                &client,
                client.say_hello(&user, &accounts),
            )?;
            print_logs(&rpc, &sig)?;
            report(&client)
        }
        Command::TransferTokens {
            destination,
            token_program,
            source,
            authority,
        } => {
            check(&client, &payer)?;
            let accounts = TransferAccounts {
                destination,
                token_program,
                source,
                authority,
                program: args.program_id,
            };
            let sig = client.transfer_tokens(&accounts)?;
            print_logs(&rpc, &sig)
        }
        Command::Report => report(&client),
    }
}


/// Makes sure the payer is funded.
fn check(client: &Client<RpcClient>, payer: &Keypair) -> Result {
    let lamports = client.ensure_funded()?;
    eprintln!(
        "Using account {} containing {} SOL to pay for fees",
        payer.pubkey(),
        lamports as f64 / LAMPORTS_PER_SOL as f64,
    );
    Ok(())
}


/// Prints state of the greeting account.
fn report(client: &Client<RpcClient>) -> Result {
    let greeting = client.greeting_address()?;
    let state = client.report()?;
    println!(
        "{greeting} has been greeted {} time(s); random number: {}",
        state.counter, state.randnum
    );
    Ok(())
}


/// On confirmation timeout prints the greeting account state so the user can
/// tell whether the transaction landed instead of blindly retrying.
fn with_timeout_report(
    client: &Client<RpcClient>,
    res: solana_greeter::Result<Signature>,
) -> Result<Signature> {
    if let Err(solana_greeter::Error::ConfirmationTimeout(sig)) = &res {
        eprintln!("Outcome of {sig} unknown; current state:");
        if let Err(err) = report(client) {
            eprintln!("{err}");
        }
    }
    Ok(res?)
}


fn read_keypair(path: &str) -> Result<Keypair> {
    read_keypair_file(path).map_err(Error::from)
}


/// Fetches the transaction and prints its log messages.
fn print_logs(client: &RpcClient, sig: &Signature) -> Result {
    eprintln!("Signature: {sig}");

    let encoding = UiTransactionEncoding::Binary;
    let resp = client.get_transaction(sig, encoding)?;
    let (slot, tx) = (resp.slot, resp.transaction);
    eprintln!("Executed in slot: {slot}");

    let log_messages = tx
        .meta
        .map(|meta| meta.log_messages)
        .ok_or(Error::Msg("No transaction metadata"))?;
    if let OptionSerializer::Some(messages) = log_messages {
        for msg in messages {
            println!("{msg}");
        }
        Ok(())
    } else {
        Err(Error::Msg("No log message"))
    }
}


#[derive(derive_more::From, derive_more::Display)]
enum Error {
    Msg(&'static str),
    Greeter(solana_greeter::Error),
    Client(solana_client::client_error::ClientError),
    Box(Box<dyn std::error::Error>),
}
