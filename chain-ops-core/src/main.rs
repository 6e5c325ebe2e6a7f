use std::process::ExitCode;

use anyhow::Context;
use chain_ops_common::AccountAddress;
use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chain_ops_core::{
    accounts::AccountHandle,
    blockchain::BlockchainManager,
    config::{NetworkSettings, ValidatorSettings},
    faucet::FaucetClient,
    service::{network::treasury_account, AccountSource, Network, ServiceError, ValidatorSetup},
};

#[derive(Parser)]
#[command(name = "chain-ops")]
#[command(about = "Validator setup and tokenomics operations for a Substrate node")]
enum Commands {
    /// Fund, bond and register a validator
    Validator {
        /// Create fresh stash and controller accounts instead of the configured ones
        #[arg(long)]
        generate_accounts: bool,
        /// Submit Staking.set_controller after bonding
        #[arg(long)]
        set_controller: bool,
    },
    #[command(flatten)]
    Network(NetworkCommand),
}

#[derive(Subcommand)]
enum NetworkCommand {
    /// Free balance of an account
    Balance { address: String },
    /// Transfer whole tokens
    Transfer {
        to: String,
        value: String,
        #[arg(long, env = "SENDER_MNEMONIC", hide_env_values = true)]
        mnemonic: String,
    },
    /// Transfer the same amount to several accounts in one batch
    BatchTransfer {
        value: String,
        #[arg(required = true)]
        to: Vec<String>,
        #[arg(long, env = "SENDER_MNEMONIC", hide_env_values = true)]
        mnemonic: String,
    },
    /// Send a DDC data payload
    SendDdc {
        to: String,
        data: String,
        #[arg(long, env = "SENDER_MNEMONIC", hide_env_values = true)]
        mnemonic: String,
    },
    /// Treasury free balance
    Treasury,
    /// Existential deposit of the balances pallet
    ExistentialDeposit,
    /// Minutes left in the active era
    EraTime,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let command = Commands::parse();

    match execute(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(ServiceError::Submission { call, .. }) = e
                .downcast_ref::<ServiceError>()
                .filter(|service| service.is_logical_rejection())
            {
                error!("{} was finalized but rejected by the runtime", call);
            }
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Validator {
            generate_accounts,
            set_controller,
        } => {
            let settings = ValidatorSettings::new().context("Failed to load validator settings")?;
            let chain = BlockchainManager::new(&settings.provider).await?;
            let faucet = FaucetClient::new(&settings.request_assets_endpoint, &settings.network);

            let source = if generate_accounts {
                AccountSource::Generated
            } else {
                AccountSource::Configured
            };
            let report = ValidatorSetup::new(&chain, &faucet, &settings)
                .run(source, set_controller)
                .await?;

            info!(
                "Validator on {}: stash {}, controller {}, bonded {}",
                report.chain, report.stash, report.controller, report.bonded
            );
            println!("Validator added successfully!");
        }

        Commands::Network(command) => {
            let settings = NetworkSettings::new().context("Failed to load network settings")?;
            let chain = BlockchainManager::new(&settings.provider).await?;
            let network = Network::new(&chain, &settings);
            run_network_command(&network, command).await?;
        }
    }

    Ok(())
}

async fn run_network_command(
    network: &Network<'_, BlockchainManager>,
    command: NetworkCommand,
) -> anyhow::Result<()> {
    match command {
        NetworkCommand::Balance { address } => {
            let balance = network.balance(&AccountAddress::new(address.as_str())).await?;
            println!("Balance of {}: {}", address, network.format_balance(balance));
        }
        NetworkCommand::Transfer {
            to,
            value,
            mnemonic,
        } => {
            let sender = AccountHandle::from_uri("Sender", &mnemonic)?;
            let block = network.transfer(&sender, &AccountAddress::new(to), &value).await?;
            println!("Transfer finalized in block {}", block);
        }
        NetworkCommand::BatchTransfer {
            value,
            to,
            mnemonic,
        } => {
            let sender = AccountHandle::from_uri("Sender", &mnemonic)?;
            let dests: Vec<AccountAddress> = to.into_iter().map(AccountAddress::new).collect();
            let block = network.batch_transfer(&sender, &dests, &value).await?;
            println!("Batch of {} transfers finalized in block {}", dests.len(), block);
        }
        NetworkCommand::SendDdc { to, data, mnemonic } => {
            let sender = AccountHandle::from_uri("Sender", &mnemonic)?;
            let block = network.send_ddc(&sender, &AccountAddress::new(to), &data).await?;
            println!("DDC data finalized in block {}", block);
        }
        NetworkCommand::Treasury => {
            let balance = network.treasury_balance().await?;
            println!(
                "Treasury {} balance: {}",
                treasury_account(),
                network.format_balance(balance)
            );
        }
        NetworkCommand::ExistentialDeposit => {
            let deposit = network.existential_deposit().await?;
            println!("Existential deposit: {}", network.format_balance(deposit));
        }
        NetworkCommand::EraTime => match network.era_time_remaining(Utc::now()).await? {
            Some(minutes) => println!("Era time remaining: {} minutes", minutes),
            None => println!("No active era"),
        },
    }

    Ok(())
}
