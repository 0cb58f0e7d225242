//! Developer CLI for a PairKit credential store file.

use std::io::Write;
use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use eyre::{bail, Result, WrapErr};
use pairkit_core::{AuthInfo, CredentialStore, StoreConfig, DEFAULT_PIN};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pairkit")]
#[command(about = "Inspect the device identity and manage client pairings", long_about = None)]
struct Cli {
    /// Store file holding the identity and pairing records. Only `show`
    /// creates it; the other commands require it to exist. Safe to use while
    /// a server has the same file open.
    #[arg(long, env = "PAIRKIT_STORE", default_value = "pairkit.json", global = true)]
    store: PathBuf,

    /// Setup code reported by `show`
    #[arg(long, env = "PAIRKIT_PIN", default_value = DEFAULT_PIN, global = true)]
    pin: String,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the device identity, bootstrapping it if the store is new
    Show,

    /// List paired usernames
    Users,

    /// Pair a client by hand
    AddUser {
        /// Client username
        username: String,
        /// Client public key, base64
        public_key: String,
    },

    /// Remove a client's pairing
    RemoveUser {
        /// Client username
        username: String,
    },

    /// Remove every pairing, keeping the device identity
    Clear {
        /// Confirm the removal
        #[arg(long)]
        yes: bool,
    },
}

fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let config = StoreConfig {
        pin: cli.pin,
        storage_path: cli.store,
    };
    if !matches!(cli.command, Command::Show) && !config.storage_path.exists() {
        bail!(
            "store file {} does not exist; run `pairkit show` to create it",
            config.storage_path.display()
        );
    }
    tracing::debug!(path = %config.storage_path.display(), "opening credential store");
    let store = CredentialStore::open(&config)
        .wrap_err_with(|| format!("opening {}", config.storage_path.display()))?;

    match cli.command {
        Command::Show => {
            let public_key = hex::encode(store.public_key()?);
            let paired = store.has_user()?;
            if cli.json {
                let value = serde_json::json!({
                    "device_id": store.device_id(),
                    "pin": store.pin(),
                    "salt": store.salt().to_string(),
                    "public_key": public_key,
                    "paired": paired,
                });
                writeln!(out, "{value}")?;
            } else {
                writeln!(out, "device id:  {}", store.device_id())?;
                writeln!(out, "pin:        {}", store.pin())?;
                writeln!(out, "salt:       {}", store.salt())?;
                writeln!(out, "public key: {public_key}")?;
                writeln!(out, "paired:     {paired}")?;
            }
        }
        Command::Users => {
            let users = store.list_users()?;
            if cli.json {
                writeln!(out, "{}", serde_json::json!(users))?;
            } else {
                for user in users {
                    writeln!(out, "{user}")?;
                }
            }
        }
        Command::AddUser {
            username,
            public_key,
        } => {
            let public_key = STANDARD
                .decode(public_key.trim())
                .wrap_err("public key is not valid base64")?;
            store.create_user(&username, &public_key)?;
            tracing::info!(%username, "pairing added");
        }
        Command::RemoveUser { username } => {
            store.remove_user(&username)?;
            tracing::info!(%username, "pairing removed");
        }
        Command::Clear { yes } => {
            if !yes {
                bail!("refusing to clear pairings without --yes");
            }
            let removed = store.clear()?;
            writeln!(out, "removed {removed} pairing(s)")?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli, &mut std::io::stdout().lock())
}
