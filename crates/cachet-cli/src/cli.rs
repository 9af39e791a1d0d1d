use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cachet")]
#[command(about = "Cachet CLI: read and write values through the cache service")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration directory (default.toml, {env}.toml, local.toml) [default: ./config]
    #[arg(short, long, global = true, env = "CACHET_CONFIG_DIR")]
    pub config_dir: Option<String>,

    /// Key prefix (overrides cache.key_prefix)
    #[arg(short, long, global = true)]
    pub prefix: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a value
    Add(AddArgs),
    /// Read a value
    Get(GetArgs),
    /// Check if a key exists
    Exists(KeyArgs),
    /// Delete a key
    Delete(KeyArgs),
}

#[derive(Args)]
pub struct AddArgs {
    pub key: String,
    pub value: String,

    /// Expire the value after this many seconds
    #[arg(long)]
    pub ttl_secs: Option<u64>,

    /// Parse the value as JSON instead of storing it verbatim
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct GetArgs {
    pub key: String,

    /// Pretty-print the stored value as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct KeyArgs {
    pub key: String,
}
