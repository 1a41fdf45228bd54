use clap::Parser;
use sitesync::config::{Config, SyncOptions};
use sitesync::pgp::{self, GpgDecryptor};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Mirror a remote FTP/SFTP site to the local filesystem
#[derive(Parser, Debug)]
#[command(name = "sitesync", version, about)]
struct Cli {
    /// Site identifier from the configuration file (e.g. alpha)
    site: String,

    /// Path to the sites configuration file
    #[arg(short, long, default_value = "sites.toml")]
    config: PathBuf,

    /// Do not download anything
    #[arg(long)]
    no_copy: bool,

    /// Do not decrypt downloaded files
    #[arg(long)]
    no_decrypt: bool,

    /// Ignore local state when deciding whether to download
    #[arg(long)]
    ignore_local: bool,

    /// Skip the size comparison in the staleness check
    #[arg(long)]
    ignore_size: bool,

    /// Skip remote files older than this many days
    #[arg(long, value_name = "DAYS")]
    ignore_older_than: Option<i64>,

    /// Decrypt already-downloaded files instead of syncing
    #[arg(long)]
    decrypt_only: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let mut options = SyncOptions::for_site(&cli.site, config.site(&cli.site)?)?;
    options.no_copy = cli.no_copy;
    options.no_decrypt = cli.no_decrypt;
    options.ignore_local = cli.ignore_local;
    options.ignore_size = cli.ignore_size;
    options.ignore_older_than = cli.ignore_older_than;

    let files = if cli.decrypt_only {
        let decryptor = GpgDecryptor::new(config.gpg.clone());
        pgp::decrypt_all_pgp_files(&options, &decryptor)?
    } else {
        sitesync::commands::sync::run(&options, &config.gpg)?
    };

    for file in &files {
        println!("{}", file.display());
    }
    Ok(())
}
