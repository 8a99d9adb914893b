use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use gallery_engine::DEFAULT_CONTAINER_ID;

use super::logging::LogDestination;

#[derive(Debug, Parser)]
#[command(name = "fabric-gallery")]
#[command(about = "Storefront gallery, field filling and presigned transfers from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Where log output goes
    #[arg(long, value_enum, global = true, default_value_t = LogDestination::Terminal)]
    pub log: LogDestination,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the configured bucket and render the gallery markup
    Gallery(GalleryArgs),
    /// Upload a file through a presigned URL
    Upload(UploadArgs),
    /// Download an object through a presigned URL
    Download(DownloadArgs),
    /// Fill the matching form fields of a saved page
    Fill(FillArgs),
    /// Accept a frame message and persist it when its origin is allowed
    Relay(RelayArgs),
}

#[derive(Debug, Args)]
pub struct GalleryArgs {
    /// Storefront page containing the gallery container
    #[arg(short, long)]
    pub page: PathBuf,

    /// Id of the gallery container element
    #[arg(long, default_value = DEFAULT_CONTAINER_ID)]
    pub container: String,

    /// Write the rendered markup here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Select the tile at this index after listing
    #[arg(long)]
    pub select: Option<usize>,

    /// Simulate an add-to-cart click after selecting
    #[arg(long)]
    pub add_to_cart: bool,
}

#[derive(Debug, Args)]
pub struct TransferArgs {
    /// Backend that issues presigned URLs
    #[arg(long)]
    pub api: String,

    /// Retries after the first attempt
    #[arg(long, default_value = "3")]
    pub max_retries: u32,

    /// Base backoff delay in milliseconds
    #[arg(long, default_value = "500")]
    pub retry_base_ms: u64,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    #[command(flatten)]
    pub transfer: TransferArgs,

    /// Object key to store the file under
    #[arg(short, long)]
    pub key: String,

    /// File to upload
    #[arg(short, long)]
    pub file: PathBuf,

    #[arg(long, default_value = "application/octet-stream")]
    pub content_type: String,
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub transfer: TransferArgs,

    #[arg(short, long)]
    pub key: String,

    /// Where to write the object
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(Debug, Args)]
pub struct FillArgs {
    /// Saved storefront page
    #[arg(short, long)]
    pub page: PathBuf,

    /// Value to write, normally the selected image name
    #[arg(long)]
    pub value: String,

    /// Keep watching for a modal field instead of filling once
    #[arg(long)]
    pub watch: bool,
}

#[derive(Debug, Args)]
pub struct RelayArgs {
    /// RON file holding relayed entries
    #[arg(long)]
    pub store: PathBuf,

    /// Origins whose messages are accepted (repeatable)
    #[arg(long = "allow-origin")]
    pub allowed_origins: Vec<String>,

    /// Origin the message claims to come from
    #[arg(long)]
    pub origin: String,

    pub key: String,

    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn relay_collects_repeated_origins() {
        let cli = Cli::parse_from([
            "fabric-gallery",
            "relay",
            "--store",
            "relay.ron",
            "--allow-origin",
            "https://a.example",
            "--allow-origin",
            "https://b.example",
            "--origin",
            "https://a.example",
            "selectedFabric",
            "Rose",
        ]);
        match cli.command {
            Command::Relay(args) => {
                assert_eq!(args.allowed_origins.len(), 2);
                assert_eq!(args.key, "selectedFabric");
                assert_eq!(args.value, "Rose");
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.log, LogDestination::Terminal);
    }

    #[test]
    fn upload_defaults_follow_retry_policy() {
        let cli = Cli::parse_from([
            "fabric-gallery",
            "upload",
            "--api",
            "https://api.example",
            "-k",
            "prints/a.png",
            "-f",
            "a.png",
        ]);
        let Command::Upload(args) = cli.command else {
            panic!("expected upload");
        };
        assert_eq!(args.transfer.max_retries, 3);
        assert_eq!(args.transfer.retry_base_ms, 500);
        assert_eq!(args.content_type, "application/octet-stream");
    }
}
