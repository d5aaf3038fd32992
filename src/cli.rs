//! CLI argument definitions for the relay.
//!
//! Kept apart from the binary entrypoint so parsing can be tested from the
//! library.

use crate::release::RepoId;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Relay the latest tagged release of a repository to an FTP server.
#[derive(Parser, Debug)]
#[command(name = "release-relay")]
#[command(version, about)]
#[command(long_about = concat!(
    "Relay the latest tagged release of a repository to an FTP server.\n\n",
    "The latest release is looked up on GitHub or a self-hosted Gitea, its ",
    "release-*.tar.gz asset is downloaded and unpacked, and the unpacked tree ",
    "is uploaded over FTP. Local copies are removed after a successful upload.\n\n",
    "Settings are read from the environment, optionally seeded from a .env file ",
    "in the working directory.",
))]
#[command(after_help = concat!(
    "ENVIRONMENT:\n",
    "  APIKEY                  Shared secret for the trigger endpoint (serve)\n",
    "  RELAY_PROVIDER          github (default) or gitea\n",
    "  GITHUB_TOKEN            Token for GitHub\n",
    "  GITEA_URL, GITEA_TOKEN  Base URL and token for Gitea\n",
    "  FTP_HOST                host, host:port or [v6]:port\n",
    "  FTP_USER, FTP_PASSWORD  FTP login\n",
    "  RELAY_DOWNLOAD_DIR      Working directory [default: ./downloads]\n",
    "  RELAY_ASSET_SELECTION   first (default) or newest\n",
    "  RELAY_ON_FILE_ERROR     abort (default) or continue\n",
    "  RELAY_BIND              Trigger address [default: 127.0.0.1:5000]\n\n",
    "EXAMPLES:\n",
    "  Relay once:\n",
    "    $ release-relay run --repo octo-org/site --remote-path public_html\n\n",
    "  Serve the trigger endpoint:\n",
    "    $ release-relay serve --bind 0.0.0.0:5000",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Relay the latest release once and exit.
    Run(RunArgs),

    /// Serve the HTTP trigger endpoint.
    Serve(ServeArgs),
}

/// Arguments for the run command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Repository in owner/name form.
    #[arg(short, long, value_name = "OWNER/NAME")]
    pub repo: RepoId,

    /// Destination directory on the FTP server.
    #[arg(long, value_name = "DIR")]
    pub remote_path: String,

    /// Hosting token used instead of the configured one.
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Working directory for the archive and its extracted tree.
    #[arg(long, value_name = "DIR")]
    pub download_dir: Option<Utf8PathBuf>,
}

/// Arguments for the serve command.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Working directory for the archive and its extracted tree.
    #[arg(long, value_name = "DIR")]
    pub download_dir: Option<Utf8PathBuf>,
}
