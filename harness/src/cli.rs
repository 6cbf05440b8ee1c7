//! Command-line arguments for the loader harness.

use camino::Utf8PathBuf;
use clap::Parser;

/// Load a native library through a strategy chain and report where it came
/// from.
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "native-init-harness")]
#[command(about)]
#[command(after_help = concat!(
    "STRATEGY ORDER:\n",
    "  Without --config the chain is: --system, then --file, then resource\n",
    "  extraction into --fixed-dir (or a temporary directory when omitted).\n\n",
    "EXAMPLES:\n",
    "  Print the names the bundle must provide:\n",
    "    $ native-init-harness --library thelib --version 0.4.2 --relative-path lib --print-name\n\n",
    "  Try the system path, then extract from a resource directory:\n",
    "    $ native-init-harness --library thelib --system --resource-dir ./bundle\n\n",
    "  Use a configuration file:\n",
    "    $ native-init-harness --config loader.toml --resource-dir ./bundle\n\n",
    "Set RUST_LOG=debug to see extraction decisions.",
))]
pub struct Cli {
    /// TOML file describing the library and its strategy chain.
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with_all = ["library", "version", "relative_path", "system", "file", "fixed_dir"]
    )]
    pub config: Option<Utf8PathBuf>,

    /// Logical library name.
    #[arg(long, value_name = "NAME", required_unless_present = "config")]
    pub library: Option<String>,

    /// Version appended to extracted file names.
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,

    /// Directory prefix of bundled resource names.
    #[arg(long, value_name = "PATH")]
    pub relative_path: Option<String>,

    /// Directory holding bundled resources; resource names are relative to it.
    #[arg(long, value_name = "DIR")]
    pub resource_dir: Option<Utf8PathBuf>,

    /// Extract into this persistent directory instead of a temporary one.
    #[arg(long, value_name = "DIR")]
    pub fixed_dir: Option<Utf8PathBuf>,

    /// Try the system library search path first.
    #[arg(long)]
    pub system: bool,

    /// Try this absolute library path before extraction.
    #[arg(long, value_name = "PATH")]
    pub file: Option<Utf8PathBuf>,

    /// Print the resource and file names for this platform, then exit.
    #[arg(long)]
    pub print_name: bool,
}
