//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

#[derive(Parser, Debug)]
#[command(name = "pairwatch")]
#[command(version, about = "Watch a project tree for drawing/document pairs and file them")]
#[command(styles = clap_cargo_style())]
pub struct Cli {
    /// Settings file (defaults to the nearest .pairwatch/settings.toml)
    #[arg(short, long, global = true, env = "PAIRWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create .pairwatch/settings.toml with defaults
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Config,

    /// Watch the tree and process pairs until interrupted
    Watch {
        /// Directory to watch (overrides watch.root)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Skip the startup scan of existing files
        #[arg(long)]
        no_scan: bool,
    },

    /// List complete pairs under the tree without processing them
    Scan {
        /// Directory to scan (overrides watch.root)
        #[arg(short, long)]
        root: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_watch_args() {
        let cli = Cli::try_parse_from(["pairwatch", "watch", "--root", "/srv", "--no-scan"]).unwrap();
        match cli.command {
            Commands::Watch { root, no_scan } => {
                assert_eq!(root, Some(PathBuf::from("/srv")));
                assert!(no_scan);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
