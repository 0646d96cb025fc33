use clap::{Parser, Subcommand};

use crate::download::quality::QualityTier;

#[derive(Parser)]
#[command(name = "vidrelay")]
#[command(author, version, about = "Telegram bot that downloads YouTube and Instagram videos", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (default)
    Run,

    /// Show the estimated size of every quality for a link
    Info {
        /// YouTube or Instagram link
        url: String,
    },

    /// Download a link locally with the bot's format selection
    Download {
        /// YouTube or Instagram link
        url: String,

        /// 144p, 360p, 480p, 720p or best
        #[arg(short, long, default_value = "720p")]
        quality: QualityTier,

        /// Split the result into parts below the upload limit
        #[arg(long)]
        split: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_runs_bot() {
        let cli = Cli::try_parse_from(["vidrelay"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_download_args() {
        let cli = Cli::try_parse_from([
            "vidrelay",
            "download",
            "https://youtu.be/dQw4w9WgXcQ",
            "--quality",
            "480p",
            "--split",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Download { url, quality, split }) => {
                assert_eq!(url, "https://youtu.be/dQw4w9WgXcQ");
                assert_eq!(quality, QualityTier::P480);
                assert!(split);
            }
            _ => panic!("expected download command"),
        }
    }

    #[test]
    fn test_unknown_quality_rejected() {
        assert!(Cli::try_parse_from(["vidrelay", "download", "https://youtu.be/x", "-q", "4k"]).is_err());
    }
}
