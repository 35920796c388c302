use std::path::PathBuf;

use clap::Parser;

use crate::{data_loaders::config::ToolConfig, orchestrator::RunConfig};

#[derive(Parser, Debug)]
#[command(
    name = "win-wallpaper",
    version = concat!("v", env!("CARGO_PKG_VERSION")),
    about = "Replace Windows lock screen and account images with a solid color"
)]
pub struct Args {
    /// enter the directory to apply solid wallpapers to, includes offline images
    #[arg(long, value_name = "directory")]
    pub dir: PathBuf,

    /// enter the desired rgb value in hex format
    #[arg(long, value_name = "hex code")]
    pub rgb: String,

    /// enables Windows 7 support
    #[arg(long)]
    pub win7: bool,

    /// indicates that the image is mounted offline
    #[arg(long)]
    pub offline: bool,

    /// number of rewrite workers (defaults to one per CPU)
    #[arg(long, value_name = "n")]
    pub workers: Option<usize>,
}

impl Args {
    /// Command-line values win over the config file.
    pub fn into_run_config(self, config: &ToolConfig) -> RunConfig {
        RunConfig {
            target: self.dir,
            color: self.rgb,
            win7: self.win7,
            offline: self.offline,
            workers: self.workers.filter(|&n| n > 0).or(config.workers),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn test_required_and_flags() {
        let args = Args::try_parse_from([
            "win-wallpaper",
            "--dir",
            "D:\\image",
            "--rgb",
            "red",
            "--offline",
            "--win7",
        ])
        .unwrap();

        assert_eq!(args.dir, PathBuf::from("D:\\image"));
        assert_eq!(args.rgb, "red");
        assert!(args.offline);
        assert!(args.win7);
        assert_eq!(args.workers, None);
    }

    #[test]
    fn test_missing_rgb_is_usage_error() {
        let err = Args::try_parse_from(["win-wallpaper", "--dir", "C:\\mnt"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_version_flag() {
        let err = Args::try_parse_from(["win-wallpaper", "--version"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
        assert_eq!(err.exit_code(), 0);
        assert_eq!(err.to_string().trim(), "win-wallpaper v1.1.0");
    }

    #[test]
    fn test_cli_workers_override_config() {
        let config = ToolConfig {
            workers: Some(8),
            ..ToolConfig::default()
        };

        let from_config = Args::try_parse_from(["win-wallpaper", "--dir", "C:\\", "--rgb", "#fff"])
            .unwrap()
            .into_run_config(&config);
        assert_eq!(from_config.workers, Some(8));

        let from_cli = Args::try_parse_from([
            "win-wallpaper",
            "--dir",
            "C:\\",
            "--rgb",
            "#fff",
            "--workers",
            "2",
        ])
        .unwrap()
        .into_run_config(&config);
        assert_eq!(from_cli.workers, Some(2));
        assert!(!from_cli.win7 && !from_cli.offline);
    }
}
