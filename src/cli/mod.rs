//! CLI module - Command line interface definitions and handlers

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::romdata::{ImageType, RomDataAttrs};

/// Romscope - Offline ROM, save and game-file identification
///
/// Detects file formats from content and extension, and prints the
/// metadata fields they carry. All operations are READ-ONLY.
#[derive(Parser, Debug)]
#[command(name = "romscope")]
#[command(version)]
#[command(about = "Offline ROM, save and game-file identification", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output (debug logging)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect files and print their fields, metadata and images
    Info(InfoArgs),

    /// Detect every file under a directory
    Scan(ScanArgs),

    /// Write a scaled PNG thumbnail of a file's best internal image
    Thumb(ThumbArgs),

    /// List supported file extensions and MIME types
    Exts(ExtsArgs),

    /// Print the sample config, or write it to the default location
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Parser)]
pub struct InfoArgs {
    /// Files to inspect
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Only accept formats with these capabilities (thumbnail, metadata, dpoverlay)
    #[arg(long, value_delimiter = ',', value_parser = parse_attr)]
    pub require: Vec<RomDataAttrs>,

    /// Extract an internal image as PNG, e.g. icon=out.png (repeatable)
    #[arg(long, value_parser = parse_extract)]
    pub extract: Vec<ExtractSpec>,
}

#[derive(Debug, Clone, Parser)]
pub struct ScanArgs {
    /// Directory to scan
    #[arg(required = true)]
    pub dir: PathBuf,

    /// Print one JSON report per line
    #[arg(long)]
    pub json: bool,

    /// Include hidden files
    #[arg(long)]
    pub hidden: bool,

    /// Maximum depth to traverse
    #[arg(long, short)]
    pub depth: Option<usize>,

    /// Number of parallel workers (default: CPU count)
    #[arg(long, short)]
    pub workers: Option<usize>,

    /// Only accept formats with these capabilities
    #[arg(long, value_delimiter = ',', value_parser = parse_attr)]
    pub require: Vec<RomDataAttrs>,
}

#[derive(Debug, Clone, Parser)]
pub struct ThumbArgs {
    /// File to render
    #[arg(required = true)]
    pub file: PathBuf,

    /// Output PNG path
    #[arg(required = true)]
    pub out: PathBuf,

    /// Longest edge in pixels (default: config thumbnail_size)
    #[arg(long, short)]
    pub size: Option<u32>,
}

#[derive(Debug, Clone, Parser)]
pub struct ExtsArgs {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Parser)]
pub struct ConfigArgs {
    /// Write the sample config to the default path if none exists
    #[arg(long)]
    pub init: bool,
}

/// `TYPE=PATH` from `--extract`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSpec {
    pub image_type: ImageType,
    pub path: PathBuf,
}

fn parse_attr(s: &str) -> Result<RomDataAttrs, String> {
    RomDataAttrs::from_name(s).ok_or_else(|| format!("unknown capability '{s}' (expected one of: thumbnail, metadata, dpoverlay)"))
}

fn parse_extract(s: &str) -> Result<ExtractSpec, String> {
    let (kind, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TYPE=PATH, got '{s}'"))?;
    let image_type = ImageType::from_name(kind)
        .filter(|t| t.is_internal())
        .ok_or_else(|| format!("unknown image type '{kind}' (expected one of: icon, banner, media, image)"))?;
    if path.is_empty() {
        return Err("empty output path".to_string());
    }
    Ok(ExtractSpec {
        image_type,
        path: PathBuf::from(path),
    })
}

/// OR together repeated `--require` values.
pub fn combine_attrs(attrs: &[RomDataAttrs]) -> RomDataAttrs {
    attrs.iter().fold(RomDataAttrs::NONE, |acc, &a| acc | a)
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
    fn test_parse_info_args() {
        let cli = Cli::try_parse_from([
            "romscope",
            "info",
            "a.gba",
            "b.nes",
            "--require",
            "thumbnail,metadata",
            "--extract",
            "icon=out/icon.png",
        ])
        .unwrap();
        let Commands::Info(args) = cli.command else {
            panic!("expected info");
        };
        assert_eq!(args.files.len(), 2);
        assert_eq!(
            combine_attrs(&args.require),
            RomDataAttrs::HAS_THUMBNAIL | RomDataAttrs::HAS_METADATA
        );
        assert_eq!(args.extract[0].image_type, ImageType::IntIcon);
        assert_eq!(args.extract[0].path, PathBuf::from("out/icon.png"));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Cli::try_parse_from(["romscope", "info", "a", "--require", "sparkles"]).is_err());
        assert!(Cli::try_parse_from(["romscope", "info", "a", "--extract", "icon"]).is_err());
        assert!(Cli::try_parse_from(["romscope", "info", "a", "--extract", "ext-cover=x.png"]).is_err());
    }
}
