//! Subcommand handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::json;
use walkdir::WalkDir;

use super::{combine_attrs, Commands, ConfigArgs, ExtractSpec, ExtsArgs, InfoArgs, ScanArgs, ThumbArgs};
use crate::config::{generate_sample_config, Config, OutputFormat};
use crate::factory::{supported_file_extensions, supported_mime_types, RomDataFactory};
use crate::file::RpFileStd;
use crate::output::text::{self, StatusIcons};
use crate::output::Report;
use crate::preview::{extract_image, Thumbnailer};
use crate::romdata::{RomData, RomDataAttrs, SystemNameType};

/// Dispatch a parsed subcommand.
pub fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Info(args) => run_info(&args, config),
        Commands::Scan(args) => run_scan(&args, config),
        Commands::Thumb(args) => run_thumb(&args, config),
        Commands::Exts(args) => run_exts(&args),
        Commands::Config(args) => run_config(&args),
    }
}

/// Open and detect one file. `Ok(None)` means no format accepted it.
fn detect(path: &Path, attrs: RomDataAttrs) -> Result<Option<Arc<dyn RomData>>> {
    let file = RpFileStd::open_shared(path).with_context(|| format!("Failed to open: {}", path.display()))?;
    Ok(RomDataFactory::create(&file, attrs))
}

/// Capabilities from the command line, falling back to the config.
fn required_attrs(cli: &[RomDataAttrs], config: &Config) -> RomDataAttrs {
    if cli.is_empty() {
        config.scan.required_attrs()
    } else {
        combine_attrs(cli)
    }
}

/// Where `--extract` writes for `source`. Relative paths land in the
/// configured export dir; with several inputs the source stem is prefixed.
fn extract_dest(spec: &ExtractSpec, source: &Path, multiple: bool, config: &Config) -> PathBuf {
    let mut dest = match &config.images.export_dir {
        Some(dir) if spec.path.is_relative() => dir.join(&spec.path),
        _ => spec.path.clone(),
    };
    if multiple {
        if let (Some(stem), Some(name)) = (source.file_stem(), spec.path.file_name()) {
            dest.set_file_name(format!("{}-{}", stem.to_string_lossy(), name.to_string_lossy()));
        }
    }
    dest
}

fn run_info(args: &InfoArgs, config: &Config) -> Result<()> {
    let attrs = required_attrs(&args.require, config);
    let json = args.json || config.output.format == OutputFormat::Json;
    let multiple = args.files.len() > 1;
    let mut reports = Vec::new();

    for path in &args.files {
        let display = path.display().to_string();
        let rd = match detect(path, attrs) {
            Ok(Some(rd)) => rd,
            Ok(None) => {
                eprintln!("{}", text::render_unsupported(&display));
                continue;
            }
            Err(e) => {
                eprintln!("{}", text::render_error(&display, &format!("{e:#}")));
                continue;
            }
        };

        let report = Report::from_rom(path, rd.as_ref(), &config.output);
        if json {
            reports.push(report);
        } else {
            print!("{}", text::render(&report));
        }

        for spec in &args.extract {
            let dest = extract_dest(spec, path, multiple, config);
            match extract_image(rd.as_ref(), spec.image_type, &dest) {
                Ok(()) => eprintln!(
                    "{} Extracted {} to {}",
                    StatusIcons::SUCCESS.green(),
                    spec.image_type.name(),
                    dest.display()
                ),
                Err(e) => eprintln!("{}", text::render_error(&display, &format!("{e:#}"))),
            }
        }
        rd.close();
    }

    if json {
        let out = if config.output.pretty_json {
            serde_json::to_string_pretty(&reports)?
        } else {
            serde_json::to_string(&reports)?
        };
        println!("{out}");
    }
    Ok(())
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_str().is_some_and(|s| s.starts_with('.'))
}

/// Files under `dir`, sorted by path.
fn collect_files(dir: &Path, skip_hidden: bool, max_depth: usize) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(dir).follow_links(false).sort_by_file_name();
    if max_depth > 0 {
        walker = walker.max_depth(max_depth);
    }
    walker
        .into_iter()
        .filter_entry(|e| !skip_hidden || !is_hidden(e))
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!("Skipping: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// One recognized file from a scan. The parser is closed once this is built.
struct ScanHit {
    path: PathBuf,
    size: u64,
    class_name: &'static str,
    system: Option<&'static str>,
    report: Option<Report>,
}

fn scan_one(path: &Path, attrs: RomDataAttrs, config: &Config, json: bool) -> Option<ScanHit> {
    let rd = match detect(path, attrs) {
        Ok(Some(rd)) => rd,
        Ok(None) => return None,
        Err(e) => {
            tracing::debug!("{:#}", e);
            return None;
        }
    };
    let hit = ScanHit {
        path: path.to_path_buf(),
        size: rd.base().file().and_then(|f| f.size().ok()).unwrap_or(0),
        class_name: rd.class_name(),
        system: rd.system_name(SystemNameType::Long),
        report: json.then(|| Report::from_rom(path, rd.as_ref(), &config.output)),
    };
    rd.close();
    Some(hit)
}

fn run_scan(args: &ScanArgs, config: &Config) -> Result<()> {
    if !args.dir.is_dir() {
        anyhow::bail!("Not a directory: {}", args.dir.display());
    }
    let attrs = required_attrs(&args.require, config);
    let json = args.json || config.output.format == OutputFormat::Json;
    let skip_hidden = config.scan.skip_hidden && !args.hidden;
    let max_depth = args.depth.unwrap_or(config.scan.max_depth);
    let workers = args.workers.unwrap_or(config.scan.workers);

    let files = collect_files(&args.dir, skip_hidden, max_depth);
    tracing::info!("Scanning {} files in {}", files.len(), args.dir.display());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("Failed to build worker pool")?;

    let hits: Vec<ScanHit> = pool.install(|| {
        files
            .par_iter()
            .filter_map(|path| scan_one(path, attrs, config, json))
            .collect()
    });

    let total_bytes: u64 = hits.iter().map(|h| h.size).sum();
    for hit in &hits {
        match &hit.report {
            Some(report) => println!("{}", report.to_json(false)?),
            None => println!(
                "{:<18} {:<32} {}",
                hit.class_name.cyan(),
                hit.system.unwrap_or("Unknown"),
                hit.path.display()
            ),
        }
    }

    eprintln!(
        "{} {} of {} files recognized ({})",
        StatusIcons::INFO.cyan(),
        hits.len().to_string().bold(),
        files.len(),
        humansize::format_size(total_bytes, humansize::BINARY)
    );
    Ok(())
}

fn run_thumb(args: &ThumbArgs, config: &Config) -> Result<()> {
    let size = args.size.unwrap_or(config.images.thumbnail_size);
    let written = Thumbnailer::new().generate(&args.file, &args.out, size)?;
    eprintln!("{} Thumbnail written to {}", StatusIcons::SUCCESS.green(), written.display());
    Ok(())
}

/// `HAS_THUMBNAIL` -> `thumbnail`.
fn attr_tags(attrs: RomDataAttrs) -> Vec<String> {
    attrs
        .names()
        .into_iter()
        .map(|n| n.trim_start_matches("HAS_").to_ascii_lowercase())
        .collect()
}

fn run_exts(args: &ExtsArgs) -> Result<()> {
    let exts = supported_file_extensions();
    let mimes = supported_mime_types();

    if args.json {
        let value = json!({
            "extensions": exts.iter().map(|e| json!({ "ext": e.ext, "attrs": attr_tags(e.attrs) })).collect::<Vec<_>>(),
            "mime_types": mimes.iter().map(|m| json!({ "mime_type": m.mime_type, "attrs": attr_tags(m.attrs) })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", "Extensions".yellow().bold());
    for e in exts {
        println!("  {:<12} {}", e.ext, attr_tags(e.attrs).join(", "));
    }
    println!("\n{}", "MIME types".yellow().bold());
    for m in mimes {
        println!("  {:<40} {}", m.mime_type, attr_tags(m.attrs).join(", "));
    }
    Ok(())
}

fn run_config(args: &ConfigArgs) -> Result<()> {
    if args.init {
        let path = Config::init_default()?;
        println!("{} Config at {}", StatusIcons::SUCCESS.green(), path.display());
    } else {
        print!("{}", generate_sample_config());
    }
    Ok(())
}
