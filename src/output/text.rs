//! Colored terminal rendering.

use std::fmt::Write as _;

use colored::Colorize;

use super::{FieldReport, Report};

/// Status indicators
pub struct StatusIcons;

impl StatusIcons {
    pub const SUCCESS: &'static str = "✓";
    pub const ERROR: &'static str = "✗";
    pub const WARNING: &'static str = "⚠";
    pub const INFO: &'static str = "ℹ";
}

const NAME_WIDTH: usize = 24;

fn write_field(out: &mut String, field: &FieldReport) {
    let mut lines = field.text.lines();
    let first = lines.next().unwrap_or("");
    let _ = writeln!(out, "  {:<width$} {}", field.name.cyan(), first, width = NAME_WIDTH);
    // Continuation lines (lists, multi-line strings) align under the value.
    for line in lines {
        let _ = writeln!(out, "  {:<width$} {}", "", line, width = NAME_WIDTH);
    }
}

/// Render a report as indented, colored text.
pub fn render(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", StatusIcons::SUCCESS.green(), report.path.bold());
    let system = report.system.unwrap_or("Unknown");
    let _ = writeln!(
        out,
        "  {:<width$} {} ({})",
        "Format".cyan(),
        system.bold(),
        report.class_name,
        width = NAME_WIDTH
    );
    let _ = writeln!(out, "  {:<width$} {}", "File Type".cyan(), report.file_type, width = NAME_WIDTH);

    for tab in &report.tabs {
        if let Some(name) = &tab.name {
            let _ = writeln!(out, "\n {}", format!("[{name}]").yellow().bold());
        }
        for field in &tab.fields {
            write_field(&mut out, field);
        }
    }

    if !report.metadata.is_empty() {
        let _ = writeln!(out, "\n {}", "[Metadata]".yellow().bold());
        for prop in &report.metadata {
            let value = match prop.value.as_str() {
                Some(s) => s.to_string(),
                None => serde_json::to_string(&prop.value).unwrap_or_default(),
            };
            let _ = writeln!(out, "  {:<width$} {}", prop.name.cyan(), value, width = NAME_WIDTH);
        }
    }

    if !report.images.is_empty() {
        let _ = writeln!(
            out,
            "\n  {:<width$} {}",
            "Images".cyan(),
            report.images.join(", "),
            width = NAME_WIDTH
        );
    }
    for url in &report.ext_urls {
        let _ = writeln!(out, "  {:<width$} {}", "External".cyan(), url.url, width = NAME_WIDTH);
    }
    out
}

/// One-line message for a file no parser accepted.
pub fn render_unsupported(path: &str) -> String {
    format!("{} {}: {}", StatusIcons::WARNING.yellow(), path, "unsupported format".yellow())
}

/// One-line message for a file that could not be read.
pub fn render_error(path: &str, err: &dyn std::fmt::Display) -> String {
    format!("{} {}: {}", StatusIcons::ERROR.red(), path, err.to_string().red())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputConfig;
    use crate::file::MemFile;
    use crate::formats::nsf::tests::make_nsf;
    use crate::formats::Nsf;
    use crate::romdata::RomDataClass;
    use std::path::Path;

    #[test]
    fn test_render_contains_values() {
        let nsf = Nsf::new(MemFile::new(make_nsf()).with_name("song.nsf").into_shared());
        let report = Report::from_rom(Path::new("song.nsf"), &nsf, &OutputConfig::default());
        let text = render(&report);

        assert!(text.contains("song.nsf"));
        assert!(text.contains("NSF"));
        for tab in &report.tabs {
            for field in &tab.fields {
                let first = field.text.lines().next().unwrap_or("");
                assert!(text.contains(first), "missing {}", field.name);
            }
        }
    }

    #[test]
    fn test_unsupported_line() {
        assert!(render_unsupported("a.bin").contains("unsupported format"));
        assert!(render_error("a.bin", &"boom").contains("boom"));
    }
}
