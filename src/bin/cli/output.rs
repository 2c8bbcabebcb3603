//! Output formatting for CLI operations.

use std::path::Path;

use serde_json::json;
use zstarc::progress::format_bytes_iec;
use zstarc::{Configuration, HeaderData, PackStats};

/// Outcome of decoding the entry, for extract and test.
pub struct DecodeSummary<'a> {
    pub header: &'a HeaderData,
    pub bytes: u64,
    pub destination: Option<&'a Path>,
}

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats the single entry as a listing
    fn format_list(&self, header: &HeaderData) -> String;

    /// Formats extraction results
    fn format_extract_result(&self, summary: &DecodeSummary<'_>) -> String;

    /// Formats test results
    fn format_test_result(&self, summary: &DecodeSummary<'_>) -> String;

    /// Formats archive creation results
    fn format_create_result(&self, archive: &Path, stats: &PackStats) -> String;

    /// Formats the effective configuration
    fn format_config(&self, path: &Path, config: &Configuration) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_list(&self, header: &HeaderData) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{:>12} {:>12} {:>19} {}\n",
            "Size", "Packed", "Modified", "Name"
        ));
        output.push_str(&"-".repeat(70));
        output.push('\n');

        let size_str = header
            .unpacked_size
            .map(format_bytes_iec)
            .unwrap_or_else(|| "?".to_string());
        output.push_str(&format!(
            "{:>12} {:>12} {:>19} {}\n",
            size_str,
            format_bytes_iec(header.pack_size),
            header.file_time.to_string(),
            header.file_name
        ));

        output.push_str(&"-".repeat(70));
        output.push('\n');
        output.push_str(&format!("Archive: {}\n", header.archive_name));

        output
    }

    fn format_extract_result(&self, summary: &DecodeSummary<'_>) -> String {
        match summary.destination {
            Some(dest) => format!(
                "Extracted {} ({}) to {}\n",
                summary.header.file_name,
                format_bytes_iec(summary.bytes),
                dest.display()
            ),
            None => format!(
                "Extracted {} ({})\n",
                summary.header.file_name,
                format_bytes_iec(summary.bytes)
            ),
        }
    }

    fn format_test_result(&self, summary: &DecodeSummary<'_>) -> String {
        format!(
            "OK - {} decodes to {}\n",
            summary.header.archive_name,
            format_bytes_iec(summary.bytes)
        )
    }

    fn format_create_result(&self, archive: &Path, stats: &PackStats) -> String {
        format!(
            "Created {}: {} -> {} ({:.1}%)\n",
            archive.display(),
            format_bytes_iec(stats.bytes_in),
            format_bytes_iec(stats.bytes_out),
            stats.ratio() * 100.0
        )
    }

    fn format_config(&self, path: &Path, config: &Configuration) -> String {
        format!(
            "Config file:        {}\nCompression level:  {}\n",
            path.display(),
            config.compression_level
        )
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_list(&self, header: &HeaderData) -> String {
        let obj = json!({
            "archive": header.archive_name,
            "name": header.file_name,
            "packed_size": header.pack_size,
            "size": header.unpacked_size,
            "modified": header.file_time.to_string(),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_extract_result(&self, summary: &DecodeSummary<'_>) -> String {
        let obj = json!({
            "success": true,
            "name": summary.header.file_name,
            "bytes_extracted": summary.bytes,
            "destination": summary.destination.map(|p| p.display().to_string()),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_test_result(&self, summary: &DecodeSummary<'_>) -> String {
        let obj = json!({
            "success": true,
            "archive": summary.header.archive_name,
            "bytes_decoded": summary.bytes,
            "declared_size": summary.header.unpacked_size,
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_create_result(&self, archive: &Path, stats: &PackStats) -> String {
        let obj = json!({
            "success": true,
            "archive": archive.display().to_string(),
            "bytes_in": stats.bytes_in,
            "bytes_out": stats.bytes_out,
            "ratio": stats.ratio(),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_config(&self, path: &Path, config: &Configuration) -> String {
        let obj = json!({
            "path": path.display().to_string(),
            "compression_level": config.compression_level,
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}
