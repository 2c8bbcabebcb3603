//! Command implementations for the CLI tool.

use std::path::{Path, PathBuf};

use zstarc::host::{self, OpenMode, Operation};
use zstarc::{Configuration, Error, codec, pack_file};

use crate::OutputFormat;
use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::{DecodeSummary, create_formatter};
use crate::progress::SimpleProgress;

/// Configuration for the extract command.
pub struct ExtractConfig<'a> {
    pub archive_path: &'a Path,
    pub output_dir: &'a Path,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Configuration for the create command.
pub struct CreateConfig<'a> {
    pub archive_path: &'a Path,
    pub file: &'a Path,
    pub level: Option<u32>,
    pub move_file: bool,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Extract command implementation
pub fn extract(config: &ExtractConfig<'_>) -> ExitCode {
    let formatter = create_formatter(config.format);

    let mut handle = match host::open_archive(config.archive_path, OpenMode::Extract) {
        Ok(h) => h,
        Err(e) => return report(&e),
    };
    let header = match handle.read_header() {
        Ok(h) => h,
        Err(e) => return report(&e),
    };

    if let Err(e) = std::fs::create_dir_all(config.output_dir) {
        eprintln!("Error creating output directory: {}", e);
        return ExitCode::IoError;
    }

    let progress = SimpleProgress::new(header.unpacked_size, config.quiet);
    progress.set_message(header.file_name.clone());
    handle.set_process_data_proc(Some(progress.callback()));

    let dest = config.output_dir.join(&header.file_name);
    let result = handle.process_file(Operation::Extract {
        dest_path: Some(config.output_dir.to_path_buf()),
        dest_name: PathBuf::from(&header.file_name),
    });
    handle.close();

    match result {
        Ok(bytes) => {
            progress.finish();
            let summary = DecodeSummary {
                header: &header,
                bytes,
                destination: Some(dest.as_path()),
            };
            print!("{}", formatter.format_extract_result(&summary));
            ExitCode::Success
        }
        Err(e) => {
            progress.abandon("Failed");
            report(&e)
        }
    }
}

/// Create command implementation
pub fn create(config: &CreateConfig<'_>) -> ExitCode {
    let formatter = create_formatter(config.format);

    let level = match config.level {
        Some(level) => match codec::check_level(level) {
            Ok(level) => level,
            Err(e) => return report(&e),
        },
        None => configured_level(),
    };

    let total = std::fs::metadata(config.file).ok().map(|m| m.len());
    let progress = SimpleProgress::new(total, config.quiet);
    if let Some(name) = config.file.file_name() {
        progress.set_message(name.to_string_lossy().into_owned());
    }

    let result = pack_file(config.file, config.archive_path, level, progress.callback());
    let stats = match result {
        Ok(stats) => stats,
        Err(e) => {
            progress.abandon("Failed");
            return report(&e);
        }
    };
    progress.finish();

    if config.move_file {
        if let Err(e) = std::fs::remove_file(config.file) {
            eprintln!("Error removing '{}': {}", config.file.display(), e);
            return ExitCode::IoError;
        }
    }

    print!(
        "{}",
        formatter.format_create_result(config.archive_path, &stats)
    );
    ExitCode::Success
}

/// List command implementation
pub fn list(archive_path: &Path, format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);

    let mut handle = match host::open_archive(archive_path, OpenMode::List) {
        Ok(h) => h,
        Err(e) => return report(&e),
    };
    let header = match handle.read_header() {
        Ok(h) => h,
        Err(e) => return report(&e),
    };
    handle.close();

    print!("{}", formatter.format_list(&header));
    ExitCode::Success
}

/// Test command implementation
pub fn test(archive_path: &Path, format: OutputFormat, quiet: bool) -> ExitCode {
    let formatter = create_formatter(format);

    let mut handle = match host::open_archive(archive_path, OpenMode::Extract) {
        Ok(h) => h,
        Err(e) => return report(&e),
    };
    let header = match handle.read_header() {
        Ok(h) => h,
        Err(e) => return report(&e),
    };

    let progress = SimpleProgress::new(header.unpacked_size, quiet);
    progress.set_message("Testing...");
    handle.set_process_data_proc(Some(progress.callback()));

    let result = handle.process_file(Operation::Test);
    handle.close();

    match result {
        Ok(bytes) => {
            progress.finish();
            let summary = DecodeSummary {
                header: &header,
                bytes,
                destination: None,
            };
            print!("{}", formatter.format_test_result(&summary));
            ExitCode::Success
        }
        Err(e) => {
            progress.abandon("Failed");
            report(&e)
        }
    }
}

/// Config command implementation
pub fn config(path: Option<&Path>, format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);

    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match Configuration::default_path() {
            Ok(p) => p,
            Err(e) => return report(&e),
        },
    };
    match host::configure_packer(Some(path.as_path())) {
        Ok(config) => {
            print!("{}", formatter.format_config(&path, &config));
            ExitCode::Success
        }
        Err(e) => report(&e),
    }
}

/// Level from the configuration file, or the codec default if unavailable.
fn configured_level() -> u32 {
    match Configuration::default_path() {
        Ok(path) => Configuration::load(path).clamped().compression_level,
        Err(e) => {
            log::debug!("no configuration path: {}", e);
            Configuration::default().compression_level
        }
    }
}

fn report(error: &Error) -> ExitCode {
    eprintln!("Error: {}", error);
    error_to_exit_code(error)
}
