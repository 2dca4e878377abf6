//! Common utility functions for the simulation driver.
//!
//! This module contains shared utilities for the CLI:
//! - Logger initialization
//! - Input and output path validation

use std::error::Error;
use std::path::{Path, PathBuf};

/// Initialize the logger with the specified configuration.
///
/// # Arguments
/// * `log_level` - Log level string (off, error, warn, info, debug, trace)
/// * `log_file` - Optional path to log file (logs to stderr if None)
///
/// # Errors
/// Returns an error if the log file cannot be opened or logger initialization fails.
pub fn init_logger(log_level: &str, log_file: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    use std::io::Write;

    let level = log_level.parse::<log::LevelFilter>().unwrap_or_else(|_| {
        eprintln!("Invalid log level '{}', defaulting to 'info'", log_level);
        log::LevelFilter::Info
    });

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] {} - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    if let Some(log_path) = log_file {
        ensure_parent_dir(log_path)?;
        let target = Box::new(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)?,
        );
        builder.target(env_logger::Target::Pipe(target));
    }

    builder.try_init()?;
    Ok(())
}

/// Validate that an input path exists and is a regular file.
///
/// # Errors
/// Returns an error if the path does not exist or is not a file.
pub fn validate_input_file(input: &Path) -> Result<(), Box<dyn Error>> {
    if !input.exists() {
        return Err(format!("Input path '{}' does not exist.", input.display()).into());
    }
    if !input.is_file() {
        return Err(format!("Input path '{}' is not a file.", input.display()).into());
    }
    Ok(())
}

/// Create the parent directory of `path` when it is missing.
pub fn ensure_parent_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Output path of trial `trial` out of `trials`.
///
/// A single trial writes to `output` unchanged; otherwise the trial index is appended to the file stem,
/// so `run.csv` becomes `run_0.csv`, `run_1.csv` and so on.
pub fn trial_output_path(output: &Path, trial: usize, trials: usize) -> PathBuf {
    if trials <= 1 {
        return output.to_path_buf();
    }
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("results");
    let name = match output.extension().and_then(|s| s.to_str()) {
        Some(ext) => format!("{stem}_{trial}.{ext}"),
        None => format!("{stem}_{trial}"),
    };
    output.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_input_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("map.csv");
        std::fs::write(&file, "id,x,y\n").unwrap();
        assert!(validate_input_file(&file).is_ok());
    }
    #[test]
    fn test_validate_input_file_rejects_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(validate_input_file(temp_dir.path()).is_err());
    }
    #[test]
    fn test_validate_input_file_nonexistent() {
        assert!(validate_input_file(Path::new("/nonexistent/map.csv")).is_err());
    }
    #[test]
    fn test_ensure_parent_dir_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("nested").join("deeper").join("run.csv");
        ensure_parent_dir(&output).unwrap();
        assert!(output.parent().unwrap().is_dir());
        assert!(ensure_parent_dir(Path::new("run.csv")).is_ok());
    }
    #[test]
    fn test_trial_output_path() {
        let output = Path::new("out/run.csv");
        assert_eq!(trial_output_path(output, 0, 1), PathBuf::from("out/run.csv"));
        assert_eq!(trial_output_path(output, 2, 5), PathBuf::from("out/run_2.csv"));
        assert_eq!(
            trial_output_path(Path::new("out/run"), 1, 3),
            PathBuf::from("out/run_1")
        );
    }
}
