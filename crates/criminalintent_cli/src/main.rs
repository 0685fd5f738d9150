//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `criminalintent_core` linkage.
//! - Print the crimes of a store for quick local sanity checks.
//!
//! Usage: `criminalintent_cli [FILES_DIR]`. Without a directory an
//! in-memory store is used.

use criminalintent_core::{CrimeRepository, RepositoryConfig};
use std::process::ExitCode;
use std::time::Duration;

fn main() -> ExitCode {
    println!("criminalintent_core ping={}", criminalintent_core::ping());
    println!(
        "criminalintent_core version={}",
        criminalintent_core::core_version()
    );

    let config = match std::env::args().nth(1) {
        Some(files_dir) => RepositoryConfig::from_files_dir(files_dir),
        None => RepositoryConfig::in_memory(std::env::temp_dir().join("criminalintent-photos")),
    };

    let repo = match CrimeRepository::open(config) {
        Ok(repo) => repo,
        Err(err) => {
            eprintln!("failed to open crime store: {err}");
            return ExitCode::FAILURE;
        }
    };

    match repo.crimes().recv_timeout(Duration::from_secs(5)) {
        Some(Ok(crimes)) => {
            println!("crimes={}", crimes.len());
            for crime in crimes {
                println!(
                    "{} {} solved={} photo={}",
                    crime.id(),
                    crime.date().format("%Y-%m-%d"),
                    crime.is_solved,
                    repo.photo_file(&crime).display()
                );
            }
            ExitCode::SUCCESS
        }
        Some(Err(err)) => {
            eprintln!("failed to list crimes: {err}");
            ExitCode::FAILURE
        }
        None => {
            eprintln!("timed out waiting for crime list");
            ExitCode::FAILURE
        }
    }
}
