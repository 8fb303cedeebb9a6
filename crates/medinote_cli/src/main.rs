//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `medinote_core` linkage and print crate status.
//! - Optionally open a note database and report note/article counts.
//!
//! Usage: `medinote_cli [DB_PATH] [--settings SETTINGS_JSON]`

use clap::Parser;
use medinote_core::{
    load_settings, open_db, KnowledgeRepository, NoteRepository, SqliteKnowledgeRepository,
    SqliteNoteRepository,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about = "MediNote core smoke check", long_about = None)]
struct Args {
    /// SQLite note database to open and summarize
    #[arg(value_name = "DB_PATH")]
    db_path: Option<PathBuf>,

    /// Settings JSON file to load and summarize
    #[arg(short, long, value_name = "SETTINGS_JSON")]
    settings: Option<PathBuf>,
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    println!("medinote_core ping={}", medinote_core::ping());
    println!("medinote_core version={}", medinote_core::core_version());

    if let Some(path) = args.settings {
        let settings = load_settings(&path)?;
        println!(
            "settings autosave_enabled={} autosave_interval_ms={} llm_configured={}",
            settings.autosave.enabled,
            settings.autosave.interval_ms,
            settings.llm.has_api_key()
        );
    }

    if let Some(path) = args.db_path {
        let mut conn = open_db(&path)?;
        let notes = SqliteNoteRepository::new(&conn).count_notes()?;
        let knowledge = SqliteKnowledgeRepository::new(&mut conn);
        let articles = knowledge.count_articles()?;
        let tags = knowledge.list_tags()?.len();
        println!("db notes={notes} articles={articles} tags={tags}");
    }
    Ok(())
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
