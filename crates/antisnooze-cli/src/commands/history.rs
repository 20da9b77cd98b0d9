use clap::Subcommand;

use antisnooze_core::{HistoryDb, HistoryStore};

#[derive(Subcommand)]
pub enum HistoryCmd {
    /// Print recorded alarms as JSON, oldest first
    List {
        /// Keep only the most recent N entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete all recorded alarms
    Clear,
}

pub fn run(action: HistoryCmd) -> Result<(), Box<dyn std::error::Error>> {
    let db = HistoryDb::open()?;

    match action {
        HistoryCmd::List { limit } => {
            let mut entries = db.list()?;
            if let Some(limit) = limit {
                let skip = entries.len().saturating_sub(limit);
                entries.drain(..skip);
            }
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        HistoryCmd::Clear => {
            let removed = db.clear()?;
            println!("removed {removed} entries");
        }
    }
    Ok(())
}
