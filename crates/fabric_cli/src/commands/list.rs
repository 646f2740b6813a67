//! List command implementation.

use fabric_journal::{keys, EntryState, FileJournal, JournalEntry, JournalStore};
use std::path::Path;

/// Runs the list command.
pub fn run(
    journal_path: &Path,
    state: Option<EntryState>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if !journal_path.exists() {
        return Err(format!("No journal found at {:?}", journal_path).into());
    }

    let journal = FileJournal::open(journal_path)?;
    let entries = select(journal.all_entries()?, state);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            print!("{}", render_text(&entries));
        }
    }

    Ok(())
}

fn select(mut entries: Vec<JournalEntry>, state: Option<EntryState>) -> Vec<JournalEntry> {
    if let Some(state) = state {
        entries.retain(|entry| entry.state == state);
    }
    entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.key().cmp(&b.key())));
    entries
}

fn render_text(entries: &[JournalEntry]) -> String {
    let mut out = String::new();
    if entries.is_empty() {
        out.push_str("No entries\n");
        return out;
    }

    out.push_str(&format!(
        "{:<8} {:<36} {:<9} {:<9} {:>4}  UPDATED\n",
        "TYPE", "RESOURCE", "STATE", "OPERATION", "REV"
    ));
    for entry in entries {
        out.push_str(&format!(
            "{:<8} {:<36} {:<9} {:<9} {:>4}  {}\n",
            entry.resource_type.as_str(),
            entry.resource_uuid,
            entry.state.as_str(),
            entry.data.get_str(keys::OPERATION).unwrap_or("-"),
            entry.revision_number,
            entry.updated_at.format("%Y-%m-%d %H:%M:%S"),
        ));
        if let Some(error) = &entry.last_error {
            out.push_str(&format!("         error: {}\n", error));
        }
    }
    out
}
