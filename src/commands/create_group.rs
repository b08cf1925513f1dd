use anyhow::Result;
use hyperion_core::users::{self, GroupCreate};
use hyperion_core::{Database, Settings};
use owo_colors::OwoColorize;

pub fn run(settings: Settings, name: String, description: Option<String>) -> Result<()> {
    let db = Database::open(&settings.database_path)?;

    let group = db.transaction(|tx| users::create_group(tx, &GroupCreate { name, description }))?;

    println!("{} group {}", "Created".green(), group.name.bold());
    println!("  Id: {}", group.id.yellow());

    Ok(())
}
