use anyhow::Result;
use hyperion_core::ics::IcsPublisher;
use hyperion_core::{Database, Settings};
use owo_colors::OwoColorize;

pub fn run(settings: Settings) -> Result<()> {
    let db = Database::open(&settings.database_path)?;
    let publisher = IcsPublisher::new(
        settings.ics_path.clone(),
        settings.school.application_domain_name.clone(),
    );

    let count = publisher.rebuild(&db)?;

    println!(
        "{} {} with {} events",
        "Wrote".green(),
        publisher.path().display(),
        count
    );

    Ok(())
}
