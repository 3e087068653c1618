//! `migrate` command handler — creates or updates the SQLite schema.

use anyhow::Result;

use transcribe_core::settings::Settings;

use crate::bootstrap::resolve_db_path;

pub async fn execute(settings: &Settings) -> Result<()> {
    let db_path = resolve_db_path(settings);
    println!("applying schema to {}", db_path.display());
    transcribe_db::setup_database(&db_path).await?;
    println!("schema is up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrate_creates_schema_in_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.store_url = format!("sqlite://{}", dir.path().join("test.db").display());
        execute(&settings).await.unwrap();
        assert!(dir.path().join("test.db").exists());
    }
}
