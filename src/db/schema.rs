use anyhow::{Context, Result};
use rusqlite::Connection;

const SCHEMA: &str = include_str!("schema.sql");

/// Creates any missing tables and indexes. Safe to run on every start.
pub fn create_schema(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA)
        .context("Failed to create database schema")?;
    tx.commit()?;

    tracing::info!("Database schema ready");
    Ok(())
}
