use lancedb::{connect, Connection};
use std::path::Path;

use siteqa_core::{Error, Result};

pub async fn open_db(db_path: &Path) -> Result<Connection> {
	connect(db_path.to_string_lossy().as_ref())
		.execute()
		.await
		.map_err(|e| Error::index_unavailable(db_path, e))
}

pub async fn has_table(conn: &Connection, name: &str) -> Result<bool> {
	let names = conn.table_names().execute().await.map_err(anyhow::Error::from)?;
	Ok(names.iter().any(|n| n == name))
}
