//! Static dataset server and the file-reading JSON API.
//!
//! `GET /api/emissions` reads one CSV from disk and answers with its rows as
//! an array of header-keyed objects. Everything under `<root>/datasets` is
//! served at `<base_path>/datasets/`.

use crate::dataset::StaticConfig;
use crate::models::Record;
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use csv::ReaderBuilder;
use serde_json::{Value, json};
use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::services::ServeDir;

pub const DEFAULT_EMISSIONS_CSV: &str = "datasets/co-emissions-per-capita.csv";
pub const READ_ERROR: &str = "Failed to read and parse CSV file";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Directory holding `datasets/`.
    pub root: PathBuf,
    /// CSV read by the API route, relative to `root`.
    pub emissions_csv: PathBuf,
    pub static_config: StaticConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            emissions_csv: PathBuf::from(DEFAULT_EMISSIONS_CSV),
            static_config: StaticConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn emissions_path(&self) -> PathBuf {
        self.root.join(&self.emissions_csv)
    }

    pub fn datasets_dir(&self) -> PathBuf {
        self.root.join("datasets")
    }

    /// Mount point of the dataset directory.
    pub fn datasets_route(&self) -> String {
        self.static_config.static_file("/datasets")
    }
}

/// Every row of the CSV at `path`, blank lines skipped.
///
/// Unlike the page loader this reader is strict: a row whose field count
/// differs from the header is an error.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut rdr = ReaderBuilder::new().flexible(false).from_reader(f);
    let headers = rdr.headers().context("read csv header")?.clone();
    let mut out = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("parse csv record {}", i + 1))?;
        out.push(Record::from_parts(headers.iter(), rec.iter()));
    }
    Ok(out)
}

/// Status and JSON body answered by the file-reading route.
pub fn read_records_response(path: &Path) -> (StatusCode, Value) {
    match read_records(path) {
        Ok(records) => (
            StatusCode::OK,
            Value::Array(records.iter().map(Record::to_json).collect()),
        ),
        Err(e) => {
            log::warn!("api: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": READ_ERROR }))
        }
    }
}

async fn get_emissions(State(config): State<Arc<ServerConfig>>) -> impl IntoResponse {
    let path = config.emissions_path();
    let (status, body) = tokio::task::spawn_blocking(move || read_records_response(&path))
        .await
        .unwrap_or_else(|e| {
            log::warn!("api: reader task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": READ_ERROR }))
        });
    (status, Json(body))
}

pub fn router(config: Arc<ServerConfig>) -> Router {
    let datasets = ServeDir::new(config.datasets_dir());
    Router::new()
        .route("/api/emissions", get(get_emissions))
        .nest_service(&config.datasets_route(), datasets)
        .with_state(config)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, config: ServerConfig) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {}", addr))?;
    log::info!(
        "serving {} at http://{}{}",
        config.datasets_dir().display(),
        listener.local_addr()?,
        config.datasets_route()
    );
    axum::serve(listener, router(Arc::new(config)))
        .await
        .context("http server")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_become_objects() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("e.csv");
        std::fs::write(&p, "Entity,Year,Value\nItaly,2020,5.1\n\nFrance,2020,4.2\n").unwrap();
        let (status, body) = read_records_response(&p);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                {"Entity": "Italy", "Year": "2020", "Value": "5.1"},
                {"Entity": "France", "Year": "2020", "Value": "4.2"}
            ])
        );
    }

    #[test]
    fn missing_file_is_a_generic_500() {
        let (status, body) = read_records_response(Path::new("/definitely/not/here.csv"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Failed to read and parse CSV file"}));
    }

    #[test]
    fn ragged_rows_are_a_generic_500() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("e.csv");
        std::fs::write(&p, "Entity,Year,Value\nItaly,2020\nFrance,2020,4.2,extra,more\n").unwrap();
        let (status, body) = read_records_response(&p);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Failed to read and parse CSV file"}));

        std::fs::write(&p, "Entity,Year,Value\nFrance,2020,4.2,extra\n").unwrap();
        assert!(read_records(&p).is_err());
    }

    #[test]
    fn dataset_route_uses_base_path() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.datasets_route(), "/DataVis-Project/datasets");
        assert_eq!(cfg.emissions_path(), PathBuf::from("./datasets/co-emissions-per-capita.csv"));
    }
}
