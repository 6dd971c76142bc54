//! Dataset acquisition: fetch a static CSV (local file or HTTP) and map each
//! row through a caller-supplied closure.
//!
//! The asynchronous path is [`DatasetHandle`]: one worker thread per fetch,
//! publishing its result through a channel. The handle exposes a three-state
//! [`LoadState`], so "still loading", "loaded but empty" and "failed" stay
//! distinct. There is no retry; a failure is logged and surfaced as
//! [`LoadState::Failed`].
//!
//! ```no_run
//! use datavis::dataset::{DatasetSource, load_blocking};
//!
//! let source = DatasetSource::local("public");
//! let rows = load_blocking(&source, "co-emissions-per-capita.csv", |r, _| {
//!     Some((r.str("Entity").to_string(), r.num("Annual CO2 emissions (per capita)")))
//! });
//! println!("{:?}", rows.rows().map(|r| r.len()));
//! ```
use crate::models::Record;
use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, Trim};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

pub const DEFAULT_BASE_PATH: &str = "/DataVis-Project";

/// Where static files are mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticConfig {
    pub base_path: String,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
        }
    }
}

impl StaticConfig {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Prefix `path` with the base path, inserting a `/` when `path` lacks one.
    pub fn static_file(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_path, path)
        } else {
            format!("{}/{}", self.base_path, path)
        }
    }
}

// Allow -, _, . unescaped in path segments (common in dataset names)
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

fn enc_path(path: &str) -> String {
    path.split('/')
        .map(|s| percent_encoding::utf8_percent_encode(s.trim(), SAFE).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Blocking HTTP client with capped timeouts and redirects.
pub fn http_client() -> Result<HttpClient> {
    HttpClient::builder()
        .timeout(Duration::from_secs(30)) // total request timeout
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(5))
        .user_agent(concat!("datavis-rs/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("build http client")
}

/// Where a dataset path is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    /// `<root>/<dataset>` on disk.
    Local { root: PathBuf },
    /// `<base_url><base_path>/datasets/<dataset>` over HTTP.
    Http { base_url: String, config: StaticConfig },
}

impl DatasetSource {
    pub fn local(root: impl Into<PathBuf>) -> Self {
        DatasetSource::Local { root: root.into() }
    }

    pub fn http(base_url: impl Into<String>, config: StaticConfig) -> Self {
        DatasetSource::Http {
            base_url: base_url.into(),
            config,
        }
    }

    /// File path or URL the dataset is read from.
    pub fn locate(&self, dataset: &str) -> String {
        match self {
            DatasetSource::Local { root } => root.join(dataset.trim_start_matches('/')).to_string_lossy().into_owned(),
            DatasetSource::Http { base_url, config } => {
                let path = format!("/datasets/{}", enc_path(dataset.trim_start_matches('/')));
                format!("{}{}", base_url.trim_end_matches('/'), config.static_file(&path))
            }
        }
    }

    /// Open the dataset for reading. HTTP bodies are buffered in full.
    pub fn open(&self, dataset: &str) -> Result<Box<dyn Read + Send>> {
        let location = self.locate(dataset);
        match self {
            DatasetSource::Local { .. } => {
                let f = File::open(&location).with_context(|| format!("open {}", location))?;
                Ok(Box::new(f))
            }
            DatasetSource::Http { .. } => {
                let resp = http_client()?
                    .get(&location)
                    .send()
                    .with_context(|| format!("GET {}", location))?;
                if !resp.status().is_success() {
                    bail!("request failed with HTTP {}", resp.status());
                }
                let body = resp.bytes().with_context(|| format!("read body of {}", location))?;
                Ok(Box::new(Cursor::new(body.to_vec())))
            }
        }
    }
}

/// Parse header-keyed CSV through `mapper`; a `None` from the mapper skips the row.
///
/// Records are flexible (short rows are padded with empty strings), values
/// are not trimmed and blank lines are skipped. The index handed to the
/// mapper counts parsed records, starting at 0.
pub fn parse_csv<R, T, F>(reader: R, mapper: F) -> Result<Vec<T>>
where
    R: Read,
    F: Fn(&Record, usize) -> Option<T>,
{
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::None)
        .from_reader(reader);
    let headers = rdr.headers().context("read csv header")?.clone();
    let mut out = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("parse csv record {}", i + 1))?;
        if rec.iter().all(|f| f.is_empty()) && rec.len() <= 1 {
            continue;
        }
        let record = Record::from_parts(headers.iter(), rec.iter());
        if let Some(row) = mapper(&record, i) {
            out.push(row);
        }
    }
    Ok(out)
}

/// Fetch and parse in one call.
pub fn fetch<T, F>(source: &DatasetSource, dataset: &str, mapper: F) -> Result<Vec<T>>
where
    F: Fn(&Record, usize) -> Option<T>,
{
    let reader = source.open(dataset)?;
    parse_csv(reader, mapper).with_context(|| format!("parse {}", source.locate(dataset)))
}

/// Acquisition state of one dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Loading,
    Loaded(Vec<T>),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn rows(&self) -> Option<&[T]> {
        match self {
            LoadState::Loaded(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Synchronous acquisition.
pub fn load_blocking<T, F>(source: &DatasetSource, dataset: &str, mapper: F) -> LoadState<T>
where
    F: Fn(&Record, usize) -> Option<T>,
{
    match fetch(source, dataset, mapper) {
        Ok(rows) => {
            log::debug!("loaded {} rows from {}", rows.len(), dataset);
            LoadState::Loaded(rows)
        }
        Err(e) => {
            log::warn!("failed to load {}: {:#}", dataset, e);
            LoadState::Failed(format!("{:#}", e))
        }
    }
}

type Outcome<T> = std::result::Result<Vec<T>, String>;

/// One background fetch. Dropping the handle cancels it.
pub struct DatasetHandle<T> {
    state: LoadState<T>,
    rx: Option<Receiver<Outcome<T>>>,
    token: CancelToken,
}

impl<T: Send + 'static> DatasetHandle<T> {
    pub fn spawn<F>(source: DatasetSource, dataset: impl Into<String>, mapper: F) -> Self
    where
        F: Fn(&Record, usize) -> Option<T> + Send + 'static,
    {
        let dataset = dataset.into();
        let token = CancelToken::default();
        let worker_token = token.clone();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let outcome = fetch(&source, &dataset, mapper).map_err(|e| format!("{:#}", e));
            if worker_token.is_cancelled() {
                log::debug!("discarding result for {} (cancelled)", dataset);
                return;
            }
            if let Err(e) = &outcome {
                log::warn!("failed to load {}: {}", dataset, e);
            }
            let _ = tx.send(outcome);
        });
        Self {
            state: LoadState::Loading,
            rx: Some(rx),
            token,
        }
    }
}

impl<T> DatasetHandle<T> {
    fn commit(&mut self, outcome: Outcome<T>) {
        self.state = match outcome {
            Ok(rows) => LoadState::Loaded(rows),
            Err(e) => LoadState::Failed(e),
        };
        self.rx = None;
    }

    /// Move a finished result, if any, into the state.
    pub fn poll(&mut self) -> &LoadState<T> {
        if let Some(rx) = &self.rx {
            match rx.try_recv() {
                Ok(outcome) => self.commit(outcome),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    self.rx = None;
                    if !self.token.is_cancelled() {
                        self.state = LoadState::Failed("dataset worker exited without a result".into());
                    }
                }
            }
        }
        &self.state
    }

    /// Block until the worker reports. Returns immediately once cancelled.
    pub fn wait(&mut self) -> &LoadState<T> {
        if let Some(rx) = self.rx.take() {
            match rx.recv() {
                Ok(outcome) => self.commit(outcome),
                Err(_) if !self.token.is_cancelled() => {
                    self.state = LoadState::Failed("dataset worker exited without a result".into());
                }
                Err(_) => {}
            }
        }
        &self.state
    }

    pub fn state(&self) -> &LoadState<T> {
        &self.state
    }

    /// Stop listening; a result that arrives later is discarded.
    pub fn cancel(&mut self) {
        self.token.cancel();
        self.rx = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl<T> Drop for DatasetHandle<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn static_file_joins_with_single_slash() {
        let cfg = StaticConfig::default();
        assert_eq!(cfg.static_file("/datasets/a.csv"), "/DataVis-Project/datasets/a.csv");
        assert_eq!(cfg.static_file("datasets/a.csv"), "/DataVis-Project/datasets/a.csv");
    }

    #[test]
    fn http_location_encodes_segments() {
        let src = DatasetSource::http("http://localhost:3000/", StaticConfig::default());
        assert_eq!(
            src.locate("financial/shares or investments.csv"),
            "http://localhost:3000/DataVis-Project/datasets/financial/shares%20or%20investments.csv"
        );
    }

    #[test]
    fn mapper_can_skip_rows() {
        let csv = "geo,obs_value\nItaly,10\n\nFrance,x\nSpain,\n";
        let rows = parse_csv(csv.as_bytes(), |r, i| {
            let v = r.num("obs_value");
            (!v.is_nan()).then(|| (i, r.str("geo").to_string(), v))
        })
        .unwrap();
        assert_eq!(rows, vec![(0, "Italy".to_string(), 10.0), (2, "Spain".to_string(), 0.0)]);
    }

    #[test]
    fn short_records_are_padded() {
        let rows = parse_csv("a,b,c\n1,2\n".as_bytes(), |r, _| Some(r.clone())).unwrap();
        assert_eq!(rows[0].str("c"), "");
        assert_eq!(rows[0].len(), 3);
    }

    #[test]
    fn blocking_load_distinguishes_empty_and_failed() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = File::create(dir.path().join("empty.csv")).unwrap();
        writeln!(f, "geo,obs_value").unwrap();
        let src = DatasetSource::local(dir.path());

        let empty: LoadState<Record> = load_blocking(&src, "empty.csv", |r, _| Some(r.clone()));
        assert_eq!(empty, LoadState::Loaded(vec![]));

        let missing: LoadState<Record> = load_blocking(&src, "nope.csv", |r, _| Some(r.clone()));
        assert!(missing.error().is_some());
        assert!(!missing.is_loading());
    }

    #[test]
    fn handle_delivers_rows() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("d.csv"), "geo,obs_value\nItaly,3\n").unwrap();
        let mut h = DatasetHandle::spawn(DatasetSource::local(dir.path()), "d.csv", |r, _| {
            Some(r.num("obs_value"))
        });
        assert_eq!(h.wait(), &LoadState::Loaded(vec![3.0]));
        assert_eq!(h.poll(), &LoadState::Loaded(vec![3.0]));
    }

    #[test]
    fn cancelled_handle_stays_loading() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("d.csv"), "geo\nItaly\n").unwrap();
        let mut h = DatasetHandle::spawn(DatasetSource::local(dir.path()), "d.csv", |r, _| {
            Some(r.str("geo").to_string())
        });
        h.cancel();
        assert!(h.is_cancelled());
        assert!(h.wait().is_loading());
        thread::sleep(Duration::from_millis(20));
        assert!(h.poll().is_loading());
    }
}
