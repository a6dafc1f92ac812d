use crate::data::persistence::Persistable;
use crate::data::weekly_actual::{EditField, WeeklyActual, WeeklyActualData};
use crate::error::{CommitError, StoreError};
use reqwest::Url;
use reqwest::blocking::Client;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Where weekly actuals come from and where single-cell edits go.
pub trait RowStore: Send + Sync {
    fn fetch(&self, year: i32, season: u8) -> Result<Vec<WeeklyActual>, StoreError>;

    fn update_field(
        &self,
        style_number: &str,
        week_number: u32,
        field: EditField,
        value: i64,
    ) -> Result<(), CommitError>;

    fn describe(&self) -> String;
}

/// Fetches every configured year and concatenates the rows in year order.
pub fn load_rows(
    store: &dyn RowStore,
    years: &[i32],
    season: u8,
) -> Result<Vec<WeeklyActual>, StoreError> {
    let mut rows = Vec::new();
    for &year in years {
        let batch = store.fetch(year, season)?;
        debug!(year, season, count = batch.len(), "fetched rows");
        rows.extend(batch);
    }
    info!(source = %store.describe(), season, total = rows.len(), "rows loaded");
    Ok(rows)
}

/// The HTTP store when an API base URL is configured, the local row file otherwise.
pub fn open_store(
    api_base_url: Option<&str>,
    data_dir: &Path,
) -> Result<Arc<dyn RowStore>, StoreError> {
    match api_base_url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => Ok(Arc::new(HttpStore::new(url)?)),
        None => Ok(Arc::new(FileStore::new(data_dir.to_path_buf()))),
    }
}

// ── HTTP ──────────────────────────────────────────────────────────────────────

pub struct HttpStore {
    client: Client,
    base: Url,
}

#[derive(Serialize)]
struct FieldUpdate<'a> {
    field: &'a str,
    value: i64,
}

impl HttpStore {
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let base = Url::parse(base_url).map_err(|_| StoreError::BadUrl(base_url.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(StoreError::BadUrl(base_url.to_string()));
        }
        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(HttpStore { client, base })
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn list_url(&self) -> Url {
        self.endpoint(&["otb-planning"])
    }

    fn update_url(&self, style_number: &str, week_number: u32) -> Url {
        let week = week_number.to_string();
        self.endpoint(&["otb-planning", "bulk", style_number, &week])
    }
}

impl RowStore for HttpStore {
    fn fetch(&self, year: i32, season: u8) -> Result<Vec<WeeklyActual>, StoreError> {
        let response = self
            .client
            .get(self.list_url())
            .query(&[("year", year.to_string()), ("season", season.to_string())])
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }
        Ok(response.json::<Vec<WeeklyActual>>()?)
    }

    fn update_field(
        &self,
        style_number: &str,
        week_number: u32,
        field: EditField,
        value: i64,
    ) -> Result<(), CommitError> {
        let body = FieldUpdate { field: field.wire_name(), value };
        let response = self
            .client
            .patch(self.update_url(style_number, week_number))
            .json(&body)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(CommitError::Status(status.as_u16()));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.base.to_string()
    }
}

// ── Local file ────────────────────────────────────────────────────────────────

/// Serves `otb_rows.json` from a data directory with the same contract as the API.
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        FileStore { dir, write_lock: Mutex::new(()) }
    }
}

fn season_matches(row: &WeeklyActual, season: u8) -> bool {
    let s = row.season.trim();
    s.is_empty() || s == season.to_string()
}

impl RowStore for FileStore {
    fn fetch(&self, year: i32, season: u8) -> Result<Vec<WeeklyActual>, StoreError> {
        let data = WeeklyActualData::load_from(&self.dir)
            .map_err(|e| StoreError::Local(format!("{e:#}")))?;
        Ok(data
            .rows
            .into_iter()
            .filter(|r| r.year == year && season_matches(r, season))
            .collect())
    }

    fn update_field(
        &self,
        style_number: &str,
        week_number: u32,
        field: EditField,
        value: i64,
    ) -> Result<(), CommitError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CommitError::Store("row file lock poisoned".to_string()))?;
        let mut data = WeeklyActualData::load_from(&self.dir)
            .map_err(|e| CommitError::Store(format!("{e:#}")))?;
        match data.find_mut(style_number, week_number) {
            Some(row) => row.set_field(field, Some(value)),
            None => {
                let template = data.template_for(style_number).ok_or_else(|| {
                    CommitError::MissingRow { style: style_number.to_string(), week: week_number }
                })?;
                if let Some(first) = data.first_week_of(style_number) {
                    if week_number < first {
                        return Err(CommitError::BeforeFirstWeek {
                            style: style_number.to_string(),
                            week: week_number,
                            first,
                        });
                    }
                }
                let mut row = WeeklyActual::blank_like(template, week_number);
                row.set_field(field, Some(value));
                data.rows.push(row);
            }
        }
        data.save_to(&self.dir)
            .map_err(|e| CommitError::Store(format!("{e:#}")))
    }

    fn describe(&self) -> String {
        self.dir.join(WeeklyActualData::filename()).display().to_string()
    }
}
