// Paginated delivery of mapping results
use anyhow::{bail, Context, Result};
use fieldfuse_matcher::FieldRecord;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// One page of results as posted to the callback endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPage {
    pub task_id: String,
    pub status: i32,
    /// 1-based, 0 for the single page of an empty result.
    pub page_num: usize,
    pub page_size: usize,
    /// JSON-encoded array of records.
    pub data: String,
}

/// Split records into pages of at most `page_size`. An empty result still
/// yields one empty page.
pub fn paginate(task_id: &str, records: &[FieldRecord], page_size: usize) -> Result<Vec<ResultPage>> {
    let page_size = page_size.max(1);
    let mut pages = Vec::with_capacity(records.len().div_ceil(page_size));
    for (i, chunk) in records.chunks(page_size).enumerate() {
        pages.push(ResultPage {
            task_id: task_id.to_string(),
            status: 1,
            page_num: i + 1,
            page_size: chunk.len(),
            data: serde_json::to_string(chunk)?,
        });
    }
    if pages.is_empty() {
        pages.push(ResultPage {
            task_id: task_id.to_string(),
            status: 1,
            page_num: 0,
            page_size: 0,
            data: "[]".to_string(),
        });
    }
    Ok(pages)
}

/// Destination of result pages.
pub trait ResultSink: Send + Sync {
    fn deliver(&self, page: &ResultPage) -> Result<()>;
}

/// Form-posts every page to a callback URL.
pub struct CallbackSink {
    client: reqwest::blocking::Client,
    url: String,
}

impl CallbackSink {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .context("cannot build callback client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl ResultSink for CallbackSink {
    fn deliver(&self, page: &ResultPage) -> Result<()> {
        let started = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .form(page)
            .send()
            .with_context(|| format!("callback for task {} page {} failed", page.task_id, page.page_num))?;
        let status = response.status();
        if !status.is_success() {
            bail!(
                "callback for task {} page {} returned {}",
                page.task_id,
                page.page_num,
                status
            );
        }
        info!(
            "Call back taskId: {}, pageNum: {}, time: {:?}",
            page.task_id,
            page.page_num,
            started.elapsed()
        );
        Ok(())
    }
}

/// Keeps pages in memory. Used when no callback URL is configured.
#[derive(Default)]
pub struct MemorySink {
    pages: Mutex<Vec<ResultPage>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pages(&self) -> Vec<ResultPage> {
        self.pages.lock().clone()
    }

    pub fn pages_for(&self, task_id: &str) -> Vec<ResultPage> {
        self.pages
            .lock()
            .iter()
            .filter(|p| p.task_id == task_id)
            .cloned()
            .collect()
    }
}

impl ResultSink for MemorySink {
    fn deliver(&self, page: &ResultPage) -> Result<()> {
        debug!("Stored page {} of task {}", page.page_num, page.task_id);
        self.pages.lock().push(page.clone());
        Ok(())
    }
}

/// Write all pages of a task as one JSON array.
pub fn archive<P: AsRef<Path>>(pages: &[ResultPage], path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec(pages)?;
    std::fs::write(path, data).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}
