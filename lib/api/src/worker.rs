// Matching job queue with a fixed set of worker threads.
// Each worker owns its own MappingExtractor, so matcher caches are never
// shared between concurrent requests.

use crate::sink::{archive, paginate, ResultSink};
use anyhow::{Context, Result};
use fieldfuse_matcher::{execute, MappingExtractor, MatchRequest, MatchResources, MatcherConfig};
use fieldfuse_storage::{TaskRecord, TaskStatus, TaskStore};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

/// A queued matching request.
#[derive(Debug, Clone)]
pub struct MatchJob {
    pub job_id: String,
    pub task_id: String,
    pub request: MatchRequest,
}

/// Everything a worker needs besides its own extractor.
#[derive(Clone)]
pub struct WorkerContext {
    pub resources: MatchResources,
    pub config: MatcherConfig,
    pub value_limit: Option<usize>,
    pub cache_tables: usize,
    pub sink: Arc<dyn ResultSink>,
    pub store: TaskStore,
    pub page_size: usize,
    /// Directory receiving `<task id>.json` with every delivered page.
    pub archive_dir: Option<PathBuf>,
}

struct JobQueue {
    jobs: Mutex<VecDeque<MatchJob>>,
    condvar: Condvar,
    running: AtomicBool,
}

pub struct WorkerPool {
    queue: Arc<JobQueue>,
    store: TaskStore,
    handles: Mutex<Vec<JoinHandle<()>>>,
    submitted: AtomicU64,
    completed: Arc<AtomicU64>,
}

impl WorkerPool {
    /// Spawn `workers` threads. Extractors are built up front so a bad
    /// matcher configuration fails here rather than inside a job.
    pub fn start(workers: usize, context: WorkerContext) -> Result<Self> {
        let queue = Arc::new(JobQueue {
            jobs: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            running: AtomicBool::new(true),
        });
        let completed = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers.max(1) {
            let extractor = MappingExtractor::new(
                &context.resources,
                context.config.clone(),
                context.value_limit,
                context.cache_tables,
            )?;
            let queue = queue.clone();
            let context = context.clone();
            let completed = completed.clone();
            let handle = thread::Builder::new()
                .name(format!("match-worker-{}", worker_id))
                .spawn(move || worker_loop(queue, extractor, context, completed))
                .context("failed to spawn match worker thread")?;
            handles.push(handle);
        }
        info!("Started {} match workers", handles.len());

        Ok(Self {
            queue,
            store: context.store,
            handles: Mutex::new(handles),
            submitted: AtomicU64::new(0),
            completed,
        })
    }

    /// Record the task as pending and queue it. Returns the job id.
    pub fn submit(&self, task_id: &str, request: MatchRequest) -> Result<String> {
        if !self.queue.running.load(Ordering::Acquire) {
            anyhow::bail!("worker pool is shut down");
        }
        let n = self.submitted.fetch_add(1, Ordering::Relaxed) + 1;
        let job_id = format!("{}-{}", request.name(), n);
        self.store.insert(&TaskRecord::pending(task_id, &job_id))?;

        let mut jobs = self.queue.jobs.lock();
        jobs.push_back(MatchJob {
            job_id: job_id.clone(),
            task_id: task_id.to_string(),
            request,
        });
        self.queue.condvar.notify_one();
        Ok(job_id)
    }

    pub fn pending_jobs(&self) -> usize {
        self.queue.jobs.lock().len()
    }

    pub fn jobs_submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn jobs_completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    /// Stop accepting jobs, finish the queued ones and join every worker.
    pub fn shutdown(&self) {
        self.queue.running.store(false, Ordering::Release);
        self.queue.condvar.notify_all();
        let handles: Vec<JoinHandle<()>> = self.handles.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                warn!("Match worker exited with a panic");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    queue: Arc<JobQueue>,
    mut extractor: MappingExtractor,
    context: WorkerContext,
    completed: Arc<AtomicU64>,
) {
    loop {
        let job = {
            let mut jobs = queue.jobs.lock();
            while jobs.is_empty() && queue.running.load(Ordering::Acquire) {
                queue.condvar.wait(&mut jobs);
            }
            match jobs.pop_front() {
                Some(job) => job,
                None => break,
            }
        };
        run_job(&mut extractor, &context, &job);
        completed.fetch_add(1, Ordering::Release);
    }
}

fn archive_path(dir: &std::path::Path, task_id: &str) -> PathBuf {
    let name: String = task_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    dir.join(format!("{}.json", name))
}

fn deliver(context: &WorkerContext, task_id: &str, records: &[fieldfuse_matcher::FieldRecord]) -> Result<usize> {
    let pages = paginate(task_id, records, context.page_size)?;
    for page in &pages {
        context.sink.deliver(page)?;
    }
    if let Some(dir) = &context.archive_dir {
        archive(&pages, archive_path(dir, task_id))?;
    }
    Ok(pages.len())
}

/// Run one job and record its outcome. Never panics out of the worker.
pub fn run_job(extractor: &mut MappingExtractor, context: &WorkerContext, job: &MatchJob) {
    info!("Running {} for task {}", job.job_id, job.task_id);

    let outcome = catch_unwind(AssertUnwindSafe(|| execute(extractor, &job.request)));
    let (status, message) = match outcome {
        Ok(mapping) => match deliver(context, &job.task_id, &mapping.records()) {
            Ok(pages) => (TaskStatus::Success, format!("{} fields matched, {} pages", mapping.len(), pages)),
            Err(e) => {
                error!("Delivering results of task {} failed: {:#}", job.task_id, e);
                (TaskStatus::Failure, format!("{:#}", e))
            }
        },
        Err(_) => {
            extractor.clear();
            error!("Task {} panicked", job.task_id);
            (TaskStatus::Failure, "matching aborted".to_string())
        }
    };

    match context.store.set_status(&job.task_id, status, message) {
        Ok(true) => {}
        Ok(false) => warn!("Task {} vanished from the task store", job.task_id),
        Err(e) => error!("Cannot record status of task {}: {:#}", job.task_id, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use ahash::AHashMap;
    use fieldfuse_core::{HashingModel, MemorySource, SimpleTokenizer};
    use fieldfuse_matcher::{DetectorRegistry, Gazetteer};
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn context(store: TaskStore, sink: Arc<MemorySink>, archive_dir: Option<PathBuf>) -> WorkerContext {
        let source = MemorySource::new()
            .with_table("a", vec![("a1", "手机号码", vec!["13812345678", "13987654321", "15011112222"])])
            .with_table("b", vec![("b1", "联系电话", vec!["18600001111", "13700002222", "13511113333"])]);
        WorkerContext {
            resources: MatchResources {
                source: Arc::new(source),
                tokenizer: Arc::new(SimpleTokenizer),
                model: Arc::new(HashingModel::default()),
                idf: Arc::new(AHashMap::<String, f64>::new()),
                registry: Arc::new(DetectorRegistry::builtin(Arc::new(Gazetteer::builtin())).unwrap()),
            },
            config: MatcherConfig::default(),
            value_limit: None,
            cache_tables: 8,
            sink,
            store,
            page_size: 10,
            archive_dir,
        }
    }

    fn wait_for(pool: &WorkerPool, n: u64) {
        let deadline = Instant::now() + Duration::from_secs(30);
        while pool.jobs_completed() < n {
            assert!(Instant::now() < deadline, "jobs did not finish");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_job_success_delivers_pages() {
        let dir = tempdir().unwrap();
        let store = TaskStore::open(dir.path().join("tasks")).unwrap();
        let sink = Arc::new(MemorySink::new());
        let archive_dir = dir.path().join("results");
        let pool = WorkerPool::start(2, context(store.clone(), sink.clone(), Some(archive_dir.clone()))).unwrap();

        let request = MatchRequest::OneToOne {
            source: "a".to_string(),
            target: "b".to_string(),
        };
        let job_id = pool.submit("100", request).unwrap();
        assert!(job_id.starts_with("one2one"));
        wait_for(&pool, 1);

        let record = store.get("100").unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Success);
        let pages = sink.pages_for("100");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_num, 1);
        assert!(archive_dir.join("100.json").exists());
    }

    #[test]
    fn test_empty_result_still_reported() {
        let dir = tempdir().unwrap();
        let store = TaskStore::open(dir.path()).unwrap();
        let sink = Arc::new(MemorySink::new());
        let pool = WorkerPool::start(1, context(store.clone(), sink.clone(), None)).unwrap();

        let request = MatchRequest::OneToOne {
            source: "a".to_string(),
            target: "missing".to_string(),
        };
        pool.submit("7", request).unwrap();
        wait_for(&pool, 1);

        assert_eq!(store.get("7").unwrap().unwrap().status, TaskStatus::Success);
        let pages = sink.pages_for("7");
        assert_eq!((pages[0].page_num, pages[0].page_size), (0, 0));
    }

    #[test]
    fn test_sink_failure_marks_task_failed() {
        struct BrokenSink;
        impl ResultSink for BrokenSink {
            fn deliver(&self, _page: &crate::sink::ResultPage) -> Result<()> {
                anyhow::bail!("callback unreachable")
            }
        }

        let dir = tempdir().unwrap();
        let store = TaskStore::open(dir.path()).unwrap();
        let mut ctx = context(store.clone(), Arc::new(MemorySink::new()), None);
        ctx.sink = Arc::new(BrokenSink);
        let pool = WorkerPool::start(1, ctx).unwrap();

        pool.submit("8", MatchRequest::All { tables: vec!["a".into(), "b".into()] }).unwrap();
        wait_for(&pool, 1);

        let record = store.get("8").unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Failure);
        assert!(record.message.contains("callback unreachable"));
    }

    #[test]
    fn test_shutdown_rejects_new_jobs() {
        let dir = tempdir().unwrap();
        let store = TaskStore::open(dir.path()).unwrap();
        let pool = WorkerPool::start(1, context(store, Arc::new(MemorySink::new()), None)).unwrap();
        pool.shutdown();
        assert!(pool
            .submit("1", MatchRequest::All { tables: vec!["a".into()] })
            .is_err());
    }

    #[test]
    fn test_archive_path_is_sanitized() {
        let p = archive_path(std::path::Path::new("/tmp/out"), "../x y");
        assert_eq!(p, PathBuf::from("/tmp/out/___x_y.json"));
    }
}
