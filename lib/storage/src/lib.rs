pub mod idf;
pub mod task_store;

pub use idf::{IdfBuilder, IdfCorpus};
pub use task_store::{TaskRecord, TaskStatus, TaskStore};
