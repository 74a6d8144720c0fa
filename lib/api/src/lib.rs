//! # fieldfuse API
//!
//! Serving layer: REST task endpoints, the matching worker pool, the HTTP
//! asset catalog adapter and result delivery.

pub mod http_source;
pub mod rest;
pub mod sink;
pub mod worker;

pub use http_source::HttpSource;
pub use rest::{AppState, RestApi, TaskId};
pub use sink::{paginate, CallbackSink, MemorySink, ResultPage, ResultSink};
pub use worker::{MatchJob, WorkerContext, WorkerPool};
