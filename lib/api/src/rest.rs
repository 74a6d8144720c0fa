use crate::worker::WorkerPool;
use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use fieldfuse_matcher::MatchRequest;
use fieldfuse_storage::TaskStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

/// Task identifiers arrive as JSON strings or numbers and are echoed back
/// in the same form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    Number(i64),
    Text(String),
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Number(n) => write!(f, "{}", n),
            TaskId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllRequest {
    task_id: TaskId,
    table_id_list: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OneToAllRequest {
    task_id: TaskId,
    table_id_src: String,
    table_id_list_dest: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OneToOneRequest {
    task_id: TaskId,
    table_id_src: String,
    table_id_dest: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SomeToAllRequest {
    task_id: TaskId,
    table_id_list_src: Vec<String>,
    table_id_list_dest: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskStateRequest {
    task_id: TaskId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskStateResponse {
    task_id: TaskId,
    status: i32,
    message: String,
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<WorkerPool>,
    pub store: TaskStore,
}

pub struct RestApi;

impl RestApi {
    /// Register every route on an app or scope.
    pub fn configure(cfg: &mut web::ServiceConfig) {
        cfg.route("/health", web::get().to(health))
            .route("/test", web::get().to(health))
            .route("/test", web::post().to(health))
            .route("/task/all", web::post().to(match_all))
            .route("/task/one2all", web::post().to(match_one_to_all))
            .route("/task/one2one", web::post().to(match_one_to_one))
            .route("/task/some2all", web::post().to(match_some_to_all))
            .route("/task/state", web::post().to(task_state))
            .route("/cache/delete", web::post().to(delete_cache));
    }

    pub async fn start(state: AppState, port: u16, workers: usize) -> std::io::Result<()> {
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(state.clone()))
                .configure(RestApi::configure)
        })
        .workers(workers.max(1))
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }
}

fn rejected(message: impl Into<String>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "state": false,
        "message": message.into(),
    }))
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, HttpResponse> {
    serde_json::from_slice(body).map_err(|e| {
        info!("Error parsing parameters: {}", e);
        rejected(format!("invalid parameters: {}", e))
    })
}

fn enqueue(state: &AppState, task_id: &TaskId, request: MatchRequest) -> HttpResponse {
    info!("Request taskId: {} ({})", task_id, request.name());
    if let Err(e) = request.validate() {
        return rejected(e.to_string());
    }
    match state.pool.submit(&task_id.to_string(), request) {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "state": true })),
        Err(e) => {
            error!("Cannot queue task {}: {:#}", task_id, e);
            rejected(format!("{:#}", e))
        }
    }
}

async fn health() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "code": 200,
        "msg": "ok",
    })))
}

async fn match_all(state: web::Data<AppState>, body: web::Bytes) -> ActixResult<HttpResponse> {
    let req: AllRequest = match parse(&body) {
        Ok(req) => req,
        Err(resp) => return Ok(resp),
    };
    let request = MatchRequest::All {
        tables: req.table_id_list,
    };
    Ok(enqueue(&state, &req.task_id, request))
}

async fn match_one_to_all(state: web::Data<AppState>, body: web::Bytes) -> ActixResult<HttpResponse> {
    let req: OneToAllRequest = match parse(&body) {
        Ok(req) => req,
        Err(resp) => return Ok(resp),
    };
    let request = MatchRequest::OneToAll {
        source: req.table_id_src,
        targets: req.table_id_list_dest,
    };
    Ok(enqueue(&state, &req.task_id, request))
}

async fn match_one_to_one(state: web::Data<AppState>, body: web::Bytes) -> ActixResult<HttpResponse> {
    let req: OneToOneRequest = match parse(&body) {
        Ok(req) => req,
        Err(resp) => return Ok(resp),
    };
    let request = MatchRequest::OneToOne {
        source: req.table_id_src,
        target: req.table_id_dest,
    };
    Ok(enqueue(&state, &req.task_id, request))
}

async fn match_some_to_all(state: web::Data<AppState>, body: web::Bytes) -> ActixResult<HttpResponse> {
    let req: SomeToAllRequest = match parse(&body) {
        Ok(req) => req,
        Err(resp) => return Ok(resp),
    };
    let request = MatchRequest::SomeToAll {
        sources: req.table_id_list_src,
        targets: req.table_id_list_dest,
    };
    Ok(enqueue(&state, &req.task_id, request))
}

async fn task_state(state: web::Data<AppState>, body: web::Bytes) -> ActixResult<HttpResponse> {
    let req: TaskStateRequest = match parse(&body) {
        Ok(req) => req,
        Err(resp) => return Ok(resp),
    };
    let key = req.task_id.to_string();
    let response = match state.store.get(&key) {
        Ok(Some(record)) => TaskStateResponse {
            task_id: req.task_id,
            status: record.status.code(),
            message: record.message,
        },
        Ok(None) => TaskStateResponse {
            task_id: req.task_id,
            status: -1,
            message: "taskId does not exist".to_string(),
        },
        Err(e) => {
            error!("Querying task {} failed: {:#}", key, e);
            TaskStateResponse {
                task_id: req.task_id,
                status: -1,
                message: "error while querying status".to_string(),
            }
        }
    };
    Ok(HttpResponse::Ok().json(response))
}

async fn delete_cache(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    match state.store.clear() {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({ "status": true }))),
        Err(e) => {
            error!("Clearing task store failed: {:#}", e);
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "status": false,
                "message": format!("{:#}", e),
            })))
        }
    }
}
