use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex, TryLockError},
};

use hoist_deployment::{ManifestEntry, Publisher, UploadReport};
use lazy_static::lazy_static;
use regex::Regex;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::tokio::task::spawn_blocking;
use rocket::State;

use super::auth::Operator;

lazy_static! {
    static ref ENVIRONMENT_NAME_REGEX: Regex = Regex::new("^[a-zA-Z0-9_-]{1,50}$").unwrap();
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct PublishRequest {
    environment: String,
    local_base_path: PathBuf,
    files: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ConnectionStatus {
    environment: String,
    reachable: bool,
}

/// One lock per configured environment, held by a deployment from staging to
/// switchover.
pub struct DeploymentLocks {
    locks: HashMap<String, Arc<Mutex<()>>>,
}

impl DeploymentLocks {
    pub fn new<'a>(environments: impl IntoIterator<Item = &'a str>) -> DeploymentLocks {
        DeploymentLocks {
            locks: environments
                .into_iter()
                .map(|environment| (environment.to_owned(), Arc::new(Mutex::new(()))))
                .collect(),
        }
    }

    fn get(&self, environment: &str) -> Option<Arc<Mutex<()>>> {
        self.locks.get(environment).cloned()
    }
}

fn validate_environment(name: &str) -> Result<(), Custom<String>> {
    if ENVIRONMENT_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(Custom(
            Status::BadRequest,
            format!("Invalid environment name {:?}", name),
        ))
    }
}

#[post("/publish", format = "json", data = "<request>")]
pub async fn publish(
    _operator: Operator,
    request: Json<PublishRequest>,
    publisher: &State<Arc<Publisher>>,
    locks: &State<DeploymentLocks>,
) -> Result<Custom<Json<UploadReport>>, Custom<String>> {
    let request = request.into_inner();
    validate_environment(&request.environment)?;

    let environment = request.environment.clone();
    let lock = locks.get(&environment);
    let publisher = Arc::clone(publisher.inner());
    let report = spawn_blocking(move || {
        let _guard = match lock.as_deref().map(Mutex::try_lock) {
            Some(Ok(guard)) => Some(guard),
            Some(Err(TryLockError::Poisoned(poisoned))) => Some(poisoned.into_inner()),
            Some(Err(TryLockError::WouldBlock)) => return None,
            None => None,
        };
        Some(publisher.upload_files(&request.local_base_path, &request.files, &request.environment))
    })
    .await
    .map_err(|e| {
        Custom(
            Status::InternalServerError,
            format!("Deployment task failed: {}", e),
        )
    })?;

    let Some(report) = report else {
        warn!("Rejected a second deployment to {}", environment);
        return Err(Custom(
            Status::Conflict,
            format!("A deployment to {} is already running", environment),
        ));
    };
    let status = if report.success {
        Status::Ok
    } else {
        Status::InternalServerError
    };
    Ok(Custom(status, Json(report)))
}

#[get("/environments")]
pub fn environments(_operator: Operator, publisher: &State<Arc<Publisher>>) -> Json<Vec<String>> {
    Json(
        publisher
            .environments()
            .into_iter()
            .map(str::to_owned)
            .collect(),
    )
}

#[get("/environments/<name>/connection")]
pub async fn connection(
    _operator: Operator,
    name: &str,
    publisher: &State<Arc<Publisher>>,
) -> Result<Json<ConnectionStatus>, Custom<String>> {
    validate_environment(name)?;
    if !publisher.environments().contains(&name) {
        return Err(Custom(
            Status::NotFound,
            format!("Missing config for {}", name),
        ));
    }

    let publisher = Arc::clone(publisher.inner());
    let environment = name.to_owned();
    spawn_blocking(move || {
        let reachable = publisher.test_connection(&environment);
        Json(ConnectionStatus {
            environment,
            reachable,
        })
    })
    .await
    .map_err(|e| {
        Custom(
            Status::InternalServerError,
            format!("Connection check failed: {}", e),
        )
    })
}
