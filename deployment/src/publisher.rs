use std::{collections::HashMap, fmt, path::Path};

use crate::{
    cleanup,
    config::DeploymentTarget,
    path::{ContentFolder, FolderLayout, StagingToken},
    provision::ProvisionError,
    report::UploadReport,
    run::DeploymentRun,
    store::{Connector, RemoteStore},
    switchover,
    upload,
    ManifestEntry,
};

#[derive(Debug)]
pub enum DeploymentError {
    MissingConfig(String),
    ConnectionFailed(anyhow::Error),
    DirectoryUnavailable(ProvisionError),
    UploadFailed,
    SwitchoverFailed(Vec<ContentFolder>),
}

impl fmt::Display for DeploymentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentError::MissingConfig(environment) => {
                write!(f, "Missing config for {}", environment)
            }
            DeploymentError::ConnectionFailed(_) => write!(f, "FTP connection failed"),
            DeploymentError::DirectoryUnavailable(e) => write!(f, "{}", e),
            DeploymentError::UploadFailed => write!(f, "Upload failed"),
            DeploymentError::SwitchoverFailed(folders) => {
                let names: Vec<&str> = folders.iter().map(ContentFolder::name).collect();
                write!(f, "Switchover failed for: {}", names.join(", "))
            }
        }
    }
}

impl std::error::Error for DeploymentError {}

/// Publishes exported content to the configured environments.
///
/// Holds no per-run state. Deployments to the same environment have to be
/// serialized by the caller.
pub struct Publisher {
    environments: HashMap<String, DeploymentTarget>,
    connector: Box<dyn Connector + Send + Sync>,
    unique_staging_roots: bool,
}

impl Publisher {
    pub fn new(connector: Box<dyn Connector + Send + Sync>) -> Publisher {
        Publisher {
            environments: HashMap::new(),
            connector,
            unique_staging_roots: true,
        }
    }

    pub fn with_unique_staging_roots(&mut self, unique: bool) -> &mut Publisher {
        self.unique_staging_roots = unique;
        self
    }

    pub fn register_environment(&mut self, name: impl AsRef<str>, target: DeploymentTarget) {
        self.environments.insert(name.as_ref().to_owned(), target);
    }

    pub fn environments(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.environments.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Connects, logs in and disconnects again.
    pub fn test_connection(&self, environment: &str) -> bool {
        let Some(target) = self.environments.get(environment) else {
            warn!("Missing config for {}", environment);
            return false;
        };
        match self.connector.connect(target) {
            Ok(mut store) => {
                if let Err(e) = store.close() {
                    debug!("Closing test connection to {} failed: {}", environment, e);
                }
                true
            }
            Err(e) => {
                warn!("Connection test for {} failed: {:#}", environment, e);
                false
            }
        }
    }

    /// Stages every manifest entry, then promotes the staged content folders.
    /// Never fails outright; the outcome is described by the report.
    pub fn upload_files(
        &self,
        local_base_path: &Path,
        manifest: &[ManifestEntry],
        environment: &str,
    ) -> UploadReport {
        let total_files = manifest.len();
        let Some(target) = self.environments.get(environment) else {
            let error = DeploymentError::MissingConfig(environment.to_owned());
            error!("{}", error);
            return UploadReport::failure(error, total_files);
        };

        let mut store = match self.connector.connect(target) {
            Ok(store) => store,
            Err(e) => {
                error!("Connecting to {} failed: {:#}", environment, e);
                return UploadReport::failure(DeploymentError::ConnectionFailed(e), total_files);
            }
        };
        info!(
            "Deploying {} files to {} at {}",
            total_files, environment, target.base_path
        );

        let token = self.unique_staging_roots.then(StagingToken::generate);
        let mut run = DeploymentRun::new(FolderLayout::new(&target.base_path, token));
        let report = self.deploy(&mut *store, &mut run, local_base_path, manifest);

        if let Err(e) = store.close() {
            debug!("Closing connection to {} failed: {}", environment, e);
        }
        report
    }

    fn deploy(
        &self,
        store: &mut dyn RemoteStore,
        run: &mut DeploymentRun,
        local_base_path: &Path,
        manifest: &[ManifestEntry],
    ) -> UploadReport {
        let total_files = manifest.len();
        let staged = match upload::stage_files(store, run, local_base_path, manifest) {
            Ok(staged) => staged,
            Err(e) => {
                discard_staging(store, run);
                return UploadReport::failure(DeploymentError::DirectoryUnavailable(e), total_files);
            }
        };

        if !staged.succeeded() {
            error!(
                "{} of {} files failed to upload, discarding staged content",
                staged.failed.len(),
                total_files
            );
            discard_staging(store, run);
            return UploadReport {
                uploaded_files: staged.uploaded,
                failed_files: staged.failed,
                ..UploadReport::failure(DeploymentError::UploadFailed, total_files)
            };
        }

        let switched = switchover::switchover(store, run);

        if switched.succeeded() {
            info!("Deployment of {} files succeeded", staged.uploaded);
            UploadReport {
                success: true,
                message: Some(format!("Uploaded {} files", staged.uploaded)),
                total_files,
                uploaded_files: staged.uploaded,
                folders: switched.folders,
                ..Default::default()
            }
        } else {
            let error = DeploymentError::SwitchoverFailed(switched.failed_folders());
            error!("{}", error);
            UploadReport {
                uploaded_files: staged.uploaded,
                folders: switched.folders,
                ..UploadReport::failure(error, total_files)
            }
        }
    }
}

fn discard_staging(store: &mut dyn RemoteStore, run: &mut DeploymentRun) {
    for root in run.layout.staging_roots() {
        if let Err(e) = cleanup::delete_recursive(store, &mut run.capabilities, &root) {
            warn!("Could not discard staged content at {}: {}", root, e);
        }
    }
}
