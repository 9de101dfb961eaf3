#[macro_use]
extern crate log;

mod cleanup;
mod manifest;
mod provision;
mod publisher;
mod report;
mod run;
mod switchover;
mod upload;

pub mod config;
pub mod path;
pub mod store;

pub use manifest::ManifestEntry;
pub use publisher::{DeploymentError, Publisher};
pub use report::{FailedFile, FolderReport, UploadReport};
pub use switchover::FolderOutcome;
