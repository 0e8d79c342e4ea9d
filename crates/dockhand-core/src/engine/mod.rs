//! Container and image operations on top of the [`ApiClient`].
//!
//! An [`Engine`] is built once by the caller and passed by reference to
//! every operation. HTTP calls go through its client; pull, CLI
//! inspection, file copy and directory listing go through its
//! [`CommandRunner`].
//!
//! Lifecycle actions and removals report success as a boolean derived
//! from the response status, using two different thresholds:
//!
//! | Operation | Success |
//! |-----------|---------|
//! | start / stop / kill / restart | status `< 300` |
//! | remove image / remove container | status `<= 300` |

use std::sync::Arc;

use serde::Serialize;

use dockhand_config::AppConfig;

use crate::client::{ApiClient, ClientError};
use crate::process::{CommandRunner, ProcessError, ProcessOutput, TokioCommandRunner};
use crate::types::{Container, Image, ImageWithContainers, InspectImage, SearchImage};

mod containers;
mod files;
mod images;
pub mod listing;
pub mod template;

pub use containers::{ContainerListParams, RemoveContainerOptions};
pub use images::{RemoveImageOptions, image_reference};
pub use listing::parse_directory_items;
pub use template::expand_row_command;

/// Errors from engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("container {id} is not running (state: {state})")]
    ContainerNotRunning { id: String, state: String },

    #[error("engine returned no body for {0}")]
    EmptyBody(String),
}

impl EngineError {
    /// Whether the error is a local precondition failure rather than a
    /// transport, protocol or process failure.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            EngineError::ContainerNotFound(_) | EngineError::ContainerNotRunning { .. }
        )
    }
}

/// Success threshold for start, stop, kill and restart.
pub fn lifecycle_succeeded(status: u16) -> bool {
    status < 300
}

/// Success threshold for image and container removal. Looser than
/// [`lifecycle_succeeded`]: a 300 counts.
pub fn removal_succeeded(status: u16) -> bool {
    status <= 300
}

/// Percent-encode a caller-supplied name for use in a request path.
///
/// `:`, `/` and `@` stay literal so references such as `ubuntu:12.04`,
/// `library/ubuntu` and `alpine@sha256:...` keep their usual form.
pub fn path_segment(name: &str) -> String {
    urlencoding::encode(name)
        .replace("%3A", ":")
        .replace("%2F", "/")
        .replace("%40", "@")
}

/// Which collection [`Engine::list`] fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListKind {
    Images,
    ImagesWithContainers,
    Containers(ContainerListParams),
    Search(String),
}

/// Result of [`Engine::list`], tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum Listing {
    Images(Vec<Image>),
    ImagesWithContainers(Vec<ImageWithContainers>),
    Containers(Vec<Container>),
    Search(Vec<SearchImage>),
}

impl Listing {
    pub fn len(&self) -> usize {
        match self {
            Listing::Images(items) => items.len(),
            Listing::ImagesWithContainers(items) => items.len(),
            Listing::Containers(items) => items.len(),
            Listing::Search(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How [`Engine::inspect_as`] inspects an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InspectFormat {
    /// Raw text lines from the engine CLI (works for any object).
    #[default]
    Lines,
    /// Typed image record from the HTTP API.
    Image,
}

/// Result of [`Engine::inspect_as`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Inspection {
    Lines(Vec<String>),
    Image(Box<InspectImage>),
}

/// Engine API operations.
#[derive(Clone)]
pub struct Engine {
    client: ApiClient,
    runner: Arc<dyn CommandRunner>,
    docker_bin: String,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("client", &self.client)
            .field("docker_bin", &self.docker_bin)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine using `docker` on `PATH` for process-backed
    /// operations.
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            runner: Arc::new(TokioCommandRunner::new()),
            docker_bin: "docker".to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(ApiClient::from_config(&config.engine)).with_docker_bin(&config.cli.docker_bin)
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_docker_bin(mut self, docker_bin: impl Into<String>) -> Self {
        self.docker_bin = docker_bin.into();
        self
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn docker_bin(&self) -> &str {
        &self.docker_bin
    }

    /// Fetch one collection, tagged with its kind.
    pub async fn list(&self, kind: ListKind) -> Result<Listing, EngineError> {
        Ok(match kind {
            ListKind::Images => Listing::Images(self.images().await?),
            ListKind::ImagesWithContainers => {
                Listing::ImagesWithContainers(self.images_with_containers().await?)
            }
            ListKind::Containers(params) => Listing::Containers(self.containers(&params).await?),
            ListKind::Search(term) => Listing::Search(self.search_images(&term).await?),
        })
    }

    /// Inspect `id` as raw CLI lines or as a typed image record.
    pub async fn inspect_as(
        &self,
        id: &str,
        format: InspectFormat,
    ) -> Result<Inspection, EngineError> {
        match format {
            InspectFormat::Lines => Ok(Inspection::Lines(self.inspect(id).await?)),
            InspectFormat::Image => Ok(Inspection::Image(Box::new(self.inspect_image(id).await?))),
        }
    }

    /// Run `<docker_bin> args...` and fail on a non-zero exit.
    async fn run_docker(&self, context: &str, args: &[&str]) -> Result<ProcessOutput, EngineError> {
        let argv: Vec<String> = std::iter::once(self.docker_bin.as_str())
            .chain(args.iter().copied())
            .map(str::to_string)
            .collect();
        let output = self.runner.run(&argv).await?;
        Ok(output.check(context)?)
    }
}
