//! File copy and directory listing inside containers, via the engine CLI.

use tracing::info;

use crate::types::DirectoryItem;

use super::{Engine, EngineError, parse_directory_items};

impl Engine {
    /// Copy host path `from` to `to` inside container `id`.
    pub async fn copy_to_container(&self, id: &str, from: &str, to: &str) -> Result<(), EngineError> {
        let target = format!("{id}:{to}");
        self.run_docker("failed to copy file to container", &["cp", from, &target])
            .await?;
        info!(container = %id, from, to, "copied file to container");
        Ok(())
    }

    /// Copy `from` inside container `id` to host path `to`.
    pub async fn copy_from_container(
        &self,
        id: &str,
        from: &str,
        to: &str,
    ) -> Result<(), EngineError> {
        let source = format!("{id}:{from}");
        self.run_docker("failed to copy file from container", &["cp", &source, to])
            .await?;
        info!(container = %id, from, to, "copied file from container");
        Ok(())
    }

    /// List the directory `path` inside container `id`.
    pub async fn list_directory(
        &self,
        id: &str,
        path: &str,
    ) -> Result<Vec<DirectoryItem>, EngineError> {
        let output = self
            .run_docker("docker exec ls", &["exec", id, "ls", "-la", path])
            .await?;
        Ok(parse_directory_items(&output.stdout, path))
    }
}
