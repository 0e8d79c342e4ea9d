//! Container listing, lifecycle actions and removal.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{info, warn};

use crate::client::RequestOptions;
use crate::types::Container;

use super::{Engine, EngineError, lifecycle_succeeded, path_segment, removal_succeeded};

/// Query for `GET /containers/json`.
///
/// Lists stopped containers too unless [`running`](Self::running) is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerListParams {
    pub all: bool,
    pub filters: BTreeMap<String, Vec<String>>,
}

impl Default for ContainerListParams {
    fn default() -> Self {
        Self {
            all: true,
            filters: BTreeMap::new(),
        }
    }
}

impl ContainerListParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only running containers.
    pub fn running() -> Self {
        Self {
            all: false,
            ..Self::default()
        }
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.entry(key.into()).or_default().push(value.into());
        self
    }

    /// Containers created from the image `id`.
    pub fn ancestor(self, id: impl Into<String>) -> Self {
        self.filter("ancestor", id)
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.filter("id", id)
    }

    /// The engine matches this as a pattern, so `web` also selects `webapp`.
    pub fn name(self, name: impl Into<String>) -> Self {
        self.filter("name", name)
    }

    fn to_options(&self) -> RequestOptions {
        let opts = RequestOptions::new().param("all", self.all);
        if self.filters.is_empty() {
            return opts;
        }
        let filters: serde_json::Map<String, Value> = self
            .filters
            .iter()
            .map(|(key, values)| (key.clone(), Value::from(values.clone())))
            .collect();
        opts.param("filters", Value::Object(filters))
    }
}

/// Query flags for `DELETE /containers/{name}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveContainerOptions {
    /// Remove anonymous volumes too.
    pub v: bool,
    /// Kill the container first if it is running.
    pub force: bool,
    /// Remove the link instead of the container.
    pub link: bool,
}

impl Engine {
    pub async fn containers(
        &self,
        params: &ContainerListParams,
    ) -> Result<Vec<Container>, EngineError> {
        let resp = self
            .client
            .get::<Vec<Container>>("/containers/json", params.to_options())
            .await?;
        Ok(resp.into_body().unwrap_or_default())
    }

    pub async fn start_container(&self, name: &str) -> Result<bool, EngineError> {
        self.container_action(name, "start").await
    }

    pub async fn stop_container(&self, name: &str) -> Result<bool, EngineError> {
        self.container_action(name, "stop").await
    }

    pub async fn kill_container(&self, name: &str) -> Result<bool, EngineError> {
        self.container_action(name, "kill").await
    }

    pub async fn restart_container(&self, name: &str) -> Result<bool, EngineError> {
        self.container_action(name, "restart").await
    }

    /// `DELETE /containers/{name}`; success is a status `<= 300`.
    pub async fn remove_container(
        &self,
        name: &str,
        opts: RemoveContainerOptions,
    ) -> Result<bool, EngineError> {
        let resp = self
            .client
            .delete(
                &format!("/containers/{}", path_segment(name)),
                RequestOptions::new()
                    .param("v", opts.v)
                    .param("force", opts.force)
                    .param("link", opts.link),
            )
            .await?;
        info!(container = %name, status = resp.status, "removed container");
        Ok(removal_succeeded(resp.status))
    }

    /// Kill `container` only if it exists and is running.
    ///
    /// `container` is looked up by id first, then by exact name. Precondition
    /// failures are returned as [`EngineError::ContainerNotFound`] or
    /// [`EngineError::ContainerNotRunning`]; the kill endpoint is not called
    /// in either case.
    pub async fn try_kill_running(&self, container: &str) -> Result<bool, EngineError> {
        let Some(found) = self.find_container(container).await? else {
            return Err(EngineError::ContainerNotFound(container.to_string()));
        };
        if !found.is_running() {
            return Err(EngineError::ContainerNotRunning {
                id: found.id,
                state: found.state,
            });
        }
        self.kill_container(&found.id).await
    }

    /// Like [`try_kill_running`](Self::try_kill_running), but a precondition
    /// failure is logged and reported as `false`. Transport, protocol and
    /// API errors still propagate.
    pub async fn kill_if_running(&self, container: &str) -> Result<bool, EngineError> {
        match self.try_kill_running(container).await {
            Err(err) if err.is_precondition() => {
                warn!(container, error = %err, "not killing container");
                Ok(false)
            }
            other => other,
        }
    }

    async fn find_container(&self, container: &str) -> Result<Option<Container>, EngineError> {
        let by_id = self.containers(&ContainerListParams::new().id(container)).await?;
        if let Some(found) = by_id.into_iter().next() {
            return Ok(Some(found));
        }
        let by_name = self
            .containers(&ContainerListParams::new().name(container))
            .await?;
        Ok(by_name.into_iter().find(|c| c.name() == container))
    }

    async fn container_action(&self, name: &str, action: &str) -> Result<bool, EngineError> {
        let resp = self
            .client
            .post(
                &format!("/containers/{}/{action}", path_segment(name)),
                RequestOptions::new(),
            )
            .await?;
        info!(container = %name, action, status = resp.status, "container action");
        Ok(lifecycle_succeeded(resp.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_lists_all() {
        let params = ContainerListParams::default();
        assert!(params.all);
        assert!(params.filters.is_empty());
        assert!(!ContainerListParams::running().all);
    }

    #[test]
    fn test_filters_encoded_as_json_param() {
        let request = ContainerListParams::new()
            .ancestor("sha256:ab")
            .to_options()
            .into_request(crate::http::Method::Get, "/containers/json");
        assert_eq!(
            request.target(),
            "/containers/json?all=true&filters=%7B%22ancestor%22%3A%5B%22sha256%3Aab%22%5D%7D"
        );
    }

    #[test]
    fn test_filter_values_accumulate() {
        let params = ContainerListParams::running()
            .filter("status", "running")
            .filter("status", "paused")
            .id("web")
            .name("web");
        assert_eq!(params.filters["status"], vec!["running", "paused"]);
        assert_eq!(params.filters["id"], vec!["web"]);
        assert_eq!(params.filters["name"], vec!["web"]);
    }

    #[test]
    fn test_no_filters_param_when_empty() {
        let request = ContainerListParams::running()
            .to_options()
            .into_request(crate::http::Method::Get, "/containers/json");
        assert_eq!(request.target(), "/containers/json?all=false");
    }
}
