//! Image listing, search, inspection, pull and removal.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::client::RequestOptions;
use crate::types::{Container, Image, ImageWithContainers, InspectImage, NONE_TAG, SearchImage};

use super::{ContainerListParams, Engine, EngineError, path_segment, removal_succeeded};

const SEARCH_LIMIT: u32 = 100;

/// Query flags for `DELETE /images/{name}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveImageOptions {
    /// Remove even if containers use the image.
    pub force: bool,
    /// Keep untagged parent images.
    pub noprune: bool,
}

impl Engine {
    /// List images, one row per repository tag.
    ///
    /// An image with several tags becomes several rows so each tag can be
    /// removed on its own. An untagged image with digests becomes one row
    /// per digest, tagged `<repo>:<none>`.
    pub async fn images(&self) -> Result<Vec<Image>, EngineError> {
        let images = self.fetch_images().await?;
        Ok(images.into_iter().flat_map(fan_out).collect())
    }

    /// List images with the containers created from each.
    ///
    /// Issues one container query per distinct image id, so the number of
    /// requests is bounded by the number of images.
    pub async fn images_with_containers(&self) -> Result<Vec<ImageWithContainers>, EngineError> {
        let images = self.fetch_images().await?;

        let mut dependents: HashMap<String, Vec<Container>> = HashMap::new();
        for image in &images {
            if dependents.contains_key(&image.id) {
                continue;
            }
            let containers = self
                .containers(&ContainerListParams::new().ancestor(&image.id))
                .await?;
            dependents.insert(image.id.clone(), containers);
        }

        Ok(images
            .into_iter()
            .flat_map(fan_out)
            .map(|image| {
                let containers = dependents.get(&image.id).cloned().unwrap_or_default();
                ImageWithContainers {
                    image,
                    dependents: containers,
                }
            })
            .collect())
    }

    /// Search the registry for images matching `term`.
    pub async fn search_images(&self, term: &str) -> Result<Vec<SearchImage>, EngineError> {
        let path = "/images/search";
        let resp = self
            .client
            .get::<Vec<SearchImage>>(
                path,
                RequestOptions::new()
                    .param("term", term)
                    .param("limit", SEARCH_LIMIT),
            )
            .await?;
        Ok(resp.into_body().unwrap_or_default())
    }

    /// Typed image record from the HTTP API.
    pub async fn inspect_image(&self, name: &str) -> Result<InspectImage, EngineError> {
        let path = format!("/images/{}/json", path_segment(name));
        self.client
            .get::<InspectImage>(&path, RequestOptions::new())
            .await?
            .into_body()
            .ok_or(EngineError::EmptyBody(path))
    }

    /// Raw `inspect` output of any engine object, split into lines.
    pub async fn inspect(&self, id: &str) -> Result<Vec<String>, EngineError> {
        let output = self.run_docker("docker inspect", &["inspect", id]).await?;
        Ok(output.stdout.lines().map(str::to_string).collect())
    }

    /// Pull an image through the engine CLI. A missing tag defaults to
    /// `latest`.
    pub async fn pull_image(&self, name: &str) -> Result<(), EngineError> {
        let reference = image_reference(name);
        info!(image = %reference, "pulling image");
        self.run_docker("docker pull", &["pull", &reference]).await?;
        Ok(())
    }

    /// `DELETE /images/{name}`; success is a status `<= 300`.
    pub async fn remove_image(
        &self,
        name: &str,
        opts: RemoveImageOptions,
    ) -> Result<bool, EngineError> {
        let resp = self
            .client
            .delete(
                &format!("/images/{}", path_segment(name)),
                RequestOptions::new()
                    .param("force", opts.force)
                    .param("noprune", opts.noprune),
            )
            .await?;
        info!(image = %name, status = resp.status, "removed image");
        Ok(removal_succeeded(resp.status))
    }

    async fn fetch_images(&self) -> Result<Vec<Image>, EngineError> {
        let path = "/images/json";
        let images = self
            .client
            .get::<Vec<Image>>(path, RequestOptions::new())
            .await?
            .into_body()
            .ok_or_else(|| EngineError::EmptyBody(path.to_string()))?;
        debug!(count = images.len(), "fetched images");
        Ok(images)
    }
}

/// Append `:latest` to a reference without a tag. Digest references and
/// registry ports are left alone.
pub fn image_reference(name: &str) -> String {
    if name.contains('@') {
        return name.to_string();
    }
    let name_start = name.rfind('/').map_or(0, |i| i + 1);
    if name[name_start..].contains(':') {
        name.to_string()
    } else {
        format!("{name}:latest")
    }
}

fn fan_out(image: Image) -> Vec<Image> {
    if image.repo_tags.len() > 1 {
        return image
            .repo_tags
            .iter()
            .map(|tag| Image {
                repo_tags: vec![tag.clone()],
                ..image.clone()
            })
            .collect();
    }

    if image.repo_tags.is_empty() && !image.repo_digests.is_empty() {
        return image
            .repo_digests
            .iter()
            .map(|digest| {
                let repo = digest.split_once('@').map_or(digest.as_str(), |(r, _)| r);
                Image {
                    repo_tags: vec![format!("{repo}:{NONE_TAG}")],
                    repo_digests: vec![digest.clone()],
                    ..image.clone()
                }
            })
            .collect();
    }

    vec![image]
}
