//! Engine API record types.
//!
//! Field names follow the engine's JSON (`PascalCase` for image and
//! container records, `snake_case` for registry search results). Fields
//! the engine may send as `null` deserialize to their empty value.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Image summary from `GET /images/json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Image {
    pub id: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub repo_tags: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub repo_digests: Vec<String>,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub shared_size: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub labels: HashMap<String, String>,
    /// Number of containers using the image; `-1` when the engine did not
    /// compute it.
    #[serde(default = "not_computed")]
    pub containers: i64,
}

fn not_computed() -> i64 {
    -1
}

/// Marker the engine uses for a missing repository or tag.
pub const NONE_TAG: &str = "<none>";

impl Image {
    /// First `repository:tag` split into its two halves. A registry port
    /// (`host:5000/app`) is not mistaken for a tag.
    fn split_reference(&self) -> (&str, &str) {
        let Some(reference) = self.repo_tags.first() else {
            return (NONE_TAG, NONE_TAG);
        };
        let name_start = reference.rfind('/').map_or(0, |i| i + 1);
        match reference[name_start..].rfind(':') {
            Some(i) => (
                &reference[..name_start + i],
                &reference[name_start + i + 1..],
            ),
            None => (reference.as_str(), NONE_TAG),
        }
    }

    pub fn repository(&self) -> &str {
        self.split_reference().0
    }

    pub fn tag(&self) -> &str {
        self.split_reference().1
    }

    /// Short 12-character id without the `sha256:` prefix.
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

/// An image row together with the containers created from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageWithContainers {
    #[serde(flatten)]
    pub image: Image,
    #[serde(rename = "DependentContainers")]
    pub dependents: Vec<Container>,
}

impl ImageWithContainers {
    /// Whether any container (running or not) references the image.
    pub fn in_use(&self) -> bool {
        !self.dependents.is_empty()
    }
}

/// Container summary from `GET /containers/json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Container {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub names: Vec<String>,
    #[serde(default)]
    pub image: String,
    #[serde(rename = "ImageID", default)]
    pub image_id: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "nullable")]
    pub ports: Vec<Port>,
    #[serde(default, deserialize_with = "nullable")]
    pub labels: HashMap<String, String>,
}

impl Container {
    /// First name without the leading `/`.
    pub fn name(&self) -> &str {
        self.names
            .first()
            .map(|n| n.trim_start_matches('/'))
            .unwrap_or_default()
    }

    pub fn is_running(&self) -> bool {
        self.state == "running"
    }

    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

/// A container port mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Port {
    #[serde(rename = "IP", default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    pub private_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_port: Option<u16>,
    #[serde(rename = "Type", default)]
    pub kind: String,
}

impl Port {
    /// A port with a public side is published on the host.
    pub fn is_published(&self) -> bool {
        self.public_port.is_some()
    }
}

/// Registry search result from `GET /images/search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchImage {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub star_count: u64,
    #[serde(default)]
    pub is_official: bool,
    #[serde(default)]
    pub is_automated: bool,
}

/// Detailed image record from `GET /images/{name}/json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectImage {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub repo_tags: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub repo_digests: Vec<String>,
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub docker_version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub config: Option<ImageConfig>,
    #[serde(rename = "RootFS", default)]
    pub root_fs: Option<RootFs>,
}

/// Runtime defaults baked into an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageConfig {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub working_dir: String,
    #[serde(default, deserialize_with = "nullable")]
    pub env: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub cmd: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub entrypoint: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub labels: HashMap<String, String>,
}

/// Layer description of an image's root filesystem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RootFs {
    #[serde(rename = "Type", default)]
    pub kind: String,
    #[serde(default, deserialize_with = "nullable")]
    pub layers: Vec<String>,
}

/// Kind of a directory entry inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Dir,
    File,
}

/// One entry of a container directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryItem {
    pub name: String,
    /// Absolute path; directories end with `/`.
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
}

fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    id.get(..12).unwrap_or(id)
}
