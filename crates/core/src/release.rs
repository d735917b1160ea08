//! Release records and the keys and filters used to look them up.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::validation::{ValidationResult, require_non_empty};

/// One deployable image for one container in one release channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
  pub container: String,
  pub release_channel: String,
  pub image_path: String,
}

impl Release {
  /// Build a release, rejecting any empty field.
  pub fn new(
    container: impl Into<String>,
    release_channel: impl Into<String>,
    image_path: impl Into<String>,
  ) -> ValidationResult<Self> {
    let release = Self {
      container: container.into(),
      release_channel: release_channel.into(),
      image_path: image_path.into(),
    };
    release.validate()?;
    Ok(release)
  }

  /// Check that all three fields are set. The first empty field is reported by its wire name.
  pub fn validate(&self) -> ValidationResult<()> {
    require_non_empty(&self.container, "container")?;
    require_non_empty(&self.release_channel, "releaseChannel")?;
    require_non_empty(&self.image_path, "imagePath")?;
    Ok(())
  }

  pub fn key(&self) -> ReleaseKey {
    ReleaseKey {
      container: self.container.clone(),
      release_channel: self.release_channel.clone(),
    }
  }
}

impl fmt::Display for Release {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{} -> {}", self.container, self.release_channel, self.image_path)
  }
}

/// Composite identity of a release: one image per (container, channel) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReleaseKey {
  pub container: String,
  pub release_channel: String,
}

impl ReleaseKey {
  pub fn new(container: impl Into<String>, release_channel: impl Into<String>) -> Self {
    Self {
      container: container.into(),
      release_channel: release_channel.into(),
    }
  }
}

impl fmt::Display for ReleaseKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.container, self.release_channel)
  }
}

/// A partial-key filter. Empty strings are treated the same as absent fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReleaseQuery {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub container: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub release_channel: Option<String>,
}

/// Which index a query resolves to, in precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryShape<'a> {
  /// Both fields set: at most one match
  Exact(ReleaseKey),
  /// Only the container is set
  Container(&'a str),
  /// Only the release channel is set
  Channel(&'a str),
  /// Neither is set: dump everything
  All,
}

impl ReleaseQuery {
  pub fn new(container: Option<&str>, release_channel: Option<&str>) -> Self {
    Self {
      container: container.map(String::from),
      release_channel: release_channel.map(String::from),
    }
  }

  pub fn all() -> Self {
    Self::default()
  }

  pub fn by_container(container: impl Into<String>) -> Self {
    Self {
      container: Some(container.into()),
      release_channel: None,
    }
  }

  pub fn by_channel(release_channel: impl Into<String>) -> Self {
    Self {
      container: None,
      release_channel: Some(release_channel.into()),
    }
  }

  pub fn exact(container: impl Into<String>, release_channel: impl Into<String>) -> Self {
    Self {
      container: Some(container.into()),
      release_channel: Some(release_channel.into()),
    }
  }

  pub fn container(&self) -> Option<&str> {
    self.container.as_deref().filter(|s| !s.is_empty())
  }

  pub fn release_channel(&self) -> Option<&str> {
    self.release_channel.as_deref().filter(|s| !s.is_empty())
  }

  pub fn shape(&self) -> QueryShape<'_> {
    match (self.container(), self.release_channel()) {
      (Some(container), Some(channel)) => QueryShape::Exact(ReleaseKey::new(container, channel)),
      (Some(container), None) => QueryShape::Container(container),
      (None, Some(channel)) => QueryShape::Channel(channel),
      (None, None) => QueryShape::All,
    }
  }
}
