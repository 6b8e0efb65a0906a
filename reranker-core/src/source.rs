use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Which element of a feed entry carries the canonical article link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum LinkKey {
    /// RSS `<link>` / Atom alternate link.
    #[default]
    Link,
    /// RSS `<guid>` / Atom `<id>`.
    Guid,
    /// Namespaced extension element such as `feedburner:origLink`.
    Extension { prefix: String, name: String },
}

impl LinkKey {
    pub fn parse(value: &str) -> Self {
        match value {
            "link" => LinkKey::Link,
            "guid" | "id" => LinkKey::Guid,
            other => match other.split_once(':') {
                Some((prefix, name)) if !prefix.is_empty() && !name.is_empty() => {
                    LinkKey::Extension {
                        prefix: prefix.to_owned(),
                        name: name.to_owned(),
                    }
                }
                _ => LinkKey::Link,
            },
        }
    }

    /// The other common convention, tried when this key is absent on an entry.
    pub fn fallback(&self) -> LinkKey {
        match self {
            LinkKey::Link => LinkKey::Guid,
            LinkKey::Guid | LinkKey::Extension { .. } => LinkKey::Link,
        }
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkKey::Link => f.write_str("link"),
            LinkKey::Guid => f.write_str("guid"),
            LinkKey::Extension { prefix, name } => write!(f, "{prefix}:{name}"),
        }
    }
}

impl Serialize for LinkKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LinkKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(LinkKey::parse(&raw))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Source {
    pub feed_endpoint: String,
    #[serde(default)]
    pub link_key: LinkKey,
    pub display_name: String,
}

impl Source {
    pub fn new(
        feed_endpoint: impl Into<String>,
        link_key: LinkKey,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            feed_endpoint: feed_endpoint.into(),
            link_key,
            display_name: display_name.into(),
        }
    }
}
