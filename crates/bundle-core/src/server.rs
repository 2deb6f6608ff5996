//! Remote hosts declared by `server` and `include-bundles` elements

use crate::manifest::{Attributes, names};
use crate::{Error, Result};

/// A remote host repositories are cloned from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    pub name: Option<String>,
    pub url: String,
    pub push_url: Option<String>,
    /// Spliced in from an included bundle rather than declared here
    pub from_include: bool,
}

impl Server {
    /// Build from element attributes. `url` wins over `server-url`.
    pub fn from_attributes(attributes: &Attributes) -> Result<Self> {
        let url = attributes
            .get(names::URL)
            .or_else(|| attributes.get(names::SERVER_URL))
            .ok_or_else(|| {
                let name = attributes.get(names::NAME).unwrap_or("<unnamed>");
                Error::conflict(format!("server '{name}' has no url"))
            })?;
        Ok(Self {
            name: attributes.get(names::NAME).map(String::from),
            url: normalize(url),
            push_url: attributes.get(names::PUSH_URL).map(normalize),
            from_include: attributes.get(names::FROM_INCLUDE) == Some("true"),
        })
    }

    /// Full URL of the repository at `path` on this server, and its push URL.
    pub fn repo_urls(&self, path: &str) -> (String, Option<String>) {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        let url = format!("{}{path}", self.url);
        let push = self.push_url.as_ref().map(|push| format!("{push}{path}"));
        (url, push)
    }
}

fn normalize(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
