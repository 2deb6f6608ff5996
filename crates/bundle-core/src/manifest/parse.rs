//! Reading manifests through `xot` into the owned tree

use std::path::Path;

use xot::{Value, Xot};

use super::model::{Attributes, Element, ManifestDoc, Node};
use crate::{Error, Result};

impl ManifestDoc {
    /// Parse manifest XML. `origin` only labels errors.
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        let mut xot = Xot::new();
        let parse_error = |message: String| Error::ManifestParse {
            path: origin.to_path_buf(),
            message,
        };
        let document = xot.parse(content).map_err(|e| parse_error(e.to_string()))?;
        let root = xot
            .document_element(document)
            .map_err(|e| parse_error(e.to_string()))?;
        Ok(Self::new(convert(&xot, root)))
    }

    /// Load the manifest file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = bundle_fs::read_text(path)?;
        Self::parse(&content, path)
    }
}

fn convert(xot: &Xot, node: xot::Node) -> Element {
    let name = match xot.value(node) {
        Value::Element(element) => xot.local_name_str(element.name()).to_string(),
        _ => String::new(),
    };
    let attributes: Attributes = xot
        .attributes(node)
        .iter()
        .map(|(name, value)| (xot.local_name_str(name).to_string(), value.to_string()))
        .collect();

    let mut children = Vec::new();
    for child in xot.children(node) {
        match xot.value(child) {
            Value::Element(_) => children.push(Node::Element(convert(xot, child))),
            Value::Comment(comment) => children.push(Node::Comment(comment.get().to_string())),
            Value::Text(text) => {
                let text = text.get().trim();
                if !text.is_empty() {
                    children.push(Node::Text(text.to_string()));
                }
            }
            _ => {}
        }
    }

    Element {
        name,
        attributes,
        children,
    }
}
