//! Serialising manifests through `xot` as indented XML

use std::path::Path;

use xot::output::xml::{Declaration, Parameters};
use xot::output::Indentation;
use xot::Xot;

use super::model::{Element, ManifestDoc, Node};
use crate::{Error, Result};

impl ManifestDoc {
    /// Render with two-space indentation, one element per line.
    pub fn to_xml(&self) -> Result<String> {
        let mut xot = Xot::new();
        let root = build(&mut xot, &self.root)?;
        let document = xot.new_document_with_element(root).map_err(write_error)?;
        let parameters = Parameters {
            indentation: Some(Indentation::default()),
            declaration: Some(Declaration {
                encoding: Some("UTF-8".to_string()),
                standalone: None,
            }),
            ..Default::default()
        };
        xot.serialize_xml_string(parameters, document)
            .map_err(write_error)
    }

    /// Write the manifest atomically to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        bundle_fs::write_text(path, &self.to_xml()?)?;
        tracing::debug!(path = %path.display(), "Wrote manifest");
        Ok(())
    }
}

fn build(xot: &mut Xot, element: &Element) -> Result<xot::Node> {
    let name = xot.add_name(&element.name);
    let node = xot.new_element(name);
    for (key, value) in element.attributes.iter() {
        let key = xot.add_name(key);
        xot.set_attribute(node, key, value);
    }
    for child in &element.children {
        let child = match child {
            Node::Element(child) => build(xot, child)?,
            Node::Comment(comment) => xot.new_comment(comment),
            Node::Text(text) => xot.new_text(text),
        };
        xot.append(node, child).map_err(write_error)?;
    }
    Ok(node)
}

fn write_error(e: xot::Error) -> Error {
    Error::ManifestWrite {
        message: e.to_string(),
    }
}
