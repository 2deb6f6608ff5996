//! Sections prepended to `HISTORY` on every release

use super::{ChangeCategories, VersionMarker};

const RULE: &str = "===========================================================";

/// History entry for a release of `marker` carrying `changes`.
pub fn history_section(marker: &VersionMarker, changes: &ChangeCategories, built_on: &str) -> String {
    format!(
        "{RULE}\nPackage: {} {}\n{RULE}\nRelease {} built by bundler on {built_on}\n{}\n",
        marker.product,
        marker.version,
        marker.release,
        changes.render()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::MarkerFormat;

    #[test]
    fn section_is_parseable_as_changes() {
        let marker = VersionMarker {
            product: "Foo".into(),
            version: "1.3.0".into(),
            release: 1,
            format: MarkerFormat::KeyValue,
        };
        let changes = ChangeCategories {
            features: vec!["Shiny".into()],
            ..Default::default()
        };

        let section = history_section(&marker, &changes, "2024-05-01 12:00");

        assert!(section.starts_with(RULE));
        assert!(section.contains("Package: Foo 1.3.0"));
        assert_eq!(ChangeCategories::parse(&section), changes);
    }
}
