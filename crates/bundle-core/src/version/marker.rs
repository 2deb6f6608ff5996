//! Version marker files in their three supported variants

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ReleaseFailure;

/// On-disk variant of a version marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerFormat {
    /// `VERSION`: `NAME=`, `VERSION=`, `RELEASE=` lines
    KeyValue,
    /// `version.toml`: a `[product]` table
    Toml,
    /// `version.txt`: `[<name> ]<version>-<release>`
    Plain,
}

impl MarkerFormat {
    /// Probe order when several markers exist.
    pub const PROBE_ORDER: [MarkerFormat; 3] =
        [MarkerFormat::KeyValue, MarkerFormat::Toml, MarkerFormat::Plain];

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::KeyValue => "VERSION",
            Self::Toml => "version.toml",
            Self::Plain => "version.txt",
        }
    }
}

/// Product identity and version read from a marker file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMarker {
    pub product: String,
    pub version: String,
    pub release: u32,
    pub format: MarkerFormat,
}

#[derive(Debug, Serialize, Deserialize)]
struct TomlMarker {
    product: TomlProduct,
}

#[derive(Debug, Serialize, Deserialize)]
struct TomlProduct {
    name: String,
    version: String,
    #[serde(default = "first_release")]
    release: u32,
}

fn first_release() -> u32 {
    1
}

impl VersionMarker {
    /// Find and parse the marker in `dir`. `Ok(None)` when there is none.
    pub fn find(dir: &Path) -> Result<Option<Self>, ReleaseFailure> {
        for format in MarkerFormat::PROBE_ORDER {
            let path = dir.join(format.file_name());
            if !path.is_file() {
                continue;
            }
            let content =
                std::fs::read_to_string(&path).map_err(|e| ReleaseFailure::InvalidVersionFile {
                    file: format.file_name().to_string(),
                    message: e.to_string(),
                })?;
            let fallback_name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            return Self::parse(&content, format, &fallback_name).map(Some);
        }
        Ok(None)
    }

    /// Parse marker content of the given variant.
    pub fn parse(content: &str, format: MarkerFormat, fallback_name: &str) -> Result<Self, ReleaseFailure> {
        let invalid = |message: String| ReleaseFailure::InvalidVersionFile {
            file: format.file_name().to_string(),
            message,
        };
        match format {
            MarkerFormat::KeyValue => {
                let mut product = None;
                let mut version = None;
                let mut release = None;
                for line in content.lines() {
                    let Some((key, value)) = line.split_once('=') else {
                        continue;
                    };
                    let key = key.trim().to_ascii_uppercase();
                    let value = value.trim().trim_matches('"').to_string();
                    match key.strip_prefix("PKG_").unwrap_or(&key) {
                        "NAME" => product = Some(value),
                        "VERSION" => version = Some(value),
                        "RELEASE" => release = Some(value),
                        _ => {}
                    }
                }
                let version = version.ok_or_else(|| invalid("no VERSION entry".into()))?;
                let release = match release {
                    Some(raw) => raw
                        .parse()
                        .map_err(|_| invalid(format!("release '{raw}' is not a number")))?,
                    None => 1,
                };
                Ok(Self {
                    product: product.unwrap_or_else(|| fallback_name.to_string()),
                    version,
                    release,
                    format,
                })
            }
            MarkerFormat::Toml => {
                let parsed: TomlMarker =
                    toml::from_str(content).map_err(|e| invalid(e.message().to_string()))?;
                Ok(Self {
                    product: parsed.product.name,
                    version: parsed.product.version,
                    release: parsed.product.release,
                    format,
                })
            }
            MarkerFormat::Plain => {
                let line = content
                    .lines()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .ok_or_else(|| invalid("empty file".into()))?;
                let (product, rest) = match line.split_once(char::is_whitespace) {
                    Some((name, rest)) => (name.to_string(), rest.trim()),
                    None => (fallback_name.to_string(), line),
                };
                let (version, release) = match rest.rsplit_once('-') {
                    Some((version, release)) if release.parse::<u32>().is_ok() => {
                        (version.to_string(), release.parse().unwrap_or(1))
                    }
                    _ => (rest.to_string(), 1),
                };
                if version.is_empty() {
                    return Err(invalid("no version".into()));
                }
                Ok(Self {
                    product,
                    version,
                    release,
                    format,
                })
            }
        }
    }

    /// Render in the variant the marker was read from.
    pub fn render(&self) -> String {
        match self.format {
            MarkerFormat::KeyValue => format!(
                "NAME={}\nVERSION={}\nRELEASE={}\n",
                self.product, self.version, self.release
            ),
            MarkerFormat::Toml => {
                let marker = TomlMarker {
                    product: TomlProduct {
                        name: self.product.clone(),
                        version: self.version.clone(),
                        release: self.release,
                    },
                };
                toml::to_string(&marker).unwrap_or_default()
            }
            MarkerFormat::Plain => format!("{} {}-{}\n", self.product, self.version, self.release),
        }
    }

    /// Marker file path in `dir`.
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.format.file_name())
    }

    /// `<version>-<release>`, as written into archives.
    pub fn archive_label(&self) -> String {
        format!("{}-{}", self.version, self.release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn key_value_with_pkg_prefix() {
        let marker = VersionMarker::parse(
            "PKG_NAME=Foo\nPKG_VERSION=1.2.3\nPKG_RELEASE=4\n",
            MarkerFormat::KeyValue,
            "dir",
        )
        .unwrap();
        assert_eq!(marker.product, "Foo");
        assert_eq!(marker.version, "1.2.3");
        assert_eq!(marker.release, 4);
    }

    #[test]
    fn plain_with_and_without_name() {
        let named = VersionMarker::parse("Foo 1.2.3-feature-2\n", MarkerFormat::Plain, "dir").unwrap();
        assert_eq!(named.product, "Foo");
        assert_eq!(named.version, "1.2.3-feature");
        assert_eq!(named.release, 2);

        let bare = VersionMarker::parse("0.4.0\n", MarkerFormat::Plain, "dir").unwrap();
        assert_eq!(bare.product, "dir");
        assert_eq!(bare.version, "0.4.0");
        assert_eq!(bare.release, 1);
    }

    #[test]
    fn every_variant_round_trips() {
        for format in MarkerFormat::PROBE_ORDER {
            let marker = VersionMarker {
                product: "Foo".into(),
                version: "2.0.1".into(),
                release: 3,
                format,
            };
            let parsed = VersionMarker::parse(&marker.render(), format, "dir").unwrap();
            assert_eq!(parsed, marker, "{format:?}");
        }
    }

    #[test]
    fn key_value_wins_over_plain() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("version.txt"), "9.9.9-1").unwrap();
        std::fs::write(temp.path().join("VERSION"), "VERSION=1.0.0\n").unwrap();

        let marker = VersionMarker::find(temp.path()).unwrap().unwrap();

        assert_eq!(marker.format, MarkerFormat::KeyValue);
        assert_eq!(marker.version, "1.0.0");
    }

    #[test]
    fn invalid_release_number() {
        let result = VersionMarker::parse("VERSION=1.0\nRELEASE=x\n", MarkerFormat::KeyValue, "d");
        assert!(matches!(result, Err(ReleaseFailure::InvalidVersionFile { .. })));
    }

    #[test]
    fn missing_marker_is_none() {
        let temp = TempDir::new().unwrap();
        assert_eq!(VersionMarker::find(temp.path()).unwrap(), None);
    }
}
