//! Changelog sections: requires, features, bug fixes, internal features

use std::fmt::Write as _;

/// The four changelog buckets, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Requires,
    Features,
    BugFixes,
    InternalFeatures,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Requires,
        Section::Features,
        Section::BugFixes,
        Section::InternalFeatures,
    ];

    /// Header written to changelog files.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Requires => "Requires",
            Self::Features => "New features",
            Self::BugFixes => "Bug fixes",
            Self::InternalFeatures => "New internal features",
        }
    }

    fn from_header(line: &str) -> Option<Self> {
        match line.trim().trim_end_matches(':').to_ascii_lowercase().as_str() {
            "requires" => Some(Self::Requires),
            "new features" | "features" => Some(Self::Features),
            "bug fixes" | "bugfixes" => Some(Self::BugFixes),
            "new internal features" | "internal features" => Some(Self::InternalFeatures),
            _ => None,
        }
    }
}

/// Classified changelog entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeCategories {
    pub requires: Vec<String>,
    pub features: Vec<String>,
    pub bug_fixes: Vec<String>,
    pub internal_features: Vec<String>,
}

impl ChangeCategories {
    /// Parse changelog text. Also accepts `HISTORY` content and diff excerpts.
    ///
    /// Entries start with `-` or `*`, a bare marker is a placeholder.
    /// Indented lines continue the previous entry. A `Package:` line or an
    /// `=` rule closes the current section.
    pub fn parse(text: &str) -> Self {
        let mut changes = Self::default();
        let mut section: Option<Section> = None;
        let mut last_entry: Option<(Section, usize)> = None;

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(header) = Section::from_header(trimmed) {
                section = Some(header);
                last_entry = None;
                continue;
            }
            if is_rule(trimmed) {
                if trimmed.starts_with('=') {
                    section = None;
                    last_entry = None;
                }
                continue;
            }
            if trimmed.starts_with("Package:") {
                section = None;
                last_entry = None;
                continue;
            }
            let Some(current) = section else {
                continue;
            };

            if let Some(entry) = trimmed.strip_prefix(['-', '*']) {
                let entry = entry.trim();
                if entry.is_empty() {
                    last_entry = None;
                    continue;
                }
                let bucket = changes.bucket_mut(current);
                bucket.push(entry.to_string());
                last_entry = Some((current, bucket.len() - 1));
            } else if line.starts_with([' ', '\t'])
                && let Some((bucket, index)) = last_entry
            {
                let entry = &mut changes.bucket_mut(bucket)[index];
                entry.push(' ');
                entry.push_str(trimmed);
            }
        }
        changes
    }

    pub fn bucket(&self, section: Section) -> &[String] {
        match section {
            Section::Requires => &self.requires,
            Section::Features => &self.features,
            Section::BugFixes => &self.bug_fixes,
            Section::InternalFeatures => &self.internal_features,
        }
    }

    fn bucket_mut(&mut self, section: Section) -> &mut Vec<String> {
        match section {
            Section::Requires => &mut self.requires,
            Section::Features => &mut self.features,
            Section::BugFixes => &mut self.bug_fixes,
            Section::InternalFeatures => &mut self.internal_features,
        }
    }

    pub fn is_empty(&self) -> bool {
        Section::ALL.iter().all(|s| self.bucket(*s).is_empty())
    }

    /// Requires, features or internal features present.
    pub fn has_minor_changes(&self) -> bool {
        !self.requires.is_empty() || !self.features.is_empty() || !self.internal_features.is_empty()
    }

    /// Copy with every entry prefixed by `[label] `.
    pub fn prefixed(&self, label: &str) -> Self {
        let prefix = |entries: &[String]| -> Vec<String> {
            entries.iter().map(|e| format!("[{label}] {e}")).collect()
        };
        Self {
            requires: prefix(&self.requires),
            features: prefix(&self.features),
            bug_fixes: prefix(&self.bug_fixes),
            internal_features: prefix(&self.internal_features),
        }
    }

    /// Append every entry of `other`.
    pub fn extend(&mut self, other: Self) {
        self.requires.extend(other.requires);
        self.features.extend(other.features);
        self.bug_fixes.extend(other.bug_fixes);
        self.internal_features.extend(other.internal_features);
    }

    /// Render as changelog sections. Empty buckets get a placeholder.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in Section::ALL {
            let title = section.title();
            let _ = writeln!(out, "{title}\n{}", "~".repeat(title.len()));
            let entries = self.bucket(section);
            if entries.is_empty() {
                out.push_str("-\n");
            }
            for entry in entries {
                let _ = writeln!(out, "- {entry}");
            }
        }
        out
    }

    /// Blank changelog template.
    pub fn blank_template() -> String {
        Self::default().render()
    }
}

fn is_rule(line: &str) -> bool {
    let mut chars = line.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    line.len() >= 3 && matches!(first, '~' | '=' | '-' | '^') && chars.all(|c| c == first)
}
