use serde::Serialize;
use strum::{Display, EnumIter, EnumString};

use crate::models::image::ImageHandle;

/// Display grouping for style templates.
#[derive(Debug, Clone, Copy, Serialize, EnumString, EnumIter, Display, PartialEq, Eq, Hash)]
pub enum StyleCategory {
    #[strum(serialize = "Portraits & Close-ups")]
    #[serde(rename = "Portraits & Close-ups")]
    Portraits,
    #[strum(serialize = "Full & Medium Shots")]
    #[serde(rename = "Full & Medium Shots")]
    FullAndMedium,
    #[strum(serialize = "Dynamic & Candid")]
    #[serde(rename = "Dynamic & Candid")]
    DynamicAndCandid,
}

/// A named transform template. Catalog entries live for the whole process.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JobSpec {
    pub name: &'static str,
    pub directive: &'static str,
    pub category: StyleCategory,
}

impl JobSpec {
    /// Lowercase, dash-separated form of the name for file names.
    pub fn slug(&self) -> String {
        slugify(self.name)
    }
}

/// Lifecycle of one job within a session.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    Done { image: ImageHandle },
    Failed { message: String },
}

impl JobStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, JobStatus::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    /// Wire label used by the HTTP API.
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Done { .. } => "done",
            JobStatus::Failed { .. } => "error",
        }
    }

    pub fn image(&self) -> Option<&ImageHandle> {
        match self {
            JobStatus::Done { image } => Some(image),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            JobStatus::Failed { message } => Some(message),
            _ => None,
        }
    }
}

/// The ordered, duplicate-free set of jobs chosen for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSelection {
    specs: Vec<&'static JobSpec>,
}

impl RunSelection {
    /// Build a selection, dropping repeated names while keeping first-seen order.
    pub fn new(specs: impl IntoIterator<Item = &'static JobSpec>) -> Self {
        let mut selected: Vec<&'static JobSpec> = Vec::new();
        for spec in specs {
            if !selected.iter().any(|s| s.name == spec.name) {
                selected.push(spec);
            }
        }
        Self { specs: selected }
    }

    pub fn specs(&self) -> &[&'static JobSpec] {
        &self.specs
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.specs.iter().map(|s| s.name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.iter().any(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Lowercase the name and collapse every run of non-alphanumerics into one dash.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
            in_run = false;
        } else if !in_run {
            slug.push('-');
            in_run = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    static A: JobSpec = JobSpec {
        name: "Alpha",
        directive: "a",
        category: StyleCategory::Portraits,
    };
    static B: JobSpec = JobSpec {
        name: "Beta",
        directive: "b",
        category: StyleCategory::Portraits,
    };

    #[test]
    fn test_selection_drops_duplicates() {
        let selection = RunSelection::new([&A, &B, &A]);
        assert_eq!(selection.names().collect::<Vec<_>>(), vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Smiling Portrait"), "smiling-portrait");
        assert_eq!(slugify("Hand on Hip"), "hand-on-hip");
        assert_eq!(slugify("Rock & Roll!"), "rock-roll-");
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(JobStatus::Pending.label(), "pending");
        assert_eq!(
            JobStatus::Failed {
                message: "rate limited".into()
            }
            .label(),
            "error"
        );
        assert!(JobStatus::Pending.is_pending());
    }
}
