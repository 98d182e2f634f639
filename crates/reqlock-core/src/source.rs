use std::fmt;

use crate::error::ResolveError;
use crate::name::canonical_name;

const VCS_PREFIXES: [&str; 4] = ["git+", "hg+", "svn+", "bzr+"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SourceKind {
    Vcs,
    Url,
    Path,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocator {
    pub kind: SourceKind,
    pub location: String,
}

impl SourceLocator {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if VCS_PREFIXES
            .iter()
            .any(|prefix| trimmed.starts_with(prefix))
        {
            return Some(Self {
                kind: SourceKind::Vcs,
                location: trimmed.to_string(),
            });
        }
        if trimmed.contains("://") {
            return Some(Self {
                kind: SourceKind::Url,
                location: trimmed.to_string(),
            });
        }
        if trimmed.starts_with('/') || trimmed.starts_with("./") || trimmed.starts_with("../") {
            return Some(Self {
                kind: SourceKind::Path,
                location: trimmed.to_string(),
            });
        }

        None
    }

    pub fn package_name(&self) -> Result<String, ResolveError> {
        if let Some(fragment) = self.location.split("#egg=").nth(1) {
            let name = fragment.split('&').next().unwrap_or(fragment);
            if !name.is_empty() {
                return Ok(canonical_name(name));
            }
        }

        if self.kind == SourceKind::Path {
            let last = self
                .location
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or("");
            if !last.is_empty() && last != "." && last != ".." {
                return Ok(canonical_name(last));
            }
        }

        Err(ResolveError::InvalidSpecifier {
            line: self.location.clone(),
            reason: "cannot determine package name; add an #egg= fragment".to_string(),
        })
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.location)
    }
}
