use std::collections::BTreeSet;
use std::fmt;

use semver::Version;

use crate::error::ResolveError;
use crate::name::{canonical_name, validate_package_name};
use crate::source::SourceLocator;
use crate::specifier::SpecifierSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub specifiers: SpecifierSet,
    pub extras: BTreeSet<String>,
    pub source: Option<SourceLocator>,
    pub editable: bool,
    pub via: BTreeSet<String>,
}

impl Requirement {
    pub fn parse(raw_line: &str) -> Result<Self, ResolveError> {
        let line = raw_line.trim();
        if line.is_empty() {
            return Err(invalid(raw_line, "empty requirement line"));
        }

        if let Some(rest) = line.strip_prefix("-e ").or_else(|| line.strip_prefix("-e\t")) {
            let locator = SourceLocator::parse(rest).ok_or_else(|| {
                invalid(
                    raw_line,
                    "editable requirement must be a VCS reference, URL or local path",
                )
            })?;
            let name = locator.package_name()?;
            return Ok(Self {
                name,
                specifiers: SpecifierSet::any(),
                extras: BTreeSet::new(),
                source: Some(locator),
                editable: true,
                via: BTreeSet::new(),
            });
        }
        if line == "-e" {
            return Err(invalid(raw_line, "missing location after -e"));
        }

        if let Some(locator) = SourceLocator::parse(line) {
            let name = locator.package_name()?;
            return Ok(Self {
                name,
                specifiers: SpecifierSet::any(),
                extras: BTreeSet::new(),
                source: Some(locator),
                editable: false,
                via: BTreeSet::new(),
            });
        }

        let (name_part, extras, spec_part) = split_plain_line(raw_line, line)?;
        let name = canonical_name(name_part);
        validate_package_name(&name)?;
        let specifiers = SpecifierSet::parse(spec_part)?;

        Ok(Self {
            name,
            specifiers,
            extras,
            source: None,
            editable: false,
            via: BTreeSet::new(),
        })
    }

    pub fn key(&self) -> &str {
        &self.name
    }

    pub fn is_pinned(&self) -> bool {
        self.editable || self.source.is_some() || self.specifiers.exact_pin().is_some()
    }

    pub fn pinned_version(&self) -> Option<Version> {
        self.specifiers.exact_pin()
    }

    // Display omits extras for source requirements, so the rendered form
    // alone cannot key dependency lookups.
    pub fn dependency_key(&self) -> String {
        if self.source.is_some() && !self.extras.is_empty() {
            let extras = self.extras.iter().cloned().collect::<Vec<_>>().join(",");
            format!("{self}[{extras}]")
        } else {
            self.to_string()
        }
    }

    pub fn as_tuple(&self) -> (String, Option<Version>, Vec<String>) {
        (
            self.name.clone(),
            self.specifiers.exact_pin(),
            self.extras.iter().cloned().collect(),
        )
    }

    pub fn pin_to(&mut self, version: Version) {
        self.specifiers = SpecifierSet::pin(version);
    }

    pub fn with_via(mut self, parent: &str) -> Self {
        self.via.insert(parent.to_string());
        self
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(locator) = &self.source {
            if self.editable {
                return write!(f, "-e {locator}");
            }
            return write!(f, "{locator}");
        }

        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            let extras = self.extras.iter().cloned().collect::<Vec<_>>().join(",");
            write!(f, "[{extras}]")?;
        }
        if !self.specifiers.is_empty() {
            write!(f, "{}", self.specifiers)?;
        }
        Ok(())
    }
}

fn split_plain_line<'a>(
    raw_line: &str,
    line: &'a str,
) -> Result<(&'a str, BTreeSet<String>, &'a str), ResolveError> {
    let (before_spec, spec_part) = match line.find(|ch| "<>=~^!".contains(ch)) {
        Some(index) => (line[..index].trim(), &line[index..]),
        None => (line, ""),
    };

    let (name_part, extras) = match before_spec.find('[') {
        Some(open) => {
            let Some(close) = before_spec.rfind(']') else {
                return Err(invalid(raw_line, "unterminated extras bracket"));
            };
            if close < open || close != before_spec.len() - 1 {
                return Err(invalid(raw_line, "malformed extras bracket"));
            }
            let extras = before_spec[open + 1..close]
                .split(',')
                .map(str::trim)
                .filter(|extra| !extra.is_empty())
                .map(canonical_name)
                .collect();
            (before_spec[..open].trim(), extras)
        }
        None => (before_spec, BTreeSet::new()),
    };

    if name_part.is_empty() {
        return Err(invalid(raw_line, "missing package name"));
    }

    Ok((name_part, extras, spec_part))
}

fn invalid(line: &str, reason: &str) -> ResolveError {
    ResolveError::InvalidSpecifier {
        line: line.trim().to_string(),
        reason: reason.to_string(),
    }
}
