use std::fmt;

use semver::{BuildMetadata, Comparator, Op, Version, VersionReq};

use crate::error::ResolveError;

#[derive(Debug, Clone, Default)]
pub struct SpecifierSet {
    comparators: Vec<Comparator>,
}

impl SpecifierSet {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn parse(input: &str) -> Result<Self, ResolveError> {
        let mut set = Self::default();
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(set);
        }

        for fragment in trimmed.split(',') {
            let fragment = fragment.trim();
            if fragment.is_empty() {
                return Err(invalid(input, "empty predicate in specifier list"));
            }
            set.insert(parse_predicate(input, fragment)?);
        }
        Ok(set)
    }

    pub fn pin(version: Version) -> Self {
        Self {
            comparators: vec![Comparator {
                op: Op::Exact,
                major: version.major,
                minor: Some(version.minor),
                patch: Some(version.patch),
                pre: version.pre,
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.comparators.is_empty()
    }

    pub fn len(&self) -> usize {
        self.comparators.len()
    }

    pub fn insert(&mut self, comparator: Comparator) {
        if !self.comparators.contains(&comparator) {
            self.comparators.push(comparator);
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for comparator in &other.comparators {
            merged.insert(comparator.clone());
        }
        merged
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.as_version_req().matches(version)
    }

    pub fn as_version_req(&self) -> VersionReq {
        VersionReq {
            comparators: self.comparators.clone(),
        }
    }

    pub fn exact_pin(&self) -> Option<Version> {
        let [comparator] = self.comparators.as_slice() else {
            return None;
        };
        if comparator.op != Op::Exact {
            return None;
        }
        let (Some(minor), Some(patch)) = (comparator.minor, comparator.patch) else {
            return None;
        };
        Some(Version {
            major: comparator.major,
            minor,
            patch,
            pre: comparator.pre.clone(),
            build: BuildMetadata::EMPTY,
        })
    }
}

// Comparators are deduplicated on insert, so same length plus containment
// is set equality. Insertion order must not affect comparison.
impl PartialEq for SpecifierSet {
    fn eq(&self, other: &Self) -> bool {
        self.comparators.len() == other.comparators.len()
            && self
                .comparators
                .iter()
                .all(|comparator| other.comparators.contains(comparator))
    }
}

impl Eq for SpecifierSet {}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.comparators.is_empty() {
            return write!(f, "<any>");
        }

        let mut rendered: Vec<(u64, u64, u64, u8, String)> = self
            .comparators
            .iter()
            .map(|comparator| {
                (
                    comparator.major,
                    comparator.minor.unwrap_or(0),
                    comparator.patch.unwrap_or(0),
                    op_rank(comparator.op),
                    render_predicate(comparator),
                )
            })
            .collect();
        rendered.sort();

        let joined = rendered
            .into_iter()
            .map(|(_, _, _, _, text)| text)
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{joined}")
    }
}

fn parse_predicate(line: &str, fragment: &str) -> Result<Comparator, ResolveError> {
    if fragment.starts_with("===") || fragment.starts_with("!=") {
        return Err(invalid(
            line,
            &format!("unsupported version operator in '{fragment}'"),
        ));
    }

    let rewritten = if let Some(rest) = fragment.strip_prefix("==") {
        let rest = rest.trim();
        if rest.contains('*') {
            rest.to_string()
        } else {
            format!("={rest}")
        }
    } else if let Some(rest) = fragment.strip_prefix("~=") {
        format!("~{}", rest.trim())
    } else {
        fragment.to_string()
    };

    rewritten
        .parse::<Comparator>()
        .map_err(|err| invalid(line, &format!("bad predicate '{fragment}': {err}")))
}

fn render_predicate(comparator: &Comparator) -> String {
    let mut version = comparator.major.to_string();
    if let Some(minor) = comparator.minor {
        version.push_str(&format!(".{minor}"));
        if let Some(patch) = comparator.patch {
            version.push_str(&format!(".{patch}"));
        }
    }
    if !comparator.pre.is_empty() {
        version.push_str(&format!("-{}", comparator.pre));
    }

    match comparator.op {
        Op::Exact => format!("=={version}"),
        Op::Greater => format!(">{version}"),
        Op::GreaterEq => format!(">={version}"),
        Op::Less => format!("<{version}"),
        Op::LessEq => format!("<={version}"),
        Op::Tilde => format!("~={version}"),
        Op::Caret => format!("^{version}"),
        Op::Wildcard => match (comparator.minor, comparator.patch) {
            (Some(minor), _) => format!("=={}.{minor}.*", comparator.major),
            (None, _) => format!("=={}.*", comparator.major),
        },
        _ => format!("{version}"),
    }
}

fn op_rank(op: Op) -> u8 {
    match op {
        Op::Greater | Op::GreaterEq => 0,
        Op::Tilde | Op::Caret | Op::Wildcard => 1,
        Op::Exact => 2,
        Op::Less | Op::LessEq => 3,
        _ => 4,
    }
}

fn invalid(line: &str, reason: &str) -> ResolveError {
    ResolveError::InvalidSpecifier {
        line: line.to_string(),
        reason: reason.to_string(),
    }
}
