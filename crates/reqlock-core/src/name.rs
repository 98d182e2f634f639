use crate::error::ResolveError;

pub fn canonical_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|ch| match ch {
            '_' | '.' => '-',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

pub fn validate_package_name(name: &str) -> Result<(), ResolveError> {
    let invalid = |reason: &str| ResolveError::InvalidSpecifier {
        line: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("package name must not be empty"));
    }
    let first = name.chars().next().unwrap_or('-');
    if !first.is_ascii_alphanumeric() {
        return Err(invalid("package name must start with a letter or digit"));
    }
    if name.ends_with('-') {
        return Err(invalid("package name must not end with a separator"));
    }
    if name
        .chars()
        .any(|ch| !(ch.is_ascii_alphanumeric() || ch == '-'))
    {
        return Err(invalid("package name contains invalid character(s)"));
    }

    Ok(())
}
