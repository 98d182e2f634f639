use reqlock_core::{Requirement, ResolveError};

pub fn merge(a: &Requirement, b: &Requirement) -> Result<Requirement, ResolveError> {
    if a.name != b.name {
        return Err(ResolveError::PreconditionViolated(format!(
            "cannot merge requirements for '{}' and '{}'",
            a.name, b.name
        )));
    }

    let mut merged = match (&a.source, &b.source) {
        (Some(left), Some(right)) => {
            if left != right || a.editable != b.editable {
                return Err(conflict(a, b));
            }
            a.clone()
        }
        (Some(_), None) => a.clone(),
        (None, Some(_)) => b.clone(),
        (None, None) => {
            if let (Some(left), Some(right)) = (a.pinned_version(), b.pinned_version()) {
                if left != right {
                    return Err(conflict(a, b));
                }
            }
            a.clone()
        }
    };

    merged.specifiers = a.specifiers.union(&b.specifiers);
    merged.extras = a.extras.union(&b.extras).cloned().collect();
    merged.via = a.via.union(&b.via).cloned().collect();
    Ok(merged)
}

fn conflict(a: &Requirement, b: &Requirement) -> ResolveError {
    ResolveError::Conflict {
        name: a.name.clone(),
        left: a.to_string(),
        right: b.to_string(),
        left_via: a.via.iter().cloned().collect(),
        right_via: b.via.iter().cloned().collect(),
    }
}
