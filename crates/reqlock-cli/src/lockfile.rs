use reqlock_core::{Requirement, ResolveError};
use reqlock_resolver::ResolutionResult;

pub fn render_lockfile(result: &ResolutionResult, command_hint: &str) -> Vec<String> {
    let mut lines = vec![
        "# This file is autogenerated by reqlock.".to_string(),
        "# To update, run:".to_string(),
        "#".to_string(),
        format!("#     {command_hint}"),
        "#".to_string(),
    ];

    for resolved in result.requirements.values() {
        let requirement = &resolved.requirement;
        let mut line = requirement.to_string();
        if !resolved.hashes.is_empty() {
            line.push_str(" \\");
        }
        lines.push(line);

        let hash_count = resolved.hashes.len();
        for (index, hash) in resolved.hashes.iter().enumerate() {
            let continuation = if index + 1 < hash_count { " \\" } else { "" };
            lines.push(format!("    --hash={hash}{continuation}"));
        }

        if !requirement.via.is_empty() {
            let parents = requirement.via.iter().cloned().collect::<Vec<_>>();
            lines.push(format!("    # via {}", parents.join(", ")));
        }
    }

    lines
}

pub fn parse_requirement_lines(content: &str) -> Result<Vec<Requirement>, ResolveError> {
    content
        .lines()
        .map(strip_comment)
        .map(|line| line.trim_end_matches('\\').trim())
        .filter(|line| !line.is_empty() && !line.starts_with("--"))
        .map(Requirement::parse)
        .collect()
}

fn strip_comment(line: &str) -> &str {
    let trimmed = line.trim();
    if trimmed.starts_with('#') {
        return "";
    }
    match trimmed.find(" #") {
        Some(index) => trimmed[..index].trim(),
        None => trimmed,
    }
}
