/// Parse model output into raw (subject, predicate, object) triples.
///
/// Accepts one parenthesized triple per line, delimited by semicolons or
/// commas, with optional list numbering in front. Lines that do not parse
/// are skipped; at most `max_triplets` triples are returned.
pub fn parse_triplets(output: &str, max_triplets: usize) -> Vec<(String, String, String)> {
    let mut triples = Vec::new();

    for line in output.lines() {
        if triples.len() >= max_triplets {
            break;
        }

        let line = strip_list_prefix(line.trim());
        if line.is_empty() {
            continue;
        }

        let Some(inner) = line.strip_prefix('(').and_then(|l| l.strip_suffix(')')) else {
            continue;
        };

        // Prefer semicolons (the prompted format); fall back to commas for
        // models that ignore the delimiter instruction.
        let parts: Vec<&str> = if inner.contains(';') {
            inner.split(';').collect()
        } else {
            inner.split(',').collect()
        };

        if parts.len() != 3 {
            continue;
        }

        let subject = parts[0].trim();
        let predicate = parts[1].trim();
        let object = parts[2].trim();

        if subject.is_empty() || predicate.is_empty() || object.is_empty() {
            continue;
        }

        triples.push((
            subject.to_string(),
            predicate.to_string(),
            object.to_string(),
        ));
    }

    triples
}

/// Strip "1." / "2)" / "-" list markers the model sometimes prepends.
fn strip_list_prefix(line: &str) -> &str {
    let trimmed = line.trim_start_matches(['-', '*', ' ']);
    let Some(first_paren) = trimmed.find('(') else {
        return trimmed;
    };
    if trimmed[..first_paren]
        .chars()
        .all(|c| c.is_ascii_digit() || c == '.' || c == ')' || c == ' ')
    {
        &trimmed[first_paren..]
    } else {
        trimmed
    }
}
