use regex::Regex;

/// Normalize an entity name: lowercase, trim, collapse internal whitespace.
///
/// Surface-form variants of the same name ("New York", "new  york") collapse
/// to one graph node. Aggressive merging of genuinely distinct entities
/// sharing a surface form is an accepted limitation of this policy.
pub fn normalize_entity(name: &str) -> String {
    let lowered = name.to_lowercase();
    let trimmed = lowered.trim();

    let re = Regex::new(r"\s+").unwrap();
    re.replace_all(trimmed, " ").to_string()
}
