//! Fuzzy matching between a worker's declared skills and a job category.
//!
//! Both sides are reduced to slugs (lowercase, alphanumeric runs joined by hyphens) and a match
//! is a containment in either direction, so "Electrical Repairs" matches a worker who declares
//! "electrical" or "home-electrical-repairs".
use std::sync::OnceLock;

use regex::Regex;

fn non_alnum() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("invalid slug regex"))
}

pub fn slugify(value: &str) -> String {
    let lower = value.to_lowercase();
    non_alnum().replace_all(&lower, "-").trim_matches('-').to_string()
}

/// True when any declared skill slug-matches the job category. Callers are expected to skip the
/// check entirely when the worker declares no skills.
pub fn matches_category(skills: &[String], category: &str) -> bool {
    let cat = slugify(category);
    if cat.is_empty() {
        return true;
    }
    skills
        .iter()
        .map(|s| slugify(s))
        .any(|skill| !skill.is_empty() && (skill.contains(&cat) || cat.contains(&skill)))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn slugs_collapse_punctuation_and_case() {
        assert_eq!(slugify("Electrical Repairs!"), "electrical-repairs");
        assert_eq!(slugify("  AC / Heating  "), "ac-heating");
    }

    #[test]
    fn containment_matches_both_directions() {
        let skills = vec!["Electrical".to_string(), "plumbing".to_string()];
        assert!(matches_category(&skills, "Home Electrical Repairs"));
        let skills = vec!["home electrical repairs".to_string()];
        assert!(matches_category(&skills, "electrical"));
    }

    #[test]
    fn unrelated_skills_do_not_match() {
        let skills = vec!["carpentry".to_string(), "painting".to_string()];
        assert!(!matches_category(&skills, "plumbing"));
    }
}
