//! Deterministic, URL-safe slugs for case studies.
//!
//! Slugs are ASCII only: lowercase letters, digits and single hyphens.
//! Anything else, including non-Latin scripts, collapses into a separator,
//! so a title with no ASCII alphanumerics yields [`FALLBACK_SLUG`].

use std::collections::HashSet;

/// Produced by [`slugify`] when the input has nothing representable.
pub const FALLBACK_SLUG: &str = "project";

const POSITIONAL_PREFIX: &str = "case-study";

/// Lowercase, trim, and collapse every run of characters outside
/// `[a-z0-9]` into one hyphen, without leading or trailing hyphens.
pub fn slugify(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_separator = false;

    for ch in lowered.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch);
        } else {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Whether `candidate` is already a well-formed slug.
pub fn is_valid_slug(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}

/// Assigns unique slugs to the case studies of a single save.
///
/// Entries are processed in draft order. Untitled entries receive a
/// positional `case-study-<n>` slug, and repeats receive the first free
/// numeric suffix (`-2`, `-3`, …).
#[derive(Debug, Default)]
pub struct SlugAssigner {
    assigned: HashSet<String>,
}

impl SlugAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the slug for the entry at zero-based `position`.
    ///
    /// `explicit` wins over `name` when it holds any non-blank text.
    pub fn assign(&mut self, explicit: Option<&str>, name: &str, position: usize) -> String {
        let source = explicit
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(name);

        let mut base = slugify(source);
        if base == FALLBACK_SLUG {
            base = format!("{POSITIONAL_PREFIX}-{}", position + 1);
        }

        let mut candidate = base.clone();
        let mut suffix = 2usize;
        while self.assigned.contains(&candidate) {
            candidate = format!("{base}-{suffix}");
            suffix += 1;
        }

        self.assigned.insert(candidate.clone());
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assign_all(entries: &[(Option<&str>, &str)]) -> Vec<String> {
        let mut assigner = SlugAssigner::new();
        entries
            .iter()
            .enumerate()
            .map(|(index, (explicit, name))| assigner.assign(*explicit, name, index))
            .collect()
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Acme   Corp!! "), "acme-corp");
        assert_eq!(slugify("--Already-Sluggy--"), "already-sluggy");
        assert_eq!(slugify("Moonshine Art / marketplace"), "moonshine-art-marketplace");
    }

    #[test]
    fn slugify_falls_back_when_nothing_is_representable() {
        assert_eq!(slugify(""), FALLBACK_SLUG);
        assert_eq!(slugify("   "), FALLBACK_SLUG);
        assert_eq!(slugify("東京"), FALLBACK_SLUG);
    }

    #[test]
    fn slugify_drops_non_ascii_letters_instead_of_transliterating() {
        assert_eq!(slugify("Café"), "caf");
        assert_eq!(slugify("Über Studio"), "ber-studio");
    }

    #[test]
    fn duplicate_and_untitled_names_get_distinct_slugs() {
        let slugs = assign_all(&[(None, "Acme Corp"), (None, "Acme Corp"), (None, "")]);
        assert_eq!(slugs, vec!["acme-corp", "acme-corp-2", "case-study-3"]);
    }

    #[test]
    fn explicit_slug_is_kept_when_valid_and_unique() {
        let slugs = assign_all(&[
            (Some("questbycycle"), "QuestByCycle.org"),
            (Some("crowdpm"), "CrowdPM Platform"),
        ]);
        assert_eq!(slugs, vec!["questbycycle", "crowdpm"]);
    }

    #[test]
    fn blank_explicit_slug_falls_back_to_name() {
        let slugs = assign_all(&[(Some("   "), "Harbor Analytics")]);
        assert_eq!(slugs, vec!["harbor-analytics"]);
    }

    #[test]
    fn suffixes_skip_slugs_taken_earlier_in_the_draft() {
        let slugs = assign_all(&[(None, "a-2"), (None, "a"), (None, "a")]);
        assert_eq!(slugs, vec!["a-2", "a", "a-3"]);
    }

    #[test]
    fn assigned_slugs_are_unique_and_well_formed() {
        let names = [
            "", "", "Acme", "acme", "ACME!", "東京", "Project", "case study 1", "", "Acme",
        ];
        let entries: Vec<(Option<&str>, &str)> = names.iter().map(|name| (None, *name)).collect();
        let slugs = assign_all(&entries);

        let unique: HashSet<&String> = slugs.iter().collect();
        assert_eq!(unique.len(), slugs.len(), "slugs must be distinct: {slugs:?}");
        assert!(slugs.iter().all(|slug| is_valid_slug(slug)));
    }

    #[test]
    fn is_valid_slug_rejects_uppercase_and_empty() {
        assert!(is_valid_slug("case-study-3"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("Acme"));
        assert!(!is_valid_slug("acme corp"));
    }
}
