//! Listing identity resolution
//!
//! Maps free-text names, slugs and numeric ids onto listing records. Reviews
//! only carry a free-text listing name, so the same matching policy is what
//! associates a review with a listing.
//!
//! Name matching runs in tiers; each tier scans listings in provider order and
//! the first hit wins:
//! 1. case-insensitive exact match
//! 2. match after collapsing space/hyphen runs (or equal slugs)
//! 3. bidirectional substring containment

use frd_common::models::ListingRecord;

/// URL slug for a listing name
///
/// Lowercase; every run of non-alphanumeric characters becomes one `-`;
/// no leading or trailing separator.
pub fn to_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }
    slug
}

/// Best-effort display name for a slug
///
/// Short words and unit codes (`2b`, `e1`, `33`) are uppercased, other words
/// capitalized. Lossy: only ever used to seed matching.
pub fn from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            if is_unit_code(word) || word.chars().count() <= 2 {
                word.to_uppercase()
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Digits optionally followed by one letter
fn is_unit_code(word: &str) -> bool {
    let digits = word.chars().take_while(char::is_ascii_digit).count();
    let rest: Vec<char> = word.chars().skip(digits).collect();
    digits > 0 && (rest.is_empty() || (rest.len() == 1 && rest[0].is_ascii_alphabetic()))
}

/// Lowercase, runs of spaces and hyphens collapsed to one space, trimmed
pub fn normalize_for_match(value: &str) -> String {
    value
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Exact,
    Normalized,
    Substring,
}

const TIERS: [Tier; 3] = [Tier::Exact, Tier::Normalized, Tier::Substring];

/// Prepared form of a search term, computed once per lookup
struct SearchTerm {
    lower: String,
    normalized: String,
    slug: String,
}

impl SearchTerm {
    fn new(term: &str) -> Self {
        Self {
            lower: term.trim().to_lowercase(),
            normalized: normalize_for_match(term),
            slug: to_slug(term),
        }
    }

    fn matches(&self, name: &str, tier: Tier) -> bool {
        match tier {
            Tier::Exact => !self.lower.is_empty() && name.trim().to_lowercase() == self.lower,
            Tier::Normalized => {
                let normalized = normalize_for_match(name);
                (!normalized.is_empty() && normalized == self.normalized)
                    || (!self.slug.is_empty() && to_slug(name) == self.slug)
            }
            Tier::Substring => {
                let normalized = normalize_for_match(name);
                !normalized.is_empty()
                    && !self.normalized.is_empty()
                    && (normalized.contains(&self.normalized) || self.normalized.contains(&normalized))
            }
        }
    }
}

fn match_by_name<'a>(term: &str, listings: &'a [ListingRecord]) -> Option<&'a ListingRecord> {
    let term = SearchTerm::new(term);
    TIERS.iter().find_map(|&tier| {
        listings.iter().find(|listing| {
            listing
                .name_candidates()
                .into_iter()
                .flatten()
                .any(|name| term.matches(name, tier))
        })
    })
}

/// Resolve an identifier (numeric id, name or slug) to a listing
///
/// A purely numeric identifier is an id lookup and never name-matched.
/// Otherwise the identifier is name-matched as given, then as the name
/// recovered from it as a slug.
pub fn resolve_listing<'a>(identifier: &str, listings: &'a [ListingRecord]) -> Option<&'a ListingRecord> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return None;
    }

    if let Some(id) = parse_listing_id(identifier) {
        return listings.iter().find(|listing| listing.id == id);
    }

    match_by_name(identifier, listings).or_else(|| {
        let candidate = from_slug(identifier);
        if candidate == identifier {
            None
        } else {
            match_by_name(&candidate, listings)
        }
    })
}

/// Numeric listing id, if the identifier is purely digits
pub fn parse_listing_id(identifier: &str) -> Option<i64> {
    let identifier = identifier.trim();
    if identifier.is_empty() || !identifier.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    identifier.parse().ok()
}

/// Whether a review's free-text listing name matches a search term
pub fn listing_name_matches(listing_name: &str, search: &str) -> bool {
    let term = SearchTerm::new(search);
    TIERS.iter().any(|&tier| term.matches(listing_name, tier))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: i64, internal: Option<&str>, public: Option<&str>) -> ListingRecord {
        ListingRecord {
            id,
            internal_name: internal.map(str::to_string),
            public_name: public.map(str::to_string),
            external_name: None,
            description: None,
            thumbnail_url: None,
            address: None,
            public_address: None,
            street: None,
            city: None,
            country: None,
            zipcode: None,
            bedrooms: None,
            bathrooms: None,
            person_capacity: None,
            amenities: None,
            images: Vec::new(),
        }
    }

    fn fixtures() -> Vec<ListingRecord> {
        vec![
            listing(1, Some("2B E1 A - 27 St Clements"), None),
            listing(2, Some("2B E1 - 33 St Clements"), Some("Stylish Flat in Whitechapel")),
            listing(3, None, Some("The Putney Apart")),
            listing(4, Some(""), None),
        ]
    }

    #[test]
    fn test_to_slug() {
        assert_eq!(to_slug("2B E1 - 33 St Clements"), "2b-e1-33-st-clements");
        assert_eq!(to_slug("  The Putney Apart! "), "the-putney-apart");
        assert_eq!(to_slug("---"), "");
    }

    #[test]
    fn test_from_slug() {
        assert_eq!(from_slug("2b-e1-33-st-clements"), "2B E1 33 ST Clements");
        assert_eq!(from_slug("the-putney-apart"), "The Putney Apart");
        assert_eq!(from_slug("2b-n1-a-29-shoreditch-heights"), "2B N1 A 29 Shoreditch Heights");
    }

    #[test]
    fn test_normalize_for_match() {
        assert_eq!(normalize_for_match("2B E1 - 33  St Clements"), "2b e1 33 st clements");
        assert_eq!(normalize_for_match("2b-e1-33-st-clements"), "2b e1 33 st clements");
    }

    #[test]
    fn test_slug_resolves_by_normalized_match() {
        let listings = fixtures();
        let found = resolve_listing("2b-e1-33-st-clements", &listings).unwrap();
        assert_eq!(found.id, 2);
        assert_eq!(found.internal_name.as_deref(), Some("2B E1 - 33 St Clements"));
    }

    #[test]
    fn test_exact_tier_beats_earlier_substring_hit() {
        let listings = vec![
            listing(10, Some("Putney Apart Annex"), None),
            listing(11, Some("Putney Apart"), None),
        ];
        assert_eq!(resolve_listing("putney apart", &listings).unwrap().id, 11);
    }

    #[test]
    fn test_numeric_identifier_is_id_lookup() {
        let mut listings = fixtures();
        listings.push(listing(5, Some("3"), None));

        assert_eq!(resolve_listing("3", &listings).unwrap().id, 3);
        assert!(resolve_listing("99", &listings).is_none());
    }

    #[test]
    fn test_any_name_field_matches() {
        let listings = fixtures();
        assert_eq!(resolve_listing("stylish-flat-in-whitechapel", &listings).unwrap().id, 2);
        assert_eq!(resolve_listing("Putney", &listings).unwrap().id, 3);
    }

    #[test]
    fn test_case_space_hyphen_variants_resolve() {
        let listings = fixtures();
        for variant in ["2b e1 33 st clements", "2B-E1-33-ST-CLEMENTS", "2b   e1 -- 33 st clements"] {
            assert_eq!(resolve_listing(variant, &listings).map(|l| l.id), Some(2), "{}", variant);
        }
    }

    #[test]
    fn test_unknown_identifier_not_found() {
        let listings = fixtures();
        assert!(resolve_listing("shoreditch-heights", &listings).is_none());
        assert!(resolve_listing("   ", &listings).is_none());
    }

    #[test]
    fn test_listing_name_matches() {
        assert!(listing_name_matches("2B E1 - 33 St Clements", "2b-e1-33-st-clements"));
        assert!(listing_name_matches("The Putney Apart", "putney"));
        assert!(!listing_name_matches("The Putney Apart", "Shoreditch"));
        assert!(!listing_name_matches("", "putney"));
    }
}
