//! Name Helpers
//!
//! English singularization for name hints. Array items and map values are
//! "one entry's worth" of their container, so their hints are singular.

/// Irregular plurals (plural, singular)
const IRREGULAR: &[(&str, &str)] = &[
    ("people", "person"),
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("indices", "index"),
    ("matrices", "matrix"),
    ("vertices", "vertex"),
    ("criteria", "criterion"),
    ("analyses", "analysis"),
    ("data", "datum"),
];

/// Words that are the same in both forms
const UNCOUNTABLE: &[&str] = &[
    "metadata", "information", "equipment", "series", "species", "news", "status", "alias",
    "analysis", "canvas", "bus", "address",
];

/// Singularize an English word, preserving the case of its first letter.
pub fn singularize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();

    // "statuses", "aliases": the plural of a word already ending in s,
    // matched only as a whole word or camel/snake segment
    let es_plural = UNCOUNTABLE.iter().any(|u| {
        u.ends_with('s')
            && lower.strip_suffix("es").is_some_and(|stem| stem.ends_with(u))
            && starts_segment(word, word.len() - 2 - u.len())
    });
    if es_plural {
        return word[..word.len() - 2].to_string();
    }

    if lower.len() < 2 || UNCOUNTABLE.iter().any(|u| lower.ends_with(u)) {
        return word.to_string();
    }

    for (plural, singular) in IRREGULAR {
        if lower.ends_with(plural) {
            let stem = &word[..word.len() - plural.len()];
            return restore_case(stem, singular, &word[word.len() - plural.len()..]);
        }
    }

    let cut = |n: usize, suffix: &str| format!("{}{}", &word[..word.len() - n], suffix);

    if lower.ends_with("ies") && lower.len() > 3 {
        return cut(3, "y");
    }
    if lower.ends_with("ves") && lower.len() > 3 {
        return cut(3, "f");
    }
    for suffix in ["sses", "shes", "ches", "xes", "zes", "oes"] {
        if lower.ends_with(suffix) {
            return cut(2, "");
        }
    }
    if lower.ends_with('s') && !lower.ends_with("ss") && !lower.ends_with("us") && !lower.ends_with("is") {
        return cut(1, "");
    }

    word.to_string()
}

fn starts_segment(word: &str, at: usize) -> bool {
    at == 0
        || word[at..].starts_with(|c: char| c.is_uppercase())
        || word[..at].ends_with(['_', '-'])
}

fn restore_case(stem: &str, singular: &str, original: &str) -> String {
    let starts_upper = original.chars().next().map(|c| c.is_uppercase()).unwrap_or(false);
    if starts_upper {
        let mut chars = singular.chars();
        match chars.next() {
            Some(first) => format!("{}{}{}", stem, first.to_uppercase(), chars.as_str()),
            None => stem.to_string(),
        }
    } else {
        format!("{}{}", stem, singular)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_plurals() {
        assert_eq!(singularize("pets"), "pet");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("matches"), "match");
        assert_eq!(singularize("classes"), "class");
        assert_eq!(singularize("shelves"), "shelf");
    }

    #[test]
    fn test_plurals_of_words_ending_in_s() {
        assert_eq!(singularize("aliases"), "alias");
        assert_eq!(singularize("statuses"), "status");
        assert_eq!(singularize("buses"), "bus");
        assert_eq!(singularize("canvases"), "canvas");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("analyses"), "analysis");
        assert_eq!(singularize("OrderStatuses"), "OrderStatus");
        assert_eq!(singularize("abuses"), "abuse");
    }

    #[test]
    fn test_already_singular() {
        assert_eq!(singularize("class"), "class");
        assert_eq!(singularize("status"), "status");
        assert_eq!(singularize("item"), "item");
        assert_eq!(singularize("axis"), "axis");
    }

    #[test]
    fn test_irregular_and_case() {
        assert_eq!(singularize("people"), "person");
        assert_eq!(singularize("Children"), "Child");
        assert_eq!(singularize("teamMembers"), "teamMember");
        assert_eq!(singularize("salesPeople"), "salesPerson");
    }

    #[test]
    fn test_idempotent() {
        for word in ["tags", "entries", "addresses", "Nodes", "aliases", "statuses", "buses"] {
            let once = singularize(word);
            assert_eq!(singularize(&once), once);
        }
    }
}
