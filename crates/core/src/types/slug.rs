//! URL slugs for categories and blog posts.

/// Build a URL slug from a display name.
///
/// Lowercases, folds common French accented letters to ASCII, drops every
/// character that is not a word character or separator, and collapses runs of
/// whitespace, `-` and `_` into a single `-`. Leading and trailing separators
/// are removed. Returns an empty string if nothing usable remains.
///
/// ```
/// use chezflora_core::slugify;
///
/// assert_eq!(slugify("Bouquets de Saison"), "bouquets-de-saison");
/// assert_eq!(slugify("Plantes d'intérieur"), "plantes-dinterieur");
/// assert_eq!(slugify("  Roses -- & Pivoines "), "roses-pivoines");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        let folded = fold_accent(c);
        if folded.is_empty() && (c.is_whitespace() || c == '-' || c == '_') {
            pending_separator = true;
            continue;
        }
        for f in folded.chars() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(f);
        }
    }

    slug
}

/// ASCII replacement for a lowercase character; empty if it is not kept.
fn fold_accent(c: char) -> &'static str {
    match c {
        'à' | 'â' | 'ä' | 'á' | 'ã' => "a",
        'é' | 'è' | 'ê' | 'ë' => "e",
        'î' | 'ï' | 'í' => "i",
        'ô' | 'ö' | 'ó' | 'õ' => "o",
        'ù' | 'û' | 'ü' | 'ú' => "u",
        'ÿ' => "y",
        'ç' => "c",
        'ñ' => "n",
        'œ' => "oe",
        'æ' => "ae",
        _ => ascii_word(c),
    }
}

fn ascii_word(c: char) -> &'static str {
    const TABLE: &str = "abcdefghijklmnopqrstuvwxyz0123456789";
    TABLE
        .find(c)
        .and_then(|i| TABLE.get(i..=i))
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_names() {
        assert_eq!(slugify("Roses"), "roses");
        assert_eq!(slugify("Fleurs Séchées"), "fleurs-sechees");
        assert_eq!(slugify("Cœur de bouquet"), "coeur-de-bouquet");
    }

    #[test]
    fn test_collapses_separators() {
        assert_eq!(slugify("a  -  b__c"), "a-b-c");
        assert_eq!(slugify("--edge--"), "edge");
    }

    #[test]
    fn test_strips_punctuation() {
        assert_eq!(slugify("Mariage & Événements!"), "mariage-evenements");
        assert_eq!(slugify("100% Naturel"), "100-naturel");
    }

    #[test]
    fn test_nothing_usable() {
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(""), "");
    }
}
