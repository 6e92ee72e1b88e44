//! Text helpers shared by the environments.

use deunicode::deunicode;

/// Canonical form of a word for exact-match comparison.
///
/// Lowercases, drops ASCII punctuation, joins whitespace-separated pieces
/// with `_` and folds accented letters to ASCII, so `"Café au lait."` and
/// `"cafe  AU lait"` compare equal.
pub fn normalize_word(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    let joined = stripped.split_whitespace().collect::<Vec<_>>().join("_");
    deunicode(&joined)
}

/// True when both texts normalize to the same word.
pub fn same_word(a: &str, b: &str) -> bool {
    normalize_word(a) == normalize_word(b)
}

/// Case-insensitive substring test.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Replace every `{key}` placeholder of `template` with its value.
pub fn fill_template(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_owned(), |text, (key, value)| {
        text.replace(&format!("{{{key}}}"), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_placeholders() {
        let text = fill_template(
            "{player} guessed {word}. {player} wins!",
            &[("player", "Toto"), ("word", "cat")],
        );
        assert_eq!(text, "Toto guessed cat. Toto wins!");
        assert_eq!(fill_template("no {slot}", &[]), "no {slot}");
    }

    #[test]
    fn normalization_ignores_case_punctuation_and_spacing() {
        for guess in ["Banana.", "banana", "BANANA ", "  banana!"] {
            assert!(same_word(guess, "Banana"), "{guess:?}");
        }
        assert!(!same_word("bananas", "Banana"));
    }

    #[test]
    fn normalization_folds_accents() {
        assert!(same_word("café", "cafe"));
        assert_eq!(normalize_word("Crème brûlée"), "creme_brulee");
    }

    #[test]
    fn multi_word_targets_join_with_underscore() {
        assert_eq!(normalize_word("Beef  patty"), "beef_patty");
        assert!(same_word("beef patty", "Beef patty."));
    }

    #[test]
    fn contains_is_case_insensitive() {
        assert!(contains_ignore_case("It rhymes with BANANA split", "banana"));
        assert!(!contains_ignore_case("a yellow fruit", "banana"));
        assert!(!contains_ignore_case("anything", ""));
    }
}
