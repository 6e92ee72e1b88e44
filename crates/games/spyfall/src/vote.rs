//! Reading a vote out of free-form accusation text.

/// Lowercased spellings a name may appear under: as is, without spaces and
/// with spaces replaced by underscores.
fn spellings(name: &str) -> [String; 3] {
    let lower = name.to_lowercase();
    [lower.replace(' ', ""), lower.replace(' ', "_"), lower]
}

/// First offset at which `word` stands on its own in `text`, not as part of
/// a longer word.
fn find_word(text: &str, word: &str) -> Option<usize> {
    text.match_indices(word).map(|(pos, _)| pos).find(|&pos| {
        let before = text[..pos].chars().next_back();
        let after = text[pos + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn position_in(text: &str, name: &str) -> Option<usize> {
    spellings(name)
        .iter()
        .filter(|s| !s.is_empty())
        .filter_map(|s| find_word(text, s))
        .min()
}

/// Name of the candidate `voter` accuses in `text`, if any.
///
/// A name wrapped in asterisks (`*Amy*`) wins over bare mentions. Without a
/// marked name, the candidate mentioned earliest in the text is taken. The
/// voter's own name never counts.
pub fn extract_vote<'a>(text: &str, candidates: &'a [String], voter: &str) -> Option<&'a str> {
    let lowered = text.to_lowercase();
    let eligible = || candidates.iter().filter(move |c| c.as_str() != voter);

    let marked = lowered.split('*').skip(1).step_by(2);
    for span in marked {
        let span = span.trim();
        if let Some(name) = eligible().find(|c| spellings(c).iter().any(|s| s == span)) {
            return Some(name.as_str());
        }
    }

    eligible()
        .filter_map(|c| position_in(&lowered, c).map(|pos| (pos, c)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, c)| c.as_str())
}
