/// Whitespace tokens of `text`. No case folding or punctuation stripping:
/// titles are matched on their words as written.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Sliding `nword` windows over the tokens of `text`, each joined by a single
/// space. Tokens never contain whitespace, so the joined form identifies the
/// word tuple.
///
/// A text of `nword` words or fewer is a single phrase of all its words; the
/// empty text is the empty phrase.
pub fn split_phrases(text: &str, nword: usize) -> Vec<String> {
    let words = tokenize(text);
    if nword > 0 && words.len() > nword {
        words.windows(nword).map(|w| w.join(" ")).collect()
    } else {
        vec![words.join(" ")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        assert_eq!(tokenize("  Newton's   first\tlaw\n"), vec!["Newton's", "first", "law"]);
    }

    #[test]
    fn phrases_slide_over_words() {
        assert_eq!(split_phrases("the cat sat", 2), vec!["the cat", "cat sat"]);
        assert_eq!(split_phrases("a b c d", 3), vec!["a b c", "b c d"]);
    }
}
