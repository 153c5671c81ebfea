//! Human-readable column labels
//!
//! Column names are split on snake/kebab/space separators and camel-case
//! boundaries, then lowercased: `unit_price` -> `unit price`,
//! `HTTPStatus` -> `http status`.

/// Split a column name into lowercase words
pub fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map_or(false, |n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }

        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words.into_iter().map(|w| w.to_lowercase()).collect()
}

/// Derive one label per column name
///
/// When every column (two or more) starts with the same word and has more
/// than one word, that shared leading word is dropped:
/// `ProductCode, ProductPrice` -> `code, price`.
pub fn derive_labels(names: &[String]) -> Vec<String> {
    let split: Vec<Vec<String>> = names.iter().map(|n| split_words(n)).collect();

    let shared_prefix = names.len() >= 2
        && split.iter().all(|words| words.len() > 1)
        && split.windows(2).all(|pair| pair[0][0] == pair[1][0]);

    split
        .into_iter()
        .zip(names)
        .map(|(words, name)| {
            let words: &[String] = if shared_prefix { &words[1..] } else { &words };
            if words.is_empty() {
                name.trim().to_lowercase()
            } else {
                words.join(" ")
            }
        })
        .collect()
}
