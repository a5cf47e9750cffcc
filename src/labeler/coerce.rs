// src/labeler/coerce.rs — Map free-form model replies onto the closed label set

use crate::dataset::LabelSet;
use crate::util::unquote;

/// Pick the label a raw model reply most plausibly means.
///
/// In order: exact match ignoring case and surrounding quotes/punctuation;
/// the longest label whose words appear as whole words in the reply; the
/// label with the highest normalized Levenshtein similarity. Ties go to the
/// earlier label. With an empty label set the cleaned reply is returned
/// unchanged.
pub fn coerce(raw: &str, labels: &LabelSet) -> String {
    let cleaned = unquote(raw).trim_end_matches(['.', '!', ';', ',']).trim();
    let lowered = cleaned.to_lowercase();

    if let Some(exact) = labels.iter().find(|l| l.to_lowercase() == lowered) {
        return exact.to_string();
    }

    let reply_words = words(&lowered);
    let mut mentioned: Option<&str> = None;
    for label in labels.iter() {
        let label_lower = label.to_lowercase();
        let label_words = words(&label_lower);
        if !label_words.is_empty()
            && reply_words
                .windows(label_words.len())
                .any(|w| w == label_words.as_slice())
            && mentioned.map_or(true, |m| label.len() > m.len())
        {
            mentioned = Some(label);
        }
    }
    if let Some(label) = mentioned {
        return label.to_string();
    }

    let mut best: Option<(&str, f64)> = None;
    for label in labels.iter() {
        let score = strsim::normalized_levenshtein(&lowered, &label.to_lowercase());
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((label, score));
        }
    }

    match best {
        Some((label, _)) => label.to_string(),
        None => cleaned.to_string(),
    }
}

/// Alphanumeric runs; "Label: B" is `["label", "b"]`.
fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}
