//! Dictionary-free English noun lemmatizer.
//!
//! Maps plural nouns to their singular form using an irregular-form table and
//! the usual suffix rules. Verb and adjective inflections are left alone, so
//! "graced" stays "graced" while "virgins" becomes "virgin".

use lazy_static::lazy_static;
use std::borrow::Cow;
use std::collections::HashMap;

lazy_static! {
    static ref IRREGULAR: HashMap<&'static str, &'static str> = [
        ("men", "man"), ("women", "woman"), ("children", "child"), ("people", "person"),
        ("mice", "mouse"), ("geese", "goose"), ("feet", "foot"), ("teeth", "tooth"),
        ("oxen", "ox"), ("dice", "die"), ("data", "datum"), ("media", "medium"),
        ("leaves", "leaf"), ("wolves", "wolf"), ("knives", "knife"), ("lives", "life"),
        ("wives", "wife"), ("halves", "half"), ("selves", "self"), ("shelves", "shelf"),
        ("thieves", "thief"), ("loaves", "loaf"), ("calves", "calf"),
        ("indices", "index"), ("matrices", "matrix"), ("vertices", "vertex"),
        ("criteria", "criterion"), ("phenomena", "phenomenon"),
        ("analyses", "analysis"), ("crises", "crisis"), ("theses", "thesis"),
        ("hypotheses", "hypothesis"), ("axes", "axis"),
    ]
    .into_iter()
    .collect();
}

/// Words ending in "s" that are already singular.
const SINGULAR_ENDINGS: &[&str] = &["ss", "us", "is"];

/// Returns the lemma of a lower-cased token, borrowing when nothing changes.
pub fn lemmatize(token: &str) -> Cow<'_, str> {
    if let Some(lemma) = IRREGULAR.get(token) {
        return Cow::Borrowed(*lemma);
    }
    // Short words ("gas", "bus", "yes") are too ambiguous to strip.
    if token.chars().count() <= 3 || !token.ends_with('s') {
        return Cow::Borrowed(token);
    }
    if let Some(stem) = token.strip_suffix("ies") {
        if stem.chars().count() >= 2 {
            return Cow::Owned(format!("{stem}y"));
        }
        return Cow::Borrowed(token);
    }
    for suffix in ["sses", "ches", "shes", "xes", "zes"] {
        if token.ends_with(suffix) {
            return Cow::Borrowed(&token[..token.len() - 2]);
        }
    }
    if SINGULAR_ENDINGS.iter().any(|end| token.ends_with(end)) {
        return Cow::Borrowed(token);
    }
    Cow::Borrowed(&token[..token.len() - 1])
}
