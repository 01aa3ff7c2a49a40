//! Text normalization shared by the similarity kernel and natural keys.
//!
//! Similarity scores are only meaningful when the query string and the
//! catalog string were normalized by the same rules, and idempotent upserts
//! only converge when the natural key uses those rules too. Both live here
//! so they cannot drift apart.

/// Normalize a string for comparison: lowercase, fold Latin diacritics,
/// replace runs of non-alphanumeric characters with a single space, trim.
///
/// `"Château Margaux "` → `"chateau margaux"`.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;

    for c in input.chars() {
        for lc in c.to_lowercase() {
            match fold_diacritic(lc) {
                Some(folded) => {
                    // Folded replacements are always alphanumeric ASCII.
                    if pending_space && !out.is_empty() {
                        out.push(' ');
                    }
                    pending_space = false;
                    out.push_str(folded);
                }
                None => {
                    if lc.is_alphanumeric() {
                        if pending_space && !out.is_empty() {
                            out.push(' ');
                        }
                        pending_space = false;
                        out.push(lc);
                    } else {
                        pending_space = true;
                    }
                }
            }
        }
    }

    out
}

/// Fold a lowercase Latin character with diacritics to its ASCII base form.
///
/// Returns `None` for characters that need no folding. Covers the accented
/// forms that actually occur on wine labels (French, German, Spanish,
/// Portuguese, Italian, Hungarian producers); anything outside the table
/// passes through unchanged.
fn fold_diacritic(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' => "i",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'ç' | 'ć' | 'č' => "c",
        'ñ' | 'ń' | 'ň' => "n",
        'ý' | 'ÿ' => "y",
        'š' | 'ś' => "s",
        'ž' | 'ź' | 'ż' => "z",
        'ř' => "r",
        'ł' => "l",
        'ť' => "t",
        'ď' => "d",
        'þ' => "th",
        'ð' => "d",
        'æ' => "ae",
        'œ' => "oe",
        'ß' => "ss",
        _ => return None,
    };
    Some(folded)
}
