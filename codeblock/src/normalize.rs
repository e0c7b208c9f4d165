/// Canonicalize raw block text into a `;`-terminated statement sequence.
///
/// Carriage returns are removed, the text is trimmed, whitespace-only
/// statements are dropped, and every remaining statement ends in exactly one
/// `;`. Empty input stays empty. Normalizing twice changes nothing.
pub fn normalize(text: &str) -> String {
    let text = text.replace('\r', "");
    let mut normalized = String::with_capacity(text.len() + 1);
    for fragment in text.trim().split(';') {
        if fragment.trim().is_empty() {
            continue;
        }
        if normalized.is_empty() {
            normalized.push_str(fragment.trim_start());
        } else {
            normalized.push_str(fragment);
        }
        normalized.push(';');
    }
    normalized
}
