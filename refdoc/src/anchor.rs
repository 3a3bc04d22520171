/// Derive a URL-safe anchor from a section title.
///
/// The title is lowercased, whitespace becomes `-`, and every character that
/// is not alphanumeric, `-` or `_` is dropped. "Aggregations & Filters"
/// becomes `aggregations--filters`.
pub fn slugify(title: &str) -> String {
    let mut anchor = String::with_capacity(title.len());
    for c in title.trim().chars() {
        if c.is_whitespace() {
            anchor.push('-');
        } else if c.is_alphanumeric() || c == '-' || c == '_' {
            anchor.extend(c.to_lowercase());
        }
    }
    anchor
}
