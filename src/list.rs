//! Separator-delimited list values, as found in variables like `PATH`.
//!
//! Values are handled as bytes, so list elements that are not valid UTF-8
//! survive a merge unchanged.

/// Split a list value into its elements.
///
/// An empty value is an empty list. Otherwise every separator starts a new
/// element, so empty elements and duplicates are kept as they are.
pub fn split(value: &[u8], separator: u8) -> Vec<&[u8]> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(|&b| b == separator).collect()
}

/// Join list elements with the separator.
pub fn join<S: AsRef<[u8]>>(elements: &[S], separator: u8) -> Vec<u8> {
    let mut value = Vec::new();
    for (i, elem) in elements.iter().enumerate() {
        if i > 0 {
            value.push(separator);
        }
        value.extend_from_slice(elem.as_ref());
    }
    value
}

/// Merge `extra` into the list value `current`.
///
/// Elements of `current` that also appear in `extra` are dropped, then `extra`
/// goes in front (`prepend`) or at the back of what remains. Neither side is
/// reordered, and duplicates inside `extra` are kept.
///
/// ```
/// use program_wrapper::list::merge;
/// assert_eq!(merge(b"a:b:c", b"b:d", b':', false), b"a:c:b:d");
/// assert_eq!(merge(b"a:b:c", b"b:d", b':', true), b"b:d:a:c");
/// ```
pub fn merge(current: &[u8], extra: &[u8], separator: u8, prepend: bool) -> Vec<u8> {
    let extra_elems = split(extra, separator);
    let current_elems: Vec<&[u8]> = split(current, separator)
        .into_iter()
        .filter(|elem| !extra_elems.contains(elem))
        .collect();

    let merged: Vec<&[u8]> = if prepend {
        extra_elems.iter().chain(current_elems.iter()).copied().collect()
    } else {
        current_elems.iter().chain(extra_elems.iter()).copied().collect()
    };
    join(&merged, separator)
}
