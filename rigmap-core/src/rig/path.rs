//! Slash-separated node path helpers.

/// Trims surrounding whitespace and trailing dots.
pub fn normalize_name(name: &str) -> &str {
    name.trim().trim_end_matches('.')
}

/// Case-insensitive comparison after [`normalize_name`].
pub fn name_equals(a: &str, b: &str) -> bool {
    normalize_name(a).to_lowercase() == normalize_name(b).to_lowercase()
}

pub fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Drops `leading` from the front of `segments` when it matches.
pub fn strip_leading<'a, 'b>(segments: &'a [&'b str], leading: &str) -> &'a [&'b str] {
    match segments.split_first() {
        Some((first, rest)) if !leading.is_empty() && name_equals(first, leading) => rest,
        _ => segments,
    }
}

/// All but the last segment.
pub fn parent_segments<'a, 'b>(segments: &'a [&'b str]) -> &'a [&'b str] {
    match segments.split_last() {
        Some((_, init)) => init,
        None => segments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_compare_loosely() {
        assert!(name_equals("Hips", "hips"));
        assert!(name_equals("Spine.", "spine"));
        assert!(name_equals(" Head ", "HEAD"));
        assert!(!name_equals("Hand_L", "Hand_R"));
    }

    #[test]
    fn splits_and_strips() {
        let segs = split_segments("/Armature//Hips/Spine/");
        assert_eq!(segs, vec!["Armature", "Hips", "Spine"]);
        assert_eq!(strip_leading(&segs, "armature"), &["Hips", "Spine"]);
        assert_eq!(strip_leading(&segs, "Body"), &segs[..]);
        assert_eq!(strip_leading(&segs, ""), &segs[..]);
        assert_eq!(parent_segments(&segs), &["Armature", "Hips"]);
        assert!(parent_segments(&[]).is_empty());
    }
}
