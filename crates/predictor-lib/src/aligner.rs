//! Feature alignment between a request and a descriptor's schema
//!
//! Alignment is pure and total: it always returns a (possibly empty)
//! column list. An empty result tells the dispatcher not to invoke the
//! artifact at all.

/// Last-resort columns used when none of the required features are present.
/// Kept as-is pending product confirmation of the minimal feature set.
pub const FALLBACK_FEATURES: [&str; 2] = ["distance", "duration"];

/// Align `available` columns against `required` features
pub fn align(available: &[String], required: &[String]) -> Vec<String> {
    align_with(available, required, None)
}

/// Align with an optional caller-supplied feature list.
///
/// The explicit list only matters when the descriptor records no schema.
pub fn align_with(
    available: &[String],
    required: &[String],
    explicit: Option<&[String]>,
) -> Vec<String> {
    if required.is_empty() {
        return match explicit {
            Some(explicit) => explicit
                .iter()
                .filter(|name| available.contains(name))
                .cloned()
                .collect(),
            None => available.to_vec(),
        };
    }

    let usable: Vec<String> = required
        .iter()
        .filter(|name| available.contains(name))
        .cloned()
        .collect();

    if !usable.is_empty() {
        return usable;
    }

    FALLBACK_FEATURES
        .iter()
        .filter(|name| available.iter().any(|a| a == *name))
        .map(|name| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_order_follows_required_features() {
        assert_eq!(align(&cols(&["b", "a", "c"]), &cols(&["a", "b"])), cols(&["a", "b"]));
    }

    #[test]
    fn test_partial_overlap_keeps_subset() {
        assert_eq!(
            align(&cols(&["trip_miles", "hour"]), &cols(&["trip_miles", "trip_time", "hour"])),
            cols(&["trip_miles", "hour"])
        );
    }

    #[test]
    fn test_disjoint_falls_back_to_minimal_pair() {
        assert_eq!(
            align(&cols(&["distance", "duration", "foo"]), &cols(&["bar", "baz"])),
            cols(&["distance", "duration"])
        );
    }

    #[test]
    fn test_fallback_pair_is_intersected() {
        assert_eq!(align(&cols(&["duration", "foo"]), &cols(&["bar"])), cols(&["duration"]));
        assert!(align(&cols(&["foo"]), &cols(&["bar"])).is_empty());
    }

    #[test]
    fn test_fallback_pair_keeps_fixed_order() {
        assert_eq!(
            align(&cols(&["duration", "distance"]), &cols(&["bar"])),
            cols(&["distance", "duration"])
        );
    }

    #[test]
    fn test_empty_available_is_empty() {
        assert!(align(&[], &cols(&["a", "b"])).is_empty());
    }

    #[test]
    fn test_schemaless_passes_through() {
        let available = cols(&["z", "y", "x"]);
        assert_eq!(align(&available, &[]), available);
    }

    #[test]
    fn test_schemaless_uses_explicit_list() {
        let available = cols(&["a", "b", "c"]);
        let explicit = cols(&["c", "missing", "a"]);
        assert_eq!(align_with(&available, &[], Some(&explicit)), cols(&["c", "a"]));
    }

    #[test]
    fn test_explicit_list_ignored_with_schema() {
        let available = cols(&["a", "b", "c"]);
        let explicit = cols(&["c"]);
        assert_eq!(
            align_with(&available, &cols(&["b", "a"]), Some(&explicit)),
            cols(&["b", "a"])
        );
    }
}
