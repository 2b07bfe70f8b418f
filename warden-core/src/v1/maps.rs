//! Filters for commands returning lists of map names.
//!
//! A filter sees the candidate's index, its name, and what has been
//! picked so far, and returns `true` to keep the map.

/// Predicate over `(index, name, picked_so_far)`.
pub type MapFilter = Box<dyn Fn(usize, &str, &[String]) -> bool + Send + Sync>;

/// Run every filter over every candidate, keeping a map only when all
/// filters agree.
pub(crate) fn apply(maps: Vec<String>, filters: &[MapFilter]) -> Vec<String> {
    let mut picked = Vec::with_capacity(maps.len());
    for (idx, name) in maps.into_iter().enumerate() {
        if filters.iter().all(|f| f(idx, &name, &picked)) {
            picked.push(name);
        }
    }
    picked
}

/// Keep only maps whose name contains `needle`.
pub fn contains(needle: impl Into<String>) -> MapFilter {
    let needle = needle.into();
    Box::new(move |_, name, _| name.contains(&needle))
}

/// Drop offensive-mode maps.
pub fn no_offensive() -> MapFilter {
    Box::new(|_, name, _| !(name.contains("offensive") || name.contains("off")))
}

/// Stop picking once `limit` maps have been kept.
pub fn limit(limit: usize) -> MapFilter {
    Box::new(move |_, _, picked| picked.len() < limit)
}
