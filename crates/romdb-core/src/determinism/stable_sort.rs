//! Stable ordering for descriptor iteration.
//!
//! Manifest assembly is first-writer-wins, so the iteration order over
//! descriptors decides which one claims a contested destination path. That
//! order is the lowercase file name of each descriptor, nothing else.

/// Normalized sort key for a descriptor source: its lowercase file name.
pub fn normalized_name(source: &str) -> String {
    let name = source.rsplit(['/', '\\']).next().unwrap_or(source);
    name.to_lowercase()
}

/// Sort items by the normalized name of their source. Ties keep input order.
pub fn sort_by_normalized_name<T, F>(items: &mut [T], mut source_fn: F)
where
    F: FnMut(&T) -> &str,
{
    items.sort_by_cached_key(|item| normalized_name(source_fn(item)));
}
