//! Marker-directory discovery under the packages root.
//!
//! Packages are directories whose immediate child is a `.storybook` config
//! directory; builds are `storybook-static` output directories. Both walks
//! are bounded by the configured depth and skip dependency caches.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

/// Marker directory identifying a buildable storybook package.
pub const BUNDLE_MARKER: &str = ".storybook";
/// Marker directory identifying a produced storybook build.
pub const BUILD_MARKER: &str = "storybook-static";

const DEPENDENCY_CACHE: &str = "node_modules";

pub(crate) fn not_dependency_cache(entry: &DirEntry) -> bool {
    entry.file_name() != DEPENDENCY_CACHE
}

fn find_marker_dirs(
    root: &Path,
    depth: usize,
    marker: &'static str,
) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .max_depth(depth)
        .into_iter()
        .filter_entry(not_dependency_cache)
        .filter_map(Result::ok)
        .filter(move |entry| entry.file_type().is_dir() && entry.file_name() == marker)
        .map(|entry| entry.into_path())
}

/// Lazily streams the directories containing a storybook config marker.
/// Each package appears exactly once; order is traversal order and callers
/// must not depend on it.
pub fn find_storybook_packages(root: &Path, depth: usize) -> impl Iterator<Item = PathBuf> {
    find_marker_dirs(root, depth, BUNDLE_MARKER)
        .filter_map(|marker| marker.parent().map(Path::to_path_buf))
}

/// Returns every produced build output directory, fully materialized so the
/// caller can detect the empty case up front.
pub fn find_storybook_builds(root: &Path, depth: usize) -> Vec<PathBuf> {
    find_marker_dirs(root, depth, BUILD_MARKER).collect()
}

/// The package name a build output belongs to: its parent directory's
/// basename. Used to compute the remote destination subpath.
pub fn package_name(build_path: &Path) -> Option<&str> {
    build_path.parent().and_then(|p| p.file_name()).and_then(|n| n.to_str())
}
