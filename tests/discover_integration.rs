use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;

use storybook_publisher::discover::{find_storybook_builds, find_storybook_packages};

fn mkdirs(root: &Path, relative: &str) {
    fs::create_dir_all(root.join(relative)).expect("creating test tree failed");
}

#[test]
fn packages_are_exactly_the_marker_parents_excluding_dependency_caches() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    mkdirs(root, "pkg-a/.storybook");
    mkdirs(root, "pkg-b/.storybook");
    mkdirs(root, "pkg-c/src");
    mkdirs(root, "node_modules/pkg-x/.storybook");

    // A marker that is a file, not a directory, must not count.
    mkdirs(root, "pkg-d");
    fs::write(root.join("pkg-d/.storybook"), b"not a directory").unwrap();

    let found: HashSet<PathBuf> = find_storybook_packages(root, 3).collect();
    let expected: HashSet<PathBuf> = [root.join("pkg-a"), root.join("pkg-b")].into();
    assert_eq!(found, expected);
}

#[test]
fn package_discovery_respects_the_depth_bound() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    mkdirs(root, "a/b/.storybook");
    mkdirs(root, "a/b/c/.storybook");

    let found: HashSet<PathBuf> = find_storybook_packages(root, 3).collect();
    assert_eq!(found, [root.join("a/b")].into());
}

#[test]
fn each_package_appears_exactly_once() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    mkdirs(root, "pkg-a/.storybook/inner");

    let found: Vec<PathBuf> = find_storybook_packages(root, 3).collect();
    assert_eq!(found, vec![root.join("pkg-a")]);
}

#[test]
fn build_discovery_returns_every_marker_directory() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    mkdirs(root, "pkg-a/storybook-static");
    mkdirs(root, "pkg-b/storybook-static");
    mkdirs(root, "group/pkg-c/storybook-static");
    mkdirs(root, "node_modules/pkg-x/storybook-static");

    let found: HashSet<PathBuf> = find_storybook_builds(root, 3).into_iter().collect();
    let expected: HashSet<PathBuf> = [
        root.join("pkg-a/storybook-static"),
        root.join("pkg-b/storybook-static"),
        root.join("group/pkg-c/storybook-static"),
    ]
    .into();
    assert_eq!(found, expected);
}

#[test]
fn empty_tree_discovers_nothing() {
    let tmp = tempdir().unwrap();
    assert_eq!(find_storybook_packages(tmp.path(), 3).count(), 0);
    assert!(find_storybook_builds(tmp.path(), 3).is_empty());
}
