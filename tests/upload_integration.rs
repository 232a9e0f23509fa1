use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::tempdir;

use storybook_publisher::publish::upload_storybook_build;
use storybook_publisher::testing::InMemoryStore;

fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).expect("creating parent dirs failed");
    fs::write(path, content).expect("writing test file failed");
}

#[tokio::test]
async fn destination_keys_preserve_the_relative_path_verbatim() {
    let tmp = tempdir().unwrap();
    let build = tmp.path().join("storybook-static");
    write_file(&build, "a/b.txt", "nested");
    write_file(&build, "c.txt", "flat");

    let store = InMemoryStore::new();
    let uploaded = upload_storybook_build(&store, &build, "commits/X/pkg", 4)
        .await
        .expect("upload batch should succeed");

    assert_eq!(uploaded, 2);
    assert_eq!(
        store.keys(),
        vec!["commits/X/pkg/a/b.txt".to_string(), "commits/X/pkg/c.txt".to_string()]
    );
    let object = store.object("commits/X/pkg/a/b.txt").unwrap();
    assert_eq!(object.bytes, b"nested");
    assert_eq!(object.content_type, "text/plain");
}

#[tokio::test]
async fn active_uploads_never_exceed_the_concurrency_bound() {
    let tmp = tempdir().unwrap();
    let build = tmp.path().join("storybook-static");
    for i in 0..20 {
        write_file(&build, &format!("file-{i}.js"), "content");
    }

    let store = InMemoryStore::with_put_delay(Duration::from_millis(10));
    upload_storybook_build(&store, &build, "commits/X/pkg", 4)
        .await
        .expect("upload batch should succeed");

    assert_eq!(store.put_count(), 20);
    assert!(
        store.max_active_puts() <= 4,
        "observed {} concurrent uploads with a bound of 4",
        store.max_active_puts()
    );
    assert!(
        store.max_active_puts() > 1,
        "uploads should actually overlap under the bound"
    );
}

#[tokio::test]
async fn a_single_failed_upload_fails_the_batch_after_settling() {
    let tmp = tempdir().unwrap();
    let build = tmp.path().join("storybook-static");
    for i in 0..8 {
        write_file(&build, &format!("file-{i}.js"), "content");
    }

    let store = InMemoryStore::with_put_delay(Duration::from_millis(5));
    store.fail_key("commits/X/pkg/file-3.js");

    let result = upload_storybook_build(&store, &build, "commits/X/pkg", 4).await;
    assert!(result.is_err(), "batch must report failure when any task fails");
    assert_eq!(
        store.active_puts(),
        0,
        "no upload may still be pending once the batch call returns"
    );
}

#[tokio::test]
async fn re_uploading_overwrites_with_the_latest_content() {
    let tmp = tempdir().unwrap();
    let build = tmp.path().join("storybook-static");
    write_file(&build, "index.html", "<html>v1</html>");

    let store = InMemoryStore::new();
    upload_storybook_build(&store, &build, "commits/X/pkg", 4).await.unwrap();

    write_file(&build, "index.html", "<html>v2</html>");
    upload_storybook_build(&store, &build, "commits/X/pkg", 4).await.unwrap();

    assert_eq!(store.keys(), vec!["commits/X/pkg/index.html".to_string()]);
    assert_eq!(
        store.object("commits/X/pkg/index.html").unwrap().bytes,
        b"<html>v2</html>"
    );
}

#[tokio::test]
async fn dependency_cache_files_are_not_uploaded() {
    let tmp = tempdir().unwrap();
    let build = tmp.path().join("storybook-static");
    write_file(&build, "index.html", "page");
    write_file(&build, "node_modules/lib/index.js", "dependency");

    let store = InMemoryStore::new();
    upload_storybook_build(&store, &build, "commits/X/pkg", 4).await.unwrap();

    assert_eq!(store.keys(), vec!["commits/X/pkg/index.html".to_string()]);
}
