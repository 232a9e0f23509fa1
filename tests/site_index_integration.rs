use chrono::{DateTime, Duration, Utc};

use storybook_publisher::commit::CommitMetadata;
use storybook_publisher::config::{test_config, Config};
use storybook_publisher::contract::{MockObjectStore, ObjectInfo};
use storybook_publisher::site_index::{update_site_index, SITE_INDEX_KEY};
use storybook_publisher::testing::InMemoryStore;

fn metadata(commit: &str, branch: &str, datestamp: DateTime<Utc>) -> CommitMetadata {
    CommitMetadata {
        datestamp,
        commit: commit.into(),
        branch: branch.into(),
        pull_request: None,
        pull_request_url: None,
        summary: format!("summary for {commit}"),
        description: "details".into(),
    }
}

fn seed_metadata(store: &InMemoryStore, commit: &str, created: DateTime<Utc>) {
    let meta = metadata(commit, "main", created);
    store.seed(
        &format!("commits/metadata-{commit}.json"),
        serde_json::to_vec_pretty(&meta).unwrap(),
        "application/json",
        created,
    );
}

fn aggregation_config() -> Config {
    let mut config = test_config();
    config.store.max_age = Duration::days(30);
    config.num_latest_items = 25;
    config
}

fn rendered_index(store: &InMemoryStore) -> String {
    String::from_utf8(store.object(SITE_INDEX_KEY).expect("site index published").bytes).unwrap()
}

#[tokio::test]
async fn entries_older_than_max_age_are_excluded_and_rest_sorted_newest_first() {
    let now = Utc::now();
    let store = InMemoryStore::new();
    seed_metadata(&store, "old", now - Duration::days(40));
    seed_metadata(&store, "mid", now - Duration::days(10));
    seed_metadata(&store, "new", now - Duration::days(1));

    update_site_index(&aggregation_config(), &store, now).await.unwrap();

    let page = rendered_index(&store);
    assert!(!page.contains("commits/old/index.html"));
    let new_pos = page.find("commits/new/index.html").expect("new entry present");
    let mid_pos = page.find("commits/mid/index.html").expect("mid entry present");
    assert!(new_pos < mid_pos, "newest entry must render first");
}

#[tokio::test]
async fn aggregation_truncates_to_the_configured_count() {
    let now = Utc::now();
    let store = InMemoryStore::new();
    for age in 1..=5 {
        seed_metadata(&store, &format!("c{age}"), now - Duration::days(age));
    }

    let mut config = aggregation_config();
    config.num_latest_items = 2;
    update_site_index(&config, &store, now).await.unwrap();

    let page = rendered_index(&store);
    assert!(page.contains("commits/c1/index.html"));
    assert!(page.contains("commits/c2/index.html"));
    for dropped in 3..=5 {
        assert!(
            !page.contains(&format!("commits/c{dropped}/index.html")),
            "entry c{dropped} must be truncated away"
        );
    }
}

#[tokio::test]
async fn truncation_avoids_fetching_objects_beyond_the_bound() {
    let now = Utc::now();
    let mut store = MockObjectStore::new();

    let listing: Vec<ObjectInfo> = (1..=5)
        .map(|age| ObjectInfo {
            key: format!("commits/metadata-c{age}.json"),
            created: now - Duration::days(age),
        })
        .collect();
    store
        .expect_list()
        .withf(|prefix| prefix == "commits/metadata-")
        .return_once(move |_| Ok(listing));

    for age in 1..=2 {
        let meta = metadata(&format!("c{age}"), "main", now - Duration::days(age));
        let bytes = serde_json::to_vec(&meta).unwrap();
        store
            .expect_get()
            .withf(move |key| key == format!("commits/metadata-c{age}.json"))
            .times(1)
            .return_once(move |_| Ok(bytes));
    }
    // No get expectation exists for c3..c5: fetching them would panic.

    store
        .expect_put()
        .withf(|key, _, content_type| key == SITE_INDEX_KEY && content_type == "text/html")
        .times(1)
        .return_once(|_, _, _| Ok(()));

    let mut config = aggregation_config();
    config.num_latest_items = 2;
    update_site_index(&config, &store, now).await.unwrap();
}

#[tokio::test]
async fn a_corrupt_metadata_object_is_skipped_not_fatal() {
    let now = Utc::now();
    let store = InMemoryStore::new();
    seed_metadata(&store, "good-a", now - Duration::days(1));
    seed_metadata(&store, "good-b", now - Duration::days(2));
    store.seed(
        "commits/metadata-broken.json",
        b"{ this is not json".to_vec(),
        "application/json",
        now - Duration::days(3),
    );

    update_site_index(&aggregation_config(), &store, now).await.unwrap();

    let page = rendered_index(&store);
    assert!(page.contains("commits/good-a/index.html"));
    assert!(page.contains("commits/good-b/index.html"));
    assert!(!page.contains("broken"));
}

#[tokio::test]
async fn rebuilding_overwrites_the_previous_index() {
    let now = Utc::now();
    let store = InMemoryStore::new();
    store.seed(SITE_INDEX_KEY, b"stale index".to_vec(), "text/html", now);
    seed_metadata(&store, "fresh", now - Duration::days(1));

    update_site_index(&aggregation_config(), &store, now).await.unwrap();

    let page = rendered_index(&store);
    assert!(!page.contains("stale index"));
    assert!(page.contains("commits/fresh/index.html"));
}
