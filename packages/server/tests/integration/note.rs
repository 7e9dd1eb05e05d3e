use ::common::storage::ContentHash;
use blobpad::search::SearchIndex;

use crate::common::{TestApp, routes};

mod note_lifecycle {
    use super::*;

    #[tokio::test]
    async fn draft_gets_a_body_version() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;

        let created = app.create_note(&work, "Draft", None).await;
        let id = created.id();
        assert_eq!(created.body["body"], "");
        assert_eq!(created.body["notebook"], work.as_str());
        assert_eq!(created.body["attachment_id"], "");
        assert_eq!(created.body["created_at"], created.body["updated_at"]);
        let history = created.body["history"].as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["version"], "");

        let updated = app
            .put(&routes::note(&id), &serde_json::json!({ "body": "hello" }))
            .await;
        assert_eq!(updated.status, 200, "{}", updated.text);
        assert!(
            updated.body["updated_at"].as_i64().unwrap()
                > created.body["updated_at"].as_i64().unwrap()
        );

        let fetched = app.get(&routes::note(&id)).await;
        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.body["title"], "Draft");
        assert_eq!(fetched.body["body"], "hello");
        let history = fetched.body["history"].as_array().unwrap();
        assert_eq!(history.len(), 2);

        let hello_hash = ContentHash::compute(b"hello").to_hex();
        assert_eq!(history[1]["version"], hello_hash.as_str());

        let version = app.get(&routes::note_version(&hello_hash)).await;
        assert_eq!(version.status, 200);
        assert_eq!(version.body, serde_json::json!({ "body": "hello" }));
    }

    #[tokio::test]
    async fn initial_body_is_stored_at_creation() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;

        let created = app.create_note(&work, "Meeting", Some("agenda")).await;

        assert_eq!(created.body["body"], "agenda");
        assert_eq!(created.body["created_at"], created.body["updated_at"]);
        let history = created.body["history"].as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["version"], "");

        let fetched = app.get(&routes::note(&created.id())).await;
        assert_eq!(fetched.body["body"], "agenda");
        assert_eq!(fetched.body["history"], created.body["history"]);
    }

    #[tokio::test]
    async fn every_body_update_adds_one_version() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let id = app.create_note(&work, "Log", None).await.id();

        for i in 0..4 {
            let res = app
                .put(&routes::note(&id), &serde_json::json!({ "body": format!("v{i}") }))
                .await;
            assert_eq!(res.status, 200);
        }

        let fetched = app.get(&routes::note(&id)).await;
        let history = fetched.body["history"].as_array().unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(fetched.body["body"], "v3");

        let stamps: Vec<i64> = history
            .iter()
            .map(|h| h["updated_at"].as_i64().unwrap())
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]), "{stamps:?}");
        assert_eq!(fetched.body["updated_at"].as_i64().unwrap(), stamps[4]);
    }

    #[tokio::test]
    async fn title_update_leaves_body_alone() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let created = app.create_note(&work, "Old", Some("text")).await;
        let id = created.id();

        let res = app
            .put(&routes::note(&id), &serde_json::json!({ "title": "New" }))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["title"], "New");
        assert_eq!(res.body["body"], "text");
        assert_eq!(res.body["updated_at"], created.body["updated_at"]);
        assert_eq!(res.body["history"], created.body["history"]);
    }

    #[tokio::test]
    async fn echoed_note_fields_are_ignored() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let created = app.create_note(&work, "Draft", None).await;

        let mut payload = created.body.clone();
        payload["body"] = serde_json::Value::from("edited");
        payload["created_at"] = serde_json::Value::from(1);
        let res = app.put(&routes::note(&created.id()), &payload).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["body"], "edited");
        assert_eq!(res.body["created_at"], created.body["created_at"]);
    }

    #[tokio::test]
    async fn empty_body_is_a_new_version() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let id = app.create_note(&work, "Draft", Some("text")).await.id();

        let res = app
            .put(&routes::note(&id), &serde_json::json!({ "body": "" }))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["body"], "");
        let history = res.body["history"].as_array().unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2]["version"], ContentHash::compute(b"").to_hex().as_str());
    }

    #[tokio::test]
    async fn empty_patch_changes_nothing() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let created = app.create_note(&work, "Draft", Some("text")).await;

        let res = app
            .put(&routes::note(&created.id()), &serde_json::json!({}))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["history"], created.body["history"]);
        assert_eq!(res.body["title"], "Draft");
    }
}

mod note_errors {
    use super::*;

    #[tokio::test]
    async fn unknown_note_is_not_found() {
        let app = TestApp::spawn().await;
        let ghost = "0123456789abcdef0123456789abcdef";

        let get = app.get(&routes::note(ghost)).await;
        assert_eq!(get.status, 404);
        assert_eq!(get.code(), "NOT_FOUND");

        let put = app
            .put(&routes::note(ghost), &serde_json::json!({ "title": "x" }))
            .await;
        assert_eq!(put.status, 404);
    }

    #[tokio::test]
    async fn notebook_id_is_not_a_note() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;

        let res = app
            .put(
                &routes::note(&work),
                &serde_json::json!({ "title": "Hijacked", "body": "x" }),
            )
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");
        let notebooks = app.get(routes::NOTEBOOKS).await;
        assert_eq!(notebooks.body[0]["name"], "Work");
        let store = app.repo.store();
        assert_eq!(store.history(&work, "title").await.unwrap().len(), 2);
        assert!(store.history(&work, "body").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_id_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::note("not-an-id")).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_notebook_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                routes::NOTES,
                &serde_json::json!({
                    "title": "Orphan",
                    "notebook": "0123456789abcdef0123456789abcdef",
                }),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
        assert_eq!(app.listed_ids(routes::NOTES).await.len(), 0);
    }

    #[tokio::test]
    async fn unknown_version_is_not_found() {
        let app = TestApp::spawn().await;
        let hash = ContentHash::compute(b"never stored").to_hex();

        let res = app.get(&routes::note_version(&hash)).await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn malformed_version_hash_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::note_version("abc")).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }
}

mod note_blobs {
    use super::*;

    #[tokio::test]
    async fn identical_bodies_share_one_blob() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;

        let before = app.blobs.puts();
        let a = app.create_note(&work, "A", Some("same text")).await;
        let b = app.create_note(&work, "B", Some("same text")).await;

        assert_eq!(app.blobs.puts(), before + 1);
        assert_eq!(a.body["history"][1]["version"], b.body["history"][1]["version"]);
    }

    #[tokio::test]
    async fn old_versions_stay_readable() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let id = app.create_note(&work, "Draft", Some("first")).await.id();
        app.put(&routes::note(&id), &serde_json::json!({ "body": "second" }))
            .await;

        let fetched = app.get(&routes::note(&id)).await;
        let first = fetched.body["history"][1]["version"].as_str().unwrap();

        let res = app.get(&routes::note_version(first)).await;
        assert_eq!(res.body["body"], "first");
    }
}

mod note_listing {
    use super::*;

    #[tokio::test]
    async fn lists_most_recently_updated_first() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let a = app.create_note(&work, "A", None).await.id();
        let b = app.create_note(&work, "B", None).await.id();
        app.put(&routes::note(&a), &serde_json::json!({ "body": "bump" }))
            .await;

        let ids = app.listed_ids(routes::NOTES).await;

        assert_eq!(ids, vec![a, b]);
    }

    #[tokio::test]
    async fn filters_by_notebook() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let home = app.create_notebook("Home").await;
        let w = app.create_note(&work, "Report", None).await.id();
        app.create_note(&home, "Groceries", None).await;

        let ids = app.listed_ids(&routes::notes_in(&work)).await;

        assert_eq!(ids, vec![w]);
    }

    #[tokio::test]
    async fn notebook_filter_wins_over_query() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let home = app.create_notebook("Home").await;
        let w = app.create_note(&work, "Report", None).await.id();
        app.create_note(&home, "Report", None).await;

        let path = format!("{}&query=Report", routes::notes_in(&work));
        let ids = app.listed_ids(&path).await;

        assert_eq!(ids, vec![w]);
    }

    #[tokio::test]
    async fn text_query_searches_titles_and_bodies() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let by_title = app.create_note(&work, "Milk run", None).await.id();
        let by_body = app.create_note(&work, "Shopping", Some("buy milk")).await.id();
        app.create_note(&work, "Unrelated", Some("nothing here")).await;

        let mut ids = app.listed_ids(&routes::notes_matching("milk")).await;
        ids.sort();
        let mut expected = vec![by_title, by_body];
        expected.sort();

        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn body_update_is_visible_to_search() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let id = app.create_note(&work, "Draft", None).await.id();

        assert!(app.listed_ids(&routes::notes_matching("zebra")).await.is_empty());

        app.put(&routes::note(&id), &serde_json::json!({ "body": "a zebra" }))
            .await;

        assert_eq!(app.listed_ids(&routes::notes_matching("zebra")).await, vec![id]);
    }

    #[tokio::test]
    async fn stale_index_entries_are_skipped() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let real = app.create_note(&work, "Real", None).await.id();

        let ghost = "0123456789abcdef0123456789abcdef";
        let mut doc = app.index.inner.get(&real).await.unwrap();
        doc.id = ghost.to_string();
        app.index.inner.put_document(ghost, &doc).await.unwrap();

        let ids = app.listed_ids(routes::NOTES).await;

        assert_eq!(ids, vec![real]);
    }
}

mod index_outage {
    use super::*;

    #[tokio::test]
    async fn writes_succeed_while_index_is_down() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        app.index.set_available(false);

        let created = app.create_note(&work, "Offline", Some("still saved")).await;
        let id = created.id();
        let updated = app
            .put(&routes::note(&id), &serde_json::json!({ "title": "Renamed" }))
            .await;
        assert_eq!(updated.status, 200);

        let fetched = app.get(&routes::note(&id)).await;
        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.body["title"], "Renamed");
        assert_eq!(app.indexer.pending().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn listing_reports_index_unavailable() {
        let app = TestApp::spawn().await;
        app.index.set_available(false);

        let res = app.get(routes::NOTES).await;

        assert_eq!(res.status, 503);
        assert_eq!(res.code(), "INDEX_UNAVAILABLE");
    }

    #[tokio::test]
    async fn outbox_catches_the_index_up() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        app.index.set_available(false);
        let id = app.create_note(&work, "Queued", None).await.id();
        app.put(&routes::note(&id), &serde_json::json!({ "body": "latest" }))
            .await;

        app.index.set_available(true);
        let report = app.indexer.drain_outbox(&app.repo).await.unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(app.indexer.pending().await.unwrap(), 0);
        let doc = app.index.inner.get(&id).await.unwrap();
        assert_eq!(doc.title, "Queued");
        assert_eq!(doc.body, "latest");
    }

    #[tokio::test]
    async fn outbox_gives_up_after_max_attempts() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        app.index.set_available(false);
        app.create_note(&work, "Stuck", None).await;

        let mut retried = 0;
        for _ in 0..5 {
            retried += app.indexer.drain_outbox(&app.repo).await.unwrap().retried;
        }

        // Three attempts are allowed; the entry then waits for a reindex.
        assert_eq!(retried, 3);
        assert_eq!(app.indexer.pending().await.unwrap(), 1);
    }
}

mod blob_outage {
    use super::*;

    #[tokio::test]
    async fn failed_update_writes_nothing() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let id = app.create_note(&work, "Old", Some("body")).await.id();

        app.blobs.fail_reads(true);
        let res = app
            .put(&routes::note(&id), &serde_json::json!({ "title": "New" }))
            .await;
        app.blobs.fail_reads(false);

        assert_eq!(res.status, 503);
        assert_eq!(res.code(), "STORE_UNAVAILABLE");
        let titles = app.repo.store().history(&id, "title").await.unwrap();
        assert_eq!(titles.last().unwrap().value, "Old");
        assert_eq!(app.get(&routes::note(&id)).await.body["title"], "Old");
        assert_eq!(app.index.inner.get(&id).await.unwrap().title, "Old");
    }

    #[tokio::test]
    async fn retry_after_outage_applies_once() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let id = app.create_note(&work, "Old", Some("body")).await.id();
        let patch = serde_json::json!({ "title": "New", "body": "fresh" });

        app.blobs.fail_reads(true);
        assert_eq!(app.put(&routes::note(&id), &patch).await.status, 503);
        app.blobs.fail_reads(false);
        let res = app.put(&routes::note(&id), &patch).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["title"], "New");
        assert_eq!(res.body["body"], "fresh");
        assert_eq!(res.body["history"].as_array().unwrap().len(), 3);
        let doc = app.index.inner.get(&id).await.unwrap();
        assert_eq!(doc.title, "New");
        assert_eq!(doc.body, "fresh");
        assert_eq!(app.indexer.pending().await.unwrap(), 0);
    }
}

mod concurrent_updates {
    use super::*;

    #[tokio::test]
    async fn both_title_updates_are_kept() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let id = app.create_note(&work, "Start", None).await.id();

        let path = routes::note(&id);
        let alpha = serde_json::json!({ "title": "Alpha" });
        let beta = serde_json::json!({ "title": "Beta" });
        let (a, b) = tokio::join!(app.put(&path, &alpha), app.put(&path, &beta));
        assert_eq!(a.status, 200);
        assert_eq!(b.status, 200);

        let titles: Vec<String> = app
            .repo
            .store()
            .history(&id, "title")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.value)
            .collect();
        assert_eq!(titles.len(), 4);
        assert!(titles.contains(&"Alpha".to_string()));
        assert!(titles.contains(&"Beta".to_string()));

        let latest = app.get(&path).await;
        assert_eq!(latest.body["title"], titles[3].as_str());
    }
}
