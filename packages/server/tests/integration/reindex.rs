use blobpad::entity::entity_set;
use blobpad::repository::EntityId;
use blobpad::search::SearchIndex;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::common::{TestApp, routes};

mod rebuild {
    use super::*;

    #[tokio::test]
    async fn restores_a_wiped_index() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let a = app.create_note(&work, "A", Some("alpha")).await.id();
        let b = app.create_note(&work, "B", None).await.id();
        app.index.inner.drop_all().await.unwrap();
        assert!(app.listed_ids(routes::NOTES).await.is_empty());

        let res = app.post(routes::REINDEX, &serde_json::json!({})).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["indexed"], 2);
        assert_eq!(res.body["degraded"], 0);
        assert_eq!(res.body["failed"], 0);
        assert_eq!(app.listed_ids(routes::NOTES).await, vec![b, a.clone()]);
        assert_eq!(app.index.inner.get(&a).await.unwrap().body, "alpha");
    }

    #[tokio::test]
    async fn drops_documents_the_store_does_not_have() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let real = app.create_note(&work, "Real", None).await.id();
        let mut ghost = app.index.inner.get(&real).await.unwrap();
        ghost.id = EntityId::generate().to_string();
        app.index.inner.put_document(&ghost.id, &ghost).await.unwrap();

        app.post(routes::REINDEX, &serde_json::json!({})).await;

        assert_eq!(app.index.inner.len().await, 1);
        assert!(app.index.inner.get(&ghost.id).await.is_none());
    }

    #[tokio::test]
    async fn includes_attachment_text() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let res = app.upload(&work, &[("scan.pdf", b"%PDF quarterly")]).await;
        let id = res.body[0]["id"].as_str().unwrap().to_string();
        app.index.inner.drop_all().await.unwrap();

        app.post(routes::REINDEX, &serde_json::json!({})).await;

        let doc = app.index.inner.get(&id).await.unwrap();
        assert_eq!(
            doc.attachment_content.as_deref(),
            Some("extracted: %PDF quarterly")
        );
        assert_eq!(doc.attachment_id.as_deref(), res.body[0]["attachment_id"].as_str());
    }

    #[tokio::test]
    async fn unavailable_index_fails_the_rebuild() {
        let app = TestApp::spawn().await;
        app.index.set_available(false);

        let res = app.post(routes::REINDEX, &serde_json::json!({})).await;

        assert_eq!(res.status, 503);
        assert_eq!(res.code(), "INDEX_UNAVAILABLE");
    }
}

mod partial_failure {
    use super::*;

    #[tokio::test]
    async fn corrupt_note_is_skipped() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let good = app.create_note(&work, "Good", None).await.id();

        // A set member with none of its scalars or logs.
        let mut tx = app.repo.store().begin();
        tx.add_to_set("notes", EntityId::generate().to_string(), 0);
        app.repo.store().commit(tx).await.unwrap();

        let report = app.indexer.reindex_all(&app.repo).await.unwrap();

        assert_eq!(report.indexed, 1);
        assert_eq!(report.failed, 1);
        assert!(app.index.inner.get(&good).await.is_some());
    }

    #[tokio::test]
    async fn unreadable_blobs_index_a_degraded_document() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let id = app.create_note(&work, "Titled", Some("body text")).await.id();

        app.blobs.fail_reads(true);
        let report = app.indexer.reindex_all(&app.repo).await.unwrap();
        app.blobs.fail_reads(false);

        assert_eq!(report.indexed, 1);
        assert_eq!(report.degraded, 1);
        let doc = app.index.inner.get(&id).await.unwrap();
        assert_eq!(doc.title, "Titled");
        assert_eq!(doc.body, "");
    }
}

mod outbox_cleanup {
    use super::*;

    #[tokio::test]
    async fn rebuild_resolves_pending_writes() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        app.index.set_available(false);
        let id = app.create_note(&work, "Missed", None).await.id();
        assert_eq!(app.indexer.pending().await.unwrap(), 1);

        app.index.set_available(true);
        let report = app.indexer.reindex_all(&app.repo).await.unwrap();

        assert_eq!(report.indexed, 1);
        assert_eq!(app.indexer.pending().await.unwrap(), 0);
        assert!(app.index.inner.get(&id).await.is_some());
    }

    #[tokio::test]
    async fn notes_the_rebuild_missed_stay_pending() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        app.index.set_available(false);
        let missed = app.create_note(&work, "Missed", None).await.id();
        let healed = app.create_note(&work, "Healed", None).await.id();
        assert_eq!(app.indexer.pending().await.unwrap(), 2);

        app.index.set_available(true);
        app.index.reject_writes_for(&missed, true);
        let report = app.indexer.reindex_all(&app.repo).await.unwrap();

        assert_eq!(report.indexed, 1);
        assert_eq!(report.failed, 1);
        assert!(app.index.inner.get(&healed).await.is_some());
        assert!(app.index.inner.get(&missed).await.is_none());
        // The original entry plus one recorded by the rebuild.
        assert_eq!(app.indexer.pending().await.unwrap(), 2);

        app.index.reject_writes_for(&missed, false);
        let drained = app.indexer.drain_outbox(&app.repo).await.unwrap();

        assert_eq!(drained.delivered, 1);
        assert_eq!(app.indexer.pending().await.unwrap(), 0);
        assert_eq!(app.index.inner.get(&missed).await.unwrap().title, "Missed");
    }

    #[tokio::test]
    async fn corrupt_notes_are_recorded_for_retry() {
        let app = TestApp::spawn().await;
        let corrupt = EntityId::generate().to_string();
        let mut tx = app.repo.store().begin();
        tx.add_to_set("notes", corrupt.as_str(), 0);
        app.repo.store().commit(tx).await.unwrap();

        let report = app.indexer.reindex_all(&app.repo).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(app.indexer.pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn entries_for_unknown_notes_are_discarded() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        app.index.set_available(false);
        app.create_note(&work, "Doomed", None).await;

        // Forget the note's membership so it no longer resolves.
        entity_set::Entity::delete_many()
            .filter(entity_set::Column::SetName.eq("notes"))
            .exec(&app.db)
            .await
            .unwrap();

        app.index.set_available(true);
        let report = app.indexer.drain_outbox(&app.repo).await.unwrap();

        assert_eq!(report.discarded, 1);
        assert_eq!(app.indexer.pending().await.unwrap(), 0);
    }
}
