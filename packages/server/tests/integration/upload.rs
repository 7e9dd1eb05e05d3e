use crate::common::{TestApp, routes};

const PDF_TEXT: &[u8] = b"%PDF-1.4 quarterly revenue report";

mod file_import {
    use super::*;

    #[tokio::test]
    async fn pdf_becomes_a_note_with_attachment() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;

        let res = app.upload(&work, &[("scan.pdf", PDF_TEXT)]).await;

        assert_eq!(res.status, 201, "{}", res.text);
        let notes = res.body.as_array().unwrap();
        assert_eq!(notes.len(), 1);
        let note = &notes[0];
        assert_eq!(note["title"], "scan.pdf");
        assert_eq!(note["body"], "");
        assert_eq!(note["notebook"], work.as_str());
        assert_eq!(note["history"].as_array().unwrap().len(), 1);

        let attachment = &note["attachment"];
        assert_eq!(note["attachment_id"], attachment["id"]);
        assert_eq!(attachment["type"], "application/pdf");
        assert_eq!(attachment["filename"], "scan.pdf");
        assert_eq!(attachment["size"].as_u64().unwrap(), PDF_TEXT.len() as u64);
        assert!(attachment["ref"].as_str().is_some());
        assert!(attachment["content_ref"].as_str().is_some());
    }

    #[tokio::test]
    async fn attachment_metadata_is_readable() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let res = app.upload(&work, &[("scan.pdf", PDF_TEXT)]).await;
        let uploaded = &res.body[0]["attachment"];

        let fetched = app
            .get(&routes::attachment(uploaded["id"].as_str().unwrap()))
            .await;

        assert_eq!(fetched.status, 200);
        assert_eq!(&fetched.body, uploaded);
    }

    #[tokio::test]
    async fn fetched_note_includes_attachment() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let res = app.upload(&work, &[("scan.pdf", PDF_TEXT)]).await;
        let note_id = res.body[0]["id"].as_str().unwrap().to_string();

        let fetched = app.get(&routes::note(&note_id)).await;

        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.body["attachment"], res.body[0]["attachment"]);
    }

    #[tokio::test]
    async fn same_file_twice_shares_blobs() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;

        let before = app.blobs.puts();
        let first = app.upload(&work, &[("scan.pdf", PDF_TEXT)]).await;
        let after_first = app.blobs.puts();
        let second = app.upload(&work, &[("scan.pdf", PDF_TEXT)]).await;

        // Content plus extracted text on the first upload, nothing new after.
        assert_eq!(after_first, before + 2);
        assert_eq!(app.blobs.puts(), after_first);

        let a = &first.body[0];
        let b = &second.body[0];
        assert_ne!(a["id"], b["id"]);
        assert_ne!(a["attachment_id"], b["attachment_id"]);
        assert_eq!(a["attachment"]["ref"], b["attachment"]["ref"]);
    }

    #[tokio::test]
    async fn several_files_in_one_request() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;

        let res = app
            .upload(&work, &[("a.txt", b"alpha"), ("b.png", b"\x89PNG")])
            .await;

        assert_eq!(res.status, 201);
        let notes = res.body.as_array().unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0]["attachment"]["type"], "text/plain");
        assert_eq!(notes[1]["attachment"]["type"], "image/png");
        assert!(notes[1]["attachment"].get("content_ref").is_none());
    }

    #[tokio::test]
    async fn extracted_text_is_searchable() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let res = app.upload(&work, &[("scan.pdf", PDF_TEXT)]).await;
        let note_id = res.body[0]["id"].as_str().unwrap().to_string();

        let ids = app.listed_ids(&routes::notes_matching("revenue")).await;

        assert_eq!(ids, vec![note_id]);
    }
}

mod upload_errors {
    use super::*;

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;

        let res = app.upload(&work, &[]).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_notebook_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .upload("0123456789abcdef0123456789abcdef", &[("scan.pdf", PDF_TEXT)])
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }
}

mod attachment_download {
    use super::*;

    async fn uploaded_note(app: &TestApp) -> String {
        let work = app.create_notebook("Work").await;
        let res = app.upload(&work, &[("scan.pdf", PDF_TEXT)]).await;
        res.body[0]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn streams_inline_by_default() {
        let app = TestApp::spawn().await;
        let note_id = uploaded_note(&app).await;

        let res = app
            .client
            .get(app.url(&routes::note_pdf(&note_id)))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), 200);
        let headers = res.headers().clone();
        assert_eq!(headers["content-type"], "application/pdf");
        assert!(
            headers["content-disposition"]
                .to_str()
                .unwrap()
                .starts_with("inline; filename=\"scan.pdf\"")
        );
        assert!(headers.contains_key("etag"));
        assert_eq!(res.bytes().await.unwrap().as_ref(), PDF_TEXT);
    }

    #[tokio::test]
    async fn dl_flag_requests_a_download() {
        let app = TestApp::spawn().await;
        let note_id = uploaded_note(&app).await;

        let res = app
            .client
            .get(app.url(&format!("{}?dl=1", routes::note_pdf(&note_id))))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), 200);
        assert!(
            res.headers()["content-disposition"]
                .to_str()
                .unwrap()
                .starts_with("attachment;")
        );
    }

    #[tokio::test]
    async fn matching_etag_is_not_modified() {
        let app = TestApp::spawn().await;
        let note_id = uploaded_note(&app).await;
        let url = app.url(&routes::note_pdf(&note_id));

        let first = app.client.get(&url).send().await.unwrap();
        let etag = first.headers()["etag"].clone();

        let second = app
            .client
            .get(&url)
            .header("If-None-Match", etag)
            .send()
            .await
            .unwrap();

        assert_eq!(second.status(), 304);
    }

    #[tokio::test]
    async fn note_without_attachment_is_not_found() {
        let app = TestApp::spawn().await;
        let work = app.create_notebook("Work").await;
        let id = app.create_note(&work, "Plain", None).await.id();

        let res = app.get(&routes::note_pdf(&id)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");
    }
}
