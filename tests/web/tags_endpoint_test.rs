#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use exiftags::tool::ToolLauncher;
    use exiftags::web::{router, AppState};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn fixture(name: &str) -> String {
        format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    fn app(launcher: ToolLauncher) -> axum::Router {
        router(Arc::new(AppState::new(launcher)))
    }

    fn get_tags() -> Request<Body> {
        Request::builder().uri("/tags").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_get_tags_streams_document() {
        let app = app(ToolLauncher::new("cat", [fixture("listx_make_model.xml")]));

        let response = app.oneshot(get_tags()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let tags = value["tags"].as_array().unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0]["path"], "EXIF:Make");
        assert_eq!(tags[0]["description"]["en"], "Manufacturer");
        assert_eq!(tags[1]["path"], "EXIF:Model");
        assert_eq!(tags[1]["writable"], false);
    }

    #[tokio::test]
    async fn test_get_tags_empty_listing() {
        let app = app(ToolLauncher::new("sh", ["-c", "printf '<taginfo>\\n</taginfo>\\n'"]));

        let response = app.oneshot(get_tags()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"{\"tags\":[]}");
    }

    #[tokio::test]
    async fn test_non_utf8_comment_outside_tables_is_ignored() {
        let app = app(ToolLauncher::new(
            "sh",
            [
                "-c",
                r#"printf '<!-- caf\351 -->\n<table name="A"><tag name="X" type="s" writable="true"/></table>\n'"#,
            ],
        ));

        let response = app.oneshot(get_tags()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"tags": [{
                "writable": true,
                "path": "A:X",
                "group": "A",
                "type": "s",
                "description": {}
            }]})
        );
    }

    #[tokio::test]
    async fn test_missing_tool_is_internal_error() {
        let app = app(ToolLauncher::new(
            "/nonexistent/exiftool-does-not-exist",
            ["-listx"],
        ));

        let response = app.oneshot(get_tags()).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, serde_json::json!({"error": "internal server error"}));
    }

    #[tokio::test]
    async fn test_failure_before_first_record_is_internal_error() {
        let app = app(ToolLauncher::new(
            "sh",
            ["-c", "printf \"<table name='EXIF'><tag name='Make'></table>\\n\""],
        ));

        let response = app.oneshot(get_tags()).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_ends_body_early() {
        let app = app(ToolLauncher::new("cat", [fixture("listx_malformed.xml")]));

        let response = app.oneshot(get_tags()).await.unwrap();

        // the first record was already ready, so the status is committed
        assert_eq!(response.status(), StatusCode::OK);
        let mut body = response.into_body();
        let first = body.frame().await.unwrap().unwrap().into_data().unwrap();
        assert!(first.starts_with(b"{\"tags\":["));
        assert!(body.frame().await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_get_tags_unknown_route() {
        let app = app(ToolLauncher::new("cat", [fixture("listx_make_model.xml")]));

        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_client_disconnect_terminates_tool() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("tool.pid");
        let script = format!(
            "echo $$ > '{}'; while :; do \
             printf '%s\\n' \"<table name='EXIF'><tag name='Make' type='string' writable='true'/></table>\"; \
             sleep 0.05; done",
            pid_file.display()
        );
        let app = app(ToolLauncher::new("sh", ["-c", script.as_str()]));

        let response = app.oneshot(get_tags()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut body = response.into_body();
        let first = body.frame().await.unwrap().unwrap().into_data().unwrap();
        assert!(first.starts_with(b"{\"tags\":["));
        let second = body.frame().await.unwrap().unwrap().into_data().unwrap();
        assert!(second.starts_with(b","));

        // the client goes away mid-stream
        drop(body);

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let proc_dir = format!("/proc/{}", pid.trim());
        let gone = async {
            while Path::new(&proc_dir).exists() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), gone)
            .await
            .expect("tool process should be killed and reaped after disconnect");
    }
}
