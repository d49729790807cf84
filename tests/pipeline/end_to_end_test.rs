#[cfg(test)]
mod tests {
    use exiftags::stream::{BodyChunk, StreamState, TagStream};
    use exiftags::tool::ToolLauncher;
    use exiftags::TagRecord;
    use serde::Deserialize;
    use tokio::sync::mpsc;

    #[derive(Deserialize)]
    struct Document {
        tags: Vec<TagRecord>,
    }

    fn fixture(name: &str) -> String {
        format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    fn cat(name: &str) -> TagStream {
        let run = ToolLauncher::new("cat", [fixture(name)]).launch().unwrap();
        TagStream::spawn(run)
    }

    async fn collect(mut chunks: mpsc::Receiver<BodyChunk>) -> (String, usize, bool) {
        let mut body = Vec::new();
        let mut count = 0;
        while let Some(chunk) = chunks.recv().await {
            match chunk {
                Ok(bytes) => {
                    body.extend_from_slice(&bytes);
                    count += 1;
                }
                Err(_) => return (String::from_utf8(body).unwrap(), count, true),
            }
        }
        (String::from_utf8(body).unwrap(), count, false)
    }

    #[tokio::test]
    async fn test_make_model_document() {
        let stream = cat("listx_make_model.xml");

        let (body, chunks, aborted) = collect(stream.chunks).await;

        assert!(!aborted);
        // two records plus the closing token
        assert_eq!(chunks, 3);
        insta::assert_snapshot!(body, @r#"{"tags":[{"writable":true,"path":"EXIF:Make","group":"EXIF","type":"string","description":{"en":"Manufacturer"}},{"writable":false,"path":"EXIF:Model","group":"EXIF","type":"string","description":{}}]}"#);

        let outcome = stream.outcome.await.unwrap();
        assert!(outcome.is_completed());
        assert_eq!(outcome.records, 2);
    }

    #[tokio::test]
    async fn test_records_follow_fragment_order() {
        let stream = cat("listx_mixed.xml");

        let (body, _, aborted) = collect(stream.chunks).await;
        assert!(!aborted);

        let doc: Document = serde_json::from_str(&body).unwrap();
        let paths: Vec<&str> = doc.tags.iter().map(|t| t.path.as_str()).collect();
        assert_eq!(paths, ["File:FileSize", "XMP-dc:Title", "IPTC:Keywords"]);

        // single-line table
        assert_eq!(doc.tags[0].description["en"], "File Size");
        assert!(!doc.tags[0].writable);

        // duplicate language code keeps the later text
        assert_eq!(doc.tags[1].description.len(), 2);
        assert_eq!(doc.tags[1].description["en"], "Document Title");
        assert_eq!(doc.tags[1].description["de"], "Titel");
        assert_eq!(doc.tags[1].tag_type, "lang-alt");

        assert_eq!(doc.tags[2].description["fr"], "Mots-clés");
    }

    #[tokio::test]
    async fn test_malformed_fragment_truncates_document() {
        let stream = cat("listx_malformed.xml");

        let (body, _, aborted) = collect(stream.chunks).await;

        assert!(aborted);
        assert!(body.starts_with(r#"{"tags":[{"writable":true,"path":"EXIF:Make""#));
        assert!(!body.ends_with("]}"));
        assert!(!body.contains("Software"));
        assert!(serde_json::from_str::<serde_json::Value>(&body).is_err());

        let outcome = stream.outcome.await.unwrap();
        assert!(matches!(outcome.state, StreamState::Failed(_)));
        assert_eq!(outcome.records, 1);
    }

    #[tokio::test]
    async fn test_nonzero_tool_exit_after_complete_listing() {
        let script = format!("cat '{}'; exit 2", fixture("listx_make_model.xml"));
        let run = ToolLauncher::new("sh", ["-c", script.as_str()])
            .launch()
            .unwrap();
        let stream = TagStream::spawn(run);

        let (body, _, aborted) = collect(stream.chunks).await;

        // the exit status only gets logged; the document is already complete
        assert!(!aborted);
        assert!(body.ends_with("]}"));
        let exit = stream.exit.await.unwrap().unwrap();
        assert_eq!(exit.status.code(), Some(2));
    }
}
