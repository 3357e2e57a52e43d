//! Image embedding through managed assets.

mod common;

use std::path::PathBuf;

use common::{MockTransport, asset, character, client, page, url};
use kanka_core::manager::embed::content_hash;
use kanka_core::{EmbedOptions, EmbeddedImages, Fields, Method};
use serde_json::json;
use tempfile::TempDir;

const CDN: &str = "https://th.kanka.io/w/1a2b3c4d-0000-4000-8000-00000000000a/map.png";
const OLD_CDN: &str = "https://th.kanka.io/w/9b2f6c1e-1111-4222-8333-444455556666/old.png";

fn image_file(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_uploads_then_patches_entry() {
    let dir = tempfile::tempdir().unwrap();
    let map = image_file(&dir, "map.png", b"map-v1");
    let hash = content_hash(b"map-v1");

    let transport = MockTransport::new();
    let mut created = character(1, 100, "Aria");
    created["entry"] = json!(r#"<img src="map">"#);
    transport.push_data(created.clone());
    transport.push_data(asset(10, &format!("map:{}", hash), CDN));
    let mut patched = created;
    patched["entry"] = json!(format!(r#"<img src="{}">"#, CDN));
    transport.push_data(patched);
    let client = client(&transport);

    let (aria, outcome) = client
        .characters()
        .create_with_images(
            Fields::new()
                .set("name", "Aria")
                .set("entry", r#"<img src="map">"#),
            &EmbeddedImages::new().with("map", &map),
        )
        .await
        .unwrap();

    assert_eq!(aria.entry(), Some(format!(r#"<img src="{}">"#, CDN).as_str()));
    assert_eq!(outcome.uploaded.len(), 1);
    assert_eq!(outcome.html, format!(r#"<img src="{}">"#, CDN));

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);

    assert_eq!(requests[1].url, url("entities/100/entity_assets"));
    let form = requests[1].multipart().unwrap();
    assert_eq!(form.field("type_id"), Some("1"));
    assert_eq!(form.field("name"), Some(format!("map:{}", hash).as_str()));
    assert_eq!(form.files[0].field, "file");
    assert_eq!(form.files[0].file_name, "map.png");
    assert_eq!(form.files[0].bytes, b"map-v1");

    assert_eq!(requests[2].method, Method::Patch);
    assert_eq!(requests[2].url, url("characters/1"));
    assert_eq!(
        requests[2].json(),
        Some(&json!({ "entry": format!(r#"<img src="{}">"#, CDN) }))
    );
}

#[tokio::test]
async fn test_create_without_images_is_a_plain_create() {
    let transport = MockTransport::new();
    transport.push_data(character(1, 100, "Aria"));
    let client = client(&transport);

    let (_, outcome) = client
        .characters()
        .create_with_images(Fields::new().set("name", "Aria"), &EmbeddedImages::new())
        .await
        .unwrap();

    assert!(outcome.uploaded.is_empty());
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_failed_entry_patch_is_surfaced() {
    let dir = tempfile::tempdir().unwrap();
    let map = image_file(&dir, "map.png", b"map-v1");

    let transport = MockTransport::new();
    let mut created = character(1, 100, "Aria");
    created["entry"] = json!(r#"<img src="map">"#);
    transport.push_data(created);
    transport.push_data(asset(10, &format!("map:{}", content_hash(b"map-v1")), CDN));
    transport.push_json(500, json!({ "message": "Server Error" }));
    let client = client(&transport);

    let err = client
        .characters()
        .create_with_images(
            Fields::new()
                .set("name", "Aria")
                .set("entry", r#"<img src="map">"#),
            &EmbeddedImages::new().with("map", &map),
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn test_post_create_uploads_before_creating() {
    let dir = tempfile::tempdir().unwrap();
    let map = image_file(&dir, "map.png", b"map-v1");

    let transport = MockTransport::new();
    transport.push_data(asset(10, &format!("map:{}", content_hash(b"map-v1")), CDN));
    transport.push_data(json!({
        "id": 5,
        "entity_id": 100,
        "name": "Travels",
        "entry": format!(r#"<img src='{}'>"#, CDN),
    }));
    let client = client(&transport);

    let (post, _) = client
        .characters()
        .posts()
        .create_with_images(
            100,
            Fields::new()
                .set("name", "Travels")
                .set("entry", "<img src='map'>"),
            &EmbeddedImages::new().with("map", &map),
        )
        .await
        .unwrap();

    assert_eq!(post.id(), Some(5));
    let requests = transport.requests();
    assert_eq!(requests[0].url, url("entities/100/entity_assets"));
    assert_eq!(requests[1].url, url("entities/100/posts"));
    assert_eq!(
        requests[1].json(),
        Some(&json!({ "name": "Travels", "entry": format!(r#"<img src='{}'>"#, CDN) }))
    );
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_is_idempotent_and_cleans_orphans() {
    let dir = tempfile::tempdir().unwrap();
    let map = image_file(&dir, "map.png", b"map-v1");
    let hash = content_hash(b"map-v1");
    let rewritten = format!(r#"<img src="{}">"#, CDN);

    let transport = MockTransport::new();
    let mut current = character(1, 100, "Aria");
    current["entry"] = json!(rewritten);
    transport.push_data(current);
    transport.push_json(
        200,
        page(
            json!([
                asset(10, &format!("map:{}", hash), CDN),
                asset(11, "Battle map", "https://th.kanka.io/w/battle.png"),
                asset(12, "old:0123456789ab", OLD_CDN),
            ]),
            1,
            1,
        ),
    );
    transport.push_no_content();
    transport.push_json(404, json!({ "message": "Not found." }));
    let client = client(&transport);

    let aria = client.characters().get(1, false).await.unwrap();
    let (updated, outcome) = client
        .characters()
        .update_with_images(
            &aria,
            Fields::new().set("entry", r#"<img src="map">"#),
            &EmbeddedImages::new().with("map", &map),
            EmbedOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(updated, aria);
    assert_eq!(outcome.html, rewritten);
    assert!(outcome.uploaded.is_empty());
    assert_eq!(outcome.reused.len(), 1);
    assert_eq!(outcome.deleted.len(), 1);
    assert_eq!(outcome.deleted[0].id(), Some(12));

    let requests = transport.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[1].url, url("entities/100/entity_assets"));
    assert_eq!(requests[1].query_param("limit"), Some("100"));
    assert_eq!(requests[2].method, Method::Delete);
    assert_eq!(requests[2].url, url("entities/100/entity_assets/12"));
    assert_eq!(
        requests[3].url,
        url("images/9b2f6c1e-1111-4222-8333-444455556666")
    );
}

#[tokio::test]
async fn test_changed_content_replaces_asset() {
    let dir = tempfile::tempdir().unwrap();
    let map = image_file(&dir, "map.png", b"map-v2");
    let hash = content_hash(b"map-v2");
    let new_cdn = "https://th.kanka.io/w/map-v2.png";

    let transport = MockTransport::new();
    transport.push_data(json!({ "id": 1, "entity_id": 100, "name": "Aria", "entry": "<img src=\"map\">" }));
    transport.push_json(
        200,
        page(json!([asset(10, "map:000000000000", "https://th.kanka.io/w/map.png")]), 1, 1),
    );
    transport.push_no_content();
    transport.push_data(asset(13, &format!("map:{}", hash), new_cdn));
    transport.push_data(json!({
        "id": 1,
        "entity_id": 100,
        "name": "Aria",
        "entry": format!(r#"<img src="{}">"#, new_cdn),
    }));
    let client = client(&transport);

    // A bare id is resolved with a fetch; the entry comes from that record.
    let (_, outcome) = client
        .characters()
        .update_with_images(
            1,
            Fields::new(),
            &EmbeddedImages::new().with("map", &map),
            EmbedOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.deleted[0].id(), Some(10));
    assert_eq!(outcome.uploaded[0].id(), Some(13));

    let requests = transport.requests();
    assert_eq!(requests.len(), 5);
    assert_eq!(requests[0].url, url("characters/1"));
    assert_eq!(requests[2].url, url("entities/100/entity_assets/10"));
    assert_eq!(
        requests[3].multipart().unwrap().field("name"),
        Some(format!("map:{}", hash).as_str())
    );
    assert_eq!(
        requests[4].json(),
        Some(&json!({ "entry": format!(r#"<img src="{}">"#, new_cdn) }))
    );
}

#[tokio::test]
async fn test_gallery_cleanup_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let map = image_file(&dir, "map.png", b"map-v1");
    let hash = content_hash(b"map-v1");

    let transport = MockTransport::new();
    let mut current = character(1, 100, "Aria");
    current["entry"] = json!(format!(r#"<img src="{}">"#, CDN));
    transport.push_data(current);
    transport.push_json(
        200,
        page(
            json!([
                asset(10, &format!("map:{}", hash), CDN),
                asset(12, "old:0123456789ab", OLD_CDN),
            ]),
            1,
            1,
        ),
    );
    transport.push_no_content();
    let client = client(&transport);

    let aria = client.characters().get(1, false).await.unwrap();
    client
        .characters()
        .update_with_images(
            &aria,
            Fields::new().set("entry", r#"<img src="map">"#),
            &EmbeddedImages::new().with("map", &map),
            EmbedOptions {
                delete_gallery_images: false,
            },
        )
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].url, url("entities/100/entity_assets/12"));
}

#[tokio::test]
async fn test_reconciliation_reads_every_asset_page() {
    let dir = tempfile::tempdir().unwrap();
    let map = image_file(&dir, "map.png", b"map-v1");
    let hash = content_hash(b"map-v1");

    let transport = MockTransport::new();
    let mut current = character(1, 100, "Aria");
    current["entry"] = json!(format!(r#"<img src="{}">"#, CDN));
    transport.push_data(current);
    transport.push_json(200, page(json!([asset(11, "Battle map", CDN)]), 1, 2));
    transport.push_json(200, page(json!([asset(10, &format!("map:{}", hash), CDN)]), 2, 2));
    let client = client(&transport);

    let aria = client.characters().get(1, false).await.unwrap();
    let (_, outcome) = client
        .characters()
        .update_with_images(
            &aria,
            Fields::new().set("entry", r#"<img src="map">"#),
            &EmbeddedImages::new().with("map", &map),
            EmbedOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.reused[0].id(), Some(10));
    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].query_param("page"), Some("2"));
    // The asset listing does not disturb the manager's pagination.
    assert_eq!(client.characters().assets().pagination().current_page, None);
}

#[tokio::test]
async fn test_long_placeholders_are_matched_after_truncation() {
    let dir = tempfile::tempdir().unwrap();
    let map = image_file(&dir, "map.png", b"map-v1");
    let hash = content_hash(b"map-v1");
    let placeholder = "a-very-long-placeholder-name-for-the-world-map";
    let truncated: String = placeholder.chars().take(32).collect();

    let transport = MockTransport::new();
    let mut current = character(1, 100, "Aria");
    current["entry"] = json!(format!(r#"<img src="{}">"#, CDN));
    transport.push_data(current);
    transport.push_json(
        200,
        page(json!([asset(10, &format!("{}:{}", truncated, hash), CDN)]), 1, 1),
    );
    let client = client(&transport);

    let aria = client.characters().get(1, false).await.unwrap();
    let (_, outcome) = client
        .characters()
        .update_with_images(
            &aria,
            Fields::new().set("entry", format!(r#"<img src="{}">"#, placeholder)),
            &EmbeddedImages::new().with(placeholder, &map),
            EmbedOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.reused.len(), 1);
    assert!(outcome.deleted.is_empty());
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn test_placeholders_sharing_a_prefix_keep_their_assets() {
    let dir = tempfile::tempdir().unwrap();
    let first_file = image_file(&dir, "first.png", b"first");
    let second_file = image_file(&dir, "second.png", b"second");
    let prefix = "x".repeat(32);
    let first = format!("{}-first", prefix);
    let second = format!("{}-second", prefix);
    let first_cdn = "https://th.kanka.io/w/first.png";
    let second_cdn = "https://th.kanka.io/w/second.png";
    let rewritten = format!(r#"<img src="{}"><img src="{}">"#, first_cdn, second_cdn);

    let transport = MockTransport::new();
    let mut current = character(1, 100, "Aria");
    current["entry"] = json!(rewritten);
    transport.push_data(current);
    transport.push_json(
        200,
        page(
            json!([
                asset(10, &format!("{}:{}", prefix, content_hash(b"first")), first_cdn),
                asset(11, &format!("{}:{}", prefix, content_hash(b"second")), second_cdn),
            ]),
            1,
            1,
        ),
    );
    let client = client(&transport);

    let aria = client.characters().get(1, false).await.unwrap();
    let (_, outcome) = client
        .characters()
        .update_with_images(
            &aria,
            Fields::new().set(
                "entry",
                format!(r#"<img src="{}"><img src="{}">"#, first, second),
            ),
            &EmbeddedImages::new()
                .with(first.as_str(), &first_file)
                .with(second.as_str(), &second_file),
            EmbedOptions::default(),
        )
        .await
        .unwrap();

    assert!(outcome.uploaded.is_empty());
    assert!(outcome.deleted.is_empty());
    assert_eq!(outcome.reused.len(), 2);
    assert_eq!(outcome.html, rewritten);
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn test_asset_without_url_leaves_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let map = image_file(&dir, "map.png", b"map-v1");
    let hash = content_hash(b"map-v1");

    let transport = MockTransport::new();
    let mut created = character(1, 100, "Aria");
    created["entry"] = json!(r#"<img src="map">"#);
    transport.push_data(created);
    transport.push_data(json!({
        "id": 10,
        "entity_id": 100,
        "name": format!("map:{}", hash),
        "type_id": 1,
    }));
    let client = client(&transport);

    let (_, outcome) = client
        .characters()
        .create_with_images(
            Fields::new().set("name", "Aria").set("entry", r#"<img src="map">"#),
            &EmbeddedImages::new().with("map", &map),
        )
        .await
        .unwrap();

    assert_eq!(outcome.uploaded.len(), 1);
    assert_eq!(outcome.unresolved, vec!["map".to_string()]);
    assert_eq!(outcome.html, r#"<img src="map">"#);
    // Nothing changed, so the entry is not patched.
    assert_eq!(transport.request_count(), 2);
}
