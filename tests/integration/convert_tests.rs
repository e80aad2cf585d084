//! Conversion integration tests.
//!
//! Tests verify:
//! - Single-file responses (raw bytes, Content-Type, Content-Disposition)
//! - Batch responses (ZIP archive, entry naming, collision renames)
//! - Resize behavior (applied, enlargement skipped)
//! - ICO and SVG special-case outputs
//! - Conversion failures map to 500

use std::io::{Cursor, Read};

use axum::http::{header, StatusCode};
use image::ImageFormat;
use tower::ServiceExt;

use super::test_utils::{
    body_bytes, body_json, convert_request, default_router, jpeg_image, png_image, MultipartForm,
};

// =============================================================================
// Single-File Responses
// =============================================================================

#[tokio::test]
async fn test_single_file_webp() {
    let router = default_router();

    let form = MultipartForm::new()
        .text("format", "webp")
        .file("files", "photo.png", "image/png", &png_image(32, 24));

    let response = router.oneshot(convert_request(form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/webp"
    );

    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(disposition, "attachment; filename=\"photo.webp\"");

    // The body must actually be WebP.
    let body = body_bytes(response).await;
    assert_eq!(
        image::guess_format(&body).unwrap(),
        ImageFormat::WebP,
        "response body should be WebP"
    );
}

#[tokio::test]
async fn test_jpg_alias_mime_and_extension() {
    let router = default_router();

    let form = MultipartForm::new()
        .text("format", "jpg")
        .file("files", "photo.png", "image/png", &png_image(16, 16));

    let response = router.oneshot(convert_request(form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // MIME maps to the canonical subtype, the extension keeps the alias.
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/jpeg"
    );
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.ends_with("photo.jpg\""), "got {disposition}");
}

#[tokio::test]
async fn test_filename_with_spaces_is_encoded() {
    let router = default_router();

    let form = MultipartForm::new()
        .text("format", "png")
        .file("files", "my photo.jpg", "image/jpeg", &jpeg_image(16, 16));

    let response = router.oneshot(convert_request(form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(disposition, "attachment; filename=\"my%20photo.png\"");
}

#[tokio::test]
async fn test_same_format_preserves_dimensions() {
    let router = default_router();

    let form = MultipartForm::new()
        .text("format", "png")
        .file("files", "a.png", "image/png", &png_image(120, 90));

    let response = router.oneshot(convert_request(form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_bytes(response).await;
    let img = image::load_from_memory(&body).unwrap();
    assert_eq!((img.width(), img.height()), (120, 90));
}

// =============================================================================
// Resize Behavior
// =============================================================================

#[tokio::test]
async fn test_resize_applied() {
    let router = default_router();

    let form = MultipartForm::new()
        .text("format", "png")
        .text("width", "50")
        .text("height", "40")
        .file("files", "a.png", "image/png", &png_image(100, 80));

    let response = router.oneshot(convert_request(form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_bytes(response).await;
    let img = image::load_from_memory(&body).unwrap();
    assert_eq!((img.width(), img.height()), (50, 40));
}

#[tokio::test]
async fn test_enlarging_resize_skipped() {
    let router = default_router();

    // Requested dimensions exceed the source: resize is skipped entirely.
    let form = MultipartForm::new()
        .text("format", "png")
        .text("width", "200")
        .text("height", "200")
        .file("files", "a.png", "image/png", &png_image(10, 10));

    let response = router.oneshot(convert_request(form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_bytes(response).await;
    let img = image::load_from_memory(&body).unwrap();
    assert_eq!((img.width(), img.height()), (10, 10));
}

#[tokio::test]
async fn test_quality_accepted_for_jpeg() {
    let router = default_router();

    let form = MultipartForm::new()
        .text("format", "jpeg")
        .text("quality", "40")
        .file("files", "a.png", "image/png", &png_image(64, 64));

    let response = router.oneshot(convert_request(form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_bytes(response).await;
    assert_eq!(image::guess_format(&body).unwrap(), ImageFormat::Jpeg);
}

// =============================================================================
// Batch / Archive Responses
// =============================================================================

#[tokio::test]
async fn test_batch_returns_zip_archive() {
    let router = default_router();

    let form = MultipartForm::new()
        .text("format", "png")
        .file("files", "a.jpg", "image/jpeg", &jpeg_image(20, 20))
        .file("files", "b.jpg", "image/jpeg", &jpeg_image(24, 24))
        .file("files", "c.jpg", "image/jpeg", &jpeg_image(28, 28));

    let response = router.oneshot(convert_request(form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/zip"
    );
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(disposition, "attachment; filename=converted_images.zip");

    // The streamed body must reassemble into a readable archive with one
    // entry per uploaded file, in renamed-extension form.
    let body = body_bytes(response).await;
    let mut archive = zip::ZipArchive::new(Cursor::new(body.to_vec())).unwrap();
    assert_eq!(archive.len(), 3);

    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["a.png", "b.png", "c.png"]);

    // Every entry must decode as the target format.
    for name in &names {
        let mut entry_bytes = Vec::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_end(&mut entry_bytes)
            .unwrap();
        assert_eq!(
            image::guess_format(&entry_bytes).unwrap(),
            ImageFormat::Png,
            "entry {name} should be PNG"
        );
    }
}

#[tokio::test]
async fn test_archive_collision_renames() {
    let router = default_router();

    // Same basename with different source extensions collapses onto the
    // same output name; later entries get _N suffixes in submission order.
    let form = MultipartForm::new()
        .text("format", "webp")
        .file("files", "photo.jpg", "image/jpeg", &jpeg_image(16, 16))
        .file("files", "photo.png", "image/png", &png_image(16, 16));

    let response = router.oneshot(convert_request(form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_bytes(response).await;
    let archive = zip::ZipArchive::new(Cursor::new(body.to_vec())).unwrap();

    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["photo.webp", "photo_1.webp"]);
}

#[tokio::test]
async fn test_archive_preserves_submission_order() {
    let router = default_router();

    let form = MultipartForm::new()
        .text("format", "png")
        .file("files", "zebra.jpg", "image/jpeg", &jpeg_image(16, 16))
        .file("files", "apple.jpg", "image/jpeg", &jpeg_image(16, 16));

    let response = router.oneshot(convert_request(form)).await.unwrap();
    let body = body_bytes(response).await;
    let mut archive = zip::ZipArchive::new(Cursor::new(body.to_vec())).unwrap();

    // Entries appear in upload order, not sorted.
    let first = archive.by_index(0).unwrap().name().to_string();
    let second = archive.by_index(1).unwrap().name().to_string();
    assert_eq!(first, "zebra.png");
    assert_eq!(second, "apple.png");
}

// =============================================================================
// Special-Case Formats
// =============================================================================

#[tokio::test]
async fn test_ico_output() {
    let router = default_router();

    let form = MultipartForm::new()
        .text("format", "ico")
        .file("files", "logo.png", "image/png", &png_image(64, 64));

    let response = router.oneshot(convert_request(form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/ico"
    );

    // ICONDIR magic: reserved 0, type 1.
    let body = body_bytes(response).await;
    assert_eq!(&body[0..4], &[0x00, 0x00, 0x01, 0x00]);
}

#[tokio::test]
async fn test_svg_embeds_original_when_untouched() {
    let router = default_router();

    let source = png_image(24, 24);
    let form = MultipartForm::new()
        .text("format", "svg")
        .file("files", "pic.png", "image/png", &source);

    let response = router.oneshot(convert_request(form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/svg"
    );

    let body = body_bytes(response).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.starts_with("<svg"), "should be an SVG document");
    assert!(
        text.contains("data:image/png;base64,"),
        "should embed the source as a PNG data URI"
    );
    assert!(text.contains("width=\"24\""), "should carry source dimensions");
}

#[tokio::test]
async fn test_svg_with_resize_reencodes_as_png() {
    let router = default_router();

    let form = MultipartForm::new()
        .text("format", "svg")
        .text("width", "12")
        .text("height", "12")
        .file("files", "pic.jpg", "image/jpeg", &jpeg_image(48, 48));

    let response = router.oneshot(convert_request(form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_bytes(response).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    // A transformed raster is re-encoded as PNG before embedding.
    assert!(text.contains("data:image/png;base64,"));
    assert!(text.contains("width=\"12\""));
}

// =============================================================================
// Conversion Failures
// =============================================================================

#[tokio::test]
async fn test_unsupported_format_is_500() {
    let router = default_router();

    let form = MultipartForm::new()
        .text("format", "heic")
        .file("files", "a.png", "image/png", &png_image(8, 8));

    let response = router.oneshot(convert_request(form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["error"], "conversion_failed");
    assert_eq!(json["message"], "Image conversion failed");
}

#[tokio::test]
async fn test_undecodable_file_is_500() {
    let router = default_router();

    let form = MultipartForm::new()
        .text("format", "png")
        .file("files", "junk.png", "image/png", b"this is not an image");

    let response = router.oneshot(convert_request(form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["error"], "conversion_failed");
}

#[tokio::test]
async fn test_one_bad_file_fails_whole_batch() {
    let router = default_router();

    // All-or-nothing: a single undecodable file aborts the batch.
    let form = MultipartForm::new()
        .text("format", "png")
        .file("files", "good.jpg", "image/jpeg", &jpeg_image(16, 16))
        .file("files", "bad.jpg", "image/jpeg", b"garbage");

    let response = router.oneshot(convert_request(form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
