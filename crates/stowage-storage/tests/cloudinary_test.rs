//! Cloudinary backend against a mocked upload API.

use bytes::Bytes;
use mockito::{Matcher, Server};
use serde_json::json;
use stowage_core::{
    CloudinaryConfig, FileType, NewUploadedFile, StorageBackend, UploadOptions, UploadedFile,
    UrlOptions,
};
use stowage_storage::{CloudinaryStorage, Storage, StorageError};

fn storage(server: &Server) -> CloudinaryStorage {
    CloudinaryStorage::new(
        CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            api_url: server.url(),
            delivery_url: "https://res.cloudinary.com".to_string(),
        },
        reqwest::Client::new(),
    )
}

fn stored(file_type: FileType, public_id: &str, url: &str, resource_type: Option<&str>) -> UploadedFile {
    let mut metadata = stowage_core::Metadata::new();
    if let Some(resource_type) = resource_type {
        metadata.insert("resource_type".into(), json!(resource_type));
    }
    NewUploadedFile::from_upload(
        StorageBackend::Cloudinary,
        "cat.jpg",
        file_type,
        1024,
        None,
        stowage_core::UploadResult {
            public_url: url.to_string(),
            secure_url: Some(url.to_string()),
            native_id: public_id.to_string(),
            metadata,
        },
    )
    .into_uploaded_file()
}

#[tokio::test]
async fn upload_image_records_provider_metadata() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1_1/demo/auto/upload")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("images/cat_req-1".to_string()),
            Matcher::Regex("q_auto:good/f_auto".to_string()),
            Matcher::Regex("signature".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "public_id": "images/cat_req-1",
                "version": 1700000000u64,
                "width": 640,
                "height": 480,
                "format": "jpg",
                "resource_type": "image",
                "bytes": 1024,
                "url": "http://res.cloudinary.com/demo/image/upload/v1/images/cat_req-1.jpg",
                "secure_url": "https://res.cloudinary.com/demo/image/upload/v1/images/cat_req-1.jpg"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let result = storage(&server)
        .upload(
            Bytes::from_static(b"jpeg bytes"),
            "cat.jpg",
            FileType::Image,
            &UploadOptions::with_request_id(Some("req-1".to_string())),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.native_id, "images/cat_req-1");
    assert_eq!(
        result.public_url,
        "https://res.cloudinary.com/demo/image/upload/v1/images/cat_req-1.jpg"
    );
    assert_eq!(result.secure_url.as_deref(), Some(result.public_url.as_str()));
    assert_eq!(result.metadata["width"], json!(640));
    assert_eq!(result.metadata["resource_type"], json!("image"));
    assert_eq!(result.metadata["cloudinary_version"], json!(1700000000u64));
}

#[tokio::test]
async fn uploaded_entry_resolves_to_its_public_url() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1_1/demo/auto/upload")
        .with_status(200)
        .with_body(
            json!({
                "public_id": "images/cat_anonymous",
                "resource_type": "image",
                "url": "http://res.cloudinary.com/demo/image/upload/v1/images/cat_anonymous.jpg",
                "secure_url": "https://res.cloudinary.com/demo/image/upload/v1/images/cat_anonymous.jpg"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let storage = storage(&server);
    let result = storage
        .upload(
            Bytes::from_static(b"jpeg bytes"),
            "cat.jpg",
            FileType::Image,
            &UploadOptions::default(),
        )
        .await
        .unwrap();
    let file = NewUploadedFile::from_upload(
        StorageBackend::Cloudinary,
        "cat.jpg",
        FileType::Image,
        10,
        None,
        result,
    )
    .into_uploaded_file();

    assert_eq!(
        storage.get_url(&file, &UrlOptions::default()).await,
        file.public_url
    );
}

#[tokio::test]
async fn upload_without_secure_url_falls_back_to_plain_url() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1_1/demo/auto/upload")
        .with_status(200)
        .with_body(
            json!({
                "public_id": "documents/a_anonymous",
                "resource_type": "raw",
                "url": "http://res.cloudinary.com/demo/raw/upload/a.pdf"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let result = storage(&server)
        .upload(
            Bytes::from_static(b"%PDF"),
            "a.pdf",
            FileType::Document,
            &UploadOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(result.public_url, "http://res.cloudinary.com/demo/raw/upload/a.pdf");
    assert!(result.secure_url.is_none());
}

#[tokio::test]
async fn upload_failure_names_backend() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1_1/demo/auto/upload")
        .with_status(401)
        .with_body(r#"{"error":{"message":"Invalid Signature"}}"#)
        .create_async()
        .await;

    let err = storage(&server)
        .upload(
            Bytes::from_static(b"%PDF"),
            "report.pdf",
            FileType::Document,
            &UploadOptions::default(),
        )
        .await
        .unwrap_err();

    match err {
        StorageError::UploadFailed { backend, message } => {
            assert_eq!(backend, StorageBackend::Cloudinary);
            assert!(message.contains("Invalid Signature"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn delete_uses_recorded_resource_type() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1_1/demo/video/destroy")
        .match_body(Matcher::Regex("public_id=videos%2Fclip_anonymous".to_string()))
        .with_status(200)
        .with_body(r#"{"result":"ok"}"#)
        .create_async()
        .await;

    let file = stored(
        FileType::Video,
        "videos/clip_anonymous",
        "https://res.cloudinary.com/demo/video/upload/clip.mp4",
        Some("video"),
    );
    assert!(storage(&server).delete(&file).await);
    mock.assert_async().await;
}

#[tokio::test]
async fn delete_reports_not_found_as_false() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1_1/demo/image/destroy")
        .with_status(200)
        .with_body(r#"{"result":"not found"}"#)
        .create_async()
        .await;

    let file = stored(FileType::Image, "images/cat_anonymous", "https://x/cat.jpg", None);
    assert!(!storage(&server).delete(&file).await);
}

#[tokio::test]
async fn delete_without_public_id_makes_no_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let file = stored(FileType::Image, "", "https://x/cat.jpg", None);
    assert!(!storage(&server).delete(&file).await);
    mock.assert_async().await;
}

#[tokio::test]
async fn get_url_transforms_images_only() {
    let server = Server::new_async().await;
    let storage = storage(&server);
    let options = UrlOptions {
        width: Some(300),
        height: Some(200),
        ..Default::default()
    };

    let image = stored(FileType::Image, "images/cat_anonymous", "https://x/cat.jpg", None);
    assert_eq!(
        storage.get_url(&image, &options).await,
        "https://res.cloudinary.com/demo/image/upload/c_fill,w_300,h_200/images/cat_anonymous"
    );
    assert_eq!(
        storage.get_url(&image, &UrlOptions::default()).await,
        "https://x/cat.jpg"
    );

    let document = stored(FileType::Document, "documents/a_anonymous", "https://x/a.pdf", None);
    assert_eq!(storage.get_url(&document, &options).await, "https://x/a.pdf");
}

#[tokio::test]
async fn download_fetches_delivery_url() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/demo/image/upload/cat.jpg")
        .with_status(200)
        .with_body("jpeg bytes")
        .create_async()
        .await;

    let url = format!("{}/demo/image/upload/cat.jpg", server.url());
    let file = stored(FileType::Image, "images/cat_anonymous", &url, None);

    let bytes = storage(&server).download(&file).await.unwrap();
    assert_eq!(&bytes[..], b"jpeg bytes");
}
