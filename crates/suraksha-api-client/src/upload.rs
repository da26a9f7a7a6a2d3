//! The three network steps of the signed upload flow.
//!
//! 1. `GET /upload/get-signed-url` issues an [`UploadTicket`].
//! 2. The file is POSTed as multipart form data straight to the ticket's
//!    `uploadUrl`, with the signed policy fields ahead of the file part.
//! 3. `POST /upload/verify-and-publish` makes the object public.
//!
//! Each step maps its failures to its own [`UploadError`] variant.

use reqwest::multipart::{Form, Part};
use suraksha_core::models::{
    SignedUrlRequest, SignedUrlResponse, UploadFile, UploadTicket, VerifyRequest, VerifyResponse,
};
use suraksha_core::{UploadError, UploadResult};

use crate::{ApiClient, ApiError};

pub const SIGNED_URL_PATH: &str = "/upload/get-signed-url";
pub const VERIFY_AND_PUBLISH_PATH: &str = "/upload/verify-and-publish";

/// Name of the multipart part carrying the file bytes. Must come last.
pub const FILE_FIELD: &str = "file";

/// Build the storage POST body: every policy field in ticket order, then the file.
pub fn build_storage_form(ticket: &UploadTicket, file: &UploadFile) -> UploadResult<Form> {
    let mut form = Form::new();
    for (name, value) in ticket.fields.iter() {
        form = form.text(name.to_string(), value.to_string());
    }

    let part = Part::bytes(file.data.to_vec())
        .file_name(file.file_name.clone())
        .mime_str(&file.content_type)
        .map_err(|e| {
            UploadError::InvalidInput(format!(
                "Invalid content type {}: {}",
                file.content_type, e
            ))
        })?;

    Ok(form.part(FILE_FIELD, part))
}

impl ApiClient {
    /// Ask the backend for a signed upload target.
    #[tracing::instrument(
        skip(self, request),
        fields(
            folder = %request.folder,
            file_name = %request.file_name,
            file_size = request.file_size,
            operation = "request_signed_url"
        )
    )]
    pub async fn request_signed_url(
        &self,
        request: &SignedUrlRequest,
    ) -> UploadResult<UploadTicket> {
        let response: SignedUrlResponse =
            self.get(SIGNED_URL_PATH, request)
                .await
                .map_err(|e: ApiError| UploadError::SignedUrl {
                    status: e.status(),
                    message: e.detail(),
                })?;

        let ticket = response.into_ticket()?;

        tracing::debug!(
            relative_path = %ticket.relative_path,
            field_count = ticket.fields.len(),
            "Received signed upload ticket"
        );

        Ok(ticket)
    }

    /// POST the file straight to storage using the ticket.
    #[tracing::instrument(
        skip(self, ticket, file),
        fields(
            relative_path = %ticket.relative_path,
            file_size = file.size(),
            operation = "upload_to_storage"
        )
    )]
    pub async fn upload_to_storage(
        &self,
        ticket: &UploadTicket,
        file: &UploadFile,
    ) -> UploadResult<()> {
        let form = build_storage_form(ticket, file)?;

        let status = self
            .post_form_external(&ticket.upload_url, form)
            .await
            .map_err(|e| UploadError::StorageUpload {
                status: e.status(),
                body: e.detail(),
            })?;

        tracing::debug!(status, "Storage accepted upload");
        Ok(())
    }

    /// Ask the backend to validate the stored object and make it public.
    #[tracing::instrument(skip(self), fields(operation = "verify_and_publish"))]
    pub async fn verify_and_publish(&self, relative_path: &str) -> UploadResult<VerifyResponse> {
        let body = VerifyRequest {
            relative_path: relative_path.to_string(),
        };

        let response: VerifyResponse = self
            .post_json(VERIFY_AND_PUBLISH_PATH, &body)
            .await
            .map_err(|e| UploadError::Verification {
                status: e.status(),
                message: e.detail(),
            })?;

        if !response.success {
            return Err(UploadError::Verification {
                status: None,
                message: response
                    .message
                    .unwrap_or_else(|| "Backend rejected the upload".to_string()),
            });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::time::Duration;
    use suraksha_core::models::PolicyFields;
    use suraksha_core::UploadFolder;

    fn client(server: &mockito::Server) -> ApiClient {
        ApiClient::new(&server.url(), Some("tok".to_string()), Duration::from_secs(5)).unwrap()
    }

    fn logo() -> UploadFile {
        UploadFile::from_bytes("logo.png", b"PNGDATA".to_vec())
    }

    #[tokio::test]
    async fn test_request_signed_url_sends_query_and_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", SIGNED_URL_PATH)
            .match_header("authorization", "Bearer tok")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("folder".into(), "institute-images".into()),
                Matcher::UrlEncoded("fileName".into(), "logo.png".into()),
                Matcher::UrlEncoded("contentType".into(), "image/png".into()),
                Matcher::UrlEncoded("fileSize".into(), "7".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "success": true,
                    "message": "ok",
                    "uploadUrl": "https://bucket.example.com/",
                    "fields": {"key": "institute-images/1-logo.png", "Policy": "p"},
                    "relativePath": "institute-images/1-logo.png",
                    "publicUrl": "https://storage.suraksha.lk/institute-images/1-logo.png"
                }"#,
            )
            .create_async()
            .await;

        let request = logo().signed_url_request(UploadFolder::InstituteImages);
        let ticket = client(&server).request_signed_url(&request).await.unwrap();

        assert_eq!(ticket.upload_url, "https://bucket.example.com/");
        assert!(ticket.relative_path.starts_with("institute-images/"));
        assert_eq!(ticket.fields.get("Policy"), Some("p"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_request_signed_url_rejection_is_signed_url_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", SIGNED_URL_PATH)
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"message":"Unauthorized"}"#)
            .create_async()
            .await;

        let request = logo().signed_url_request(UploadFolder::InstituteImages);
        let err = client(&server)
            .request_signed_url(&request)
            .await
            .unwrap_err();
        match err {
            UploadError::SignedUrl { status, message } => {
                assert_eq!(status, Some(401));
                assert!(message.contains("Unauthorized"));
            }
            other => panic!("expected SignedUrl error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_storage_form_puts_fields_before_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bucket")
            .match_header("authorization", Matcher::Missing)
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=".to_string()),
            )
            .match_body(Matcher::Regex(
                r#"(?s)name="key".*name="Content-Type".*name="Policy".*name="X-Amz-Signature".*name="file"; filename="logo.png".*PNGDATA"#
                    .to_string(),
            ))
            .with_status(204)
            .create_async()
            .await;

        let ticket = UploadTicket {
            upload_url: format!("{}/bucket", server.url()),
            fields: PolicyFields::from_iter([
                ("key", "institute-images/1-logo.png"),
                ("Content-Type", "image/png"),
                ("Policy", "cG9saWN5"),
                ("X-Amz-Signature", "abc123"),
            ]),
            public_url: String::new(),
            relative_path: "institute-images/1-logo.png".to_string(),
        };

        client(&server)
            .upload_to_storage(&ticket, &logo())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_storage_rejection_surfaces_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/bucket")
            .with_status(403)
            .with_body("<Error><Code>AccessDenied</Code><Message>Policy expired</Message></Error>")
            .create_async()
            .await;

        let ticket = UploadTicket {
            upload_url: format!("{}/bucket", server.url()),
            fields: PolicyFields::new(),
            public_url: String::new(),
            relative_path: "institute-images/1-logo.png".to_string(),
        };

        let err = client(&server)
            .upload_to_storage(&ticket, &logo())
            .await
            .unwrap_err();
        match err {
            UploadError::StorageUpload { status, body } => {
                assert_eq!(status, Some(403));
                assert!(body.contains("Policy expired"));
            }
            other => panic!("expected StorageUpload error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_content_type_is_rejected_before_sending() {
        let ticket = UploadTicket {
            upload_url: "http://127.0.0.1:9/unused".to_string(),
            fields: PolicyFields::new(),
            public_url: String::new(),
            relative_path: "x".to_string(),
        };
        let file = logo().with_content_type("not a mime type");
        assert!(matches!(
            build_storage_form(&ticket, &file),
            Err(UploadError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_and_publish_posts_relative_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", VERIFY_AND_PUBLISH_PATH)
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::Json(serde_json::json!({
                "relativePath": "class-images/9-a.png"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success": true, "publicUrl": "https://storage.suraksha.lk/class-images/9-a.png",
                    "fileDetails": {"size": 7, "contentType": "image/png"}}"#,
            )
            .create_async()
            .await;

        let response = client(&server)
            .verify_and_publish("class-images/9-a.png")
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.file_details.and_then(|d| d.size), Some(7));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_verify_unsuccessful_body_is_verification_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", VERIFY_AND_PUBLISH_PATH)
            .with_status(200)
            .with_body(r#"{"success": false, "message": "Object not found"}"#)
            .create_async()
            .await;

        let err = client(&server)
            .verify_and_publish("class-images/missing.png")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UploadError::Verification { ref message, .. } if message == "Object not found"
        ));
    }
}
