use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

use super::error::BackendError;
use super::item::ImportItem;
use super::settings::Settings;

const TIMEOUT_SECS: u64 = 60;

/// Where to PUT a file and where it can be fetched from afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    pub upload_url: String,
    pub public_url: String,
}

/// Outcome of a bulk submission, as reported by the content store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Hands out pre-signed upload URLs.
pub trait UrlProvisioner {
    fn upload_target(
        &self,
        filename: &str,
        content_type: &str,
        folder: &str,
    ) -> Result<UploadTarget, BackendError>;
}

/// Accepts a finished item list for one course.
pub trait ContentStore {
    fn bulk_import(&self, course_id: &str, items: &[ImportItem]) -> Result<ImportReport, BackendError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionResponse {
    status: String,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error_message: Option<String>,
}

/// Client for the hosted backend's HTTP function API.
pub struct BackendClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
    import_function: String,
    upload_url_function: String,
}

impl BackendClient {
    pub fn from_settings(settings: &Settings) -> Result<Self, BackendError> {
        let base_url = settings
            .backend_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .ok_or(BackendError::NotConfigured)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url,
            auth_token: settings.auth_token.clone(),
            import_function: settings.import_function.clone(),
            upload_url_function: settings.upload_url_function.clone(),
        })
    }

    /// Underlying HTTP client, shared with the audio uploader.
    pub fn http(&self) -> &Client {
        &self.client
    }

    fn call(&self, kind: &str, path: &str, args: Value) -> Result<Value, BackendError> {
        let endpoint = format!("{}/api/{}", self.base_url, kind);
        let body = json!({ "path": path, "args": args, "format": "json" });

        tracing::debug!(%endpoint, function = path, "calling backend function");

        let mut request = self.client.post(&endpoint).json(&body);
        if let Some(token) = self.auth_token.as_deref() {
            request = request.bearer_auth(token);
        }

        let text = request.send()?.text()?;
        parse_function_response(&text)
    }
}

fn parse_function_response(text: &str) -> Result<Value, BackendError> {
    let resp: FunctionResponse = serde_json::from_str(text)?;
    if resp.status == "success" {
        Ok(resp.value)
    } else {
        Err(BackendError::Function(
            resp.error_message
                .unwrap_or_else(|| format!("backend returned status {:?}", resp.status)),
        ))
    }
}

impl UrlProvisioner for BackendClient {
    fn upload_target(
        &self,
        filename: &str,
        content_type: &str,
        folder: &str,
    ) -> Result<UploadTarget, BackendError> {
        let value = self.call(
            "action",
            &self.upload_url_function,
            json!({ "filename": filename, "contentType": content_type, "folder": folder }),
        )?;
        Ok(serde_json::from_value(value)?)
    }
}

impl ContentStore for BackendClient {
    fn bulk_import(&self, course_id: &str, items: &[ImportItem]) -> Result<ImportReport, BackendError> {
        tracing::info!(course_id, items = items.len(), "submitting bulk import");
        let value = self.call(
            "mutation",
            &self.import_function,
            json!({ "courseId": course_id, "items": items }),
        )?;
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response() {
        let value = parse_function_response(
            r#"{"status":"success","value":{"created":2,"updated":1,"failed":1,"errors":["Unit 9 not found"]}}"#,
        )
        .unwrap();
        let report: ImportReport = serde_json::from_value(value).unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(report.updated, 1);
        assert_eq!(report.errors, vec!["Unit 9 not found"]);
    }

    #[test]
    fn test_error_response_carries_message() {
        let err = parse_function_response(r#"{"status":"error","errorMessage":"Unauthorized"}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized");
    }

    #[test]
    fn test_garbage_response_is_decode_error() {
        assert!(matches!(
            parse_function_response("<html>502</html>"),
            Err(BackendError::Decode(_))
        ));
    }

    #[test]
    fn test_upload_target_decodes_camel_case() {
        let target: UploadTarget = serde_json::from_str(
            r#"{"uploadUrl":"https://s3/put?sig=1","publicUrl":"https://cdn/a.mp3"}"#,
        )
        .unwrap();
        assert_eq!(target.public_url, "https://cdn/a.mp3");
    }

    #[test]
    fn test_client_requires_backend_url() {
        let settings = Settings::default();
        assert!(matches!(
            BackendClient::from_settings(&settings),
            Err(BackendError::NotConfigured)
        ));
    }

    #[test]
    fn test_items_serialize_in_camel_case() {
        let item = ImportItem {
            unit_index: 1,
            article_index: 2,
            title: "T".into(),
            reading_text: "Body".into(),
            translation: None,
            translation_en: Some("EN".into()),
            translation_vi: None,
            translation_mn: None,
            audio_url: None,
        };
        let value = json!({ "courseId": "c1", "items": [item] });
        assert_eq!(value["items"][0]["unitIndex"], 1);
        assert_eq!(value["items"][0]["readingText"], "Body");
        assert_eq!(value["items"][0]["translationEn"], "EN");
        assert!(value["items"][0].get("audioUrl").is_none());
    }
}
