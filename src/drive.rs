use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

const DRIVE_API: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_API: &str = "https://www.googleapis.com/upload/drive/v3";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    web_view_link: Option<String>,
}

pub struct DriveClient {
    http: reqwest::Client,
    token: String,
}

impl DriveClient {
    /// Build a client from the pre-acquired OAuth token in the environment.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("GOOGLE_ACCESS_TOKEN")
            .map_err(|_| anyhow!("GOOGLE_ACCESS_TOKEN environment variable is not set"))?;
        Ok(Self {
            http: reqwest::Client::new(),
            token,
        })
    }

    /// Find the named folder, creating it on first use. Returns the folder id.
    pub async fn ensure_folder(&self, name: &str) -> Result<String> {
        let query = format!("mimeType='{FOLDER_MIME}' and name='{name}' and trashed=false");
        let list: FileList = self
            .http
            .get(format!("{DRIVE_API}/files"))
            .bearer_auth(&self.token)
            .query(&[
                ("q", query.as_str()),
                ("spaces", "drive"),
                ("fields", "files(id, name)"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to search Drive folders")?;
        if let Some(folder) = list.files.into_iter().next() {
            debug!("Using Drive folder {} ({})", name, folder.id);
            return Ok(folder.id);
        }

        info!("Creating Drive folder: {}", name);
        let created: DriveFile = self
            .http
            .post(format!("{DRIVE_API}/files"))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "name": name, "mimeType": FOLDER_MIME }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to create Drive folder")?;
        Ok(created.id)
    }

    /// Upload a PDF into the folder and hand back a shareable view link. A
    /// file already present under the same name is reused, not duplicated.
    pub async fn upload(&self, filename: &str, bytes: Vec<u8>, folder_id: &str) -> Result<String> {
        let file_id = match self.find_file(filename, folder_id).await? {
            Some(existing) => {
                debug!("Drive file already present: {}", existing.name);
                existing.id
            }
            None => self.upload_new(filename, bytes, folder_id).await?,
        };
        self.share(&file_id).await?;

        let file: DriveFile = self
            .http
            .get(format!("{DRIVE_API}/files/{file_id}"))
            .bearer_auth(&self.token)
            .query(&[("fields", "id, name, webViewLink")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to fetch Drive file link")?;
        file.web_view_link
            .ok_or_else(|| anyhow!("Drive returned no view link for {filename}"))
    }

    async fn find_file(&self, filename: &str, folder_id: &str) -> Result<Option<DriveFile>> {
        let query = format!("name='{filename}' and '{folder_id}' in parents and trashed=false");
        let list: FileList = self
            .http
            .get(format!("{DRIVE_API}/files"))
            .bearer_auth(&self.token)
            .query(&[
                ("q", query.as_str()),
                ("spaces", "drive"),
                ("fields", "files(id, name)"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to search Drive files")?;
        Ok(list.files.into_iter().next())
    }

    /// Resumable upload: post the metadata, then put the bytes to the
    /// session URI Drive hands back.
    async fn upload_new(&self, filename: &str, bytes: Vec<u8>, folder_id: &str) -> Result<String> {
        let session = self
            .http
            .post(format!("{DRIVE_UPLOAD_API}/files"))
            .bearer_auth(&self.token)
            .query(&[("uploadType", "resumable")])
            .json(&serde_json::json!({ "name": filename, "parents": [folder_id] }))
            .send()
            .await?
            .error_for_status()?;
        let session_uri = session
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Drive resumable upload returned no session URI"))?;

        let uploaded: DriveFile = self
            .http
            .put(session_uri)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/pdf")
            .body(bytes)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("Failed to upload {filename} to Drive"))?;
        info!("Uploaded to Drive: {} ({})", filename, uploaded.id);
        Ok(uploaded.id)
    }

    async fn share(&self, file_id: &str) -> Result<()> {
        self.http
            .post(format!("{DRIVE_API}/files/{file_id}/permissions"))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "type": "anyone", "role": "reader" }))
            .send()
            .await?
            .error_for_status()
            .context("Failed to share Drive file")?;
        Ok(())
    }
}

/// Keep Drive names query-safe: anything outside `[A-Za-z0-9._-]` becomes
/// an underscore.
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_passes_safe_names_through() {
        assert_eq!(sanitize_filename("scan_2026-02-15.pdf"), "scan_2026-02-15.pdf");
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("Meeting Notes (v2).pdf"), "Meeting_Notes__v2_.pdf");
        assert_eq!(sanitize_filename("it's a scan?.pdf"), "it_s_a_scan_.pdf");
        assert_eq!(sanitize_filename("appunti però.pdf"), "appunti_per_.pdf");
    }

    #[test]
    fn file_list_wire_format_parses() {
        let raw = r#"{
            "files": [
                {"id": "f1", "name": "scan.pdf", "webViewLink": "https://drive.google.com/file/d/f1/view"},
                {"id": "f2", "name": "other.pdf"}
            ]
        }"#;
        let list: FileList = serde_json::from_str(raw).unwrap();
        assert_eq!(list.files.len(), 2);
        assert_eq!(
            list.files[0].web_view_link.as_deref(),
            Some("https://drive.google.com/file/d/f1/view")
        );
        assert!(list.files[1].web_view_link.is_none());
    }

    #[test]
    fn empty_file_list_parses() {
        let list: FileList = serde_json::from_str("{}").unwrap();
        assert!(list.files.is_empty());
    }
}
