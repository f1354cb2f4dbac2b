use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::error::BackendError;
use super::item::ImportItem;
use super::remote::UrlProvisioner;

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "ogg"];

static EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[^.]+$").expect("valid regex"));
static UNIT_ARTICLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)[-_](\d+)").expect("valid regex"));
static UNIT_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)").expect("valid regex"));

/// `(unit, article)` encoded in an audio file name.
///
/// `3-2.mp3` and `3_2.mp3` give `(3, 2)`, `5.wav` gives `(5, 1)`. A name with
/// no digits gives unit 0, which callers treat as "not an article file".
pub fn parse_coordinate(file_name: &str) -> (u32, u32) {
    let stem = EXTENSION.replace(file_name, "");

    if let Some(caps) = UNIT_ARTICLE.captures(&stem) {
        return (number(&caps[1]), number(&caps[2]));
    }
    if let Some(caps) = UNIT_ONLY.captures(&stem) {
        return (number(&caps[1]), 1);
    }
    (0, 1)
}

fn number(digits: &str) -> u32 {
    digits.parse().unwrap_or(0)
}

pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        _ => "application/octet-stream",
    }
}

pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| AUDIO_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

/// Audio files directly inside `dir`, sorted by name.
pub fn scan_audio_dir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_audio_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Done,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AudioFileEntry {
    pub path: PathBuf,
    pub file_name: String,
    pub unit_index: u32,
    pub article_index: u32,
    pub status: UploadStatus,
    pub url: Option<String>,
    pub error: Option<String>,
}

impl AudioFileEntry {
    /// `None` when the name carries no unit number.
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        let (unit_index, article_index) = parse_coordinate(&file_name);
        if unit_index == 0 {
            return None;
        }
        Some(Self {
            path: path.to_path_buf(),
            file_name,
            unit_index,
            article_index,
            status: UploadStatus::Pending,
            url: None,
            error: None,
        })
    }

    pub fn coordinate(&self) -> (u32, u32) {
        (self.unit_index, self.article_index)
    }

    fn with_status(&self, status: UploadStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

/// Split selected files into the pending-upload list and the names that
/// carry no coordinate.
pub fn pending_entries(paths: &[PathBuf]) -> (Vec<AudioFileEntry>, Vec<PathBuf>) {
    let mut pending = Vec::new();
    let mut excluded = Vec::new();
    for path in paths {
        match AudioFileEntry::from_path(path) {
            Some(entry) => pending.push(entry),
            None => {
                tracing::debug!(path = %path.display(), "no unit number in audio file name");
                excluded.push(path.clone());
            }
        }
    }
    (pending, excluded)
}

/// Sends one audio file somewhere and returns its public URL.
pub trait AudioUploader {
    fn upload(&self, entry: &AudioFileEntry) -> Result<String, BackendError>;
}

/// Provisions a signed URL from the backend, then PUTs the file bytes to it.
pub struct HttpAudioUploader<'a, P: UrlProvisioner> {
    provisioner: &'a P,
    client: Client,
    folder: String,
}

impl<'a, P: UrlProvisioner> HttpAudioUploader<'a, P> {
    pub fn new(provisioner: &'a P, client: Client, folder: impl Into<String>) -> Self {
        Self {
            provisioner,
            client,
            folder: folder.into(),
        }
    }
}

impl<P: UrlProvisioner> AudioUploader for HttpAudioUploader<'_, P> {
    fn upload(&self, entry: &AudioFileEntry) -> Result<String, BackendError> {
        let content_type = content_type_for(&entry.file_name);
        let target = self
            .provisioner
            .upload_target(&entry.file_name, content_type, &self.folder)?;

        let bytes = fs::read(&entry.path).map_err(|source| BackendError::Io {
            path: entry.path.display().to_string(),
            source,
        })?;

        let resp = self
            .client
            .put(&target.upload_url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()?;

        if !resp.status().is_success() {
            return Err(BackendError::UploadStatus(resp.status().as_u16()));
        }
        Ok(target.public_url)
    }
}

/// Uploads every pending file, one at a time, in list order.
///
/// `on_update` sees each entry as it starts and again when it finishes. A
/// failed upload is recorded on its entry and the batch moves on.
pub fn upload_all<U: AudioUploader>(
    pending: &[AudioFileEntry],
    uploader: &U,
    mut on_update: impl FnMut(&AudioFileEntry),
) -> Vec<AudioFileEntry> {
    let mut finished = Vec::with_capacity(pending.len());

    for entry in pending {
        let uploading = entry.with_status(UploadStatus::Uploading);
        on_update(&uploading);

        let done = match uploader.upload(&uploading) {
            Ok(url) => {
                tracing::info!(file = %entry.file_name, %url, "uploaded audio");
                AudioFileEntry {
                    status: UploadStatus::Done,
                    url: Some(url),
                    ..uploading
                }
            }
            Err(e) => {
                tracing::warn!(file = %entry.file_name, "audio upload failed: {e}");
                AudioFileEntry {
                    status: UploadStatus::Error,
                    error: Some(e.to_string()),
                    ..uploading
                }
            }
        };

        on_update(&done);
        finished.push(done);
    }

    finished
}

/// Give each item the URL of the uploaded file at the same coordinate,
/// replacing any URL it already had. Returns the number of items touched.
pub fn attach_audio_urls(items: &mut [ImportItem], uploaded: &[AudioFileEntry]) -> usize {
    let mut matched = 0;
    for item in items.iter_mut() {
        // A later file with the same coordinate wins.
        let url = uploaded
            .iter()
            .rev()
            .filter(|f| f.status == UploadStatus::Done)
            .find(|f| f.coordinate() == item.coordinate())
            .and_then(|f| f.url.clone());

        if let Some(url) = url {
            item.audio_url = Some(url);
            matched += 1;
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::remote::UploadTarget;
    use std::cell::RefCell;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("3-2.mp3"), (3, 2));
        assert_eq!(parse_coordinate("3_2.mp3"), (3, 2));
        assert_eq!(parse_coordinate("5.wav"), (5, 1));
        assert_eq!(parse_coordinate("unit12-04.m4a"), (12, 4));
        assert_eq!(parse_coordinate("lesson 7.ogg"), (7, 1));
        assert_eq!(parse_coordinate("cover.png"), (0, 1));
    }

    #[test]
    fn test_extension_digits_are_ignored() {
        // Digits only in the extension must not become a unit.
        assert_eq!(parse_coordinate("intro.mp3"), (0, 1));
        assert_eq!(parse_coordinate("a.b.mp4"), (0, 1));
    }

    #[test]
    fn test_pending_excludes_names_without_digits() {
        let paths: Vec<PathBuf> = ["3-2.mp3", "cover.png", "5.wav"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let (pending, excluded) = pending_entries(&paths);
        let coords: Vec<(u32, u32)> = pending.iter().map(|e| e.coordinate()).collect();
        assert_eq!(coords, vec![(3, 2), (5, 1)]);
        assert_eq!(excluded, vec![PathBuf::from("cover.png")]);
        assert!(pending.iter().all(|e| e.status == UploadStatus::Pending));
    }

    #[test]
    fn test_scan_filters_audio_extensions() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        for name in ["2-1.MP3", "1-1.wav", "notes.txt", "3.ogg"] {
            fs::write(dir.path().join(name), b"x")?;
        }
        let names: Vec<String> = scan_audio_dir(dir.path())?
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["1-1.wav", "2-1.MP3", "3.ogg"]);
        Ok(())
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type_for("a.MP3"), "audio/mpeg");
        assert_eq!(content_type_for("a.m4a"), "audio/mp4");
        assert_eq!(content_type_for("a"), "application/octet-stream");
    }

    struct FakeUploader {
        fail_on: &'static str,
        calls: RefCell<Vec<String>>,
    }

    impl AudioUploader for FakeUploader {
        fn upload(&self, entry: &AudioFileEntry) -> Result<String, BackendError> {
            self.calls.borrow_mut().push(entry.file_name.clone());
            if entry.file_name == self.fail_on {
                Err(BackendError::UploadStatus(500))
            } else {
                Ok(format!("https://cdn/{}", entry.file_name))
            }
        }
    }

    fn item(unit: u32, article: u32, audio: Option<&str>) -> ImportItem {
        ImportItem {
            unit_index: unit,
            article_index: article,
            title: "T".into(),
            reading_text: "Body".into(),
            translation: None,
            translation_en: None,
            translation_vi: None,
            translation_mn: None,
            audio_url: audio.map(str::to_string),
        }
    }

    #[test]
    fn test_upload_failure_does_not_stop_batch() {
        let paths: Vec<PathBuf> = ["1-1.mp3", "1-2.mp3", "2.mp3"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let (pending, _) = pending_entries(&paths);
        let uploader = FakeUploader {
            fail_on: "1-2.mp3",
            calls: RefCell::new(Vec::new()),
        };

        let mut seen = Vec::new();
        let finished = upload_all(&pending, &uploader, |e| seen.push(e.status));

        assert_eq!(*uploader.calls.borrow(), vec!["1-1.mp3", "1-2.mp3", "2.mp3"]);
        let statuses: Vec<UploadStatus> = finished.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![UploadStatus::Done, UploadStatus::Error, UploadStatus::Done]
        );
        assert_eq!(finished[1].url, None);
        assert!(finished[1].error.is_some());
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[0], UploadStatus::Uploading);
        // The input list is left untouched.
        assert!(pending.iter().all(|e| e.status == UploadStatus::Pending));

        let mut items = vec![item(1, 1, None), item(1, 2, Some("old")), item(2, 1, Some("old"))];
        let matched = attach_audio_urls(&mut items, &finished);
        assert_eq!(matched, 2);
        assert_eq!(items[0].audio_url.as_deref(), Some("https://cdn/1-1.mp3"));
        assert_eq!(items[1].audio_url.as_deref(), Some("old"));
        assert_eq!(items[2].audio_url.as_deref(), Some("https://cdn/2.mp3"));
    }

    /// Hands out `upload_url` and records every request, or fails when no
    /// URL is set.
    struct FakeProvisioner {
        upload_url: Option<String>,
        calls: RefCell<Vec<(String, String, String)>>,
    }

    impl FakeProvisioner {
        fn new(upload_url: Option<String>) -> Self {
            Self {
                upload_url,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl UrlProvisioner for FakeProvisioner {
        fn upload_target(
            &self,
            filename: &str,
            content_type: &str,
            folder: &str,
        ) -> Result<UploadTarget, BackendError> {
            self.calls.borrow_mut().push((
                filename.to_string(),
                content_type.to_string(),
                folder.to_string(),
            ));
            match &self.upload_url {
                Some(url) => Ok(UploadTarget {
                    upload_url: url.clone(),
                    public_url: format!("https://cdn/{filename}"),
                }),
                None => Err(BackendError::Function("storage quota exceeded".into())),
            }
        }
    }

    /// Accepts one connection, reads the whole request, answers with
    /// `status_line` and hands the raw request back through the join handle.
    fn serve_once(status_line: &'static str) -> anyhow::Result<(String, thread::JoinHandle<Vec<u8>>)> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let url = format!("http://{}/upload/3-2.mp3", listener.local_addr()?);
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("client connects");
            let request = read_request(&mut stream);
            let response = format!("{status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            stream.write_all(response.as_bytes()).expect("write response");
            request
        });
        Ok((url, handle))
    }

    fn read_request(stream: &mut TcpStream) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).expect("read request");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        buf
    }

    fn audio_entry(dir: &TempDir, name: &str, bytes: &[u8]) -> anyhow::Result<AudioFileEntry> {
        let path = dir.path().join(name);
        fs::write(&path, bytes)?;
        Ok(AudioFileEntry::from_path(&path).expect("name has a unit"))
    }

    fn local_client() -> anyhow::Result<Client> {
        Ok(Client::builder().no_proxy().build()?)
    }

    #[test]
    fn test_http_upload_puts_file_to_provisioned_url() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let entry = audio_entry(&dir, "3-2.mp3", b"ID3 fake audio")?;
        let (url, server) = serve_once("HTTP/1.1 200 OK")?;

        let provisioner = FakeProvisioner::new(Some(url));
        let uploader = HttpAudioUploader::new(&provisioner, local_client()?, "reading-audio");
        let public_url = uploader.upload(&entry)?;

        assert_eq!(public_url, "https://cdn/3-2.mp3");
        assert_eq!(
            *provisioner.calls.borrow(),
            vec![(
                "3-2.mp3".to_string(),
                "audio/mpeg".to_string(),
                "reading-audio".to_string()
            )]
        );

        let request = String::from_utf8(server.join().expect("server thread"))?;
        assert!(request.starts_with("PUT /upload/3-2.mp3 "));
        assert!(request.to_lowercase().contains("content-type: audio/mpeg"));
        assert!(request.ends_with("ID3 fake audio"));
        Ok(())
    }

    #[test]
    fn test_http_upload_rejected_status_is_an_error() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let entry = audio_entry(&dir, "3-2.mp3", b"ID3")?;
        let (url, server) = serve_once("HTTP/1.1 500 Internal Server Error")?;

        let provisioner = FakeProvisioner::new(Some(url));
        let uploader = HttpAudioUploader::new(&provisioner, local_client()?, "reading-audio");
        let result = uploader.upload(&entry);
        server.join().expect("server thread");

        assert!(matches!(result, Err(BackendError::UploadStatus(500))));
        Ok(())
    }

    #[test]
    fn test_provisioning_failure_marks_entry_failed() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let entry = audio_entry(&dir, "4-1.wav", b"RIFF")?;

        let provisioner = FakeProvisioner::new(None);
        let uploader = HttpAudioUploader::new(&provisioner, local_client()?, "reading-audio");
        let finished = upload_all(&[entry], &uploader, |_| {});

        assert_eq!(finished[0].status, UploadStatus::Error);
        assert_eq!(finished[0].url, None);
        assert_eq!(finished[0].error.as_deref(), Some("storage quota exceeded"));
        assert_eq!(provisioner.calls.borrow()[0].1, "audio/wav");
        Ok(())
    }
}
