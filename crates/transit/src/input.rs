//! Input descriptors the pipeline acquires its original file from.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

/// Where the original file comes from
#[derive(Debug)]
pub enum Input {
    /// A file received through a multipart form upload
    Upload(UploadDescriptor),
    /// A file already on this machine
    Local(PathBuf),
    /// An `http`/`https` URL
    Remote(String),
    /// A raw request body
    Stream(StreamInput),
}

impl Input {
    pub fn kind(&self) -> &'static str {
        match self {
            Input::Upload(_) => "upload",
            Input::Local(_) => "local",
            Input::Remote(_) => "remote",
            Input::Stream(_) => "stream",
        }
    }
}

/// Upload status codes as reported by form-upload handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadErrorCode {
    Ok,
    IniSize,
    FormSize,
    Partial,
    NoFile,
    NoTmpDir,
    CantWrite,
    Extension,
    Unknown(i32),
}

impl UploadErrorCode {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => UploadErrorCode::Ok,
            1 => UploadErrorCode::IniSize,
            2 => UploadErrorCode::FormSize,
            3 => UploadErrorCode::Partial,
            4 => UploadErrorCode::NoFile,
            6 => UploadErrorCode::NoTmpDir,
            7 => UploadErrorCode::CantWrite,
            8 => UploadErrorCode::Extension,
            other => UploadErrorCode::Unknown(other),
        }
    }

    /// Human-readable cause
    pub fn message(&self) -> String {
        match self {
            UploadErrorCode::Ok => "no error".to_string(),
            UploadErrorCode::IniSize => {
                "the uploaded file exceeds the server's maximum upload size".to_string()
            }
            UploadErrorCode::FormSize => {
                "the uploaded file exceeds the maximum size allowed by the form".to_string()
            }
            UploadErrorCode::Partial => "the file was only partially uploaded".to_string(),
            UploadErrorCode::NoFile => "no file was uploaded".to_string(),
            UploadErrorCode::NoTmpDir => "missing a temporary folder".to_string(),
            UploadErrorCode::CantWrite => "failed to write the file to disk".to_string(),
            UploadErrorCode::Extension => "an extension stopped the upload".to_string(),
            UploadErrorCode::Unknown(code) => format!("unknown upload error (code {})", code),
        }
    }
}

/// One entry of a multipart upload, as handed over by the web layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDescriptor {
    /// Temporary path the upload was written to
    pub tmp_name: String,
    /// Client-supplied file name
    pub name: String,
    #[serde(default)]
    pub error: i32,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(rename = "type", default)]
    pub content_type: Option<String>,
}

impl UploadDescriptor {
    pub fn error_code(&self) -> UploadErrorCode {
        UploadErrorCode::from_code(self.error)
    }
}

/// Raw body plus the request parameters naming it
pub struct StreamInput {
    /// Parameter whose value is the destination file name
    pub field: String,
    pub params: HashMap<String, String>,
    /// Taken on first import
    pub body: Option<Pin<Box<dyn AsyncRead + Send + Unpin>>>,
}

impl StreamInput {
    pub fn new(
        field: impl Into<String>,
        params: HashMap<String, String>,
        body: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        Self {
            field: field.into(),
            params,
            body: Some(Box::pin(body)),
        }
    }

    /// Value of the naming parameter, if present and non-blank
    pub fn file_name(&self) -> Option<&str> {
        self.params
            .get(&self.field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

impl fmt::Debug for StreamInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamInput")
            .field("field", &self.field)
            .field("params", &self.params)
            .field("consumed", &self.body.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_from_json() {
        let descriptor: UploadDescriptor = serde_json::from_str(
            r#"{"tmp_name": "/tmp/phpA1b2", "name": "cat.jpg", "error": 0, "size": 12, "type": "image/jpeg"}"#,
        )
        .unwrap();
        assert_eq!(descriptor.name, "cat.jpg");
        assert_eq!(descriptor.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(descriptor.error_code(), UploadErrorCode::Ok);

        let minimal: UploadDescriptor =
            serde_json::from_str(r#"{"tmp_name": "/tmp/x", "name": "x"}"#).unwrap();
        assert_eq!(minimal.error, 0);
        assert!(minimal.size.is_none());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(UploadErrorCode::from_code(3), UploadErrorCode::Partial);
        assert!(UploadErrorCode::from_code(1).message().contains("maximum upload size"));
        assert!(UploadErrorCode::from_code(2).message().contains("form"));
        assert_eq!(UploadErrorCode::from_code(5), UploadErrorCode::Unknown(5));
        assert!(UploadErrorCode::Unknown(5).message().contains("code 5"));
    }

    #[test]
    fn test_stream_file_name() {
        let params = HashMap::from([("filename".to_string(), "  report.pdf ".to_string())]);
        let input = StreamInput::new("filename", params, tokio::io::empty());
        assert_eq!(input.file_name(), Some("report.pdf"));
        assert_eq!(Input::Stream(input).kind(), "stream");

        let input = StreamInput::new("missing", HashMap::new(), tokio::io::empty());
        assert!(input.file_name().is_none());
    }
}
