//! Turns an `Operation` plus credentials into a `RequestDescriptor`.
//!
//! # Design
//! The service takes structured input as exactly one JSON blob in a
//! multipart field named `data`, with binary uploads carried as separate
//! parts. Building a request therefore splits the parameters into two lanes:
//! top-level `FileRef` values become file parts named after their parameter,
//! everything else is serialized together into `data`.
//!
//! Nothing here performs network I/O. The only side effect is reading the
//! bytes of referenced files.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::auth::Credentials;
use crate::error::BuildError;
use crate::http::{BasicAuth, BodyPlan, FilePart, HttpMethod, RequestDescriptor, MULTIPART_FORM_DATA};
use crate::types::{Operation, Params};

/// Builds transport-ready requests against one service endpoint.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    endpoint: String,
}

impl RequestBuilder {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Resolve `operation` into a request.
    ///
    /// Fails fast, before any file is read, when the verb is unknown or no
    /// usable credentials are supplied.
    ///
    /// A token is percent-encoded into the `auth_token` query parameter, so
    /// tokens containing `&`, `#` or `+` cannot split the URL.
    pub fn build(
        &self,
        operation: &Operation,
        credentials: Option<&Credentials>,
    ) -> Result<RequestDescriptor, BuildError> {
        let method: HttpMethod = operation.method.parse()?;
        let credentials = credentials
            .filter(|c| c.is_usable())
            .ok_or(BuildError::MissingCredentials)?;

        let mut url = format!("{}/{}", self.endpoint, operation.uri());
        let basic_auth = match credentials {
            Credentials::Token(token) => {
                url.push_str("?auth_token=");
                url.push_str(&urlencoding::encode(token));
                None
            }
            Credentials::Basic { username, password } => Some(BasicAuth {
                username: username.clone(),
                password: password.clone(),
            }),
        };

        let body = plan_body(&operation.params)?;
        let mut headers = Vec::new();
        if body.is_some() {
            headers.push(("content-type".to_string(), MULTIPART_FORM_DATA.to_string()));
        }

        debug!(
            method = %method,
            path = %operation.uri(),
            files = body.as_ref().map_or(0, |b| b.files.len()),
            "request built"
        );

        Ok(RequestDescriptor {
            method,
            url,
            headers,
            basic_auth,
            body,
        })
    }
}

/// Split parameters into file parts and a single JSON `data` field.
///
/// Returns `None` when there are no parameters at all.
pub fn plan_body(params: &Params) -> Result<Option<BodyPlan>, BuildError> {
    if params.is_empty() {
        return Ok(None);
    }

    let mut plan = BodyPlan::default();
    let mut fields = Params::new();
    for (name, value) in params {
        match value.as_file() {
            Some(path) => plan.files.push(load_file(name, path)?),
            None => {
                fields.insert(name.clone(), value.clone());
            }
        }
    }

    if !fields.is_empty() {
        plan.data = Some(serde_json::to_string(&fields)?);
    }
    Ok(Some(plan))
}

fn load_file(name: &str, path: &Path) -> Result<FilePart, BuildError> {
    let not_found = |source: Option<io::Error>| BuildError::FileNotFound {
        path: path.to_path_buf(),
        source,
    };
    let metadata = fs::metadata(path).map_err(|e| not_found(Some(e)))?;
    if !metadata.is_file() {
        return Err(not_found(None));
    }
    let content = fs::read(path).map_err(|e| not_found(Some(e)))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let content_type = mime_guess::from_path(path).first_or_octet_stream().to_string();

    Ok(FilePart {
        name: header_safe(name),
        file_name: header_safe(&file_name),
        content_type,
        content,
    })
}

/// Percent-encode the characters that would end a quoted multipart header
/// parameter (`"`, CR, LF), the way browsers encode form field names.
fn header_safe(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("%22"),
            '\r' => out.push_str("%0D"),
            '\n' => out.push_str("%0A"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::types::ParamValue;

    fn builder() -> RequestBuilder {
        RequestBuilder::new("https://build.example.com/api/v1")
    }

    fn token() -> Credentials {
        Credentials::token("abc123")
    }

    #[test]
    fn token_travels_in_query_string() {
        let req = builder().build(&Operation::get(["me"]), Some(&token())).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "https://build.example.com/api/v1/me?auth_token=abc123");
        assert!(req.basic_auth.is_none());
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn basic_auth_stays_out_of_url() {
        let creds = Credentials::basic("user@example.com", "secret");
        let req = builder()
            .build(&Operation::get(["apps", "42"]), Some(&creds))
            .unwrap();
        assert_eq!(req.url, "https://build.example.com/api/v1/apps/42");
        let auth = req.basic_auth.unwrap();
        assert_eq!(auth.username, "user@example.com");
        assert_eq!(auth.password, "secret");
    }

    #[test]
    fn trailing_slash_on_endpoint_is_stripped() {
        let b = RequestBuilder::new("https://build.example.com/api/v1/");
        let req = b.build(&Operation::get(["keys"]), Some(&token())).unwrap();
        assert_eq!(req.url, "https://build.example.com/api/v1/keys?auth_token=abc123");
    }

    #[test]
    fn method_is_normalized_to_uppercase() {
        let op = Operation::new("delete", ["apps", "1"]);
        let req = builder().build(&op, Some(&token())).unwrap();
        assert_eq!(req.method, HttpMethod::Delete);
    }

    #[test]
    fn unsupported_method_is_rejected_before_credentials() {
        let op = Operation::new("PATCH", ["apps"]);
        let err = builder().build(&op, None).unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedMethod(ref m) if m == "PATCH"));
    }

    #[test]
    fn missing_or_empty_credentials_are_rejected() {
        let op = Operation::get(["me"]);
        for creds in [None, Some(Credentials::token("")), Some(Credentials::basic("", ""))] {
            let err = builder().build(&op, creds.as_ref()).unwrap_err();
            assert!(matches!(err, BuildError::MissingCredentials));
        }
    }

    #[test]
    fn fields_and_files_travel_in_separate_lanes() {
        let mut icon = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        icon.write_all(b"\x89PNG fake").unwrap();

        let op = Operation::post(["apps", "42", "icon"])
            .param("title", "Foo")
            .param("icon", ParamValue::file(icon.path()));
        let req = builder().build(&op, Some(&token())).unwrap();

        let plan = req.body.as_ref().unwrap();
        let data: serde_json::Value = serde_json::from_str(plan.data.as_deref().unwrap()).unwrap();
        assert_eq!(data, serde_json::json!({"title": "Foo"}));

        let part = plan.file("icon").unwrap();
        assert_eq!(part.content, b"\x89PNG fake");
        assert_eq!(part.content_type, "image/png");
        assert_eq!(plan.files.len(), 1);

        assert_eq!(req.header("content-type"), Some("multipart/form-data"));
    }

    #[test]
    fn file_only_request_has_no_data_field() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let op = Operation::post(["apps"]).param("file", ParamValue::file(file.path()));
        let plan = builder().build(&op, Some(&token())).unwrap().body.unwrap();
        assert!(plan.data.is_none());
        assert_eq!(plan.files.len(), 1);
    }

    #[test]
    fn nested_structures_are_serialized_into_data() {
        let mut keys = Params::new();
        keys.insert("ios".to_string(), ParamValue::from(7i64));
        let op = Operation::post(["apps"])
            .param("platforms", vec!["ios", "android"])
            .param("keys", keys)
            .param("debug", false);
        let plan = builder().build(&op, Some(&token())).unwrap().body.unwrap();
        assert_eq!(
            plan.data.as_deref(),
            Some(r#"{"platforms":["ios","android"],"keys":{"ios":7},"debug":false}"#)
        );
    }

    #[test]
    fn text_that_looks_like_a_path_is_a_field() {
        let op = Operation::put(["apps", "1"]).param("description", "@/etc/hosts");
        let plan = builder().build(&op, Some(&token())).unwrap().body.unwrap();
        assert!(plan.files.is_empty());
        assert_eq!(plan.data.as_deref(), Some(r#"{"description":"@/etc/hosts"}"#));
    }

    #[test]
    fn missing_file_fails_the_build() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.zip");
        let op = Operation::post(["apps"]).param("file", ParamValue::file(&missing));
        let err = builder().build(&op, Some(&token())).unwrap_err();
        assert!(matches!(err, BuildError::FileNotFound { ref path, .. } if *path == missing));
        assert_eq!(err.to_string(), format!("File not found: {}", missing.display()));
    }

    #[test]
    fn directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let op = Operation::post(["apps"]).param("file", ParamValue::file(dir.path()));
        let err = builder().build(&op, Some(&token())).unwrap_err();
        assert!(matches!(err, BuildError::FileNotFound { source: None, .. }));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_not_found_with_io_cause() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("www.zip");
        std::os::unix::fs::symlink(dir.path().join("gone.zip"), &link).unwrap();

        let op = Operation::post(["apps"]).param("file", ParamValue::file(&link));
        let err = builder().build(&op, Some(&token())).unwrap_err();
        let BuildError::FileNotFound { path, source } = err else {
            panic!("expected FileNotFound");
        };
        assert_eq!(path, link);
        assert_eq!(source.unwrap().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn file_names_cannot_forge_part_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icon\r\nX-Injected: \"yes\"\r\n.png");
        std::fs::write(&path, b"PNG").unwrap();

        let op = Operation::post(["apps", "1", "icon"]).param("icon", ParamValue::file(&path));
        let plan = builder().build(&op, Some(&token())).unwrap().body.unwrap();
        let part = plan.file("icon").unwrap();
        assert_eq!(part.file_name, "icon%0D%0AX-Injected: %22yes%22%0D%0A.png");
        assert_eq!(part.content, b"PNG");
    }

    #[test]
    fn file_nested_in_a_list_is_a_serialization_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let op = Operation::post(["apps"])
            .param("attachments", ParamValue::List(vec![ParamValue::file(file.path())]));
        let err = builder().build(&op, Some(&token())).unwrap_err();
        assert!(matches!(err, BuildError::Serialization(_)));
    }

    #[test]
    fn token_is_percent_encoded_in_query() {
        let creds = Credentials::token("a&b+c#d");
        let req = builder().build(&Operation::get(["me"]), Some(&creds)).unwrap();
        assert_eq!(req.url, "https://build.example.com/api/v1/me?auth_token=a%26b%2Bc%23d");
    }
}
