//! Operations for every resource the build service exposes.
//!
//! Each function only assembles an `Operation` (path, verb, parameters with
//! the service's documented defaults). Pass the result to
//! `BuildClient::request`.

use std::fmt;
use std::path::Path;

use crate::types::{merge, Operation, ParamValue, Params};

/// Target platforms known to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Ios,
    Android,
    WinPhone,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::WinPhone => "winphone",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collaborator access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Read-only.
    #[default]
    Tester,
    /// Read and write.
    Dev,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Tester => "tester",
            Role::Dev => "dev",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn params<const N: usize>(entries: [(&str, ParamValue); N]) -> Params {
    entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

pub fn get_profile() -> Operation {
    Operation::get(["me"])
}

pub fn get_applications() -> Operation {
    Operation::get(["apps"])
}

pub fn get_application(app_id: impl fmt::Display) -> Operation {
    Operation::get(["apps".to_string(), app_id.to_string()])
}

pub fn get_application_icon(app_id: impl fmt::Display) -> Operation {
    Operation::get(["apps".to_string(), app_id.to_string(), "icon".to_string()])
}

/// Download location of the latest package built for `platform`.
pub fn download_application_platform(app_id: impl fmt::Display, platform: Platform) -> Operation {
    Operation::get(["apps".to_string(), app_id.to_string(), platform.to_string()])
}

pub fn get_keys() -> Operation {
    Operation::get(["keys"])
}

pub fn get_keys_platform(platform: Platform) -> Operation {
    Operation::get(["keys", platform.as_str()])
}

pub fn get_key_platform(platform: Platform, key_id: impl fmt::Display) -> Operation {
    Operation::get(["keys".to_string(), platform.to_string(), key_id.to_string()])
}

// ---------------------------------------------------------------------------
// Applications
// ---------------------------------------------------------------------------

/// Defaults the service documents for a new application. Signing keys are
/// left out: an empty `keys` entry is rejected by the service.
pub fn application_defaults() -> Params {
    params([
        ("title", "Phonegap Application".into()),
        ("package", "com.phonegap.www".into()),
        ("version", "0.0.1".into()),
        ("description", "".into()),
        ("debug", false.into()),
        ("private", true.into()),
        ("phonegap_version", "3.1.0".into()),
        ("hydrates", false.into()),
    ])
}

pub fn create_application(options: Params) -> Operation {
    Operation::post(["apps"]).with_params(merge(application_defaults(), options))
}

/// Create an application whose sources live in a remote repository.
pub fn create_application_from_repo(repo: &str, options: Params) -> Operation {
    let options = merge(
        options,
        params([("create_method", "remote_repo".into()), ("repo", repo.into())]),
    );
    create_application(options)
}

/// Create an application from a local zip archive or `index.html`.
pub fn create_application_from_file(source: impl AsRef<Path>, options: Params) -> Operation {
    let options = merge(
        options,
        params([("create_method", "file".into()), ("file", ParamValue::file(source))]),
    );
    create_application(options)
}

pub fn update_application(app_id: impl fmt::Display, options: Params) -> Operation {
    Operation::put(["apps".to_string(), app_id.to_string()]).with_params(options)
}

/// Pull the latest sources from the repository the application was created from.
pub fn update_application_from_repo(app_id: impl fmt::Display, options: Params) -> Operation {
    update_application(app_id, merge(options, params([("pull", true.into())])))
}

pub fn update_application_from_file(
    app_id: impl fmt::Display,
    source: impl AsRef<Path>,
    options: Params,
) -> Operation {
    update_application(app_id, merge(options, params([("file", ParamValue::file(source))])))
}

/// Upload a PNG icon for the application.
pub fn update_application_icon(app_id: impl fmt::Display, source: impl AsRef<Path>) -> Operation {
    Operation::post(["apps".to_string(), app_id.to_string(), "icon".to_string()])
        .param("icon", ParamValue::file(source))
}

pub fn delete_application(app_id: impl fmt::Display) -> Operation {
    Operation::delete(["apps".to_string(), app_id.to_string()])
}

// ---------------------------------------------------------------------------
// Builds
// ---------------------------------------------------------------------------

/// Queue builds. An empty `platforms` slice builds every platform.
pub fn build_application(app_id: impl fmt::Display, platforms: &[Platform]) -> Operation {
    let op = Operation::post(["apps".to_string(), app_id.to_string(), "build".to_string()]);
    if platforms.is_empty() {
        return op;
    }
    let names: Vec<&str> = platforms.iter().map(Platform::as_str).collect();
    op.param("platforms", names)
}

pub fn build_application_platform(app_id: impl fmt::Display, platform: Platform) -> Operation {
    Operation::post([
        "apps".to_string(),
        app_id.to_string(),
        "build".to_string(),
        platform.to_string(),
    ])
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

pub fn add_collaborator(app_id: impl fmt::Display, options: Params) -> Operation {
    let defaults = params([("email", "".into()), ("role", Role::default().as_str().into())]);
    Operation::post(["apps".to_string(), app_id.to_string(), "collaborators".to_string()])
        .with_params(merge(defaults, options))
}

pub fn update_collaborator(
    app_id: impl fmt::Display,
    collaborator_id: impl fmt::Display,
    options: Params,
) -> Operation {
    let defaults = params([("role", Role::default().as_str().into())]);
    Operation::put([
        "apps".to_string(),
        app_id.to_string(),
        "collaborators".to_string(),
        collaborator_id.to_string(),
    ])
    .with_params(merge(defaults, options))
}

pub fn delete_collaborator(app_id: impl fmt::Display, collaborator_id: impl fmt::Display) -> Operation {
    Operation::delete([
        "apps".to_string(),
        app_id.to_string(),
        "collaborators".to_string(),
        collaborator_id.to_string(),
    ])
}

// ---------------------------------------------------------------------------
// Signing keys
// ---------------------------------------------------------------------------

/// Prefer the platform-specific helpers, which know the required fields.
pub fn add_key_platform(platform: Platform, options: Params) -> Operation {
    Operation::post(["keys", platform.as_str()]).with_params(options)
}

/// Upload an Android keystore. `alias`, `key_pw` and `keystore_pw` may be
/// passed in `options`.
pub fn add_key_android(title: &str, keystore: impl AsRef<Path>, options: Params) -> Operation {
    let defaults = params([("title", title.into()), ("keystore", ParamValue::file(keystore))]);
    add_key_platform(Platform::Android, merge(defaults, options))
}

/// Upload an iOS p12 certificate and provisioning profile.
pub fn add_key_ios(
    title: &str,
    cert: impl AsRef<Path>,
    profile: impl AsRef<Path>,
    options: Params,
) -> Operation {
    let defaults = params([
        ("title", title.into()),
        ("cert", ParamValue::file(cert)),
        ("profile", ParamValue::file(profile)),
    ]);
    add_key_platform(Platform::Ios, merge(defaults, options))
}

/// Update or unlock a key.
pub fn update_key_platform(platform: Platform, key_id: impl fmt::Display, options: Params) -> Operation {
    Operation::put(["keys".to_string(), platform.to_string(), key_id.to_string()]).with_params(options)
}

pub fn update_key_ios(key_id: impl fmt::Display, password: &str) -> Operation {
    update_key_platform(Platform::Ios, key_id, params([("password", password.into())]))
}

pub fn update_key_android(key_id: impl fmt::Display, key_pw: &str, keystore_pw: &str) -> Operation {
    update_key_platform(
        Platform::Android,
        key_id,
        params([("key_pw", key_pw.into()), ("keystore_pw", keystore_pw.into())]),
    )
}

pub fn delete_key_platform(platform: Platform, key_id: impl fmt::Display) -> Operation {
    Operation::delete(["keys".to_string(), platform.to_string(), key_id.to_string()])
}
