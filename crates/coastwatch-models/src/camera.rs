//! Camera identity, connection parameters and status.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

/// Default HTTP port of the camera boards.
pub const DEFAULT_CAMERA_PORT: u16 = 80;

/// Unique identifier for a camera.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CameraId(pub String);

impl CameraId {
    /// Create from an existing string.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CameraId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CameraId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Basic-auth credentials for a camera.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Errors raised when validating a camera handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraHandleError {
    #[error("camera id must not be empty")]
    EmptyId,

    #[error("camera address must not be empty")]
    EmptyAddress,

    #[error("camera port must be non-zero")]
    InvalidPort,

    #[error("camera address does not form a valid URL: {0}")]
    InvalidUrl(String),
}

/// Identity and connection parameters for one camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CameraHandle {
    /// Unique camera ID
    pub camera_id: CameraId,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Beach / site the camera overlooks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Host name or IP address
    pub address: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Optional basic-auth credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

fn default_port() -> u16 {
    DEFAULT_CAMERA_PORT
}

impl CameraHandle {
    /// Create a handle on the default port without credentials.
    pub fn new(camera_id: impl Into<CameraId>, address: impl Into<String>) -> Self {
        Self {
            camera_id: camera_id.into(),
            name: None,
            location: None,
            address: address.into(),
            port: DEFAULT_CAMERA_PORT,
            credentials: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Base URL of the camera's HTTP interface.
    pub fn base_url(&self) -> Result<Url, CameraHandleError> {
        let raw = format!("http://{}:{}/", self.address.trim(), self.port);
        Url::parse(&raw).map_err(|e| CameraHandleError::InvalidUrl(format!("{raw}: {e}")))
    }

    /// Validate the handle before registration.
    pub fn validate(&self) -> Result<(), CameraHandleError> {
        if self.camera_id.as_str().trim().is_empty() {
            return Err(CameraHandleError::EmptyId);
        }
        if self.address.trim().is_empty() {
            return Err(CameraHandleError::EmptyAddress);
        }
        if self.port == 0 {
            return Err(CameraHandleError::InvalidPort);
        }
        self.base_url().map(|_| ())
    }
}

/// Lifecycle state of a camera's analysis loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    #[default]
    Stopped,
    Running,
}

impl LoopState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopState::Stopped => "stopped",
            LoopState::Running => "running",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, LoopState::Running)
    }
}

/// Point-in-time status of one registered camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CameraStatus {
    pub camera_id: CameraId,
    pub address: String,
    pub port: u16,
    /// Camera answered a connectivity probe
    pub connected: bool,
    /// Frame pump is running
    pub streaming: bool,
    /// Analysis loop is running
    pub analyzing: bool,
    /// At least one analysis result exists
    pub has_result: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_defaults_and_url() {
        let handle = CameraHandle::new("karasu_1", "192.168.1.100");
        assert_eq!(handle.port, 80);
        assert!(handle.validate().is_ok());
        assert_eq!(
            handle.base_url().unwrap().as_str(),
            "http://192.168.1.100/"
        );

        let custom = handle.with_port(8080);
        assert_eq!(custom.base_url().unwrap().as_str(), "http://192.168.1.100:8080/");
    }

    #[test]
    fn test_handle_validation_errors() {
        assert_eq!(
            CameraHandle::new("", "10.0.0.1").validate(),
            Err(CameraHandleError::EmptyId)
        );
        assert_eq!(
            CameraHandle::new("cam", "  ").validate(),
            Err(CameraHandleError::EmptyAddress)
        );
        assert_eq!(
            CameraHandle::new("cam", "10.0.0.1").with_port(0).validate(),
            Err(CameraHandleError::InvalidPort)
        );
        assert!(matches!(
            CameraHandle::new("cam", "bad host/name").validate(),
            Err(CameraHandleError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_handle_deserialize_default_port() {
        let json = r#"{"camera_id": "florya_1", "address": "192.168.1.102"}"#;
        let handle: CameraHandle = serde_json::from_str(json).unwrap();
        assert_eq!(handle.camera_id.as_str(), "florya_1");
        assert_eq!(handle.port, DEFAULT_CAMERA_PORT);
        assert!(handle.credentials.is_none());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("admin", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }
}
