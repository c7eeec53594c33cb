use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskverseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not authenticated. Run 'taskverse init' or set 'user' in the config file")]
    NotAuthenticated,

    #[error("Not authorized: you are not a member of this organization")]
    NotAuthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Issue not found: {0}")]
    IssueNotFound(String),

    #[error("Status not found: {0}")]
    StatusNotFound(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Organization not found: {0}")]
    OrganizationNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Member not found: {0}")]
    MemberNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write config file at {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read store file at {path}: {source}")]
    StoreRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse store file at {path}: {source}")]
    StoreParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write store file at {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Request timed out")]
    Timeout,

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("No store found. Run 'taskverse init' to create one")]
    NoStore,
}

pub type Result<T> = std::result::Result<T, TaskverseError>;
