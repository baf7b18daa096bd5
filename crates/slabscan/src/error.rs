use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlabscanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),

    #[error("Schema error: {0}")]
    Schema(#[from] crate::schema::SchemaError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Invalid image payload: {reason}")]
    InvalidImage { reason: String },

    #[error("Failed to send provider request: {0}")]
    Request(String),

    #[error("Provider rejected the request with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Provider stream failed: {0}")]
    Stream(String),

    #[error("Provider response was not decodable: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No images selected")]
    NoImagesSelected,

    #[error("A submission is already in flight")]
    SubmissionInFlight,

    #[error("Relay rejected the request ({status}): {message}")]
    Relay { status: u16, message: String },

    #[error("Transport failure: {0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Failed to read image file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not an image file: {path}")]
    NotAnImage { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, SlabscanError>;
