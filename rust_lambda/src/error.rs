use thiserror::Error;

/// Ways a single invocation can fail. None of them are retried locally.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("failed to decode S3 key: {0}")]
    Decoding(String),

    #[error("failed to index new face: {0}")]
    Index(String),

    #[error("no faces were indexed from s3://{bucket}/{key}")]
    EmptyResult { bucket: String, key: String },

    #[error("REKOGNITION_COLLECTION_ID is not set and the index request failed: {0}")]
    MissingCollection(String),

    #[error("indexed face record has no {0}")]
    IncompleteFaceRecord(&'static str),

    #[error("S3 event carries no record with a bucket and key")]
    EmptyEvent,

    #[error("invocation deadline exceeded while indexing faces")]
    DeadlineExceeded,

    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),
}
