use thiserror::Error;

/// Stable classification of every failure the pipeline can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    UpstreamUnavailable,
    NoCaptionsAvailable,
    MalformedUpstreamData,
    EmptyContent,
    Configuration,
    SchemaViolation,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid YouTube URL: {0}")]
    InvalidVideoReference(String),

    #[error("Failed to fetch YouTube page: {0}")]
    PageUnavailable(String),

    #[error("Video unavailable: {0}")]
    VideoUnavailable(String),

    #[error("{0}")]
    NoCaptions(String),

    #[error("Failed to parse caption data: {0}")]
    CaptionParse(String),

    #[error("No transcript text found")]
    EmptyTranscript,

    #[error("API key is not configured: set {0}")]
    ApiKeyMissing(String),

    #[error("Gemini request failed: {0}")]
    UpstreamRequest(String),

    #[error("Failed to process video insights: {0}")]
    SchemaViolation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn no_captions() -> Self {
        Error::NoCaptions("No captions available for this video".to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidVideoReference(_) => ErrorKind::Validation,
            Error::PageUnavailable(_) | Error::UpstreamRequest(_) => ErrorKind::UpstreamUnavailable,
            Error::VideoUnavailable(_) | Error::NoCaptions(_) => ErrorKind::NoCaptionsAvailable,
            Error::CaptionParse(_) => ErrorKind::MalformedUpstreamData,
            Error::EmptyTranscript => ErrorKind::EmptyContent,
            Error::ApiKeyMissing(_) => ErrorKind::Configuration,
            Error::SchemaViolation(_) => ErrorKind::SchemaViolation,
        }
    }

    /// True for failures raised while acquiring a transcript
    pub fn is_transcript_failure(&self) -> bool {
        matches!(
            self,
            Error::PageUnavailable(_)
                | Error::VideoUnavailable(_)
                | Error::NoCaptions(_)
                | Error::CaptionParse(_)
                | Error::EmptyTranscript
        )
    }
}
