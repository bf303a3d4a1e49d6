use thiserror::Error;

/// 统一错误类型
#[derive(Error, Debug)]
pub enum IsgError {
    #[error("No candidate register: categories={categories}, exclusions={exclusions}")]
    NoCandidateRegister {
        categories: String,
        exclusions: String,
    },

    #[error("No matching instruction: {filters}")]
    NoMatchingInstruction { filters: String },

    /// 内部契约被破坏（属于程序缺陷，而不是运行时条件）
    #[error("Internal contract violation: {message}")]
    Internal { message: String },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("File operation error: {message}")]
    File { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl IsgError {
    pub fn no_candidate_register<S: Into<String>>(categories: S, exclusions: S) -> Self {
        Self::NoCandidateRegister {
            categories: categories.into(),
            exclusions: exclusions.into(),
        }
    }

    pub fn no_matching_instruction<S: Into<String>>(filters: S) -> Self {
        Self::NoMatchingInstruction {
            filters: filters.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn file<S: Into<String>>(message: S) -> Self {
        Self::File {
            message: message.into(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Simplified Result type alias
pub type Result<T> = std::result::Result<T, IsgError>;
