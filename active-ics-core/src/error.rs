use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Ambiguous recurrence definition for UID {uid}: {reason}")]
    AmbiguousRecurrenceDefinition { uid: String, reason: String },

    #[error("Recurrence dates without a recurrence rule are not supported (UID {0})")]
    UnsupportedRdateOnlyRecurrence(String),

    #[error("Invalid recurrence rule format: {0}")]
    InvalidRuleFormat(String),

    #[error("Unsupported recurrence frequency: {0}")]
    UnsupportedFrequency(String),

    #[error("Unsupported recurrence rule part: {0}")]
    UnsupportedRulePart(String),

    #[error("ICS parsing failed: {0}")]
    Ics(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date/time parsing failed: {0}")]
    DateTime(#[from] chrono::ParseError),

    #[error("Calendar source error: {source_name} - {message}")]
    Source {
        source_name: String,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 错误是否来自日历数据本身（而非加载过程）
    pub const fn is_calendar_error(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousRecurrenceDefinition { .. }
                | Self::UnsupportedRdateOnlyRecurrence(_)
                | Self::InvalidRuleFormat(_)
                | Self::UnsupportedFrequency(_)
                | Self::UnsupportedRulePart(_)
                | Self::Ics(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
