use core::fmt;

#[derive(Debug)]
pub enum PlnError {
    ReqwestError(reqwest::Error),
    JsonError(serde_json::Error),
    MalformedInput(String),
    Overflow(&'static str),
}

impl PlnError {
    /// Timeouts, connection failures and 5xx/429 responses are worth another attempt.
    /// A request that could not be built, such as one with a bad base URL, is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            PlnError::ReqwestError(e) => match e.status() {
                Some(status) => status.is_server_error() || status.as_u16() == 429,
                None => !e.is_decode() && !e.is_builder(),
            },
            _ => false,
        }
    }
}

impl fmt::Display for PlnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlnError::ReqwestError(e) => write!(f, "Reqwest error: {}", e),
            PlnError::JsonError(e) => write!(f, "JSON error: {}", e),
            PlnError::MalformedInput(e) => write!(f, "Malformed input: {}", e),
            PlnError::Overflow(what) => write!(f, "Arithmetic overflow in {}", what),
        }
    }
}

impl std::error::Error for PlnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlnError::ReqwestError(e) => Some(e),
            PlnError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PlnError {
    fn from(error: reqwest::Error) -> Self {
        PlnError::ReqwestError(error)
    }
}

impl From<serde_json::Error> for PlnError {
    fn from(error: serde_json::Error) -> Self {
        PlnError::JsonError(error)
    }
}
