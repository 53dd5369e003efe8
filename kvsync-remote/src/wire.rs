//! Response envelope of the Cloudflare v4 API.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    pub result: Option<T>,
    pub result_info: Option<ResultInfo>,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResultInfo {
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KeyInfo {
    pub name: String,
}

impl<T> Envelope<T> {
    /// Joined error messages, for `success: false` envelopes.
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return "no error details".to_string();
        }
        self.errors
            .iter()
            .map(|e| format!("{} ({})", e.message, e.code))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Cursor for the next page, if any.
    pub fn next_cursor(&self) -> Option<&str> {
        self.result_info
            .as_ref()
            .and_then(|info| info.cursor.as_deref())
            .filter(|c| !c.is_empty())
    }
}
