use thiserror::Error;
use wasm_bindgen::JsValue;

use crate::dom::js_error_message;

/// Failures of the browser shell. None of them stop a running countdown;
/// callers log and carry on.
#[derive(Debug, Error)]
pub enum WebError {
    #[error("`window` is not available in this context")]
    MissingWindow,
    #[error("`document` is not available in this context")]
    MissingDocument,
    #[error("DOM operation `{op}` failed: {message}")]
    Dom { op: &'static str, message: String },
    #[error("logger already installed")]
    Logger(#[from] log::SetLoggerError),
}

impl WebError {
    /// Wrap a thrown JavaScript value with the name of the failing operation.
    #[must_use]
    pub fn dom(op: &'static str, value: &JsValue) -> Self {
        Self::Dom {
            op,
            message: js_error_message(value),
        }
    }
}

impl From<WebError> for JsValue {
    fn from(err: WebError) -> Self {
        Self::from_str(&err.to_string())
    }
}

/// Extension for turning `Result<T, JsValue>` into `Result<T, WebError>`.
pub trait DomResultExt<T> {
    /// # Errors
    ///
    /// Returns [`WebError::Dom`] carrying `op` when the result is an error.
    fn dom_op(self, op: &'static str) -> Result<T, WebError>;
}

impl<T> DomResultExt<T> for Result<T, JsValue> {
    fn dom_op(self, op: &'static str) -> Result<T, WebError> {
        self.map_err(|value| WebError::dom(op, &value))
    }
}

/// Log a failed DOM call at `warn` and drop the error.
pub fn warn_on_err<T>(result: Result<T, JsValue>, op: &'static str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(value) => {
            log::warn!("{}", WebError::dom(op, &value));
            None
        }
    }
}
