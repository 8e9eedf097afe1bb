use http::StatusCode;

/// Domain error that knows how it should look on the wire
///
/// Only used before a response has started; once a chat stream is
/// running, errors travel in-band as JSON lines instead.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `invalid_request_error`)
    fn error_type(&self) -> &str;

    /// Message safe to show to the browser
    fn client_message(&self) -> String;
}
