//! Outbound responses.

use crate::{Error, Issue};
use serde::Serialize;
use std::io::Cursor;
use tiny_http::{Header, Response};

pub const PNG_MEDIA_TYPE: &str = "image/png";

/// Terminal artifact of a successful render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
}

impl RenderedImage {
    pub fn png(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            media_type: PNG_MEDIA_TYPE,
        }
    }
}

pub type HttpResponse = Response<Cursor<Vec<u8>>>;

#[derive(Serialize)]
struct ValidationBody<'a> {
    success: bool,
    error: ValidationError<'a>,
}

#[derive(Serialize)]
struct ValidationError<'a> {
    name: &'static str,
    issues: &'a [Issue],
}

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

fn with_content_type(resp: HttpResponse, value: &str) -> HttpResponse {
    match header("Content-Type", value) {
        Some(h) => resp.with_header(h),
        None => resp,
    }
}

/// 200 with the image bytes as-is.
pub fn image_response(image: RenderedImage) -> HttpResponse {
    with_content_type(Response::from_data(image.bytes), image.media_type)
}

/// Map a pipeline error to its response: 400 + JSON issues for validation
/// failures, 500 with a short plain-text reason otherwise.
pub fn error_response(err: &Error) -> HttpResponse {
    match err {
        Error::Validation(issues) => {
            let body = ValidationBody {
                success: false,
                error: ValidationError {
                    name: "ValidationError",
                    issues,
                },
            };
            let json = serde_json::to_vec(&body).unwrap_or_else(|_| b"{\"success\":false}".to_vec());
            with_content_type(Response::from_data(json).with_status_code(400), "application/json")
        }
        other => with_content_type(
            Response::from_data(b"Internal Server Error".to_vec()).with_status_code(other.status_code()),
            "text/plain; charset=utf-8",
        ),
    }
}

pub fn not_found() -> HttpResponse {
    Response::from_data(b"404 Not Found".to_vec()).with_status_code(404)
}

pub fn method_not_allowed() -> HttpResponse {
    let resp = Response::from_data(b"405 Method Not Allowed".to_vec()).with_status_code(405);
    match header("Allow", "GET") {
        Some(h) => resp.with_header(h),
        None => resp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_type(resp: &HttpResponse) -> Option<String> {
        resp.headers()
            .iter()
            .find(|h| h.field.equiv("Content-Type"))
            .map(|h| h.value.as_str().to_string())
    }

    #[test]
    fn image_response_is_png() {
        let resp = image_response(RenderedImage::png(vec![1, 2, 3]));
        assert_eq!(resp.status_code().0, 200);
        assert_eq!(content_type(&resp).as_deref(), Some("image/png"));
        assert_eq!(resp.data_length(), Some(3));
    }

    #[test]
    fn validation_error_is_400_json() {
        let err = Error::Validation(vec![Issue::new("icon", "Invalid url")]);
        let resp = error_response(&err);
        assert_eq!(resp.status_code().0, 400);
        assert_eq!(content_type(&resp).as_deref(), Some("application/json"));
    }

    #[test]
    fn upstream_error_is_500() {
        let resp = error_response(&Error::StylesheetUnavailable("503".into()));
        assert_eq!(resp.status_code().0, 500);
    }
}
