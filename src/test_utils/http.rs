use axum::{
    body::Body,
    http::{StatusCode, header::LOCATION},
    response::Response,
};

#[track_caller]
pub(crate) fn get_header(response: &Response<Body>, header_name: &str) -> String {
    match response.headers().get(header_name) {
        Some(value) => value
            .to_str()
            .unwrap_or_else(|error| panic!("header {header_name} is not ASCII: {error}"))
            .to_owned(),
        None => panic!(
            "response has no {header_name} header, got headers {:?}",
            response.headers()
        ),
    }
}

#[track_caller]
pub(crate) fn assert_status_ok(response: &Response<Body>) {
    assert_eq!(response.status(), StatusCode::OK);
}

#[track_caller]
pub(crate) fn assert_content_type(response: &Response<Body>, content_type: &str) {
    assert_eq!(get_header(response, "content-type"), content_type);
}

/// Assert a plain 303 redirect to `location`, as sent to page requests.
#[track_caller]
pub(crate) fn assert_redirect(response: &Response<Body>, location: &str) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(get_header(response, LOCATION.as_str()), location);
}

/// Assert the redirect that htmx follows on the client.
#[track_caller]
pub(crate) fn assert_hx_redirect(response: &Response<Body>, endpoint: &str) {
    assert_eq!(get_header(response, "hx-redirect"), endpoint);
}

/// Read the whole body of `response` as UTF-8 text.
pub(crate) async fn read_body_text(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_else(|error| panic!("could not read response body: {error}"));

    String::from_utf8_lossy(&body).into_owned()
}
