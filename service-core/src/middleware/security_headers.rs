use axum::{extract::Request, http::header, middleware::Next, response::IntoResponse};

/// Attach standard security headers to every response.
///
/// Swagger UI needs inline scripts and same-origin framing, so its routes get
/// a relaxed content-security policy; API routes get the strict one.
pub async fn security_headers_middleware(req: Request, next: Next) -> impl IntoResponse {
    let path = req.uri().path();
    let is_docs_route = path.starts_with("/docs") || path == "/api-docs/openapi.json";

    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        header::HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        header::HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );

    let (csp, framing) = if is_docs_route {
        (
            "default-src 'self'; script-src 'self' 'unsafe-inline'; \
             style-src 'self' 'unsafe-inline'; img-src 'self' data:",
            "SAMEORIGIN",
        )
    } else {
        ("default-src 'none'; frame-ancestors 'none'", "DENY")
    };

    if let Ok(value) = header::HeaderValue::from_str(csp) {
        headers.insert(header::CONTENT_SECURITY_POLICY, value);
    }
    headers.insert(
        header::X_FRAME_OPTIONS,
        header::HeaderValue::from_static(framing),
    );

    response
}
