//! `_method` override for HTML forms, which can only send GET and POST.
//!
//! Must wrap the router from outside: a layer added with `Router::layer` runs
//! after the route was already matched.

use axum::{
    extract::Request,
    http::Method,
    middleware::Next,
    response::Response,
};

/// Reads `_method` from the query string of a POST and rewrites the method
/// when it names PUT, PATCH or DELETE. Anything else is left untouched.
pub async fn method_override_middleware(mut req: Request, next: Next) -> Response {
    if req.method() == Method::POST {
        if let Some(method) = req.uri().query().and_then(override_from_query) {
            tracing::trace!(%method, path = %req.uri().path(), "Method override");
            *req.method_mut() = method;
        }
    }
    next.run(req).await
}

fn override_from_query(query: &str) -> Option<Method> {
    let value = query.split('&').find_map(|pair| pair.strip_prefix("_method="))?;
    match value.to_ascii_uppercase().as_str() {
        "PUT" => Some(Method::PUT),
        "PATCH" => Some(Method::PATCH),
        "DELETE" => Some(Method::DELETE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_from_query() {
        assert_eq!(override_from_query("_method=PUT"), Some(Method::PUT));
        assert_eq!(override_from_query("page=2&_method=delete"), Some(Method::DELETE));
        assert_eq!(override_from_query("_method=GET"), None);
        assert_eq!(override_from_query("_method=CONNECT"), None);
        assert_eq!(override_from_query("method=PUT"), None);
    }
}
