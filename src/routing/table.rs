//! Route table
//!
//! Routers are tried in registration order. A router first matches its
//! mount prefix, then the method and the remaining path against its own
//! routes. Literal segments compare case-insensitively, one trailing slash
//! is ignored, and `:name` captures a single non-empty segment. Captures
//! are matched raw and percent-decoded afterwards.

use hyper::Method;
use std::collections::HashMap;

/// Terminal handlers a route can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    ListUsers,
    CreateUser,
    UpdateUser,
    DeleteUser,
    ListProducts,
    Upload,
}

#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: String,
    pub endpoint: Endpoint,
}

/// Routes mounted under a common path prefix
#[derive(Debug, Clone)]
pub struct Router {
    prefix: String,
    routes: Vec<Route>,
}

impl Router {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            routes: Vec::new(),
        }
    }

    #[must_use]
    pub fn route(mut self, method: Method, pattern: &str, endpoint: Endpoint) -> Self {
        self.routes.push(Route {
            method,
            pattern: pattern.to_string(),
            endpoint,
        });
        self
    }

    fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let rest = strip_mount_prefix(path, &self.prefix)?;
        self.routes
            .iter()
            .filter(|route| method_matches(&route.method, method))
            .find_map(|route| {
                match_pattern(&route.pattern, rest).map(|params| RouteMatch {
                    endpoint: route.endpoint,
                    params,
                })
            })
    }
}

/// A resolved route with its captured parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub endpoint: Endpoint,
    /// Captures as they appeared in the request path
    pub params: HashMap<String, String>,
}

impl RouteMatch {
    /// Percent-decode every capture; the error carries the raw value that failed
    pub fn decoded_params(&self) -> Result<HashMap<String, String>, String> {
        self.params
            .iter()
            .map(|(name, raw)| match urlencoding::decode(raw) {
                Ok(value) => Ok((name.clone(), value.into_owned())),
                Err(_) => Err(raw.clone()),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routers: Vec<Router>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mount(mut self, router: Router) -> Self {
        self.routers.push(router);
        self
    }

    /// The server's routes: the users sub-router, then the app-level routes
    pub fn standard() -> Self {
        let users = Router::new("/api/users")
            .route(Method::GET, "/", Endpoint::ListUsers)
            .route(Method::POST, "/", Endpoint::CreateUser)
            .route(Method::PUT, "/:id", Endpoint::UpdateUser)
            .route(Method::DELETE, "/:id", Endpoint::DeleteUser);

        let app = Router::new("")
            .route(Method::GET, "/api/products", Endpoint::ListProducts)
            .route(Method::POST, "/upload", Endpoint::Upload);

        Self::new().mount(users).mount(app)
    }

    /// First match across routers in registration order
    pub fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.routers
            .iter()
            .find_map(|router| router.resolve(method, path))
    }
}

/// GET routes also answer HEAD
fn method_matches(route_method: &Method, method: &Method) -> bool {
    route_method == method || (*route_method == Method::GET && *method == Method::HEAD)
}

/// Remaining path after the mount prefix, only at a segment boundary
fn strip_mount_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path);
    }
    let head = path.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = &path[prefix.len()..];
    (rest.is_empty() || rest.starts_with('/')).then_some(rest)
}

fn match_pattern(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let path = normalize(path);
    let pattern = normalize(pattern);

    let path_segments: Vec<&str> = path.split('/').skip(1).collect();
    let pattern_segments: Vec<&str> = pattern.split('/').skip(1).collect();
    if path_segments.len() != pattern_segments.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (pat, seg) in pattern_segments.iter().zip(&path_segments) {
        if let Some(name) = pat.strip_prefix(':') {
            if seg.is_empty() {
                return None;
            }
            params.insert(name.to_string(), (*seg).to_string());
        } else if !pat.eq_ignore_ascii_case(seg) {
            return None;
        }
    }
    Some(params)
}

fn normalize(path: &str) -> &str {
    let trimmed = if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    };
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(method: Method, path: &str) -> Option<RouteMatch> {
        RouteTable::standard().resolve(&method, path)
    }

    #[test]
    fn test_users_sub_router() {
        assert_eq!(resolve(Method::GET, "/api/users").unwrap().endpoint, Endpoint::ListUsers);
        assert_eq!(resolve(Method::GET, "/api/users/").unwrap().endpoint, Endpoint::ListUsers);
        assert_eq!(resolve(Method::POST, "/api/users").unwrap().endpoint, Endpoint::CreateUser);
        assert_eq!(resolve(Method::HEAD, "/api/users").unwrap().endpoint, Endpoint::ListUsers);
    }

    #[test]
    fn test_param_capture() {
        let m = resolve(Method::PUT, "/api/users/42").unwrap();
        assert_eq!(m.endpoint, Endpoint::UpdateUser);
        assert_eq!(m.params["id"], "42");
        assert_eq!(m.decoded_params().unwrap()["id"], "42");

        let m = resolve(Method::DELETE, "/api/users/Ada%20L").unwrap();
        assert_eq!(m.endpoint, Endpoint::DeleteUser);
        assert_eq!(m.params["id"], "Ada%20L");
        assert_eq!(m.decoded_params().unwrap()["id"], "Ada L");
    }

    #[test]
    fn test_param_invalid_utf8_fails_decoding() {
        let m = resolve(Method::PUT, "/api/users/%ff").unwrap();
        assert_eq!(m.decoded_params().unwrap_err(), "%ff");
    }

    #[test]
    fn test_case_insensitive_literals() {
        assert!(resolve(Method::GET, "/API/Users").is_some());
        assert!(resolve(Method::GET, "/api/PRODUCTS").is_some());
    }

    #[test]
    fn test_prefix_only_at_segment_boundary() {
        assert!(resolve(Method::GET, "/api/usersx").is_none());
        assert!(resolve(Method::GET, "/api").is_none());
    }

    #[test]
    fn test_method_mismatch_and_extra_segments() {
        assert!(resolve(Method::PUT, "/api/users").is_none());
        assert!(resolve(Method::GET, "/api/users/42").is_none());
        assert!(resolve(Method::PUT, "/api/users/42/extra").is_none());
        assert!(resolve(Method::GET, "/upload").is_none());
        assert_eq!(resolve(Method::POST, "/upload").unwrap().endpoint, Endpoint::Upload);
    }

    #[test]
    fn test_registration_order_wins() {
        let table = RouteTable::new()
            .mount(Router::new("/a").route(Method::GET, "/:x", Endpoint::ListUsers))
            .mount(Router::new("").route(Method::GET, "/a/b", Endpoint::ListProducts));
        assert_eq!(table.resolve(&Method::GET, "/a/b").unwrap().endpoint, Endpoint::ListUsers);
    }
}
