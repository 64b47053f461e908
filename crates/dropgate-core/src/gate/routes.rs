/// Public pages reachable without a session. Signed-in users are bounced off them.
pub const AUTH_PAGES: [&str; 4] = ["/", "/auth/signin", "/auth/signup", "/auth/verify-otp"];

pub const SIGN_IN_PAGE: &str = "/auth/signin";

pub const VENDOR_PREFIX: &str = "/vendor";

pub const AGENT_PREFIX: &str = "/agent";

/// Framework-internal prefixes that never reach the gate by default
pub const DEFAULT_BYPASS_PREFIXES: [&str; 2] = ["/api", "/_next"];

/// Access-control category of a request path. Exactly one applies per path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Anything with a `.` in it: static files, favicons, sitemaps.
    Asset,
    /// Framework or API routes excluded from gating.
    Internal,
    Auth,
    Vendor,
    Agent,
    Other,
}

impl RouteClass {
    /// Whether the gate leaves this class alone entirely.
    pub fn is_bypassed(self) -> bool {
        matches!(self, RouteClass::Asset | RouteClass::Internal)
    }
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    bypass_prefixes: Vec<String>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(DEFAULT_BYPASS_PREFIXES.iter().map(|p| p.to_string()))
    }
}

impl RouteTable {
    pub fn new<I>(bypass_prefixes: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let bypass_prefixes = bypass_prefixes
            .into_iter()
            .map(|p| p.trim().trim_end_matches('/').to_string())
            .filter(|p| p.starts_with('/') && p.len() > 1)
            .collect();
        Self { bypass_prefixes }
    }

    pub fn bypass_prefixes(&self) -> &[String] {
        &self.bypass_prefixes
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        if path.contains('.') {
            return RouteClass::Asset;
        }
        if self.bypass_prefixes.iter().any(|p| under_segment(path, p)) {
            return RouteClass::Internal;
        }
        if is_auth_page(path) {
            RouteClass::Auth
        } else if path.starts_with(VENDOR_PREFIX) {
            RouteClass::Vendor
        } else if path.starts_with(AGENT_PREFIX) {
            RouteClass::Agent
        } else {
            RouteClass::Other
        }
    }
}

pub fn is_auth_page(path: &str) -> bool {
    AUTH_PAGES.contains(&path)
}

/// `/auth/signin?next=<path+query>` with the original target URL-encoded.
pub fn sign_in_location(path: &str, query: Option<&str>) -> String {
    let next = match query.filter(|q| !q.is_empty()) {
        Some(q) => format!("{}?{}", path, q),
        None => path.to_string(),
    };
    format!("{}?next={}", SIGN_IN_PAGE, urlencoding::encode(&next))
}

fn under_segment(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
