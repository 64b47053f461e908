//! The edge gatekeeper.
//!
//! `Gatekeeper::evaluate` turns an incoming navigation into a pass-through or
//! a redirect. Whatever it decides, cookies written while deciding (a
//! credential rotation) ride along on the response.

use std::sync::Arc;

use tracing::debug;

use crate::api::ApiClient;
use crate::auth::{CredentialStore, ExecutionContext, RequestCookieStore, SetCookie};
use crate::models::Identity;

use super::routes::{sign_in_location, RouteClass, RouteTable, AGENT_PREFIX, VENDOR_PREFIX};

/// The parts of an incoming request the gate looks at.
#[derive(Debug, Clone, Default)]
pub struct GateRequest {
    pub path: String,
    /// Query string without the leading `?`.
    pub query: Option<String>,
    /// Raw `Cookie` header.
    pub cookie_header: Option<String>,
    /// Whether the request arrived over HTTPS; sets `Secure` on rotated cookies.
    pub secure: bool,
}

impl GateRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_cookies(mut self, cookie_header: impl Into<String>) -> Self {
        self.cookie_header = Some(cookie_header.into());
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Let the request continue to the page.
    Next,
    /// Send the browser elsewhere. The location is a same-origin path.
    Redirect(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResponse {
    pub decision: GateDecision,
    /// `Set-Cookie` entries to attach, whichever way the decision went.
    pub cookies: Vec<SetCookie>,
}

impl GateResponse {
    pub fn next() -> Self {
        Self {
            decision: GateDecision::Next,
            cookies: Vec::new(),
        }
    }

    pub fn is_next(&self) -> bool {
        self.decision == GateDecision::Next
    }

    pub fn location(&self) -> Option<&str> {
        match &self.decision {
            GateDecision::Redirect(location) => Some(location),
            GateDecision::Next => None,
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&SetCookie> {
        self.cookies.iter().find(|c| c.name == name)
    }
}

/// Auth and role routing in front of every page.
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    api: ApiClient,
    routes: RouteTable,
}

impl Gatekeeper {
    /// `api` supplies the connection pool and base URL; each evaluation gets
    /// its own request-scoped credential store.
    pub fn new(api: ApiClient, routes: RouteTable) -> Self {
        Self { api, routes }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub async fn evaluate(&self, request: &GateRequest) -> GateResponse {
        let class = self.routes.classify(&request.path);
        if class.is_bypassed() {
            return GateResponse::next();
        }

        let store = Arc::new(RequestCookieStore::from_cookie_header(
            request.cookie_header.as_deref(),
            request.secure,
        ));
        let decision = self.decide(request, class, &store).await;
        let cookies = store.pending_cookies();

        debug!(
            path = %request.path,
            class = ?class,
            decision = ?decision,
            rotated = !cookies.is_empty(),
            "Gate evaluated"
        );

        GateResponse { decision, cookies }
    }

    async fn decide(
        &self,
        request: &GateRequest,
        class: RouteClass,
        store: &Arc<RequestCookieStore>,
    ) -> GateDecision {
        if store.access_token().is_none() {
            return if class == RouteClass::Auth {
                GateDecision::Next
            } else {
                GateDecision::Redirect(sign_in_location(&request.path, request.query.as_deref()))
            };
        }

        let api = self
            .api
            .with_credentials(ExecutionContext::Server, store.clone());

        let identity = match api.current_identity().await {
            Ok(identity) => identity,
            Err(e) if e.is_unauthorized() && store.refresh_token().is_some() => {
                if !api.refresh_credentials().await {
                    return sign_in_fallback(request, class);
                }
                // The store now shadows the old access credential with the rotated one.
                match api.current_identity().await {
                    Ok(identity) => identity,
                    Err(e) => {
                        debug!(error = %e, path = %request.path, "Identity lookup failed after refresh");
                        return sign_in_fallback(request, class);
                    }
                }
            }
            Err(e) => {
                debug!(error = %e, path = %request.path, "Identity lookup failed");
                return sign_in_fallback(request, class);
            }
        };

        role_gate(class, &identity)
    }
}

/// Sign-in redirect for a failed lookup; auth pages pass through to avoid a loop.
fn sign_in_fallback(request: &GateRequest, class: RouteClass) -> GateDecision {
    if class == RouteClass::Auth {
        GateDecision::Next
    } else {
        GateDecision::Redirect(sign_in_location(&request.path, request.query.as_deref()))
    }
}

/// Role routing once the identity is known.
pub fn role_gate(class: RouteClass, identity: &Identity) -> GateDecision {
    match class {
        RouteClass::Auth => match identity.home_path() {
            Some(home) => GateDecision::Redirect(home.to_string()),
            None => GateDecision::Next,
        },
        RouteClass::Vendor if !identity.is_vendor => GateDecision::Redirect(AGENT_PREFIX.to_string()),
        RouteClass::Agent if !identity.is_agent => GateDecision::Redirect(VENDOR_PREFIX.to_string()),
        _ => GateDecision::Next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vendor() -> Identity {
        Identity { is_vendor: true, ..Default::default() }
    }

    fn agent() -> Identity {
        Identity { is_agent: true, ..Default::default() }
    }

    #[test]
    fn test_auth_pages_send_users_home() {
        assert_eq!(role_gate(RouteClass::Auth, &vendor()), GateDecision::Redirect("/vendor".into()));
        assert_eq!(role_gate(RouteClass::Auth, &agent()), GateDecision::Redirect("/agent".into()));
        assert_eq!(role_gate(RouteClass::Auth, &Identity::default()), GateDecision::Next);
    }

    #[test]
    fn test_role_scopes_are_enforced() {
        assert_eq!(role_gate(RouteClass::Vendor, &agent()), GateDecision::Redirect("/agent".into()));
        assert_eq!(role_gate(RouteClass::Agent, &vendor()), GateDecision::Redirect("/vendor".into()));
        assert_eq!(role_gate(RouteClass::Vendor, &vendor()), GateDecision::Next);
        assert_eq!(role_gate(RouteClass::Agent, &agent()), GateDecision::Next);
    }

    #[test]
    fn test_other_routes_pass() {
        assert_eq!(role_gate(RouteClass::Other, &vendor()), GateDecision::Next);
        assert_eq!(role_gate(RouteClass::Other, &Identity::default()), GateDecision::Next);
    }

    #[test]
    fn test_fallback_keeps_auth_pages_reachable() {
        let on_signin = GateRequest::new("/auth/signin");
        assert_eq!(sign_in_fallback(&on_signin, RouteClass::Auth), GateDecision::Next);

        let on_orders = GateRequest::new("/vendor/orders").with_query("tab=open");
        assert_eq!(
            sign_in_fallback(&on_orders, RouteClass::Vendor),
            GateDecision::Redirect("/auth/signin?next=%2Fvendor%2Forders%3Ftab%3Dopen".into())
        );
    }
}
