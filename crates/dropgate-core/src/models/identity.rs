use serde::{Deserialize, Serialize};

/// The authenticated user as reported by `GET /users/me`.
///
/// Only the role flags drive routing; the remaining fields are carried for
/// display and are optional because the backend omits them for some accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub is_vendor: bool,
    #[serde(default)]
    pub is_agent: bool,
}

impl Identity {
    /// Landing page for this identity's role. Vendor wins when both flags are set.
    pub fn home_path(&self) -> Option<&'static str> {
        if self.is_vendor {
            Some("/vendor")
        } else if self.is_agent {
            Some("/agent")
        } else {
            None
        }
    }

    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("").trim();
        let last = self.last_name.as_deref().unwrap_or("").trim();
        match (first.is_empty(), last.is_empty()) {
            (false, false) => format!("{} {}", first, last),
            (false, true) => first.to_string(),
            (true, false) => last.to_string(),
            (true, true) => self.email.clone().unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_users_me() {
        let json = r#"{"id":"6a1f","email":"ada@shop.ng","firstName":"Ada","lastName":"Obi","isVendor":true,"isAgent":false,"phone":"0800"}"#;
        let identity: Identity = serde_json::from_str(json).expect("Failed to parse identity JSON");
        assert!(identity.is_vendor);
        assert!(!identity.is_agent);
        assert_eq!(identity.display_name(), "Ada Obi");
    }

    #[test]
    fn test_missing_flags_default_to_false() {
        let identity: Identity = serde_json::from_str(r#"{"email":"x@y.z"}"#).unwrap();
        assert!(!identity.is_vendor);
        assert!(!identity.is_agent);
        assert_eq!(identity.home_path(), None);
        assert_eq!(identity.display_name(), "x@y.z");
    }

    #[test]
    fn test_home_path() {
        let vendor = Identity { is_vendor: true, ..Default::default() };
        let agent = Identity { is_agent: true, ..Default::default() };
        let both = Identity { is_vendor: true, is_agent: true, ..Default::default() };
        assert_eq!(vendor.home_path(), Some("/vendor"));
        assert_eq!(agent.home_path(), Some("/agent"));
        assert_eq!(both.home_path(), Some("/vendor"));
    }
}
