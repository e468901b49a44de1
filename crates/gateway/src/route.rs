// SPDX-License-Identifier: MIT

//! Route table (§3 Route table, §4.5 C6): longest-prefix match from a URL
//! prefix to a backend's base URL, plus the reserved `/service/*` prefix
//! the gateway answers itself.

/// Prefix the gateway reserves for its own internal status/health surface.
pub const SERVICE_PREFIX: &str = "/service";

#[derive(Debug, Clone)]
pub struct Route {
    pub prefix: String,
    pub target_base_url: String,
}

/// Mapping from URL prefix to backend target URL. Exactly one route
/// matches any given request path — the longest prefix wins, and inserting
/// a prefix that already exists replaces its target rather than creating a
/// tie.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn insert(&mut self, prefix: impl Into<String>, target_base_url: impl Into<String>) {
        let prefix = prefix.into();
        if let Some(existing) = self.routes.iter_mut().find(|r| r.prefix == prefix) {
            existing.target_base_url = target_base_url.into();
            return;
        }
        self.routes.push(Route {
            prefix,
            target_base_url: target_base_url.into(),
        });
    }

    /// Longest matching prefix for `path`, or `None` if nothing matches.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .filter(|route| path.starts_with(route.prefix.as_str()))
            .max_by_key(|route| route.prefix.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_prefix_wins() {
        let mut table = RouteTable::new();
        table.insert("/", "http://127.0.0.1:4000");
        table.insert("/api", "http://127.0.0.1:4100");

        assert_eq!(
            table.resolve("/api/threads").unwrap().target_base_url,
            "http://127.0.0.1:4100"
        );
        assert_eq!(
            table.resolve("/assets/app.js").unwrap().target_base_url,
            "http://127.0.0.1:4000"
        );
    }

    #[test]
    fn no_match_returns_none() {
        let table = RouteTable::new();
        assert!(table.resolve("/anything").is_none());
    }

    #[test]
    fn reinserting_a_prefix_replaces_its_target() {
        let mut table = RouteTable::new();
        table.insert("/api", "http://127.0.0.1:4100");
        table.insert("/api", "http://127.0.0.1:4200");
        assert_eq!(table.routes.len(), 1);
        assert_eq!(table.resolve("/api").unwrap().target_base_url, "http://127.0.0.1:4200");
    }
}
