use actix_web::http::Method;

use crate::models::Role;

/// What a route demands of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// No token needed.
    Public,
    /// Any valid token.
    Authenticated,
    /// A valid token carrying at least one of these roles.
    Roles(Vec<Role>),
}

static AUTHENTICATED: Access = Access::Authenticated;

#[derive(Debug, Clone)]
struct Rule {
    method: Method,
    segments: Vec<String>,
    access: Access,
}

impl Rule {
    fn matches(&self, method: &Method, path: &[&str]) -> bool {
        &self.method == method
            && self.segments.len() == path.len()
            && self
                .segments
                .iter()
                .zip(path)
                .all(|(pattern, actual)| is_param(pattern) || pattern == actual)
    }
}

fn is_param(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}')
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Route metadata read by the guards.
///
/// Patterns use actix's `{name}` syntax for a single dynamic segment. Routes with no
/// rule require authentication.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    rules: Vec<Rule>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn public(self, method: Method, pattern: &str) -> Self {
        self.rule(method, pattern, Access::Public)
    }

    pub fn require_roles(self, method: Method, pattern: &str, roles: &[Role]) -> Self {
        self.rule(method, pattern, Access::Roles(roles.to_vec()))
    }

    fn rule(mut self, method: Method, pattern: &str, access: Access) -> Self {
        self.rules.push(Rule {
            method,
            segments: split_path(pattern).into_iter().map(str::to_string).collect(),
            access,
        });
        self
    }

    /// First matching rule wins. `path` must be the percent-decoded path the router
    /// matches on, not the raw request target.
    pub fn resolve(&self, method: &Method, path: &str) -> &Access {
        let path = split_path(path);
        self.rules
            .iter()
            .find(|rule| rule.matches(method, &path))
            .map(|rule| &rule.access)
            .unwrap_or(&AUTHENTICATED)
    }
}
