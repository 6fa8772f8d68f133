use std::collections::HashMap;

use tracing::debug;

use super::guard::{decide, Decision, Redirect, RouteMeta};
use crate::identity::SessionStatus;

pub const LOGIN_ROUTE: &str = "login";
pub const DEFAULT_ROUTE: &str = "dashboard";
const FALLBACK_TITLE: &str = "Home";

/// One entry of the route tree. Child paths are relative to the parent.
#[derive(Debug, Clone, Default)]
pub struct RouteRecord {
    pub name: Option<String>,
    pub path: String,
    pub meta: RouteMeta,
    pub redirect: Option<String>,
    pub children: Vec<RouteRecord>,
}

impl RouteRecord {
    pub fn named<S: Into<String>>(name: S, path: S, meta: RouteMeta) -> Self {
        Self { name: Some(name.into()), path: path.into(), meta, ..Default::default() }
    }
}

/// Route that a path resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub name: Option<String>,
    pub path: String,
    pub params: HashMap<String, String>,
    /// Requirements combined over the matched chain: a flag set on any
    /// ancestor applies; the innermost title wins.
    pub meta: RouteMeta,
}

/// Outcome of one navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub decision: Decision,
    /// Document title of the view the attempt ends on, set on every attempt.
    pub title: String,
    pub route: Option<ResolvedRoute>,
    /// Path the caller should move to when the decision is a denial.
    pub redirect_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteRecord>,
    app_title: String,
}

impl RouteTable {
    pub fn new<S: Into<String>>(routes: Vec<RouteRecord>, app_title: S) -> Self {
        Self { routes, app_title: app_title.into() }
    }

    /// Views of the vector database console.
    pub fn console<S: Into<String>>(app_title: S) -> Self {
        let layout = RouteRecord {
            path: "/".into(),
            children: vec![
                RouteRecord::named("dashboard", "", RouteMeta::authed("Dashboard")),
                RouteRecord::named("databases", "databases", RouteMeta::admin("Database Management")),
                RouteRecord::named("query", "query", RouteMeta::authed("Vector Query")),
                RouteRecord::named("multi-query", "multi-query", RouteMeta::authed("Cross-Database Query")),
                RouteRecord::named("multi-query-v", "multi-query-v", RouteMeta::authed("Cross-Database Query")),
                RouteRecord::named("profile", "profile", RouteMeta::authed("Profile")),
                RouteRecord::named("QueryParameter", "query-parameter", RouteMeta::authed("Query Parameters")),
                RouteRecord::named("QueryResult", "query-result/:queryId", RouteMeta::authed("Query Result")),
            ],
            ..Default::default()
        };
        let routes = vec![
            layout,
            RouteRecord::named(LOGIN_ROUTE, "/login", RouteMeta::public("Login")),
            RouteRecord { name: Some("NotFound".into()), path: "*".into(), redirect: Some("/".into()), ..Default::default() },
        ];
        Self::new(routes, app_title)
    }

    pub fn resolve(&self, path: &str) -> Option<ResolvedRoute> {
        self.resolve_inner(path, 0)
    }

    fn resolve_inner(&self, path: &str, depth: usize) -> Option<ResolvedRoute> {
        let clean = normalize(path);
        let segs: Vec<&str> = split(&clean);
        let mut chain: Vec<&RouteRecord> = Vec::new();
        let mut params = HashMap::new();
        if !match_records(&self.routes, &[], &segs, &mut chain, &mut params) {
            return None;
        }
        let leaf = *chain.last()?;
        if let Some(target) = &leaf.redirect {
            // a redirect chain longer than a few hops is a table bug
            if depth < 4 {
                return self.resolve_inner(target, depth + 1);
            }
            return None;
        }
        let meta = RouteMeta {
            requires_auth: chain.iter().any(|r| r.meta.requires_auth),
            requires_admin: chain.iter().any(|r| r.meta.requires_admin),
            title: chain.iter().rev().find_map(|r| r.meta.title.clone()),
        };
        Some(ResolvedRoute { name: leaf.name.clone(), path: clean, params, meta })
    }

    /// Full path of a named route (params left as `:name`).
    pub fn path_of(&self, name: &str) -> Option<String> {
        fn walk<'a>(records: &'a [RouteRecord], prefix: &[&'a str], name: &str) -> Option<String> {
            for r in records {
                let mut segs: Vec<&str> = prefix.to_vec();
                segs.extend(split(&r.path));
                if r.name.as_deref() == Some(name) {
                    return Some(format!("/{}", segs.join("/")));
                }
                if let Some(p) = walk(&r.children, &segs, name) {
                    return Some(p);
                }
            }
            None
        }
        walk(&self.routes, &[], name)
    }

    pub fn title_for(&self, meta: Option<&RouteMeta>) -> String {
        let t = meta.and_then(|m| m.title.as_deref()).unwrap_or(FALLBACK_TITLE);
        format!("{} - {}", t, self.app_title)
    }

    /// Resolve `path` and run the guard against `session`.
    pub fn navigate(&self, path: &str, session: SessionStatus) -> Navigation {
        let route = self.resolve(path);
        let decision = match &route {
            Some(r) => decide(&r.meta, session),
            None => Decision::Allow,
        };
        let redirect_path = match decision {
            Decision::Allow => None,
            Decision::DenyTo(Redirect::Login) => self.path_of(LOGIN_ROUTE),
            Decision::DenyTo(Redirect::Default) => self.path_of(DEFAULT_ROUTE),
        };
        // a denied attempt ends on the redirect target, which names the title
        let title = match &redirect_path {
            Some(target) => self.title_for(self.resolve(target).as_ref().map(|r| &r.meta)),
            None => self.title_for(route.as_ref().map(|r| &r.meta)),
        };
        debug!(target: "vecdesk::nav", "navigate {} -> {:?} (title='{}')", path, decision, title);
        Navigation { decision, title, route, redirect_path }
    }
}

fn normalize(path: &str) -> String {
    let p = path.split(['?', '#']).next().unwrap_or("");
    let segs = split(p);
    format!("/{}", segs.join("/"))
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn match_records<'a>(
    records: &'a [RouteRecord],
    prefix: &[&'a str],
    segs: &[&str],
    chain: &mut Vec<&'a RouteRecord>,
    params: &mut HashMap<String, String>,
) -> bool {
    for r in records {
        let mut pattern: Vec<&str> = prefix.to_vec();
        pattern.extend(split(&r.path));
        chain.push(r);
        if !r.children.is_empty() && match_records(&r.children, &pattern, segs, chain, params) {
            return true;
        }
        if r.children.is_empty() || r.name.is_some() {
            if let Some(found) = match_pattern(&pattern, segs) {
                params.extend(found);
                return true;
            }
        }
        chain.pop();
    }
    false
}

fn match_pattern(pattern: &[&str], segs: &[&str]) -> Option<HashMap<String, String>> {
    let mut params = HashMap::new();
    for (i, p) in pattern.iter().enumerate() {
        if *p == "*" {
            params.insert("pathMatch".to_string(), segs[i.min(segs.len())..].join("/"));
            return Some(params);
        }
        let s = segs.get(i)?;
        if let Some(name) = p.strip_prefix(':') {
            params.insert(name.to_string(), s.to_string());
        } else if p != s {
            return None;
        }
    }
    if pattern.len() == segs.len() { Some(params) } else { None }
}
