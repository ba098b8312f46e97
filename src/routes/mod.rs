pub mod table;

use std::collections::HashMap;

use serde::Serialize;

use crate::profile::Role;

/// Navigation chrome a page mounts inside. Pure composition, not a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    Public,
    Authenticated,
    Stream,
    Backlot,
    GearHouse,
    Crm,
    Order,
    Partner,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(&'static str),
    Param(&'static str),
}

/// URL path pattern in the `/a/:param/b` style. A trailing `*` makes the
/// pattern a catch-all that matches any remaining path.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: &'static str,
    segments: Vec<Segment>,
    catch_all: bool,
}

impl PathPattern {
    pub fn parse(raw: &'static str) -> Self {
        let mut segments = Vec::new();
        let mut catch_all = false;

        for part in raw.split('/').filter(|p| !p.is_empty()) {
            if part == "*" {
                catch_all = true;
                break;
            } else if let Some(name) = part.strip_prefix(':') {
                segments.push(Segment::Param(name));
            } else {
                segments.push(Segment::Static(part));
            }
        }

        Self {
            raw,
            segments,
            catch_all,
        }
    }

    pub fn raw(&self) -> &'static str {
        self.raw
    }

    /// Match a concrete path, extracting named parameters. Query strings and
    /// trailing slashes are ignored for matching purposes.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let path = path.split('?').next().unwrap_or(path);
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();

        if self.catch_all {
            if parts.len() < self.segments.len() {
                return None;
            }
        } else if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts.iter()) {
            match segment {
                Segment::Static(s) => {
                    if s != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert((*name).to_string(), (*part).to_string());
                }
            }
        }

        Some(params)
    }

    /// Static segments beat parameters, parameters beat the catch-all.
    fn specificity(&self) -> usize {
        if self.catch_all {
            return 0;
        }
        // Every segment scores; static segments score double.
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Static(_) => 2,
                Segment::Param(_) => 1,
            })
            .sum::<usize>()
            + 1
    }
}

/// One nesting level of role enforcement. Evaluated in declaration order;
/// an outer layer's failure short-circuits the layers below it.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    pub required_roles: &'static [Role],
    pub redirect_to: &'static str,
}

#[derive(Debug, Clone)]
pub enum RouteAction {
    /// Mount a page inside a layout.
    Page {
        layout: Layout,
        page: &'static str,
    },
    /// Alias: resolve as if the target path had been requested (legacy paths
    /// and index-route defaults).
    Redirect { to: &'static str },
}

#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub pattern: PathPattern,
    pub action: RouteAction,
    /// Reachable without a session when false.
    pub requires_auth: bool,
    /// Ordered permission layers; empty means no role requirement.
    pub policies: Vec<RoutePolicy>,
    /// The onboarding flow itself must not onboarding-redirect.
    pub onboarding_exempt: bool,
}

impl RouteEntry {
    pub fn page(pattern: &'static str, layout: Layout, page: &'static str) -> Self {
        Self {
            pattern: PathPattern::parse(pattern),
            action: RouteAction::Page { layout, page },
            requires_auth: false,
            policies: Vec::new(),
            onboarding_exempt: false,
        }
    }

    pub fn redirect(pattern: &'static str, to: &'static str) -> Self {
        Self {
            pattern: PathPattern::parse(pattern),
            action: RouteAction::Redirect { to },
            requires_auth: false,
            policies: Vec::new(),
            onboarding_exempt: false,
        }
    }

    pub fn authenticated(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    pub fn with_policy(mut self, required_roles: &'static [Role], redirect_to: &'static str) -> Self {
        self.requires_auth = true;
        self.policies.push(RoutePolicy {
            required_roles,
            redirect_to,
        });
        self
    }

    pub fn onboarding_exempt(mut self) -> Self {
        self.onboarding_exempt = true;
        self
    }
}

/// Result of matching a path against the table.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub entry: &'a RouteEntry,
    pub params: HashMap<String, String>,
}

/// The static, declarative route table. Packaged with the application,
/// never mutated at runtime.
#[derive(Debug)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Resolve a path to its most specific matching entry. Among matches,
    /// higher specificity wins; ties fall back to declaration order, and the
    /// catch-all only matches when nothing else does.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        let mut best: Option<(usize, RouteMatch<'_>)> = None;

        for entry in &self.entries {
            if let Some(params) = entry.pattern.matches(path) {
                let score = entry.pattern.specificity();
                let better = match &best {
                    Some((best_score, _)) => score > *best_score,
                    None => true,
                };
                if better {
                    best = Some((score, RouteMatch { entry, params }));
                }
            }
        }

        best.map(|(_, m)| m)
    }

    /// Structural integrity checks: every redirect target must itself
    /// resolve, and every role-gated entry must require authentication.
    /// Run by `routes check` and by the test suite.
    pub fn check(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        for entry in &self.entries {
            if let RouteAction::Redirect { to } = &entry.action {
                match self.resolve(to) {
                    None => problems.push(format!(
                        "redirect {} -> {} has no matching entry",
                        entry.pattern.raw(),
                        to
                    )),
                    Some(m) => {
                        if let RouteAction::Redirect { .. } = m.entry.action {
                            problems.push(format!(
                                "redirect {} -> {} chains into another redirect",
                                entry.pattern.raw(),
                                to
                            ));
                        }
                    }
                }
            }

            for policy in &entry.policies {
                if policy.required_roles.is_empty() {
                    problems.push(format!(
                        "{} declares an empty role requirement",
                        entry.pattern.raw()
                    ));
                }
                if self.resolve(policy.redirect_to).is_none() {
                    problems.push(format!(
                        "{} permission fallback {} has no matching entry",
                        entry.pattern.raw(),
                        policy.redirect_to
                    ));
                }
                if !entry.requires_auth {
                    problems.push(format!(
                        "{} is role-gated but does not require auth",
                        entry.pattern.raw()
                    ));
                }
            }
        }

        if !self.entries.iter().any(|e| e.pattern.catch_all) {
            problems.push("table has no catch-all not-found entry".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}
