//! ---
//! pw_section: "02-schema-generation"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Struct-to-schema translation primitives."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
//! RPC method inference from `<Base>Request` / `<Base>Response` names.
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::Aggregates;

static SERVICE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]+)(Request|Response)$").expect("valid service name pattern")
});

/// Which half of an rpc method an aggregate supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceSide {
    Request,
    Response,
}

/// Split an aggregate name into its base name and side.
///
/// The base must be one or more ASCII letters, so `Request` alone and
/// `V2Request` do not qualify.
pub fn infer(name: &str) -> Option<(&str, ServiceSide)> {
    let captures = SERVICE_NAME.captures(name)?;
    let base = captures.get(1)?.as_str();
    let side = match captures.get(2)?.as_str() {
        "Request" => ServiceSide::Request,
        _ => ServiceSide::Response,
    };
    Some((base, side))
}

/// Sides observed for one base name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceCandidate {
    pub request: bool,
    pub response: bool,
}

impl ServiceCandidate {
    /// Number of distinct sides seen, 1 or 2.
    pub fn count(&self) -> usize {
        usize::from(self.request) + usize::from(self.response)
    }

    pub fn is_paired(&self) -> bool {
        self.request && self.response
    }

    fn mark(&mut self, side: ServiceSide) {
        match side {
            ServiceSide::Request => self.request = true,
            ServiceSide::Response => self.response = true,
        }
    }
}

/// Whether a base name needs both sides before it becomes an rpc method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PairingPolicy {
    /// Any base with at least one side yields a method.
    #[default]
    Permissive,
    RequirePaired,
}

impl PairingPolicy {
    pub fn from_required(required: bool) -> Self {
        if required {
            PairingPolicy::RequirePaired
        } else {
            PairingPolicy::Permissive
        }
    }

    fn admits(self, candidate: &ServiceCandidate) -> bool {
        match self {
            PairingPolicy::Permissive => candidate.count() > 0,
            PairingPolicy::RequirePaired => candidate.is_paired(),
        }
    }
}

/// One `rpc Base(BaseRequest) returns (BaseResponse);` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcMethod {
    pub name: String,
    pub request: String,
    pub response: String,
}

impl RpcMethod {
    fn for_base(base: &str) -> Self {
        Self {
            name: base.to_owned(),
            request: format!("{base}Request"),
            response: format!("{base}Response"),
        }
    }
}

/// Base names in first-seen order with the sides observed for each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceCandidates {
    bases: IndexMap<String, ServiceCandidate>,
}

impl ServiceCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut candidates = Self::new();
        for name in names {
            candidates.observe(name);
        }
        candidates
    }

    pub fn from_aggregates(aggregates: &Aggregates) -> Self {
        Self::from_names(aggregates.keys().map(String::as_str))
    }

    /// Record `name` if it matches the naming convention. Seeing the same
    /// side twice does not change the count.
    pub fn observe(&mut self, name: &str) -> Option<ServiceSide> {
        let (base, side) = infer(name)?;
        self.bases.entry(base.to_owned()).or_default().mark(side);
        Some(side)
    }

    pub fn get(&self, base: &str) -> Option<&ServiceCandidate> {
        self.bases.get(base)
    }

    pub fn count(&self, base: &str) -> usize {
        self.get(base).map(ServiceCandidate::count).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServiceCandidate)> {
        self.bases.iter().map(|(base, candidate)| (base.as_str(), candidate))
    }

    /// Methods admitted by `policy`, in first-seen order.
    pub fn methods(&self, policy: PairingPolicy) -> Vec<RpcMethod> {
        self.iter()
            .filter(|(_, candidate)| policy.admits(candidate))
            .map(|(base, _)| RpcMethod::for_base(base))
            .collect()
    }
}
