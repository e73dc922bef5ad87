//! Audit attribution snapshot derived from a request.

use crate::context::RequestContext;
use serde::Serialize;
use std::collections::BTreeMap;

/// Actor key holding the lower-cased authentication method.
pub const AUTHENTICATION_KEY: &str = "authentication";

/// Actor key holding the forwarded client address.
pub const IP_KEY: &str = "ip";

/// Who performed an audited action. Built per request, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Actor(BTreeMap<String, String>);

impl Actor {
    /// Derive the actor for a request.
    ///
    /// Always sets `authentication` (`"none"` without a bound authentication),
    /// sets `ip` from `x-forwarded-for` when present, and copies every metadata
    /// entry of the bound authentication. `authentication` is written last.
    pub fn from_context(ctx: &RequestContext) -> Self {
        let mut entries = BTreeMap::new();
        let mut authentication = "none".to_string();

        if let Some(ip) = ctx.forwarded_for() {
            entries.insert(IP_KEY.to_string(), ip.to_string());
        }

        if let Some(auth) = ctx.authentication() {
            authentication = auth.method.short_name();
            for (key, value) in &auth.metadata {
                entries.insert(key.clone(), value.clone());
            }
        }

        entries.insert(AUTHENTICATION_KEY.to_string(), authentication);
        Actor(entries)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}
