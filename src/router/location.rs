use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use crate::identity::ENTRY_ROUTE;

/// Navigation target: a path plus query flags (`?login=true`, `?signup=true`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub path: String,
    pub query: BTreeMap<String, String>,
}

impl Location {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.is_empty() { ENTRY_ROUTE.to_string() } else { path };
        Self { path, query: BTreeMap::new() }
    }

    pub fn entry() -> Self { Self::new(ENTRY_ROUTE) }

    /// Entry route with the login prompt raised.
    pub fn login_prompt() -> Self { Self::entry().with_flag("login") }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_flag(self, flag: &str) -> Self { self.with_query(flag, "true") }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.query.get(flag).is_some_and(|v| v == "true" || v == "1" || v.is_empty())
    }

    pub fn is_entry(&self) -> bool { self.path == ENTRY_ROUTE }

    /// Parse `"/path?k=v&flag"`. Values are percent-decoded; malformed escapes are kept verbatim.
    pub fn parse(s: &str) -> Self {
        let (path, qs) = match s.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (s, None),
        };
        let mut loc = Location::new(path.trim());
        if let Some(qs) = qs {
            for pair in qs.split('&').filter(|p| !p.is_empty()) {
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                loc.query.insert(decode(k), decode(v));
            }
        }
        loc
    }
}

fn decode(s: &str) -> String {
    let s = s.replace('+', " ");
    urlencoding::decode(&s).map(|c| c.into_owned()).unwrap_or(s)
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)?;
        let mut sep = '?';
        for (k, v) in &self.query {
            write!(f, "{}{}={}", sep, urlencoding::encode(k), urlencoding::encode(v))?;
            sep = '&';
        }
        Ok(())
    }
}
