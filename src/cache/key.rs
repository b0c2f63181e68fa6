use std::fmt;

/// Cache slot for one logical query: the endpoint name followed by its
/// normalized parameters, e.g. `market:market=NYSE:decade=1920s`.
///
/// Values are escaped and an absent parameter is written as `*`, so two
/// different parameter lists for the same endpoint never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    endpoint: &'static str,
    key: String,
}

impl CacheKey {
    pub fn new(endpoint: &'static str) -> Self {
        Self {
            endpoint,
            key: endpoint.to_string(),
        }
    }

    pub fn param(mut self, name: &str, value: Option<&str>) -> Self {
        self.key.push(':');
        self.key.push_str(name);
        self.key.push('=');
        match value {
            Some(value) => escape_into(&mut self.key, value),
            None => self.key.push('*'),
        }
        self
    }

    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

fn escape_into(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '%' => out.push_str("%25"),
            '*' => out.push_str("%2A"),
            ':' => out.push_str("%3A"),
            '=' => out.push_str("%3D"),
            c => out.push(c),
        }
    }
}
