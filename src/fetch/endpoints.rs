// Endpoint pool — ordered list of interchangeable mirror endpoints.
//
// Rotation is plain round-robin, not health-scored: after a failure the
// next endpoint is tried, and the rotation index persists across sources
// and cycles so a dead mirror is skipped for everything that follows.

/// Public mirror instances known to serve timeline RSS.
pub const DEFAULT_ENDPOINTS: &[&str] = &[
    "https://xcancel.com",
    "https://nitter.privacydev.net",
    "https://nitter.poast.org",
    "https://nitter.net",
];

pub struct EndpointPool {
    endpoints: Vec<String>,
    index: usize,
}

impl EndpointPool {
    /// Build a pool from an explicit endpoint list, falling back to the
    /// built-in mirrors when the list is empty.
    pub fn new(endpoints: &[String]) -> Self {
        let endpoints = if endpoints.is_empty() {
            DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect()
        } else {
            endpoints.to_vec()
        };
        Self {
            endpoints,
            index: 0,
        }
    }

    /// The endpoint the next fetch should use.
    pub fn current(&self) -> &str {
        &self.endpoints[self.index]
    }

    /// Advance to the next endpoint, wrapping circularly.
    pub fn rotate(&mut self) {
        self.index = (self.index + 1) % self.endpoints.len();
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl Default for EndpointPool {
    fn default() -> Self {
        Self::new(&[])
    }
}
