//! Request identities and the strategies that rotate between them.
//!
//! An [`IdentityPool`] owns its identities and an injected [`Rotation`], so
//! nothing about header selection lives in process-wide state.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// A set of request headers presented to the listing site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_agent: String,
    /// Extra headers sent alongside the user agent, in order.
    pub headers: Vec<(String, String)>,
}

impl Identity {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Browser-like identity: the given user agent plus the accept headers
    /// a desktop browser sends for a top-level navigation.
    pub fn browser(user_agent: impl Into<String>) -> Self {
        Self::new(user_agent)
            .with_header("accept", "text/html,application/xhtml+xml")
            .with_header("accept-language", "zh-CN,zh;q=0.9,en;q=0.8")
    }
}

/// The built-in desktop browser identities.
pub fn default_identities() -> Vec<Identity> {
    DEFAULT_USER_AGENTS
        .iter()
        .map(|ua| Identity::browser(*ua))
        .collect()
}

/// Chooses which identity serves the next request.
///
/// `len` is always at least 1 and `previous` is the index returned by the
/// last call, if any. Implementations must not return `previous` again when
/// `len > 1`.
pub trait Rotation: Send {
    fn pick(&mut self, previous: Option<usize>, len: usize) -> usize;
}

/// Cycles through the pool in order.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoundRobin;

impl Rotation for RoundRobin {
    fn pick(&mut self, previous: Option<usize>, len: usize) -> usize {
        match previous {
            Some(p) => (p + 1) % len,
            None => 0,
        }
    }
}

/// Uniform random choice that never repeats the previous pick.
pub struct RandomPick<R> {
    rng: R,
}

impl<R: Rng> RandomPick<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomPick<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng + Send> Rotation for RandomPick<R> {
    fn pick(&mut self, previous: Option<usize>, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        match previous {
            Some(p) if p < len => {
                // Draw from the other len - 1 slots, skipping over `p`.
                let n = self.rng.gen_range(0..len - 1);
                if n >= p {
                    n + 1
                } else {
                    n
                }
            }
            _ => self.rng.gen_range(0..len),
        }
    }
}

#[derive(thiserror::Error, Debug)]
#[error("identity pool must contain at least one identity")]
pub struct EmptyPool;

/// A non-empty list of identities plus the rotation that walks it.
pub struct IdentityPool {
    identities: Vec<Identity>,
    rotation: Box<dyn Rotation>,
    last: Option<usize>,
}

impl IdentityPool {
    pub fn new(identities: Vec<Identity>, rotation: Box<dyn Rotation>) -> Result<Self, EmptyPool> {
        if identities.is_empty() {
            return Err(EmptyPool);
        }
        Ok(Self {
            identities,
            rotation,
            last: None,
        })
    }

    /// Advances the rotation and returns the identity for the next request.
    pub fn next_identity(&mut self) -> &Identity {
        let len = self.identities.len();
        let idx = self.rotation.pick(self.last, len).min(len - 1);
        self.last = Some(idx);
        &self.identities[idx]
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }
}

impl Default for IdentityPool {
    fn default() -> Self {
        Self {
            identities: default_identities(),
            rotation: Box::new(RoundRobin),
            last: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_of(n: usize, rotation: Box<dyn Rotation>) -> IdentityPool {
        let identities = (0..n).map(|i| Identity::new(format!("agent-{}", i))).collect();
        IdentityPool::new(identities, rotation).unwrap()
    }

    #[test]
    fn empty_pool_rejected() {
        assert!(IdentityPool::new(Vec::new(), Box::new(RoundRobin)).is_err());
    }

    #[test]
    fn round_robin_cycles_in_order() {
        let mut pool = pool_of(3, Box::new(RoundRobin));
        let picked: Vec<String> = (0..5)
            .map(|_| pool.next_identity().user_agent.clone())
            .collect();
        assert_eq!(
            picked,
            vec!["agent-0", "agent-1", "agent-2", "agent-0", "agent-1"]
        );
    }

    #[test]
    fn single_identity_pool_always_returns_it() {
        let mut pool = pool_of(1, Box::new(RandomPick::new(StdRng::seed_from_u64(7))));
        for _ in 0..10 {
            assert_eq!(pool.next_identity().user_agent, "agent-0");
        }
    }

    #[test]
    fn random_pick_never_repeats_previous() {
        let mut rotation = RandomPick::new(StdRng::seed_from_u64(42));
        let mut previous = None;
        for _ in 0..500 {
            let idx = rotation.pick(previous, 4);
            assert!(idx < 4);
            assert_ne!(Some(idx), previous);
            previous = Some(idx);
        }
    }

    #[test]
    fn random_pick_reaches_every_identity() {
        let mut rotation = RandomPick::new(StdRng::seed_from_u64(1));
        let mut seen = [false; 4];
        let mut previous = None;
        for _ in 0..200 {
            let idx = rotation.pick(previous, 4);
            seen[idx] = true;
            previous = Some(idx);
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn default_pool_has_browser_headers() {
        let pool = IdentityPool::default();
        assert_eq!(pool.len(), 4);
        for identity in pool.identities() {
            assert!(identity.user_agent.starts_with("Mozilla/5.0"));
            assert!(identity.headers.iter().any(|(k, _)| k == "accept-language"));
        }
    }
}
