//! Transport for the book tag listing site: one GET per call,
//! with a timeout and a caller-chosen request identity.

mod client;
mod errors;
pub mod user_agent;
pub use self::client::{Client, RawPage, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use self::errors::FetchFailure;
pub use self::user_agent::{
    default_identities, EmptyPool, Identity, IdentityPool, RandomPick, RoundRobin, Rotation,
};
