//! Random identity generation for `add-user`.
//!
//! Mirrors what the appliance's own seed data looks like: a name from the
//! fixed pools, a numeric-suffixed username, a short password, and an avatar
//! path under `/hackable/users/`. The schema stores MD5 hex digests, so
//! that is what gets hashed; this targets a deliberately vulnerable
//! training appliance, nothing here is a password-storage recommendation.
//!
//! Each invocation draws a fresh identity; re-running the task adds another
//! user rather than converging on an existing one.

use md5::{Digest, Md5};
use rand::Rng;
use rand::seq::SliceRandom;

const FIRST_NAMES: &[&str] = &[
    "John", "Jane", "Mike", "Sarah", "David", "Emma", "Chris", "Lisa", "Tom", "Anna",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Brown", "Taylor", "Wilson", "Davis", "Miller", "Moore", "Anderson",
    "Thomas",
];

/// A generated DVWA user, ready to insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    /// Clear-text password, shown to the operator once on success.
    pub password: String,
    /// MD5 hex digest of `password`, what the schema actually stores.
    pub password_hash: String,
    pub avatar: String,
}

impl NewUser {
    /// Draw a random identity from the given RNG.
    pub fn random(rng: &mut impl Rng) -> Self {
        let first = *FIRST_NAMES.choose(rng).expect("name pool is non-empty");
        let last = *LAST_NAMES.choose(rng).expect("name pool is non-empty");
        let username = format!("{}{}", first.to_lowercase(), rng.gen_range(100..=999));
        let password = format!("Pass{}", rng.gen_range(1000..=9999));

        Self {
            first_name: first.to_string(),
            last_name: last.to_string(),
            avatar: format!("/hackable/users/{username}.jpg"),
            password_hash: md5_hex(&password),
            username,
            password,
        }
    }
}

/// MD5 hex digest of a string.
pub fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
