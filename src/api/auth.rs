//! Demo user table for the open-finance service.

/// Static demo users and their bearer tokens.
// Demo credentials only; the open-finance sandbox issues no real tokens.
const DEMO_USERS: &[(&str, &str)] = &[
  ("alice", "demo-token-alice-7f3a"),
  ("bob", "demo-token-bob-91c2"),
  ("carol", "demo-token-carol-4e8d"),
];

/// Look up the bearer token of a demo user (case-insensitive).
pub fn bearer_token(user: &str) -> Option<&'static str> {
  let user = user.trim().to_lowercase();
  DEMO_USERS
    .iter()
    .find(|(name, _)| *name == user)
    .map(|(_, token)| *token)
}

pub fn demo_users() -> impl Iterator<Item = &'static str> {
  DEMO_USERS.iter().map(|(name, _)| *name)
}
