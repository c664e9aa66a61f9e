/// API route handlers
///
/// # Modules
///
/// - `auth`: Registration, login, federated login, session renewal
/// - `health`: Liveness probe

pub mod auth;
pub mod health;
