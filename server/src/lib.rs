#![cfg_attr(test, allow(clippy::disallowed_methods, clippy::unwrap_used))]
// Application token service.
//
// Life of a request:
// 1. The authenticating front end forwards the verified user as headers
// 2. The identity middleware turns them into an `Identity`
// 3. For token requests:
//     - Look up the application in the registry
//     - Resolve the user's privilege level from the authorization file
//     - Sign the claims with the application's secret
//     - Respond with the token
//
// System components:
//  - Application registry (immutable after startup)
//  - Authorization resolver
//  - Token issuer
//  - HTTP router

pub mod auth;
pub mod config;
pub mod http;
pub mod logging;

#[cfg(test)]
mod testing;
