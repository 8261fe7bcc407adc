// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Auth0 bearer-token sign-in and cookie sessions for the Panic Button API.
//!
//! ## Auth Flow
//!
//! 1. The mobile app authenticates the user with Auth0
//! 2. It calls `POST /signIn` with `Authorization: Bearer <Auth0 JWT>`
//! 3. The server:
//!    - Fetches the tenant JWKS and picks the key matching the token `kid`
//!    - Verifies the RS256 signature, `exp` and `nbf`
//!    - Issues an HMAC-signed `user-session` cookie for the token's `sub`
//! 4. Later requests carry only the cookie; protected routes resolve the
//!    user from it without contacting Auth0
//!
//! ## Security
//!
//! - Session cookies are `HttpOnly`, `SameSite=Lax` and `Secure` by default
//! - Cookie MACs are compared in constant time
//! - Failure detail is logged, never returned to the client

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod jwt;
mod key_cache;
pub mod middleware;
pub mod session;

pub use error::AuthError;
pub use extractor::{extract_bearer, SessionUser};
pub use jwks::{JwksClient, VerificationKey};
pub use jwt::JwtVerifier;
pub use middleware::{require_session, sign_in};
pub use session::{Session, SessionCookie, SessionStore};
