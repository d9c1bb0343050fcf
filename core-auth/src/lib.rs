//! # Authentication Module
//!
//! Obtains a catalog access token through the OAuth 2.0 authorization-code
//! flow.
//!
//! ## Overview
//!
//! - [`OAuthFlowManager`] builds the authorize URL (PKCE S256 + CSRF state) and
//!   exchanges the returned code for tokens.
//! - [`callback::await_authorization_code`] runs a short-lived listener on the
//!   redirect URI that accepts exactly one redirect and hands the code back
//!   through a one-slot channel.
//!
//! Tokens live for the duration of one run; nothing is persisted or refreshed.

pub mod callback;
pub mod error;
pub mod oauth;
pub mod types;

pub use callback::{await_authorization_code, AuthorizationCallback};
pub use error::{AuthError, Result};
pub use oauth::{OAuthConfig, OAuthFlowManager, PkceVerifier};
pub use types::OAuthTokens;
