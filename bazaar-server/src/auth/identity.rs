//! Identity resolution.
//!
//! A request may carry several kinds of credentials. [`IdentityResolver`]
//! walks an ordered chain of [`IdentityStrategy`] values and returns the
//! first positive member id any of them yields.
//!
//! The chain is built from [`Config`]: development strategies can be turned
//! off, and [`IdentityStrategy::UnverifiedClaims`] is only present when
//! explicitly enabled because it trusts an unsigned token payload.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;

use crate::config::Config;
use crate::db::MemberId;

/// Claim keys scanned, in order, by [`IdentityStrategy::UnverifiedClaims`].
const CLAIM_KEYS: [&str; 4] = ["sub", "id", "user_id", "uid"];

/// Everything a request offers as proof of identity.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Member id attached by the verified-token middleware.
    pub verified_id: Option<MemberId>,
    /// Raw value of the `X-User-Id` development header.
    pub dev_header: Option<String>,
    /// Raw `Authorization` header value.
    pub authorization: Option<String>,
}

impl Credentials {
    /// The token part of an `Authorization: Bearer <token>` header.
    /// The scheme is matched case-insensitively.
    pub fn bearer_token(&self) -> Option<&str> {
        let raw = self.authorization.as_deref()?.trim();
        let (scheme, token) = raw.split_at_checked(7)?;
        if !scheme.eq_ignore_ascii_case("bearer ") {
            return None;
        }
        let token = token.trim();
        (!token.is_empty()).then_some(token)
    }
}

/// One way of turning [`Credentials`] into a member id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityStrategy {
    /// Identity already verified upstream.
    Verified,
    /// `X-User-Id: <id>`.
    DevHeader,
    /// `Authorization: Bearer uid:<id>`.
    DevBearer,
    /// Claims peeked from the payload of a three-segment bearer token,
    /// without signature verification.
    UnverifiedClaims,
}

impl IdentityStrategy {
    pub fn resolve(&self, creds: &Credentials) -> Option<MemberId> {
        match self {
            IdentityStrategy::Verified => creds.verified_id.filter(|id| *id > 0),
            IdentityStrategy::DevHeader => creds.dev_header.as_deref().and_then(parse_member_id),
            IdentityStrategy::DevBearer => creds
                .bearer_token()
                .and_then(|t| t.strip_prefix("uid:"))
                .and_then(parse_member_id),
            IdentityStrategy::UnverifiedClaims => creds.bearer_token().and_then(peek_claims),
        }
    }
}

/// Ordered strategy chain.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    chain: Vec<IdentityStrategy>,
}

impl IdentityResolver {
    pub fn new(chain: Vec<IdentityStrategy>) -> Self {
        Self { chain }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut chain = vec![IdentityStrategy::Verified];
        if config.dev_identity {
            chain.push(IdentityStrategy::DevHeader);
            chain.push(IdentityStrategy::DevBearer);
        }
        if config.allow_unverified_claims {
            tracing::warn!("unverified bearer-token claims are accepted as identity");
            chain.push(IdentityStrategy::UnverifiedClaims);
        }
        Self { chain }
    }

    pub fn strategies(&self) -> &[IdentityStrategy] {
        &self.chain
    }

    pub fn resolve(&self, creds: &Credentials) -> Option<MemberId> {
        self.chain.iter().find_map(|s| s.resolve(creds))
    }
}

fn parse_member_id(raw: &str) -> Option<MemberId> {
    raw.trim().parse::<MemberId>().ok().filter(|id| *id > 0)
}

fn peek_claims(token: &str) -> Option<MemberId> {
    let mut segments = token.split('.');
    let (_, payload, _) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Map<String, Value> = serde_json::from_slice(&bytes).ok()?;
    CLAIM_KEYS
        .iter()
        .filter_map(|key| claims.get(*key))
        .find_map(claim_as_member_id)
}

fn claim_as_member_id(value: &Value) -> Option<MemberId> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 1.0 && *f < i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .filter(|id| *id > 0),
        Value::String(s) => parse_member_id(s),
        _ => None,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
