//! Opaque external identifiers.
//!
//! Every externally visible entity is addressed by a kind-prefixed token
//! (`U_`, `I_`, `A_`) instead of its internal row id.

use rand::Rng;
use rand::distr::Alphanumeric;

/// Length of the random part of a token.
const TOKEN_LEN: usize = 12;

/// Entity kinds that carry an external token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// User token, prefixed `U_`.
    User,
    /// Item token, prefixed `I_`.
    Item,
    /// Activity token, prefixed `A_`.
    Activity,
}

impl TokenKind {
    /// Returns the token prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            TokenKind::User => "U_",
            TokenKind::Item => "I_",
            TokenKind::Activity => "A_",
        }
    }
}

/// Generates a fresh kind-prefixed token.
pub fn gen_token(kind: TokenKind) -> String {
    let mut rng = rand::rng();
    let random: String = (0..TOKEN_LEN)
        .map(|_| rng.sample(Alphanumeric) as char)
        .collect();
    format!("{}{}", kind.prefix(), random)
}
