use crate::apr1_md5;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha1::{Digest, Sha1};
use snafu::{ResultExt, Snafu};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// bcrypt cost used when none is configured. Matches Apache `htpasswd -B`.
pub const DEFAULT_BCRYPT_COST: u32 = 5;

const SHA_PREFIX: &str = "{SHA}";

/// Errors raised while encoding a password.
#[derive(Debug, Snafu)]
pub enum Error {
    /// Failed to draw a random salt.
    #[snafu(display("Failed to generate salt"))]
    Salt { source: getrandom::Error },

    /// bcrypt rejected the input or the configured cost.
    #[snafu(display("bcrypt encoding failed"))]
    Bcrypt { source: bcrypt::BcryptError },

    /// Traditional crypt failed.
    #[snafu(display("crypt encoding failed"))]
    Crypt { source: pwhash::error::Error },
}

/// Password encoding schemes understood by basic-auth servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Algorithm {
    /// Traditional DES-based Unix crypt. Only the first eight bytes count.
    Crypt,
    /// Unsalted SHA-1, base64 encoded behind a `{SHA}` prefix.
    Sha,
    /// bcrypt with a random salt, written with the `$2y$` prefix.
    Bcrypt,
    /// Apache APR1-MD5 with a random salt.
    #[default]
    Md5,
}

impl Algorithm {
    /// Every supported scheme.
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Crypt,
        Algorithm::Sha,
        Algorithm::Bcrypt,
        Algorithm::Md5,
    ];

    /// Parses a scheme name, ignoring case.
    ///
    /// Unknown names fall back to [`Algorithm::Md5`] instead of failing, which
    /// mirrors what `htpasswd` front ends have always done.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "crypt" => Algorithm::Crypt,
            "sha" => Algorithm::Sha,
            "bcrypt" => Algorithm::Bcrypt,
            "md5" => Algorithm::Md5,
            _ => {
                log::warn!("Unknown password algorithm '{name}', falling back to md5");
                Algorithm::Md5
            }
        }
    }

    /// The lowercase scheme name.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Crypt => "crypt",
            Algorithm::Sha => "sha",
            Algorithm::Bcrypt => "bcrypt",
            Algorithm::Md5 => "md5",
        }
    }

    /// Whether the scheme is considered too weak for new credentials.
    pub fn is_weak(self) -> bool {
        matches!(self, Algorithm::Crypt | Algorithm::Sha)
    }
}

impl FromStr for Algorithm {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Algorithm::from_name(s))
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Turns plaintext secrets into encoded secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoder {
    bcrypt_cost: u32,
}

impl Default for Encoder {
    fn default() -> Self {
        Self {
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl Encoder {
    /// Creates an encoder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bcrypt cost factor. bcrypt accepts 4 through 31.
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// The configured bcrypt cost factor.
    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }

    /// Encodes `secret` with `algorithm`.
    pub fn encode(&self, secret: &str, algorithm: Algorithm) -> Result<String, Error> {
        if algorithm.is_weak() {
            log::warn!("Encoding with weak password algorithm '{algorithm}'");
        }

        match algorithm {
            Algorithm::Crypt => pwhash::unix_crypt::hash(secret).context(CryptSnafu),
            Algorithm::Sha => {
                let digest = Sha1::digest(secret.as_bytes());
                Ok(format!("{SHA_PREFIX}{}", STANDARD.encode(digest)))
            }
            Algorithm::Bcrypt => {
                let parts = bcrypt::hash_with_result(secret, self.bcrypt_cost)
                    .context(BcryptSnafu)?;
                Ok(parts.format_for_version(bcrypt::Version::TwoY))
            }
            Algorithm::Md5 => apr1_md5::hash(secret).context(SaltSnafu),
        }
    }
}

/// Encodes `secret` with the default encoder; an absent algorithm means md5.
pub fn encode(secret: &str, algorithm: Option<Algorithm>) -> Result<String, Error> {
    Encoder::default().encode(secret, algorithm.unwrap_or_default())
}
