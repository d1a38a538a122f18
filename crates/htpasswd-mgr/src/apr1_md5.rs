//! Apache APR1-MD5 ("md5") password encoding.
//!
//! Produces strings of the form `$apr1$<salt>$<digest>`, where the salt is
//! eight characters and the digest is 22 characters, both drawn from the
//! crypt `itoa64` alphabet. The construction is the FreeBSD MD5-crypt scheme
//! with Apache's `$apr1$` magic, as implemented by `apr_md5_encode()` in
//! apr-util.
//!
//! MD5 is broken as a general-purpose hash; this scheme exists because it is
//! the default of Apache's own `htpasswd` tool and every basic-auth server
//! understands it.

use md5::{Digest, Md5};

/// The crypt alphabet. Differs from standard base64 by starting with `./`.
const ITOA64: &[u8; 64] = b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Prefix of every APR1-MD5 encoded secret.
pub const MAGIC: &str = "$apr1$";

/// Salt length in characters.
pub const SALT_LEN: usize = 8;

const ROUNDS: u32 = 1000;

/// Byte triplets of the final digest, in the order apr-util feeds them to `to64`.
const DIGEST_GROUPS: [(usize, usize, usize); 5] =
    [(0, 6, 12), (1, 7, 13), (2, 8, 14), (3, 9, 15), (4, 10, 5)];

/// Appends the low `chars * 6` bits of `value` to `out`, least significant first.
fn push_itoa64(out: &mut String, mut value: u32, chars: usize) {
    for _ in 0..chars {
        out.push(char::from(ITOA64[(value & 0x3f) as usize]));
        value >>= 6;
    }
}

fn encode_digest(digest: &[u8; 16]) -> String {
    let mut out = String::with_capacity(22);
    for (a, b, c) in DIGEST_GROUPS {
        let group =
            u32::from(digest[a]) << 16 | u32::from(digest[b]) << 8 | u32::from(digest[c]);
        push_itoa64(&mut out, group, 4);
    }
    push_itoa64(&mut out, u32::from(digest[11]), 2);
    out
}

/// Generates a fresh eight character salt from 48 bits of OS randomness.
pub fn generate_salt() -> Result<String, getrandom::Error> {
    let mut bytes = [0u8; 6];
    getrandom::fill(&mut bytes)?;

    let bits = bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &byte| acc << 8 | u64::from(byte));

    let mut salt = String::with_capacity(SALT_LEN);
    for i in 0..SALT_LEN {
        salt.push(char::from(ITOA64[((bits >> (6 * i)) & 0x3f) as usize]));
    }
    Ok(salt)
}

/// Encodes `password` with the given salt.
///
/// Only the first eight characters of `salt` are used, matching apr-util.
pub fn hash_with_salt(password: &str, salt: &str) -> String {
    let password = password.as_bytes();
    let salt = salt
        .char_indices()
        .nth(SALT_LEN)
        .map_or(salt, |(end, _)| &salt[..end]);

    let alternate: [u8; 16] = Md5::new()
        .chain_update(password)
        .chain_update(salt)
        .chain_update(password)
        .finalize()
        .into();

    let mut context = Md5::new();
    context.update(password);
    context.update(MAGIC);
    context.update(salt);
    for chunk in password.chunks(alternate.len()) {
        context.update(&alternate[..chunk.len()]);
    }

    // One byte per bit of the password length: NUL for set bits, the first
    // password byte for clear ones.
    let mut length = password.len();
    while length > 0 {
        if length & 1 == 1 {
            context.update([0u8]);
        } else {
            context.update(&password[..1]);
        }
        length >>= 1;
    }

    let mut digest: [u8; 16] = context.finalize().into();

    for round in 0..ROUNDS {
        let mut hasher = Md5::new();
        let odd = round & 1 == 1;

        if odd {
            hasher.update(password);
        } else {
            hasher.update(digest);
        }
        if round % 3 != 0 {
            hasher.update(salt);
        }
        if round % 7 != 0 {
            hasher.update(password);
        }
        if odd {
            hasher.update(digest);
        } else {
            hasher.update(password);
        }

        digest = hasher.finalize().into();
    }

    format!("{MAGIC}{salt}${}", encode_digest(&digest))
}

/// Encodes `password` under a freshly generated salt.
pub fn hash(password: &str) -> Result<String, getrandom::Error> {
    let salt = generate_salt()?;
    Ok(hash_with_salt(password, &salt))
}
