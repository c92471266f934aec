//! Fixed-size content checksums, stored compactly in the database and rendered
//! as lowercase hex for pool paths and upstream metadata comparisons.

use diesel::AsExpression;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Bytea;
use hex::{FromHex, FromHexError};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt::{self, Display};
use std::io::Read;
use std::str::FromStr;

/// The identity checksum for every `ContentItem` and `RepositoryFile`.
pub type Sha256Checksum = GenericChecksum<32>;
pub type Sha1Checksum = GenericChecksum<20>;
pub type Md5Checksum = GenericChecksum<16>;

/// A fixed-size checksum of length `N`, deserializable from the database without allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsExpression, FromSqlRow, Serialize, Deserialize)]
#[diesel(sql_type = Bytea)]
pub struct GenericChecksum<const N: usize>(#[serde(with = "hex_bytes")] [u8; N]);

impl<const N: usize> GenericChecksum<N> {
    pub const fn from_bytes(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    /// First two hex characters — the outer pool fan-out directory.
    pub fn bucket_outer(&self) -> String {
        hex::encode(&self.0[0..1])
    }

    /// Second two hex characters — the inner pool fan-out directory.
    pub fn bucket_inner(&self) -> String {
        // A single byte hex-encodes to exactly 2 characters; N is always >= 2 for our checksums.
        hex::encode(&self.0[1..2])
    }
}

impl<const N: usize> Display for GenericChecksum<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl<const N: usize> FromStr for GenericChecksum<N>
where
    [u8; N]: FromHex<Error = FromHexError>,
{
    type Err = FromHexError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <[u8; N]>::from_hex(s).map(Self)
    }
}

impl<const N: usize> ToSql<Bytea, Pg> for GenericChecksum<N> {
    fn to_sql<'a>(&'a self, out: &mut Output<'a, '_, Pg>) -> serialize::Result {
        <[u8] as ToSql<Bytea, Pg>>::to_sql(self.0.as_slice(), out)
    }
}

impl<const N: usize> FromSql<Bytea, Pg> for GenericChecksum<N> {
    fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
        let bytes = value.as_bytes();
        if bytes.len() != N {
            return Err(format!("expected {N} checksum bytes, got {}", bytes.len()).into());
        }
        let mut array = [0u8; N];
        array.copy_from_slice(bytes);
        Ok(Self(array))
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = hex::decode(&text).map_err(serde::de::Error::custom)?;
        bytes.try_into().map_err(|_| serde::de::Error::custom("wrong checksum length"))
    }
}

/// Hashes a reader's contents with SHA-256, returning the digest.
/// Used by the Pool on every `put` and by the Reconciler on `verify`.
pub fn sha256_digest<R: Read>(mut reader: R) -> std::io::Result<Sha256Checksum> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(GenericChecksum(hasher.finalize().into()))
}

pub fn sha256_bytes(content: &[u8]) -> Sha256Checksum {
    GenericChecksum(Sha256::digest(content).into())
}

pub fn sha1_bytes(content: &[u8]) -> Sha1Checksum {
    GenericChecksum(Sha1::digest(content).into())
}

/// Decodes Alpine's legacy `APKINDEX` checksum format: base64 with a `Q1` prefix,
/// signifying a SHA-1 digest of the package contents preceded by a one-byte OpenSSL
/// digest-algorithm tag that Alpine's tooling strips before comparison.
pub fn decode_apk_legacy_checksum(encoded: &str) -> Result<Sha1Checksum, base64::DecodeError> {
    use base64::Engine;
    let stripped = encoded.strip_prefix("Q1").unwrap_or(encoded);
    let decoded = base64::engine::general_purpose::STANDARD.decode(stripped)?;
    let mut array = [0u8; 20];
    let len = decoded.len().min(20);
    array[..len].copy_from_slice(&decoded[..len]);
    Ok(GenericChecksum(array))
}
