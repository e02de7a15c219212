//! Key derivation and HMAC authentication (RFC 3414 Section 6, RFC 7860).

use digest::core_api::BlockSizeUser;
use digest::{Digest, KeyInit, Mac};
use hmac::SimpleHmac;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::AuthProtocol;
use crate::error::{AuthErrorKind, CryptoErrorKind, Error, Result};

/// net-snmp rejects shorter passwords with `USM_PASSWORDTOOSHORT`.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const EXPANSION_SIZE: usize = 1_048_576;

/// Engine-independent key derived from a password (Ku).
///
/// Deriving it costs a 1 MB hash, so it is computed once per session and
/// localized per engine.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    protocol: AuthProtocol,
}

impl MasterKey {
    /// Password-to-key (RFC 3414 A.2.1). An empty password yields an all-zero key.
    pub fn from_password(protocol: AuthProtocol, password: &[u8]) -> Self {
        let key = match protocol {
            AuthProtocol::Md5 => password_to_key::<md5::Md5>(password),
            AuthProtocol::Sha1 => password_to_key::<sha1::Sha1>(password),
            AuthProtocol::Sha224 => password_to_key::<sha2::Sha224>(password),
            AuthProtocol::Sha256 => password_to_key::<sha2::Sha256>(password),
            AuthProtocol::Sha384 => password_to_key::<sha2::Sha384>(password),
            AuthProtocol::Sha512 => password_to_key::<sha2::Sha512>(password),
        };
        Self { key, protocol }
    }

    pub fn protocol(&self) -> AuthProtocol {
        self.protocol
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Bind to an engine: `H(Ku || engineID || Ku)` (RFC 3414 A.2.2).
    pub fn localize(&self, engine_id: &[u8]) -> LocalizedKey {
        let key = match self.protocol {
            AuthProtocol::Md5 => localize::<md5::Md5>(&self.key, engine_id),
            AuthProtocol::Sha1 => localize::<sha1::Sha1>(&self.key, engine_id),
            AuthProtocol::Sha224 => localize::<sha2::Sha224>(&self.key, engine_id),
            AuthProtocol::Sha256 => localize::<sha2::Sha256>(&self.key, engine_id),
            AuthProtocol::Sha384 => localize::<sha2::Sha384>(&self.key, engine_id),
            AuthProtocol::Sha512 => localize::<sha2::Sha512>(&self.key, engine_id),
        };
        LocalizedKey {
            key,
            protocol: self.protocol,
        }
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("protocol", &self.protocol)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Key bound to one authoritative engine (Kul).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct LocalizedKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    protocol: AuthProtocol,
}

impl LocalizedKey {
    pub fn from_password(protocol: AuthProtocol, password: &[u8], engine_id: &[u8]) -> Self {
        if !password.is_empty() && password.len() < MIN_PASSWORD_LENGTH {
            tracing::warn!(
                target: "tdsnmp::v3",
                password_len = password.len(),
                "password shorter than {} characters",
                MIN_PASSWORD_LENGTH
            );
        }
        MasterKey::from_password(protocol, password).localize(engine_id)
    }

    /// Wrap an already localized key.
    pub fn from_bytes(protocol: AuthProtocol, key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            protocol,
        }
    }

    pub fn protocol(&self) -> AuthProtocol {
        self.protocol
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    pub fn mac_len(&self) -> usize {
        self.protocol.mac_len()
    }

    /// HMAC over `data`, truncated to the protocol's MAC length.
    pub fn compute_hmac(&self, data: &[u8]) -> Result<Vec<u8>> {
        let len = self.mac_len();
        match self.protocol {
            AuthProtocol::Md5 => hmac_truncated::<md5::Md5>(&self.key, data, len),
            AuthProtocol::Sha1 => hmac_truncated::<sha1::Sha1>(&self.key, data, len),
            AuthProtocol::Sha224 => hmac_truncated::<sha2::Sha224>(&self.key, data, len),
            AuthProtocol::Sha256 => hmac_truncated::<sha2::Sha256>(&self.key, data, len),
            AuthProtocol::Sha384 => hmac_truncated::<sha2::Sha384>(&self.key, data, len),
            AuthProtocol::Sha512 => hmac_truncated::<sha2::Sha512>(&self.key, data, len),
        }
    }
}

impl std::fmt::Debug for LocalizedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalizedKey")
            .field("protocol", &self.protocol)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

fn password_to_key<D: Digest>(password: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return vec![0u8; <D as Digest>::output_size()];
    }

    // Hash the password repeated to 1 MB, fed in 64-byte chunks.
    let mut hasher = D::new();
    let mut chunk = [0u8; 64];
    let mut idx = 0;
    for _ in 0..EXPANSION_SIZE / chunk.len() {
        for byte in &mut chunk {
            *byte = password[idx];
            idx = (idx + 1) % password.len();
        }
        hasher.update(chunk);
    }
    hasher.finalize().to_vec()
}

fn localize<D: Digest>(master: &[u8], engine_id: &[u8]) -> Vec<u8> {
    let mut hasher = D::new();
    hasher.update(master);
    hasher.update(engine_id);
    hasher.update(master);
    hasher.finalize().to_vec()
}

fn hmac_truncated<D>(key: &[u8], data: &[u8], len: usize) -> Result<Vec<u8>>
where
    D: Digest + BlockSizeUser,
{
    let mut mac = <SimpleHmac<D> as KeyInit>::new_from_slice(key)
        .map_err(|_| Error::encrypt(CryptoErrorKind::InvalidKeyLength))?;
    Mac::update(&mut mac, data);
    let full = mac.finalize().into_bytes();
    Ok(full[..len.min(full.len())].to_vec())
}

/// Compute the HMAC of `message` and write it over the zeroed placeholder at
/// `auth_offset`.
pub fn authenticate_message(key: &LocalizedKey, message: &mut [u8], auth_offset: usize) -> Result<()> {
    let mac_len = key.mac_len();
    let end = auth_offset + mac_len;
    if end > message.len() {
        return Err(Error::encode(crate::error::EncodeErrorKind::MissingAuthParams));
    }
    let mac = key.compute_hmac(message)?;
    message[auth_offset..end].copy_from_slice(&mac);
    Ok(())
}

/// Check the MAC carried at `auth_offset..auth_offset + auth_len` of an incoming message.
pub fn verify_message(
    key: &LocalizedKey,
    message: &[u8],
    auth_offset: usize,
    auth_len: usize,
) -> Result<()> {
    let expected = key.mac_len();
    if auth_len != expected {
        return Err(Error::auth(AuthErrorKind::WrongMacLength {
            expected,
            actual: auth_len,
        }));
    }
    let end = auth_offset + auth_len;
    let Some(received) = message.get(auth_offset..end) else {
        return Err(Error::auth(AuthErrorKind::AuthParamsNotFound));
    };

    let mut zeroed = message.to_vec();
    zeroed[auth_offset..end].fill(0);
    let computed = key.compute_hmac(&zeroed)?;

    if bool::from(computed.ct_eq(received)) {
        Ok(())
    } else {
        Err(Error::auth(AuthErrorKind::HmacMismatch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strings::from_hex;

    const ENGINE_ID: &[u8] = &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2];

    fn hex(s: &str) -> Vec<u8> {
        from_hex(s).unwrap()
    }

    // RFC 3414 Appendix A.3.1
    #[test]
    fn test_md5_key_vectors() {
        let master = MasterKey::from_password(AuthProtocol::Md5, b"maplesyrup");
        assert_eq!(master.as_bytes(), hex("9faf3283884e92834ebc9847d8edd963"));
        let local = master.localize(ENGINE_ID);
        assert_eq!(local.as_bytes(), hex("526f5eed9fcce26f8964c2930787d82b"));
    }

    // RFC 3414 Appendix A.3.2
    #[test]
    fn test_sha1_key_vectors() {
        let master = MasterKey::from_password(AuthProtocol::Sha1, b"maplesyrup");
        assert_eq!(
            master.as_bytes(),
            hex("9fb5cc0381497b3793528939ff788d5d79145211")
        );
        let local = master.localize(ENGINE_ID);
        assert_eq!(
            local.as_bytes(),
            hex("6695febc9288e36282235fc7151f128497b38f3f")
        );
    }

    #[test]
    fn test_empty_password_zero_key() {
        let master = MasterKey::from_password(AuthProtocol::Sha256, b"");
        assert_eq!(master.as_bytes(), vec![0u8; 32]);
    }

    #[test]
    fn test_authenticate_then_verify() {
        let key = LocalizedKey::from_password(AuthProtocol::Sha1, b"maplesyrup", ENGINE_ID);
        let mut msg = b"0123456789____________abcdef".to_vec();
        let offset = 10;
        msg[offset..offset + 12].fill(0);
        authenticate_message(&key, &mut msg, offset).unwrap();
        assert_ne!(&msg[offset..offset + 12], &[0u8; 12]);
        verify_message(&key, &msg, offset, 12).unwrap();

        msg[0] ^= 0xff;
        assert!(matches!(
            verify_message(&key, &msg, offset, 12),
            Err(Error::Authentication {
                kind: AuthErrorKind::HmacMismatch
            })
        ));
    }

    #[test]
    fn test_verify_rejects_wrong_length() {
        let key = LocalizedKey::from_bytes(AuthProtocol::Md5, vec![1u8; 16]);
        assert!(matches!(
            verify_message(&key, &[0u8; 40], 4, 16),
            Err(Error::Authentication {
                kind: AuthErrorKind::WrongMacLength { expected: 12, actual: 16 }
            })
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = LocalizedKey::from_bytes(AuthProtocol::Md5, vec![0xAB; 16]);
        assert!(!format!("{:?}", key).contains("171"));
        assert!(format!("{:?}", key).contains("REDACTED"));
    }
}
