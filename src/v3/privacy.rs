//! Privacy: DES-CBC (RFC 3414 Section 8) and AES-128-CFB (RFC 3826).

use std::sync::atomic::{AtomicU64, Ordering};

use aes::Aes128;
use bytes::Bytes;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cfb_mode::cipher::AsyncStreamCipher;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{AuthProtocol, MasterKey, PrivProtocol};
use crate::error::{CryptoErrorKind, Error, Result};

type DesCbcEnc = cbc::Encryptor<des::Des>;
type DesCbcDec = cbc::Decryptor<des::Des>;
type Aes128CfbEnc = cfb_mode::Encryptor<Aes128>;
type Aes128CfbDec = cfb_mode::Decryptor<Aes128>;

const DES_BLOCK: usize = 8;

pub(crate) fn random_nonzero_u64() -> u64 {
    let mut buf = [0u8; 8];
    for _ in 0..4 {
        if getrandom::fill(&mut buf).is_ok() {
            let val = u64::from_ne_bytes(buf);
            if val != 0 {
                return val;
            }
        }
    }
    tracing::warn!(target: "tdsnmp::v3", "OS randomness unavailable, seeding salt from clock");
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
        .max(1)
}

/// Per-session salt source. Starts at a random non-zero value and never yields zero.
#[derive(Debug)]
pub struct SaltCounter(AtomicU64);

impl SaltCounter {
    pub fn new() -> Self {
        Self(AtomicU64::new(random_nonzero_u64()))
    }

    pub fn from_value(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }

    pub fn next(&self) -> u64 {
        let val = self.0.fetch_add(1, Ordering::Relaxed);
        if val == 0 {
            self.0.fetch_add(1, Ordering::Relaxed)
        } else {
            val
        }
    }
}

impl Default for SaltCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Localized privacy key.
///
/// For DES the first 8 octets are the key and the next 8 the pre-IV; AES-128
/// uses the first 16 octets as the key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    protocol: PrivProtocol,
}

impl PrivKey {
    pub fn from_password(
        auth_protocol: AuthProtocol,
        priv_protocol: PrivProtocol,
        password: &[u8],
        engine_id: &[u8],
    ) -> Self {
        Self::from_master_key(
            &MasterKey::from_password(auth_protocol, password),
            priv_protocol,
            engine_id,
        )
    }

    /// Privacy keys are localized with the auth protocol's hash.
    pub fn from_master_key(master: &MasterKey, protocol: PrivProtocol, engine_id: &[u8]) -> Self {
        let localized = master.localize(engine_id);
        Self {
            key: localized.as_bytes().to_vec(),
            protocol,
        }
    }

    pub fn from_bytes(protocol: PrivProtocol, key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            protocol,
        }
    }

    pub fn protocol(&self) -> PrivProtocol {
        self.protocol
    }

    fn material(&self) -> Result<&[u8]> {
        self.key
            .get(..self.protocol.key_len())
            .ok_or(Error::encrypt(CryptoErrorKind::InvalidKeyLength))
    }

    /// Encrypt an encoded scoped PDU. Returns `(ciphertext, msgPrivacyParameters)`.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        salt: &SaltCounter,
    ) -> Result<(Bytes, Bytes)> {
        let material = self.material()?;
        match self.protocol {
            PrivProtocol::Des => {
                let mut params = [0u8; 8];
                params[..4].copy_from_slice(&engine_boots.to_be_bytes());
                params[4..].copy_from_slice(&(salt.next() as u32).to_be_bytes());
                let iv = des_iv(&material[8..16], &params);

                let padded_len = plaintext.len().div_ceil(DES_BLOCK) * DES_BLOCK;
                let mut buf = vec![0u8; padded_len];
                buf[..plaintext.len()].copy_from_slice(plaintext);

                let cipher = DesCbcEnc::new_from_slices(&material[..8], &iv)
                    .map_err(|_| Error::encrypt(CryptoErrorKind::InvalidKeyLength))?;
                let out = cipher
                    .encrypt_padded_mut::<NoPadding>(&mut buf, padded_len)
                    .map_err(|_| Error::encrypt(CryptoErrorKind::CipherError))?;
                Ok((Bytes::copy_from_slice(out), Bytes::copy_from_slice(&params)))
            }
            PrivProtocol::Aes128 => {
                let params = salt.next().to_be_bytes();
                let iv = aes_iv(engine_boots, engine_time, &params);
                let mut buf = plaintext.to_vec();
                Aes128CfbEnc::new_from_slices(material, &iv)
                    .map_err(|_| Error::encrypt(CryptoErrorKind::InvalidKeyLength))?
                    .encrypt(&mut buf);
                Ok((Bytes::from(buf), Bytes::copy_from_slice(&params)))
            }
        }
    }

    /// Decrypt msgData using the boots/time and privacy parameters carried in the
    /// same message.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        priv_params: &[u8],
    ) -> Result<Bytes> {
        if priv_params.len() != self.protocol.salt_len() {
            return Err(Error::decrypt(CryptoErrorKind::InvalidPrivParamsLength {
                expected: self.protocol.salt_len(),
                actual: priv_params.len(),
            }));
        }
        let material = self
            .key
            .get(..self.protocol.key_len())
            .ok_or(Error::decrypt(CryptoErrorKind::InvalidKeyLength))?;

        match self.protocol {
            PrivProtocol::Des => {
                if ciphertext.len() % DES_BLOCK != 0 {
                    return Err(Error::decrypt(CryptoErrorKind::InvalidCiphertextLength {
                        length: ciphertext.len(),
                        block_size: DES_BLOCK,
                    }));
                }
                let iv = des_iv(&material[8..16], priv_params);
                let mut buf = ciphertext.to_vec();
                let plain = DesCbcDec::new_from_slices(&material[..8], &iv)
                    .map_err(|_| Error::decrypt(CryptoErrorKind::InvalidKeyLength))?
                    .decrypt_padded_mut::<NoPadding>(&mut buf)
                    .map_err(|_| Error::decrypt(CryptoErrorKind::CipherError))?;
                Ok(Bytes::copy_from_slice(plain))
            }
            PrivProtocol::Aes128 => {
                let iv = aes_iv(engine_boots, engine_time, priv_params);
                let mut buf = ciphertext.to_vec();
                Aes128CfbDec::new_from_slices(material, &iv)
                    .map_err(|_| Error::decrypt(CryptoErrorKind::InvalidKeyLength))?
                    .decrypt(&mut buf);
                Ok(Bytes::from(buf))
            }
        }
    }
}

impl std::fmt::Debug for PrivKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivKey")
            .field("protocol", &self.protocol)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

fn des_iv(pre_iv: &[u8], salt: &[u8]) -> [u8; 8] {
    let mut iv = [0u8; 8];
    for (out, (p, s)) in iv.iter_mut().zip(pre_iv.iter().zip(salt)) {
        *out = p ^ s;
    }
    iv
}

fn aes_iv(engine_boots: u32, engine_time: u32, salt: &[u8]) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[..4].copy_from_slice(&engine_boots.to_be_bytes());
    iv[4..8].copy_from_slice(&engine_time.to_be_bytes());
    iv[8..].copy_from_slice(&salt[..8]);
    iv
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGINE_ID: &[u8] = b"\x80\x00\x1f\x88\x80\xe9\x63\x00\x00\xd6\x1f\xf4\x49";

    #[test]
    fn test_salt_counter_skips_zero() {
        let counter = SaltCounter::from_value(u64::MAX);
        assert_eq!(counter.next(), u64::MAX);
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.next(), 2);
    }

    #[test]
    fn test_des_pads_and_decrypts() {
        let key = PrivKey::from_password(AuthProtocol::Md5, PrivProtocol::Des, b"privpass1", ENGINE_ID);
        let salt = SaltCounter::from_value(7);
        let plaintext = b"scoped pdu bytes, 29 octets..";
        let (ct, params) = key.encrypt(plaintext, 3, 1000, &salt).unwrap();

        assert_eq!(ct.len(), 32);
        assert_eq!(&params[..4], &3u32.to_be_bytes());
        assert_eq!(&params[4..], &7u32.to_be_bytes());

        let plain = key.decrypt(&ct, 3, 1000, &params).unwrap();
        assert_eq!(&plain[..plaintext.len()], plaintext);
        assert!(plain[plaintext.len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_aes_iv_uses_boots_and_time() {
        let key = PrivKey::from_password(AuthProtocol::Sha1, PrivProtocol::Aes128, b"privpass1", ENGINE_ID);
        let salt = SaltCounter::from_value(0x0102_0304_0506_0708);
        let plaintext = b"not a block multiple";
        let (ct, params) = key.encrypt(plaintext, 5, 12345, &salt).unwrap();
        assert_eq!(ct.len(), plaintext.len());
        assert_eq!(params.as_ref(), &[1, 2, 3, 4, 5, 6, 7, 8]);

        assert_eq!(key.decrypt(&ct, 5, 12345, &params).unwrap().as_ref(), plaintext);
        assert_ne!(key.decrypt(&ct, 5, 12346, &params).unwrap().as_ref(), plaintext);
    }

    #[test]
    fn test_decrypt_rejects_bad_inputs() {
        let key = PrivKey::from_bytes(PrivProtocol::Des, vec![0x11; 16]);
        assert!(matches!(
            key.decrypt(&[0u8; 8], 0, 0, &[0u8; 4]),
            Err(Error::Decryption {
                kind: CryptoErrorKind::InvalidPrivParamsLength { expected: 8, actual: 4 }
            })
        ));
        assert!(matches!(
            key.decrypt(&[0u8; 9], 0, 0, &[0u8; 8]),
            Err(Error::Decryption {
                kind: CryptoErrorKind::InvalidCiphertextLength { length: 9, block_size: 8 }
            })
        ));
    }

    #[test]
    fn test_short_key_is_an_error() {
        let key = PrivKey::from_bytes(PrivProtocol::Aes128, vec![0x11; 8]);
        assert!(key.encrypt(b"x", 0, 0, &SaltCounter::new()).is_err());
    }
}
