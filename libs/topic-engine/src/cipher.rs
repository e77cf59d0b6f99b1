//! Payload encryption.
//!
//! Wire format: base64-url (padded) of `IV (16 bytes) || ciphertext`, where
//! the ciphertext is AES in full-block CFB mode and has the plaintext's
//! length. There is no authentication tag: a corrupted ciphertext decrypts
//! to garbage instead of failing.

use aes::{Aes128, Aes192, Aes256};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use cfb_mode::cipher::generic_array::GenericArray;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::CipherError;

/// Initialization vector length (the AES block size).
pub const IV_LEN: usize = 16;

#[derive(Clone)]
enum Key {
    Aes128([u8; 16]),
    Aes192([u8; 24]),
    Aes256([u8; 32]),
}

#[derive(Clone, Copy)]
enum Direction {
    Encrypt,
    Decrypt,
}

/// Shared-secret cipher. The key size selects AES-128/192/256.
#[derive(Clone)]
pub struct Cipher {
    key: Key,
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bits = match self.key {
            Key::Aes128(_) => 128,
            Key::Aes192(_) => 192,
            Key::Aes256(_) => 256,
        };
        f.debug_struct("Cipher").field("aes_bits", &bits).finish_non_exhaustive()
    }
}

impl Cipher {
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        let key = match key.len() {
            16 => Key::Aes128(copy_key(key)),
            24 => Key::Aes192(copy_key(key)),
            32 => Key::Aes256(copy_key(key)),
            n => return Err(CipherError::InvalidKeyLength(n)),
        };
        Ok(Self { key })
    }

    /// Encrypt under a fresh random IV and return the wire string.
    pub fn encrypt(&self, plaintext: &str) -> String {
        let mut buf = vec![0u8; IV_LEN + plaintext.len()];
        let (iv, body) = buf.split_at_mut(IV_LEN);
        OsRng.fill_bytes(iv);
        body.copy_from_slice(plaintext.as_bytes());
        let iv: [u8; IV_LEN] = copy_key(iv);
        self.apply(&iv, body, Direction::Encrypt);
        URL_SAFE.encode(&buf)
    }

    /// Recover the plaintext from a wire string. Invalid UTF-8 in the
    /// recovered bytes is replaced, not rejected.
    pub fn decrypt(&self, wire: impl AsRef<[u8]>) -> Result<String, CipherError> {
        let mut buf = URL_SAFE
            .decode(wire.as_ref())
            .map_err(|e| CipherError::MalformedCiphertext(format!("base64: {e}")))?;
        if buf.len() < IV_LEN {
            return Err(CipherError::MalformedCiphertext(format!(
                "{} bytes is shorter than the {IV_LEN}-byte IV",
                buf.len()
            )));
        }
        let (iv, body) = buf.split_at_mut(IV_LEN);
        let iv: [u8; IV_LEN] = copy_key(iv);
        self.apply(&iv, body, Direction::Decrypt);
        Ok(String::from_utf8_lossy(body).into_owned())
    }

    fn apply(&self, iv: &[u8; IV_LEN], buf: &mut [u8], direction: Direction) {
        match (&self.key, direction) {
            (Key::Aes128(k), Direction::Encrypt) => {
                cfb_mode::Encryptor::<Aes128>::new(GenericArray::from_slice(k), GenericArray::from_slice(iv)).encrypt(buf)
            }
            (Key::Aes128(k), Direction::Decrypt) => {
                cfb_mode::Decryptor::<Aes128>::new(GenericArray::from_slice(k), GenericArray::from_slice(iv)).decrypt(buf)
            }
            (Key::Aes192(k), Direction::Encrypt) => {
                cfb_mode::Encryptor::<Aes192>::new(GenericArray::from_slice(k), GenericArray::from_slice(iv)).encrypt(buf)
            }
            (Key::Aes192(k), Direction::Decrypt) => {
                cfb_mode::Decryptor::<Aes192>::new(GenericArray::from_slice(k), GenericArray::from_slice(iv)).decrypt(buf)
            }
            (Key::Aes256(k), Direction::Encrypt) => {
                cfb_mode::Encryptor::<Aes256>::new(GenericArray::from_slice(k), GenericArray::from_slice(iv)).encrypt(buf)
            }
            (Key::Aes256(k), Direction::Decrypt) => {
                cfb_mode::Decryptor::<Aes256>::new(GenericArray::from_slice(k), GenericArray::from_slice(iv)).decrypt(buf)
            }
        }
    }
}

fn copy_key<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"0123456789abcdef";

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn round_trip_all_key_sizes() {
        let keys: [&[u8]; 3] = [KEY, b"0123456789abcdef01234567", b"0123456789abcdef0123456789abcdef"];
        let long = "x".repeat(1000);
        let texts: [&str; 4] = ["", "hello", "ünïcødé ✓", &long];
        for key in keys {
            let cipher = Cipher::new(key).unwrap();
            for text in texts {
                let wire = cipher.encrypt(text);
                assert_eq!(cipher.decrypt(&wire).unwrap(), text);
            }
        }
    }

    #[test]
    fn wire_is_iv_plus_same_length_ciphertext() {
        let cipher = Cipher::new(KEY).unwrap();
        let wire = cipher.encrypt("hello world");
        let raw = URL_SAFE.decode(&wire).unwrap();
        assert_eq!(raw.len(), IV_LEN + "hello world".len());
        assert_ne!(&raw[IV_LEN..], b"hello world");
    }

    #[test]
    fn fresh_iv_per_call() {
        let cipher = Cipher::new(KEY).unwrap();
        let a = cipher.encrypt("same");
        let b = cipher.encrypt("same");
        assert_ne!(a, b);
        assert_ne!(URL_SAFE.decode(&a).unwrap()[..IV_LEN], URL_SAFE.decode(&b).unwrap()[..IV_LEN]);
    }

    #[test]
    fn short_input_is_malformed() {
        let cipher = Cipher::new(KEY).unwrap();
        let short = URL_SAFE.encode([0u8; IV_LEN - 1]);
        assert!(matches!(cipher.decrypt(&short), Err(CipherError::MalformedCiphertext(_))));
        assert!(matches!(cipher.decrypt(""), Err(CipherError::MalformedCiphertext(_))));
    }

    #[test]
    fn bad_base64_is_malformed() {
        let cipher = Cipher::new(KEY).unwrap();
        assert!(matches!(cipher.decrypt("not/base64url!"), Err(CipherError::MalformedCiphertext(_))));
    }

    #[test]
    fn iv_only_decrypts_to_empty() {
        let cipher = Cipher::new(KEY).unwrap();
        assert_eq!(cipher.decrypt(URL_SAFE.encode([7u8; IV_LEN])).unwrap(), "");
    }

    #[test]
    fn corrupted_ciphertext_is_not_detected() {
        let cipher = Cipher::new(KEY).unwrap();
        let mut raw = URL_SAFE.decode(cipher.encrypt("attack at dawn")).unwrap();
        raw[IV_LEN] ^= 0x01;
        let out = cipher.decrypt(URL_SAFE.encode(&raw)).unwrap();
        assert_ne!(out, "attack at dawn");
    }

    #[test]
    fn rejects_bad_key_length() {
        assert!(matches!(Cipher::new(b"short"), Err(CipherError::InvalidKeyLength(5))));
        assert!(matches!(Cipher::new(&[0u8; 33]), Err(CipherError::InvalidKeyLength(33))));
    }

    // NIST SP 800-38A, F.3.13 CFB128-AES128.Encrypt
    #[test]
    fn matches_cfb128_reference_vector() {
        let cipher = Cipher::new(&hex("2b7e151628aed2a6abf7158809cf4f3c")).unwrap();
        let iv: [u8; IV_LEN] = copy_key(&hex("000102030405060708090a0b0c0d0e0f"));
        let plaintext = hex("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51");
        let expected = hex("3b3fd92eb72dad20333449f8e83cfb4ac8a64537a0b3a93fcde3cdad9f1ce58b");

        let mut buf = plaintext.clone();
        cipher.apply(&iv, &mut buf, Direction::Encrypt);
        assert_eq!(buf, expected);

        // a partial trailing block uses a prefix of the keystream
        let mut partial = plaintext[..21].to_vec();
        cipher.apply(&iv, &mut partial, Direction::Encrypt);
        assert_eq!(partial, expected[..21]);

        cipher.apply(&iv, &mut buf, Direction::Decrypt);
        assert_eq!(buf, plaintext);
    }
}
