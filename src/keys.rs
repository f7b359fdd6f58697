use curve25519_dalek::montgomery::MontgomeryPoint;
use rand::rngs::OsRng;
use rand::{rng, Rng, TryRngCore};

/// Curve25519 key pair. Only the private half is persisted; the public
/// half is rederived from it on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub public_key: [u8; 32],
    pub private_key: [u8; 32],
}

impl KeyPair {
    pub fn generate() -> Self {
        let mut private_key = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut private_key)
            .expect("CSPRNG failure while generating key material");
        Self::from_private_key(private_key)
    }

    pub fn from_private_key(private_key: [u8; 32]) -> Self {
        let public_key = MontgomeryPoint::mul_base_clamped(private_key).to_bytes();
        Self {
            public_key,
            private_key,
        }
    }
}

/// One-time pre-key with its allocated id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreKey {
    pub key_pair: KeyPair,
    pub key_id: u32,
}

impl PreKey {
    pub fn new(key_id: u32) -> Self {
        Self {
            key_pair: KeyPair::generate(),
            key_id,
        }
    }
}

pub fn generate_registration_id() -> u32 {
    rng().random_range(1..=16380)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_rederives_from_private() {
        let pair = KeyPair::generate();
        let rebuilt = KeyPair::from_private_key(pair.private_key);
        assert_eq!(rebuilt.public_key, pair.public_key);
    }

    #[test]
    fn registration_id_in_range() {
        for _ in 0..64 {
            let id = generate_registration_id();
            assert!((1..=16380).contains(&id));
        }
    }
}
