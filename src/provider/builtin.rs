//! Built-in provider backed by pure-Rust FIPS 203/204/205 and NIST-curve crates.
//!
//! Each parameter set is a zero-sized marker implementing one of the three
//! scheme traits; a single generic session type per trait adapts it to
//! [`Session`].

use fips203::traits::{Decaps, Encaps, KeyGen};
use fips204::traits::{Signer as _, Verifier as _};
use fips205::traits::{Signer as _, Verifier as _};
use rand::rngs::OsRng;

use crate::core::{ArtifactLengths, MechanismDetails, PrimitiveKind};
use crate::{BenchError, BenchResult};

use super::traits::{PrimitiveProvider, Session};

/// Key-encapsulation parameter set.
pub trait KemScheme {
    const NAME: &'static str;
    const LEVEL: u8;
    const LENGTHS: ArtifactLengths;

    type EncapsKey;
    type DecapsKey;
    type Ciphertext;
    type SharedSecret: PartialEq;

    fn keygen() -> Result<(Self::EncapsKey, Self::DecapsKey), String>;
    fn encaps(ek: &Self::EncapsKey) -> Result<(Self::SharedSecret, Self::Ciphertext), String>;
    fn decaps(dk: &Self::DecapsKey, ct: &Self::Ciphertext) -> Result<Self::SharedSecret, String>;
}

/// Post-quantum signature parameter set.
pub trait SignatureScheme {
    const NAME: &'static str;
    const LEVEL: u8;
    const LENGTHS: ArtifactLengths;

    type PublicKey;
    type SecretKey;
    type Signature;

    fn keygen() -> Result<(Self::PublicKey, Self::SecretKey), String>;
    fn sign(sk: &Self::SecretKey, message: &[u8]) -> Result<Self::Signature, String>;
    fn verify(pk: &Self::PublicKey, message: &[u8], signature: &Self::Signature) -> bool;
}

/// Classical ECDSA curve. Key generation and signing cannot fail.
pub trait CurveScheme {
    const NAME: &'static str;
    const LEVEL: u8;
    const LENGTHS: ArtifactLengths;

    type SigningKey;
    type VerifyingKey;
    type Signature;

    fn generate() -> (Self::SigningKey, Self::VerifyingKey);
    fn sign(sk: &Self::SigningKey, message: &[u8]) -> Self::Signature;
    fn verify(vk: &Self::VerifyingKey, message: &[u8], signature: &Self::Signature) -> bool;
}

fn op_failed(variant: &str, reason: String) -> BenchError {
    BenchError::Provider {
        variant: variant.to_string(),
        reason,
    }
}

fn out_of_order(variant: &str, step: &str) -> BenchError {
    op_failed(variant, format!("{step} called out of order"))
}

/// One iteration of a KEM: keypair, encapsulation, decapsulation.
pub struct KemSession<K: KemScheme> {
    keys: Option<(K::EncapsKey, K::DecapsKey)>,
    encapsulated: Option<(K::SharedSecret, K::Ciphertext)>,
}

impl<K: KemScheme> KemSession<K> {
    pub fn new() -> Self {
        KemSession {
            keys: None,
            encapsulated: None,
        }
    }
}

impl<K: KemScheme> Default for KemSession<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: KemScheme> Session for KemSession<K> {
    fn generate_keypair(&mut self) -> BenchResult<()> {
        self.keys = Some(K::keygen().map_err(|e| op_failed(K::NAME, e))?);
        Ok(())
    }

    fn produce(&mut self, _message: &[u8]) -> BenchResult<()> {
        let (ek, _) = self
            .keys
            .as_ref()
            .ok_or_else(|| out_of_order(K::NAME, "encapsulate"))?;
        self.encapsulated = Some(K::encaps(ek).map_err(|e| op_failed(K::NAME, e))?);
        Ok(())
    }

    fn consume(&mut self, _message: &[u8]) -> BenchResult<bool> {
        let ((_, dk), (sent, ct)) = self
            .keys
            .as_ref()
            .zip(self.encapsulated.as_ref())
            .ok_or_else(|| out_of_order(K::NAME, "decapsulate"))?;
        let received = K::decaps(dk, ct).map_err(|e| op_failed(K::NAME, e))?;
        Ok(received == *sent)
    }
}

/// One iteration of a post-quantum signature: keypair, sign, verify.
pub struct SignatureSession<S: SignatureScheme> {
    keys: Option<(S::PublicKey, S::SecretKey)>,
    signature: Option<S::Signature>,
}

impl<S: SignatureScheme> SignatureSession<S> {
    pub fn new() -> Self {
        SignatureSession {
            keys: None,
            signature: None,
        }
    }
}

impl<S: SignatureScheme> Default for SignatureSession<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SignatureScheme> Session for SignatureSession<S> {
    fn generate_keypair(&mut self) -> BenchResult<()> {
        self.keys = Some(S::keygen().map_err(|e| op_failed(S::NAME, e))?);
        Ok(())
    }

    fn produce(&mut self, message: &[u8]) -> BenchResult<()> {
        let (_, sk) = self
            .keys
            .as_ref()
            .ok_or_else(|| out_of_order(S::NAME, "sign"))?;
        self.signature = Some(S::sign(sk, message).map_err(|e| op_failed(S::NAME, e))?);
        Ok(())
    }

    fn consume(&mut self, message: &[u8]) -> BenchResult<bool> {
        let ((pk, _), sig) = self
            .keys
            .as_ref()
            .zip(self.signature.as_ref())
            .ok_or_else(|| out_of_order(S::NAME, "verify"))?;
        Ok(S::verify(pk, message, sig))
    }
}

/// One iteration of the ECDSA baseline.
pub struct EcdsaSession<C: CurveScheme> {
    keys: Option<(C::SigningKey, C::VerifyingKey)>,
    signature: Option<C::Signature>,
}

impl<C: CurveScheme> EcdsaSession<C> {
    pub fn new() -> Self {
        EcdsaSession {
            keys: None,
            signature: None,
        }
    }
}

impl<C: CurveScheme> Default for EcdsaSession<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CurveScheme> Session for EcdsaSession<C> {
    fn generate_keypair(&mut self) -> BenchResult<()> {
        self.keys = Some(C::generate());
        Ok(())
    }

    fn produce(&mut self, message: &[u8]) -> BenchResult<()> {
        let (sk, _) = self
            .keys
            .as_ref()
            .ok_or_else(|| out_of_order(C::NAME, "sign"))?;
        self.signature = Some(C::sign(sk, message));
        Ok(())
    }

    fn consume(&mut self, message: &[u8]) -> BenchResult<bool> {
        let ((_, vk), sig) = self
            .keys
            .as_ref()
            .zip(self.signature.as_ref())
            .ok_or_else(|| out_of_order(C::NAME, "verify"))?;
        Ok(C::verify(vk, message, sig))
    }
}

macro_rules! ml_kem {
    ($marker:ident, $module:ident, $name:literal, $level:literal, $pk:literal, $sk:literal, $ct:literal) => {
        pub struct $marker;

        impl KemScheme for $marker {
            const NAME: &'static str = $name;
            const LEVEL: u8 = $level;
            const LENGTHS: ArtifactLengths = ArtifactLengths::Kem {
                public_key: $pk,
                secret_key: $sk,
                ciphertext: $ct,
                shared_secret: 32,
            };

            type EncapsKey = fips203::$module::EncapsKey;
            type DecapsKey = fips203::$module::DecapsKey;
            type Ciphertext = <fips203::$module::EncapsKey as Encaps>::CipherText;
            type SharedSecret = <fips203::$module::EncapsKey as Encaps>::SharedSecretKey;

            fn keygen() -> Result<(Self::EncapsKey, Self::DecapsKey), String> {
                <fips203::$module::KG as KeyGen>::try_keygen().map_err(|e| e.to_string())
            }

            fn encaps(
                ek: &Self::EncapsKey,
            ) -> Result<(Self::SharedSecret, Self::Ciphertext), String> {
                ek.try_encaps().map_err(|e| e.to_string())
            }

            fn decaps(
                dk: &Self::DecapsKey,
                ct: &Self::Ciphertext,
            ) -> Result<Self::SharedSecret, String> {
                dk.try_decaps(ct).map_err(|e| e.to_string())
            }
        }
    };
}

ml_kem!(MlKem512, ml_kem_512, "ML-KEM-512", 1, 800, 1632, 768);
ml_kem!(MlKem768, ml_kem_768, "ML-KEM-768", 3, 1184, 2400, 1088);
ml_kem!(MlKem1024, ml_kem_1024, "ML-KEM-1024", 5, 1568, 3168, 1568);

macro_rules! ml_dsa {
    ($marker:ident, $module:ident, $name:literal, $level:literal, $pk:literal, $sk:literal, $sig:literal) => {
        pub struct $marker;

        impl SignatureScheme for $marker {
            const NAME: &'static str = $name;
            const LEVEL: u8 = $level;
            const LENGTHS: ArtifactLengths = ArtifactLengths::Signature {
                public_key: $pk,
                secret_key: $sk,
                signature: $sig,
            };

            type PublicKey = fips204::$module::PublicKey;
            type SecretKey = fips204::$module::PrivateKey;
            type Signature = <fips204::$module::PrivateKey as fips204::traits::Signer>::Signature;

            fn keygen() -> Result<(Self::PublicKey, Self::SecretKey), String> {
                fips204::$module::try_keygen().map_err(|e| e.to_string())
            }

            fn sign(sk: &Self::SecretKey, message: &[u8]) -> Result<Self::Signature, String> {
                sk.try_sign(message, &[]).map_err(|e| e.to_string())
            }

            fn verify(pk: &Self::PublicKey, message: &[u8], signature: &Self::Signature) -> bool {
                pk.verify(message, signature, &[])
            }
        }
    };
}

ml_dsa!(MlDsa44, ml_dsa_44, "ML-DSA-44", 2, 1312, 2560, 2420);
ml_dsa!(MlDsa65, ml_dsa_65, "ML-DSA-65", 3, 1952, 4032, 3309);
ml_dsa!(MlDsa87, ml_dsa_87, "ML-DSA-87", 5, 2592, 4896, 4627);

macro_rules! slh_dsa {
    ($marker:ident, $module:ident, $name:literal, $level:literal, $pk:literal, $sk:literal, $sig:literal) => {
        #[allow(non_camel_case_types)]
        pub struct $marker;

        impl SignatureScheme for $marker {
            const NAME: &'static str = $name;
            const LEVEL: u8 = $level;
            const LENGTHS: ArtifactLengths = ArtifactLengths::Signature {
                public_key: $pk,
                secret_key: $sk,
                signature: $sig,
            };

            type PublicKey = fips205::$module::PublicKey;
            type SecretKey = fips205::$module::PrivateKey;
            type Signature = <fips205::$module::PrivateKey as fips205::traits::Signer>::Signature;

            fn keygen() -> Result<(Self::PublicKey, Self::SecretKey), String> {
                fips205::$module::try_keygen().map_err(|e| e.to_string())
            }

            fn sign(sk: &Self::SecretKey, message: &[u8]) -> Result<Self::Signature, String> {
                // hedged signing, matching the randomized default of the other schemes
                sk.try_sign(message, &[], true).map_err(|e| e.to_string())
            }

            fn verify(pk: &Self::PublicKey, message: &[u8], signature: &Self::Signature) -> bool {
                pk.verify(message, signature, &[])
            }
        }
    };
}

slh_dsa!(SlhDsaSha2_128s, slh_dsa_sha2_128s, "SLH-DSA-SHA2-128s", 1, 32, 64, 7856);
slh_dsa!(SlhDsaSha2_128f, slh_dsa_sha2_128f, "SLH-DSA-SHA2-128f", 1, 32, 64, 17088);
slh_dsa!(SlhDsaSha2_192s, slh_dsa_sha2_192s, "SLH-DSA-SHA2-192s", 3, 48, 96, 16224);
slh_dsa!(SlhDsaSha2_192f, slh_dsa_sha2_192f, "SLH-DSA-SHA2-192f", 3, 48, 96, 35664);
slh_dsa!(SlhDsaSha2_256s, slh_dsa_sha2_256s, "SLH-DSA-SHA2-256s", 5, 64, 128, 29792);
slh_dsa!(SlhDsaSha2_256f, slh_dsa_sha2_256f, "SLH-DSA-SHA2-256f", 5, 64, 128, 49856);
slh_dsa!(SlhDsaShake128s, slh_dsa_shake_128s, "SLH-DSA-SHAKE-128s", 1, 32, 64, 7856);
slh_dsa!(SlhDsaShake128f, slh_dsa_shake_128f, "SLH-DSA-SHAKE-128f", 1, 32, 64, 17088);
slh_dsa!(SlhDsaShake192s, slh_dsa_shake_192s, "SLH-DSA-SHAKE-192s", 3, 48, 96, 16224);
slh_dsa!(SlhDsaShake192f, slh_dsa_shake_192f, "SLH-DSA-SHAKE-192f", 3, 48, 96, 35664);
slh_dsa!(SlhDsaShake256s, slh_dsa_shake_256s, "SLH-DSA-SHAKE-256s", 5, 64, 128, 29792);
slh_dsa!(SlhDsaShake256f, slh_dsa_shake_256f, "SLH-DSA-SHAKE-256f", 5, 64, 128, 49856);

macro_rules! ecdsa_curve {
    ($marker:ident, $krate:ident, $name:literal, $level:literal, $pk:literal, $sk:literal, $sig:literal) => {
        pub struct $marker;

        impl CurveScheme for $marker {
            const NAME: &'static str = $name;
            const LEVEL: u8 = $level;
            // SEC1 uncompressed point, raw scalar, fixed-width r||s
            const LENGTHS: ArtifactLengths = ArtifactLengths::Signature {
                public_key: $pk,
                secret_key: $sk,
                signature: $sig,
            };

            type SigningKey = $krate::ecdsa::SigningKey;
            type VerifyingKey = $krate::ecdsa::VerifyingKey;
            type Signature = $krate::ecdsa::Signature;

            fn generate() -> (Self::SigningKey, Self::VerifyingKey) {
                let sk = $krate::ecdsa::SigningKey::random(&mut OsRng);
                let vk = $krate::ecdsa::VerifyingKey::from(&sk);
                (sk, vk)
            }

            fn sign(sk: &Self::SigningKey, message: &[u8]) -> Self::Signature {
                use $krate::ecdsa::signature::Signer;
                sk.sign(message)
            }

            fn verify(vk: &Self::VerifyingKey, message: &[u8], signature: &Self::Signature) -> bool {
                use $krate::ecdsa::signature::Verifier;
                vk.verify(message, signature).is_ok()
            }
        }
    };
}

ecdsa_curve!(EcdsaP256, p256, "P-256", 1, 65, 32, 64);
ecdsa_curve!(EcdsaP384, p384, "P-384", 3, 97, 48, 96);
ecdsa_curve!(EcdsaP521, p521, "P-521", 5, 133, 66, 132);

/// Registry row: static metadata plus a session constructor.
#[derive(Clone, Copy)]
struct Entry {
    kind: PrimitiveKind,
    name: &'static str,
    level: u8,
    lengths: ArtifactLengths,
    open: fn() -> Box<dyn Session>,
}

fn open_session<T: Session + Default + 'static>() -> Box<dyn Session> {
    Box::new(T::default())
}

fn kem<K: KemScheme + 'static>() -> Entry {
    Entry {
        kind: PrimitiveKind::Kem,
        name: K::NAME,
        level: K::LEVEL,
        lengths: K::LENGTHS,
        open: open_session::<KemSession<K>>,
    }
}

fn sig<S: SignatureScheme + 'static>() -> Entry {
    Entry {
        kind: PrimitiveKind::Sig,
        name: S::NAME,
        level: S::LEVEL,
        lengths: S::LENGTHS,
        open: open_session::<SignatureSession<S>>,
    }
}

fn curve<C: CurveScheme + 'static>() -> Entry {
    Entry {
        kind: PrimitiveKind::Ecdsa,
        name: C::NAME,
        level: C::LEVEL,
        lengths: C::LENGTHS,
        open: open_session::<EcdsaSession<C>>,
    }
}

/// Provider over every parameter set compiled into this binary.
pub struct BuiltinProvider {
    entries: Vec<Entry>,
}

impl BuiltinProvider {
    pub fn new() -> Self {
        BuiltinProvider {
            entries: vec![
                kem::<MlKem512>(),
                kem::<MlKem768>(),
                kem::<MlKem1024>(),
                sig::<MlDsa44>(),
                sig::<MlDsa65>(),
                sig::<MlDsa87>(),
                sig::<SlhDsaSha2_128s>(),
                sig::<SlhDsaSha2_128f>(),
                sig::<SlhDsaSha2_192s>(),
                sig::<SlhDsaSha2_192f>(),
                sig::<SlhDsaSha2_256s>(),
                sig::<SlhDsaSha2_256f>(),
                sig::<SlhDsaShake128s>(),
                sig::<SlhDsaShake128f>(),
                sig::<SlhDsaShake192s>(),
                sig::<SlhDsaShake192f>(),
                sig::<SlhDsaShake256s>(),
                sig::<SlhDsaShake256f>(),
                curve::<EcdsaP256>(),
                curve::<EcdsaP384>(),
                curve::<EcdsaP521>(),
            ],
        }
    }

    fn entry(&self, kind: PrimitiveKind, variant: &str) -> BenchResult<&Entry> {
        self.entries
            .iter()
            .find(|e| e.kind == kind && e.name.eq_ignore_ascii_case(variant))
            .ok_or_else(|| BenchError::ProviderUnavailable {
                variant: variant.to_string(),
            })
    }
}

impl Default for BuiltinProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PrimitiveProvider for BuiltinProvider {
    fn name(&self) -> &str {
        "builtin"
    }

    fn version(&self) -> Option<String> {
        Some(env!("CARGO_PKG_VERSION").to_string())
    }

    fn enabled_mechanisms(&self, kind: PrimitiveKind) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.name.to_string())
            .collect()
    }

    fn details(&self, kind: PrimitiveKind, variant: &str) -> BenchResult<MechanismDetails> {
        let entry = self.entry(kind, variant)?;
        Ok(MechanismDetails {
            claimed_nist_level: Some(entry.level),
            lengths: Some(entry.lengths),
            security_notion: Some(true),
        })
    }

    fn open(&self, kind: PrimitiveKind, variant: &str) -> BenchResult<Box<dyn Session + '_>> {
        let entry = self.entry(kind, variant)?;
        Ok((entry.open)())
    }
}
