use core::fmt;

use ck_meow::Meow;
use elliptic_curve::FieldBytes;
use subtle::{Choice, ConstantTimeEq};

use crate::compat::CSCurve;

const KDF_LABEL: &[u8] = b"ring-ecdh v0.1.0 key derivation";
/// The number of bytes in a derived key.
pub const KEY_LEN: usize = 32;

/// The secret every member of a ring ends up agreeing on.
///
/// This is the affine x coordinate of `(x_1 * ... * x_n) * G`, as big endian bytes.
///
/// These bytes are not uniformly distributed, so they shouldn't be used as
/// a key directly: use [`SharedSecret::derive_key`] instead.
#[derive(Clone)]
pub struct SharedSecret<C: CSCurve>(FieldBytes<C>);

impl<C: CSCurve> SharedSecret<C> {
    pub(crate) fn new(x: FieldBytes<C>) -> Self {
        Self(x)
    }

    /// The raw x coordinate making up this secret.
    pub fn raw_secret_bytes(&self) -> &FieldBytes<C> {
        &self.0
    }

    /// Derive a uniform symmetric key from this secret.
    ///
    /// The context separates keys used for different purposes: the same
    /// secret and context will always give the same key.
    pub fn derive_key(&self, context: &[u8]) -> [u8; KEY_LEN] {
        let mut meow = Meow::new(KDF_LABEL);

        meow.meta_ad(b"curve", false);
        meow.ad(C::NAME, false);
        meow.meta_ad(b"secret", false);
        meow.ad(&self.0, false);
        meow.meta_ad(b"context", false);
        meow.ad(context, false);

        let mut out = [0u8; KEY_LEN];
        meow.prf(&mut out, false);
        out
    }
}

impl<C: CSCurve> ConstantTimeEq for SharedSecret<C> {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0[..].ct_eq(&other.0[..])
    }
}

impl<C: CSCurve> PartialEq for SharedSecret<C> {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl<C: CSCurve> Eq for SharedSecret<C> {}

impl<C: CSCurve> fmt::Debug for SharedSecret<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}
