use core::fmt;

use elliptic_curve::{Group, NonZeroScalar};
use rand_core::CryptoRngCore;

use crate::compat::{x_coordinate, CSCurve};
use crate::crypto::SharedSecret;
use crate::domain::Domain;

/// A private scalar along with the matching public point.
///
/// The private scalar is never zero, and never leaves this struct, except
/// through the multiplications done on behalf of the ring.
#[derive(Clone)]
pub struct KeyPair<C: CSCurve> {
    private: NonZeroScalar<C>,
    public: C::ProjectivePoint,
}

impl<C: CSCurve> KeyPair<C> {
    /// Generate a fresh key pair, with a private scalar uniform in `[1, n-1]`.
    pub fn random(domain: &Domain<C>, rng: &mut impl CryptoRngCore) -> Self {
        Self::from_nonzero(domain, NonZeroScalar::random(rng))
    }

    /// Create a key pair from a fixed private scalar.
    ///
    /// This returns None if the scalar is zero.
    pub fn from_scalar(domain: &Domain<C>, private: C::Scalar) -> Option<Self> {
        let private: Option<NonZeroScalar<C>> = NonZeroScalar::new(private).into();
        private.map(|private| Self::from_nonzero(domain, private))
    }

    fn from_nonzero(domain: &Domain<C>, private: NonZeroScalar<C>) -> Self {
        Self {
            private,
            public: domain.mul_generator(&private),
        }
    }

    /// The public point matching the private scalar.
    pub fn public_key(&self) -> C::AffinePoint {
        self.public.into()
    }

    pub(crate) fn public_point(&self) -> &C::ProjectivePoint {
        &self.public
    }

    /// Check that this key pair was created under a given domain.
    pub fn belongs_to(&self, domain: &Domain<C>) -> bool {
        domain.mul_generator(&self.private) == self.public
    }

    /// Multiply a point by the private scalar.
    pub(crate) fn scale(&self, point: &C::ProjectivePoint) -> C::ProjectivePoint {
        *point * *self.private
    }

    /// Run classic two party Diffie-Hellman with someone else's public key.
    ///
    /// With two members, the ring ends up agreeing on exactly this value.
    pub fn diffie_hellman(&self, their_public: &C::AffinePoint) -> SharedSecret<C> {
        self.derive_secret(&C::ProjectivePoint::from(*their_public))
    }

    /// Turn a point containing everyone else's contribution into the shared secret.
    pub(crate) fn derive_secret(&self, point: &C::ProjectivePoint) -> SharedSecret<C> {
        let full = self.scale(point);
        // Scalars are non-zero and the group has prime order, so this can
        // only happen if someone handed us the identity.
        assert!(
            !bool::from(full.is_identity()),
            "shared secret point cannot be the identity"
        );
        SharedSecret::new(x_coordinate::<C>(&full))
    }
}

impl<C: CSCurve> fmt::Debug for KeyPair<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("private", &"..")
            .field("public", &self.public)
            .finish()
    }
}
