use rand_core::CryptoRngCore;

use crate::compat::CSCurve;
use crate::crypto::SharedSecret;
use crate::domain::Domain;
use crate::keys::KeyPair;
use crate::protocol::{InitializationError, Participant};

/// One member of a ring agreement.
///
/// This holds the identity of the member, their key pair, and a slot
/// for the shared secret, which gets filled in by [`crate::run_ring_agreement`].
#[derive(Debug, Clone)]
pub struct Party<C: CSCurve> {
    id: Participant,
    name: Option<String>,
    keys: KeyPair<C>,
    shared_secret: Option<SharedSecret<C>>,
}

impl<C: CSCurve> Party<C> {
    /// Create a new party, with a freshly generated key pair.
    pub fn new(domain: &Domain<C>, id: Participant, rng: &mut impl CryptoRngCore) -> Self {
        Self::from_keys(id, KeyPair::random(domain, rng))
    }

    /// Create a new party from a fixed private scalar.
    ///
    /// This is mainly useful for reproducible runs.
    pub fn from_scalar(
        domain: &Domain<C>,
        id: Participant,
        private: C::Scalar,
    ) -> Result<Self, InitializationError> {
        let keys = KeyPair::from_scalar(domain, private).ok_or_else(|| {
            InitializationError::BadParameters(format!("private scalar of {id} cannot be zero"))
        })?;
        Ok(Self::from_keys(id, keys))
    }

    /// Create a new party from an existing key pair.
    pub fn from_keys(id: Participant, keys: KeyPair<C>) -> Self {
        Self {
            id,
            name: None,
            keys,
            shared_secret: None,
        }
    }

    /// Attach a human readable name, used only when reporting progress.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn id(&self) -> Participant {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn keys(&self) -> &KeyPair<C> {
        &self.keys
    }

    pub fn public_key(&self) -> C::AffinePoint {
        self.keys.public_key()
    }

    /// The secret this party agreed on, once the agreement has finished.
    pub fn shared_secret(&self) -> Option<&SharedSecret<C>> {
        self.shared_secret.as_ref()
    }

    pub(crate) fn clear_shared_secret(&mut self) {
        self.shared_secret = None;
    }

    /// Derive and store the shared secret from a point holding everybody else's scalars.
    ///
    /// This can only happen once per agreement.
    pub(crate) fn derive_secret(&mut self, point: &C::ProjectivePoint) -> &SharedSecret<C> {
        assert!(
            self.shared_secret.is_none(),
            "{} already holds a shared secret",
            self.id
        );
        self.shared_secret.insert(self.keys.derive_secret(point))
    }

    /// A label for logs, preferring the name if there is one.
    pub(crate) fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.id.to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use k256::{ProjectivePoint, Scalar, Secp256k1};
    use rand_core::OsRng;

    use super::*;

    #[test]
    fn test_party_construction() {
        let domain = Domain::<Secp256k1>::builtin();
        let alice = Party::new(&domain, Participant::from(0u32), &mut OsRng).with_name("Alice");
        assert_eq!(alice.id(), Participant::from(0u32));
        assert_eq!(alice.name(), Some("Alice"));
        assert_eq!(alice.label(), "Alice");
        assert!(alice.shared_secret().is_none());
        assert!(alice.keys().belongs_to(&domain));

        let bob = Party::from_scalar(&domain, Participant::from(1u32), Scalar::from(5u64)).unwrap();
        assert_eq!(bob.label(), "P1");
        assert_eq!(
            bob.public_key(),
            (ProjectivePoint::GENERATOR * Scalar::from(5u64)).to_affine()
        );

        assert!(Party::from_scalar(&domain, Participant::from(2u32), Scalar::ZERO).is_err());
    }

    #[test]
    #[should_panic]
    fn test_secret_can_only_be_derived_once() {
        let domain = Domain::<Secp256k1>::builtin();
        let mut party = Party::from_scalar(&domain, Participant::from(0u32), Scalar::ONE).unwrap();
        let point = ProjectivePoint::GENERATOR;
        party.derive_secret(&point);
        party.derive_secret(&point);
    }
}
