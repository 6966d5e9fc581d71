//! The group a ring agreement runs in.
//!
//! Rather than fixing a curve and a base point as process wide constants,
//! every key and every agreement is tied to an explicit [`Domain`] value.
use core::fmt;

use elliptic_curve::{Group, NonZeroScalar};

use crate::compat::CSCurve;
use crate::protocol::InitializationError;

/// Descriptive information about a named curve.
///
/// This is only used for diagnostics, and has no effect on the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurveMetadata {
    /// The name of the curve, e.g. `secp256k1`.
    pub name: &'static [u8],
    /// The number of bits in the group order.
    pub bits: usize,
}

impl fmt::Display for CurveMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} bits)",
            String::from_utf8_lossy(self.name),
            self.bits
        )
    }
}

/// The group parameters used for a ring agreement.
///
/// The curve itself is fixed by the type parameter, which also gives us the
/// group order. What this value adds is the generator, which is usually the
/// standard base point of the curve, but can be any other point generating
/// the group, along with optional metadata about the curve.
///
/// All the participants of an agreement need to use the same domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain<C: CSCurve> {
    generator: C::ProjectivePoint,
    metadata: Option<CurveMetadata>,
}

impl<C: CSCurve> Domain<C> {
    /// The domain of a builtin curve, using its standard base point.
    pub fn builtin() -> Self {
        Self {
            generator: C::ProjectivePoint::generator(),
            metadata: Some(CurveMetadata {
                name: C::NAME,
                bits: C::BITS,
            }),
        }
    }

    /// A domain over the same curve, but with a custom generator.
    ///
    /// Because the curve has prime order, any point other than the identity
    /// generates the whole group, so that's the only check we need.
    pub fn with_generator(generator: C::AffinePoint) -> Result<Self, InitializationError> {
        let generator = C::ProjectivePoint::from(generator);
        if bool::from(generator.is_identity()) {
            return Err(InitializationError::BadParameters(
                "generator cannot be the identity point".to_string(),
            ));
        }
        Ok(Self {
            generator,
            metadata: None,
        })
    }

    /// The generator of the group.
    pub fn generator(&self) -> &C::ProjectivePoint {
        &self.generator
    }

    /// The order of the group generated by the generator.
    pub fn order(&self) -> C::Uint {
        C::ORDER
    }

    /// Metadata about the curve, if this is a builtin domain.
    pub fn metadata(&self) -> Option<&CurveMetadata> {
        self.metadata.as_ref()
    }

    /// Multiply the generator by a scalar.
    pub(crate) fn mul_generator(&self, scalar: &NonZeroScalar<C>) -> C::ProjectivePoint {
        self.generator * **scalar
    }
}

impl<C: CSCurve> Default for Domain<C> {
    fn default() -> Self {
        Self::builtin()
    }
}
