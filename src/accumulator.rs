//! Partial products circulating around the ring.
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::compat::{x_coordinate, CSCurve};
use crate::keys::KeyPair;
use crate::protocol::Participant;
use crate::serde::{deserialize_projective_point, serialize_projective_point};

/// A point labelled with the participants whose scalars it contains.
///
/// If the contributors are `p_1, ..., p_k`, with private scalars `x_1, ..., x_k`,
/// then the point is `(x_1 * ... * x_k) * G`.
///
/// Accumulators are values: absorbing another participant gives a new accumulator,
/// leaving the old one untouched.
#[derive(Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Accumulator<C: CSCurve> {
    contributors: Vec<Participant>,
    #[serde(
        serialize_with = "serialize_projective_point::<C, _>",
        deserialize_with = "deserialize_projective_point::<C, _>"
    )]
    point: C::ProjectivePoint,
}

impl<C: CSCurve> Accumulator<C> {
    /// Start a new accumulator, containing only the scalar of one participant.
    pub fn seed(me: Participant, keys: &KeyPair<C>) -> Self {
        Self {
            contributors: vec![me],
            point: *keys.public_point(),
        }
    }

    /// Multiply in the scalar of one more participant.
    ///
    /// A participant must never be absorbed twice, since that would square
    /// their scalar in the product.
    pub fn absorb(&self, me: Participant, keys: &KeyPair<C>) -> Self {
        assert!(
            !self.contains(me),
            "{me} has already been absorbed into {self}"
        );
        let mut contributors = Vec::with_capacity(self.contributors.len() + 1);
        contributors.extend_from_slice(&self.contributors);
        contributors.push(me);
        Self {
            contributors,
            point: keys.scale(&self.point),
        }
    }

    /// Check if this accumulator contains everybody but a given participant.
    ///
    /// This assumes that the contributors are distinct, which holds as long
    /// as no participant was absorbed twice.
    pub fn is_complete_for(&self, me: Participant, total: usize) -> bool {
        self.contributors.len() + 1 == total && !self.contains(me)
    }

    pub fn contains(&self, participant: Participant) -> bool {
        self.contributors.contains(&participant)
    }

    /// The participants which contributed, in the order they did so.
    pub fn contributors(&self) -> &[Participant] {
        &self.contributors
    }

    pub fn point(&self) -> &C::ProjectivePoint {
        &self.point
    }
}

impl<C: CSCurve> fmt::Debug for Accumulator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accumulator")
            .field("contributors", &self.contributors)
            .field("point", &self.point)
            .finish()
    }
}

/// Formats the accumulator like `P0 * P2 * G = 79be...`, with the x coordinate in hex.
impl<C: CSCurve> fmt::Display for Accumulator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.contributors {
            write!(f, "{p} * ")?;
        }
        write!(f, "G = ")?;
        for byte in x_coordinate::<C>(&self.point).iter() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
