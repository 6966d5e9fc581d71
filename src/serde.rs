use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};

use crate::compat::{CSCurve, SerializablePoint};

/// Encode an arbitrary serializable value into a vec.
#[cfg(test)]
pub fn encode<T: Serialize + ?Sized>(val: &T) -> Vec<u8> {
    rmp_serde::encode::to_vec(val).expect("failed to encode value")
}

/// Encode an arbitrary serializable value into a vec, with a one byte tag in front.
pub fn encode_with_tag<T: Serialize + ?Sized>(tag: u8, val: &T) -> Vec<u8> {
    let mut out = vec![tag];
    rmp_serde::encode::write(&mut out, val).expect("failed to encode value");
    out
}

/// Decode an arbitrary value from a slice of bytes.
pub fn decode<T: DeserializeOwned>(input: &[u8]) -> Result<T, rmp_serde::decode::Error> {
    rmp_serde::decode::from_slice(input)
}

/// Serialize a single projective point.
pub fn serialize_projective_point<C: CSCurve, S: Serializer>(
    data: &C::ProjectivePoint,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    SerializablePoint::<C>::from_projective(data).serialize(serializer)
}

/// Deserialize a single projective point.
///
/// This goes through the affine encoding of the curve, which checks that
/// the point actually lies on the curve.
pub fn deserialize_projective_point<'de, C: CSCurve, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<C::ProjectivePoint, D::Error> {
    Ok(SerializablePoint::<C>::deserialize(deserializer)?.to_projective())
}
