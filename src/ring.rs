//! The ring agreement, as a protocol run by each participant separately.
//!
//! Each participant only ever talks to its two neighbours in the ring: it receives
//! a buffer of accumulators from the participant before it, does its part, and
//! sends the buffer on to the participant after it. The ring is the sorted list
//! of participants, so that everybody agrees on it.
//!
//! A participant at position `i` acts at global rounds `i` and `n + i`, when
//! those rounds exist, and needs at most these two turns to harvest its secret.
use elliptic_curve::Group;
use tracing::{debug, error, info, instrument};

use crate::accumulator::Accumulator;
use crate::compat::CSCurve;
use crate::crypto::SharedSecret;
use crate::domain::Domain;
use crate::keys::KeyPair;
use crate::participants::{ParticipantCounter, ParticipantList};
use crate::protocol::internal::{Communication, Executor, Waitpoint};
use crate::protocol::{InitializationError, Participant, Protocol, ProtocolError};

/// The number of turns any participant can take around the ring.
const TURNS: Waitpoint = 2;

/// Check a buffer received from our predecessor, before doing anything with it.
fn validate<C: CSCurve>(
    participants: &ParticipantList,
    me: Participant,
    buffer: &[Accumulator<C>],
) -> Result<(), ProtocolError> {
    if buffer.is_empty() {
        return Err(ProtocolError::AssertionFailed(
            "received an empty buffer".to_string(),
        ));
    }
    let n = participants.len();
    for (i, acc) in buffer.iter().enumerate() {
        let mut seen = ParticipantCounter::new(participants);
        for &p in acc.contributors() {
            if !seen.put(p) {
                return Err(ProtocolError::AssertionFailed(format!(
                    "accumulator {i} names {p} twice, or isn't part of the ring"
                )));
            }
        }
        if seen.count() == 0 || acc.contains(me) {
            return Err(ProtocolError::AssertionFailed(format!(
                "accumulator {i} has bad contributors {:?}",
                acc.contributors()
            )));
        }
        if i > 0 && acc.is_complete_for(me, n) {
            return Err(ProtocolError::AssertionFailed(format!(
                "accumulator {i} is complete, but isn't at the front of the buffer"
            )));
        }
        if bool::from(acc.point().is_identity()) {
            return Err(ProtocolError::AssertionFailed(format!(
                "accumulator {i} contains the identity point"
            )));
        }
    }
    Ok(())
}

#[instrument(skip_all, fields(me = %me))]
async fn do_ring_agreement<C: CSCurve>(
    comms: Communication,
    participants: ParticipantList,
    me: Participant,
    keys: KeyPair<C>,
) -> Result<SharedSecret<C>, ProtocolError> {
    let n = participants.len();
    let i = participants.index(me);
    let predecessor = participants.predecessor(me);
    let successor = participants.successor(me);

    for turn in 0..TURNS {
        // The very first turn of the ring starts from nothing.
        let buffer: Vec<Accumulator<C>> = if i == 0 && turn == 0 {
            Vec::new()
        } else {
            let (from, buffer): (_, Vec<Accumulator<C>>) = comms.recv(turn).await?;
            if from != predecessor {
                error!(%from, %predecessor, "received buffer out of turn");
                return Err(ProtocolError::AssertionFailed(format!(
                    "expected buffer from {predecessor}, but it came from {from}"
                )));
            }
            if let Err(e) = validate(&participants, me, &buffer) {
                error!(%from, "rejecting buffer: {e}");
                return Err(e);
            }
            buffer
        };
        debug!(turn, received = buffer.len(), "holding the ring");

        let mut incoming = buffer.into_iter().peekable();
        let secret = incoming
            .next_if(|acc| acc.is_complete_for(me, n))
            .map(|acc| keys.derive_secret(acc.point()));

        let mut outgoing: Vec<Accumulator<C>> =
            incoming.map(|acc| acc.absorb(me, &keys)).collect();
        if turn == 0 {
            outgoing.push(Accumulator::seed(me, &keys));
        }

        if !outgoing.is_empty() {
            // The round we're in is `turn * n + i`, and our successor acts in the next one.
            let their_turn = Waitpoint::try_from((usize::from(turn) * n + i + 1) / n)
                .map_err(|e| ProtocolError::Other(Box::new(e)))?;
            debug!(%successor, forwarded = outgoing.len(), "passing the ring on");
            comms.send_private(their_turn, successor, &outgoing).await;
        }

        if let Some(secret) = secret {
            info!(turn, "obtained the shared secret");
            return Ok(secret);
        }
    }

    error!("went around the ring without obtaining a secret");
    Err(ProtocolError::AssertionFailed(format!(
        "{me} did not obtain a secret after {TURNS} turns"
    )))
}

/// The ring agreement protocol, for a single participant.
///
/// Every participant needs to use the same domain and the same list of participants,
/// although the order of that list doesn't matter.
/// The output is the shared secret, which will be the same for everyone.
pub fn ring_agreement<C: CSCurve>(
    domain: &Domain<C>,
    participants: &[Participant],
    me: Participant,
    keys: KeyPair<C>,
) -> Result<impl Protocol<Output = SharedSecret<C>>, InitializationError> {
    if participants.len() < 2 {
        return Err(InitializationError::BadParameters(format!(
            "participant count cannot be < 2, found: {}",
            participants.len()
        )));
    };
    let participants = ParticipantList::new(participants).ok_or_else(|| {
        InitializationError::BadParameters("participant list cannot contain duplicates".to_string())
    })?;

    if !participants.contains(me) {
        return Err(InitializationError::BadParameters(format!(
            "{me} is not part of the participant list"
        )));
    }

    if !keys.belongs_to(domain) {
        return Err(InitializationError::BadParameters(
            "key was not generated in this domain".to_string(),
        ));
    }

    let comms = Communication::new(usize::from(TURNS));
    let fut = do_ring_agreement(comms.clone(), participants, me, keys);
    Ok(Executor::new(comms, fut))
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use ::serde::Serialize;
    use k256::{ProjectivePoint, Scalar, Secp256k1};
    use rand_core::OsRng;

    use crate::protocol::{run_protocol, Action, MessageData};
    use crate::serde::{encode_with_tag, serialize_projective_point};

    use super::*;

    fn run_ring(
        domain: &Domain<Secp256k1>,
        keys: Vec<(Participant, KeyPair<Secp256k1>)>,
    ) -> Result<Vec<(Participant, SharedSecret<Secp256k1>)>, Box<dyn Error>> {
        let participants: Vec<Participant> = keys.iter().map(|(p, _)| *p).collect();
        #[allow(clippy::type_complexity)]
        let mut protocols: Vec<(
            Participant,
            Box<dyn Protocol<Output = SharedSecret<Secp256k1>>>,
        )> = Vec::with_capacity(keys.len());
        for (p, k) in keys {
            let protocol = ring_agreement(domain, &participants, p, k)?;
            protocols.push((p, Box::new(protocol)));
        }
        Ok(run_protocol(protocols)?)
    }

    #[test]
    fn test_ring_agreement() -> Result<(), Box<dyn Error>> {
        let domain = Domain::<Secp256k1>::builtin();
        for n in 2..=6u32 {
            let keys = (0..n)
                .map(|i| (Participant::from(i), KeyPair::random(&domain, &mut OsRng)))
                .collect();
            let result = run_ring(&domain, keys)?;
            assert_eq!(result.len(), n as usize);
            assert!(result.iter().all(|(_, s)| s == &result[0].1));
        }
        Ok(())
    }

    #[test]
    fn test_ring_agreement_unsorted_participants() -> Result<(), Box<dyn Error>> {
        let domain = Domain::<Secp256k1>::builtin();
        let keys: Vec<_> = [9u32, 3, 40, 7]
            .into_iter()
            .zip([3u64, 5, 7, 11])
            .map(|(p, x)| {
                (
                    Participant::from(p),
                    KeyPair::from_scalar(&domain, Scalar::from(x)).unwrap(),
                )
            })
            .collect();
        let result = run_ring(&domain, keys)?;

        let expected = crate::compat::x_coordinate::<Secp256k1>(
            &(ProjectivePoint::GENERATOR * Scalar::from(3u64 * 5 * 7 * 11)),
        );
        for (_, s) in result {
            assert_eq!(s.raw_secret_bytes(), &expected);
        }
        Ok(())
    }

    #[test]
    fn test_bad_parameters() {
        let domain = Domain::<Secp256k1>::builtin();
        let keys = KeyPair::random(&domain, &mut OsRng);
        let (p0, p1, p2) = (Participant::from(0u32), 1u32.into(), 2u32.into());

        assert!(ring_agreement(&domain, &[p0], p0, keys.clone()).is_err());
        assert!(ring_agreement(&domain, &[p0, p0, p1], p0, keys.clone()).is_err());
        assert!(ring_agreement(&domain, &[p0, p1], p2, keys.clone()).is_err());

        let g = (ProjectivePoint::GENERATOR * Scalar::from(3u64)).to_affine();
        let other = Domain::<Secp256k1>::with_generator(g).unwrap();
        assert!(ring_agreement(&other, &[p0, p1], p0, keys).is_err());
    }

    fn forged(acc: &[Accumulator<Secp256k1>]) -> MessageData {
        encode_with_tag(0, acc)
    }

    /// Laid out on the wire exactly like an accumulator, but without any checks on the point.
    #[derive(Serialize)]
    struct RawAccumulator {
        contributors: Vec<Participant>,
        #[serde(serialize_with = "serialize_projective_point::<Secp256k1, _>")]
        point: ProjectivePoint,
    }

    /// Poke a protocol until it stops sending messages.
    fn drain(
        prot: &mut impl Protocol<Output = SharedSecret<Secp256k1>>,
    ) -> Result<Action<SharedSecret<Secp256k1>>, ProtocolError> {
        loop {
            match prot.poke() {
                Ok(Action::SendPrivate(_, _)) => continue,
                other => return other,
            }
        }
    }

    #[test]
    fn test_rejects_buffer_from_wrong_neighbour() {
        let domain = Domain::<Secp256k1>::builtin();
        let (p0, p1, p2) = (Participant::from(0u32), 1u32.into(), 2u32.into());
        let k0 = KeyPair::random(&domain, &mut OsRng);
        let k1 = KeyPair::random(&domain, &mut OsRng);

        // p1 expects its first buffer from p0, not from p2.
        let mut prot = ring_agreement(&domain, &[p0, p1, p2], p1, k1).unwrap();
        assert!(matches!(prot.poke(), Ok(Action::Wait)));
        prot.message(p2, forged(&[Accumulator::seed(p0, &k0)]));
        assert!(prot.poke().is_err());
    }

    #[test]
    fn test_rejects_bad_contributors() {
        let domain = Domain::<Secp256k1>::builtin();
        let (p0, p1, p2) = (Participant::from(0u32), 1u32.into(), 2u32.into());
        let k0 = KeyPair::random(&domain, &mut OsRng);
        let k1 = KeyPair::random(&domain, &mut OsRng);

        let cases = vec![
            // Already contains the receiver.
            forged(&[Accumulator::seed(p0, &k0).absorb(p1, &k1)]),
            // Names someone outside of the ring.
            forged(&[Accumulator::seed(Participant::from(8u32), &k0)]),
            // Nothing at all.
            forged(&[]),
        ];
        for message in cases {
            let mut prot = ring_agreement(&domain, &[p0, p1, p2], p1, k1.clone()).unwrap();
            prot.message(p0, message);
            assert!(prot.poke().is_err());
        }
    }

    #[test]
    fn test_first_participant_starts_the_ring() {
        let domain = Domain::<Secp256k1>::builtin();
        let (p0, p1) = (Participant::from(0u32), Participant::from(1u32));
        let k0 = KeyPair::random(&domain, &mut OsRng);

        let mut prot = ring_agreement(&domain, &[p1, p0], p0, k0).unwrap();
        match prot.poke() {
            Ok(Action::SendPrivate(to, _)) => assert_eq!(to, p1),
            other => panic!("unexpected action {other:?}"),
        }
        assert!(matches!(prot.poke(), Ok(Action::Wait)));
    }

    #[test]
    fn test_rejects_complete_accumulator_out_of_place() {
        let domain = Domain::<Secp256k1>::builtin();
        let (p0, p1, p2) = (Participant::from(0u32), 1u32.into(), 2u32.into());
        let k0 = KeyPair::random(&domain, &mut OsRng);
        let k1 = KeyPair::random(&domain, &mut OsRng);
        let k2 = KeyPair::random(&domain, &mut OsRng);

        // The second accumulator is complete for p1, but hides behind another one.
        let buffer = [
            Accumulator::seed(p2, &k2),
            Accumulator::seed(p0, &k0).absorb(p2, &k2),
        ];
        let mut prot = ring_agreement(&domain, &[p0, p1, p2], p1, k1).unwrap();
        prot.message(p0, forged(&buffer));
        assert!(matches!(
            prot.poke(),
            Err(ProtocolError::AssertionFailed(e)) if e.contains("front of the buffer")
        ));
    }

    #[test]
    fn test_rejects_identity_point() {
        let domain = Domain::<Secp256k1>::builtin();
        let (p0, p1, p2) = (Participant::from(0u32), 1u32.into(), 2u32.into());
        let k1 = KeyPair::random(&domain, &mut OsRng);

        let buffer = [RawAccumulator {
            contributors: vec![p0],
            point: ProjectivePoint::IDENTITY,
        }];
        let mut prot = ring_agreement(&domain, &[p0, p1, p2], p1, k1).unwrap();
        prot.message(p0, encode_with_tag(0, &buffer));
        assert!(matches!(
            prot.poke(),
            Err(ProtocolError::AssertionFailed(e)) if e.contains("identity")
        ));
    }

    #[test]
    fn test_fails_without_a_complete_accumulator() {
        let domain = Domain::<Secp256k1>::builtin();
        let (p0, p1, p2) = (Participant::from(0u32), 1u32.into(), 2u32.into());
        let k0 = KeyPair::random(&domain, &mut OsRng);
        let k1 = KeyPair::random(&domain, &mut OsRng);
        let k2 = KeyPair::random(&domain, &mut OsRng);

        // Both turns are well formed, but p1 never gets anything to finish.
        let mut prot = ring_agreement(&domain, &[p0, p1, p2], p1, k1).unwrap();
        prot.message(p0, encode_with_tag(0, &[Accumulator::seed(p0, &k0)]));
        prot.message(p0, encode_with_tag(1, &[Accumulator::seed(p2, &k2)]));
        assert!(matches!(
            drain(&mut prot),
            Err(ProtocolError::AssertionFailed(e)) if e.contains("did not obtain a secret")
        ));
    }
}
