use elliptic_curve::Group;
use k256::Secp256k1;
use p256::NistP256;
use rand_core::OsRng;

use crate::{
    protocol::{run_protocol, Participant, Protocol},
    ring_agreement, run_ring_agreement, run_ring_agreement_with, CSCurve, Domain, Party,
    SharedSecret,
};

fn make_parties<C: CSCurve>(domain: &Domain<C>, names: &[&str]) -> Vec<Party<C>> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Party::new(domain, Participant::from(i as u32), &mut OsRng).with_name(*name))
        .collect()
}

fn run_distributed<C: CSCurve>(
    domain: &Domain<C>,
    parties: &[Party<C>],
) -> Vec<(Participant, SharedSecret<C>)> {
    let participants: Vec<Participant> = parties.iter().map(|p| p.id()).collect();

    #[allow(clippy::type_complexity)]
    let mut protocols: Vec<(Participant, Box<dyn Protocol<Output = SharedSecret<C>>>)> =
        Vec::with_capacity(parties.len());

    for p in parties {
        let protocol = ring_agreement(domain, &participants, p.id(), p.keys().clone());
        assert!(protocol.is_ok());
        let protocol = protocol.unwrap();
        protocols.push((p.id(), Box::new(protocol)));
    }

    run_protocol(protocols).unwrap()
}

fn check_e2e<C: CSCurve>() {
    let domain = Domain::<C>::builtin();
    let mut parties = make_parties(&domain, &["Alice", "Bob", "Carol", "Dan", "Evans"]);

    run_ring_agreement(&domain, &mut parties).unwrap();
    let secret = parties[0].shared_secret().unwrap().clone();
    for p in &parties {
        assert_eq!(p.shared_secret().unwrap(), &secret);
    }

    // Both ways of running the ring land on the same value, since it only
    // depends on the product of every scalar.
    let mut distributed = run_distributed(&domain, &parties);
    distributed.sort_by_key(|(p, _)| *p);
    assert_eq!(distributed.len(), parties.len());
    for (_, s) in &distributed {
        assert_eq!(s, &secret);
    }

    let key = secret.derive_key(b"session");
    for (_, s) in &distributed {
        assert_eq!(s.derive_key(b"session"), key);
    }
}

#[test]
fn test_e2e_secp256k1() {
    check_e2e::<Secp256k1>();
}

#[test]
fn test_e2e_p256() {
    check_e2e::<NistP256>();
}

#[test]
fn test_growing_ring() {
    // Start with two parties, then add three more, re-using the first two.
    let domain = Domain::<NistP256>::builtin();
    let mut parties = make_parties(&domain, &["Alice", "Bob"]);
    run_ring_agreement(&domain, &mut parties).unwrap();
    let pair = parties[0].shared_secret().unwrap().clone();
    assert_eq!(
        pair,
        parties[0].keys().diffie_hellman(&parties[1].public_key())
    );

    for name in ["Carol", "Dan", "Evans"] {
        let id = Participant::from(parties.len() as u32);
        parties.push(Party::new(&domain, id, &mut OsRng).with_name(name));
    }
    run_ring_agreement(&domain, &mut parties).unwrap();
    let group = parties[0].shared_secret().unwrap().clone();
    assert_ne!(pair, group);
    assert!(parties.iter().all(|p| p.shared_secret() == Some(&group)));
}

#[test]
fn test_every_accumulator_is_consumed_once() {
    let domain = Domain::<Secp256k1>::builtin();
    let mut parties = make_parties(&domain, &["A", "B", "C", "D"]);
    let n = parties.len();

    let mut harvests = Vec::new();
    let mut max_buffer = 0;
    run_ring_agreement_with(&domain, &mut parties, |trace| {
        if trace.harvested {
            harvests.push(trace.holder.id());
        }
        max_buffer = max_buffer.max(trace.forwarded.len());
        for acc in trace.forwarded {
            // Everything forwarded has just been touched by the holder.
            assert_eq!(acc.contributors().last(), Some(&trace.holder.id()));
            assert!(acc.contributors().len() < n);
            assert!(!bool::from(acc.point().is_identity()));
        }
    })
    .unwrap();

    harvests.sort();
    let mut ids: Vec<_> = parties.iter().map(|p| p.id()).collect();
    ids.sort();
    assert_eq!(harvests, ids);
    assert!(max_buffer <= n - 1);
}
