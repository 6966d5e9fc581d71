//! Ring-ECDH is an implementation of elliptic curve Diffie-Hellman for
//! an arbitrary number of parties.
//!
//! The parties are arranged in a ring, and at the end of the protocol every
//! party holds the same shared secret, derived from everyone's private scalar,
//! without any party learning the private scalar of anybody else.
//!
//! # Warning
//!
//! This protocol only protects against *passive* adversaries.
//!
//! - Messages between parties are not authenticated, so anybody able to
//! tamper with the network can run a man-in-the-middle attack.
//! - This library has not undergone any form of audit.
//!
//! # Design
//!
//! With two parties holding private scalars `a` and `b`, Diffie-Hellman
//! has each party send `a * G` or `b * G` to the other, and both end up
//! with `(a * b) * G`.
//!
//! With `n` parties, we instead pass around *accumulators*: points of the form
//! ```ignore
//! (x_i * x_j * ... * x_k) * G
//! ```
//! labelled with the parties whose scalars went into them.
//! Each party starts one accumulator containing just their own scalar,
//! and then passes it along the ring, with every party multiplying in their
//! own scalar. After going around `n - 1` parties, an accumulator contains
//! everybody's scalar except for the scalar of the party it arrives at next,
//! which multiplies it in one last time, and keeps the result:
//! ```ignore
//! (x_1 * x_2 * ... * x_n) * G
//! ```
//! The x coordinate of that point is the shared secret.
//!
//! All of the accumulators travel around the ring together, in a single buffer,
//! so the whole agreement takes `2n - 1` hops.
//!
//! ## API Design
//!
//! The library offers two ways to run the agreement.
//!
//! The first is [`run_ring_agreement`], which simulates every party in a single
//! process, given a list of [`Party`] values, and fills in the shared secret of each party.
//! The agreement can also be run round by round through [`RingAgreement`], or with an
//! observer looking at every round through [`run_ring_agreement_with`].
//!
//! The second is [`ring_agreement`], which gives you the behavior of a single party,
//! as an implementation of the [`protocol::Protocol`] trait:
//! ```ignore
//! pub trait Protocol {
//!    type Output;
//!
//!    fn poke(&mut self) -> Result<Action<Self::Output>, ProtocolError>;
//!    fn message(&mut self, from: Participant, data: MessageData);
//! }
//! ```
//! Given an instance of this trait, you can do two things:
//! - You can provide a new message received from some other party.
//! - You can "poke" the protocol to see if it has some kind of action it wants you to perform, or if an error happened.
//!
//! This action is either:
//! - The protocol telling you it has finished, with the shared secret.
//! - The protocol asking you to *privately* send a message to the next party in the ring.
//! - The protocol informing you that no more progress can be made until it receives new messages.
//!
//! # Generic Curves
//!
//! The library has support for generic curves.
//!
//! The support for generic curves is done through a custom `CSCurve` trait,
//! which can be easily implemented for any curve from the
//! RustCrypto [elliptic-curves](https://github.com/RustCrypto/elliptic-curves)
//! suite of libraries.
//!
//! This crate also provides implementations of some existing curves behind features,
//! as per the following table:
//!
//! | Curve | Feature |
//! |-------|---------|
//! |Secp256k1|`k256`|
//! |P-256|`p256`|
//!
//! The group itself is described by a [`Domain`], which is passed to every
//! party, and which allows using a generator other than the standard one.
mod accumulator;
mod compat;
mod crypto;
mod domain;
mod engine;
mod keys;
mod participants;
mod party;
pub mod protocol;
mod ring;
mod serde;
#[cfg(test)]
mod test;

pub use accumulator::Accumulator;
pub use compat::CSCurve;
pub use crypto::{SharedSecret, KEY_LEN};
pub use domain::{CurveMetadata, Domain};
pub use engine::{run_ring_agreement, run_ring_agreement_with, RingAgreement, RoundTrace, State};
pub use keys::KeyPair;
pub use party::Party;
pub use ring::ring_agreement;
