//! The ring agreement, simulated in a single process.
//!
//! This drives every member of the ring, one round at a time. Each round, the
//! current holder receives a buffer of accumulators from the previous holder,
//! takes out the one which is complete for them, if any, multiplies their scalar
//! into the rest, adds an accumulator of their own the first time around,
//! and passes the buffer on.
use std::mem;

use tracing::{debug, info, instrument};

use crate::accumulator::Accumulator;
use crate::compat::CSCurve;
use crate::domain::Domain;
use crate::participants::ParticipantList;
use crate::party::Party;
use crate::protocol::{InitializationError, Participant};

/// Whether or not the agreement still has rounds left to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Some parties don't have their shared secret yet.
    Running,
    /// Every party holds the shared secret, and no accumulators are left.
    Done,
}

/// What happened during a single round.
///
/// This is handed to observers of the agreement, for diagnostics.
#[derive(Debug)]
pub struct RoundTrace<'a, C: CSCurve> {
    /// The number of this round, starting at 0.
    pub round: usize,
    /// The party which held the buffer this round.
    pub holder: &'a Party<C>,
    /// The party the buffer is passed to, or None if the agreement just finished.
    pub next: Option<&'a Party<C>>,
    /// Whether or not the holder obtained their shared secret this round.
    pub harvested: bool,
    /// The accumulators passed on to the next party.
    pub forwarded: &'a [Accumulator<C>],
}

/// The state machine driving a ring agreement.
///
/// Parties are arranged in a ring in the order they're given in.
/// The agreement starts with the first party, and takes exactly `2n - 1` rounds.
pub struct RingAgreement<'a, C: CSCurve> {
    parties: &'a mut [Party<C>],
    /// The accumulators on their way to the current holder.
    buffer: Vec<Accumulator<C>>,
    /// Which parties have already put an accumulator of their own into the ring.
    seeded: Vec<bool>,
    current: usize,
    next: usize,
    round: usize,
    harvested: usize,
    state: State,
}

impl<'a, C: CSCurve> RingAgreement<'a, C> {
    /// Prepare an agreement between some parties.
    ///
    /// This checks that there are at least two parties, that their identities are
    /// distinct, and that their keys belong to the given domain.
    ///
    /// Any shared secret left over from a previous agreement is cleared.
    pub fn new(
        domain: &Domain<C>,
        parties: &'a mut [Party<C>],
    ) -> Result<Self, InitializationError> {
        if parties.len() < 2 {
            return Err(InitializationError::BadParameters(format!(
                "participant count cannot be < 2, found: {}",
                parties.len()
            )));
        }

        let ids: Vec<Participant> = parties.iter().map(|p| p.id()).collect();
        if ParticipantList::new(&ids).is_none() {
            return Err(InitializationError::BadParameters(
                "participant list cannot contain duplicates".to_string(),
            ));
        }

        if let Some(p) = parties.iter().find(|p| !p.keys().belongs_to(domain)) {
            return Err(InitializationError::BadParameters(format!(
                "key of {} was not generated in this domain",
                p.id()
            )));
        }

        for p in parties.iter_mut() {
            p.clear_shared_secret();
        }

        let n = parties.len();
        Ok(Self {
            parties,
            buffer: Vec::with_capacity(n),
            seeded: vec![false; n],
            current: 0,
            next: 1,
            round: 0,
            harvested: 0,
            state: State::Running,
        })
    }

    /// Whether the agreement is still running.
    pub fn state(&self) -> State {
        self.state
    }

    /// The number of parties which have their shared secret so far.
    pub fn harvested(&self) -> usize {
        self.harvested
    }

    /// The accumulators currently on their way to the next holder.
    pub fn buffer(&self) -> &[Accumulator<C>] {
        &self.buffer
    }

    /// Run a single round of the agreement.
    ///
    /// This returns None once the agreement is done, without doing anything.
    pub fn step(&mut self) -> Option<RoundTrace<'_, C>> {
        if self.state == State::Done {
            return None;
        }

        let n = self.parties.len();
        assert!(
            self.round < 2 * n - 1,
            "ring agreement did not finish after {} rounds",
            self.round
        );

        let round = self.round;
        let holder = self.current;
        let id = self.parties[holder].id();
        let buffer = mem::take(&mut self.buffer);
        let mut incoming = buffer.into_iter().peekable();

        // Harvest
        let mut harvested = false;
        if let Some(acc) = incoming.next_if(|acc| acc.is_complete_for(id, n)) {
            self.parties[holder].derive_secret(acc.point());
            self.harvested += 1;
            harvested = true;
            info!(
                round,
                party = %self.parties[holder].label(),
                harvested = self.harvested,
                "party obtained the shared secret"
            );
        }

        // Termination
        if self.harvested == n {
            assert!(
                incoming.peek().is_none(),
                "accumulators are still in flight after every party finished"
            );
            self.state = State::Done;
            self.round += 1;
            return Some(RoundTrace {
                round,
                holder: &self.parties[holder],
                next: None,
                harvested,
                forwarded: &self.buffer,
            });
        }

        // Propagate
        let keys = self.parties[holder].keys();
        let mut outgoing: Vec<Accumulator<C>> = incoming
            .map(|acc| {
                assert!(
                    !acc.is_complete_for(id, n),
                    "more than one accumulator was complete for {id}"
                );
                acc.absorb(id, keys)
            })
            .collect();

        // Seed
        if !self.seeded[holder] {
            outgoing.push(Accumulator::seed(id, keys));
            self.seeded[holder] = true;
        }

        // Advance
        let next = self.next;
        self.buffer = outgoing;
        self.current = next;
        self.next = (next + 1) % n;
        self.round += 1;

        debug!(
            round,
            from = %self.parties[holder].label(),
            to = %self.parties[next].label(),
            forwarded = self.buffer.len(),
            "passing accumulators along the ring"
        );

        Some(RoundTrace {
            round,
            holder: &self.parties[holder],
            next: Some(&self.parties[next]),
            harvested,
            forwarded: &self.buffer,
        })
    }

    /// Run the remaining rounds, calling an observer after each one.
    #[instrument(skip_all, fields(parties = self.parties.len()))]
    pub fn run_with(mut self, mut observer: impl FnMut(&RoundTrace<'_, C>)) {
        while let Some(trace) = self.step() {
            observer(&trace);
        }
        info!(rounds = self.round, "ring agreement finished");
    }
}

/// Run a ring agreement between some parties.
///
/// Once this returns, every party holds the same shared secret.
pub fn run_ring_agreement<C: CSCurve>(
    domain: &Domain<C>,
    parties: &mut [Party<C>],
) -> Result<(), InitializationError> {
    run_ring_agreement_with(domain, parties, |_| {})
}

/// Like [run_ring_agreement()], except that an observer is called after each round.
///
/// The observer only gets to look at what happened, and can't influence the agreement.
pub fn run_ring_agreement_with<C: CSCurve>(
    domain: &Domain<C>,
    parties: &mut [Party<C>],
    observer: impl FnMut(&RoundTrace<'_, C>),
) -> Result<(), InitializationError> {
    RingAgreement::new(domain, parties)?.run_with(observer);
    Ok(())
}
