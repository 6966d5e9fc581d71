//! This module holds some utilities for working with participants.
//!
//! A ring needs every member to agree on who comes after whom, and on
//! which identities are valid at all. This module tries to provide useful
//! data structures for doing that.

use std::collections::HashMap;

use crate::protocol::Participant;

/// Represents a sorted list of participants.
///
/// The advantage of this data structure is that everybody will agree on its order,
/// so it can be used as the ring itself: each participant forwards to the one
/// after it, and the last participant forwards to the first.
#[derive(Debug, Clone)]
pub struct ParticipantList {
    participants: Vec<Participant>,
    /// This maps each participant to their index in the vector above.
    indices: HashMap<Participant, usize>,
}

impl ParticipantList {
    /// Create a participant list from a slice of participants.
    ///
    /// This will return None if the participants have duplicates.
    pub fn new(participants: &[Participant]) -> Option<Self> {
        let mut out = participants.to_owned();
        out.sort();

        let indices: HashMap<_, _> = out.iter().enumerate().map(|(p, x)| (*x, p)).collect();

        if indices.len() < out.len() {
            return None;
        }

        Some(Self {
            participants: out,
            indices,
        })
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Check if this list has a given participant.
    pub fn contains(&self, participant: Participant) -> bool {
        self.indices.contains_key(&participant)
    }

    /// Return the index of a given participant.
    ///
    /// Basically, the order they appear in a sorted list
    pub fn index(&self, participant: Participant) -> usize {
        self.indices[&participant]
    }

    /// The participant a given participant forwards the ring to.
    pub fn successor(&self, participant: Participant) -> Participant {
        let i = self.index(participant);
        self.participants[(i + 1) % self.len()]
    }

    /// The participant a given participant receives the ring from.
    pub fn predecessor(&self, participant: Participant) -> Participant {
        let i = self.index(participant);
        self.participants[(i + self.len() - 1) % self.len()]
    }
}

/// Allows for counting the participants we've seen, without duplicates.
///
/// This is used to validate that a list of contributors really names
/// distinct members of the ring.
#[derive(Debug, Clone)]
pub struct ParticipantCounter<'a> {
    participants: &'a ParticipantList,
    seen: Vec<bool>,
    counter: usize,
}

impl<'a> ParticipantCounter<'a> {
    /// Create a new participant counter from the list of all participants.
    pub fn new(participants: &'a ParticipantList) -> Self {
        Self {
            participants,
            seen: vec![false; participants.len()],
            counter: 0,
        }
    }

    /// Put a participant into this counter.
    ///
    /// This will return true if this participant is new, and false if it
    /// was already seen, or doesn't belong to the list at all.
    pub fn put(&mut self, participant: Participant) -> bool {
        let i = match self.participants.indices.get(&participant) {
            None => return false,
            Some(&i) => i,
        };

        if self.seen[i] {
            return false;
        }

        self.seen[i] = true;
        self.counter += 1;
        true
    }

    /// The number of distinct participants seen so far.
    pub fn count(&self) -> usize {
        self.counter
    }
}
