use std::{
    cell::RefCell,
    future::Future,
    pin::Pin,
    ptr,
    rc::Rc,
    task::{Context, Poll, RawWaker, RawWakerVTable, Waker},
};

use ::serde::Serialize;
use serde::de::DeserializeOwned;

use crate::serde::{decode, encode_with_tag};

use super::{Action, MessageData, Participant, Protocol, ProtocolError};

/// The tag at the front of every message, saying where it should be received.
///
/// In the ring protocol, this is the turn of the receiver the message is for.
pub type Waitpoint = u8;

/// Represents a queue of messages.
///
/// This is used to receive incoming messages as they arrive, and automatically
/// sort them into bins based on the waitpoint they were tagged with.
#[derive(Debug, Clone)]
struct MessageQueue {
    /// We have one queue of messages for each waitpoint.
    bins: Vec<Vec<(Participant, MessageData)>>,
}

impl MessageQueue {
    /// Create a new message queue, given a number of waitpoints.
    fn new(waitpoints: usize) -> Self {
        Self {
            bins: vec![Vec::new(); waitpoints],
        }
    }

    /// Push a new message into the queue.
    ///
    /// This will read the first byte of the message to determine what waitpoint it
    /// belongs to. Empty messages, or messages for unknown waitpoints, are dropped.
    fn push(&mut self, from: Participant, message: MessageData) {
        if message.is_empty() {
            return;
        }

        let waitpoint = usize::from(message[0]);
        if waitpoint >= self.bins.len() {
            return;
        }

        self.bins[waitpoint].push((from, message));
    }

    /// Pop the oldest message for a specific waitpoint.
    ///
    /// This waitpoint **must** be less than the number of waitpoints of this queue.
    fn pop(&mut self, waitpoint: usize) -> Option<(Participant, MessageData)> {
        assert!(waitpoint < self.bins.len());

        let bin = &mut self.bins[waitpoint];
        if bin.is_empty() {
            None
        } else {
            Some(bin.remove(0))
        }
    }
}

/// A future which tries to read a message from a specific waitpoint.
struct MessageQueueWait {
    queue: Rc<RefCell<MessageQueue>>,
    waitpoint: usize,
}

impl Future for MessageQueueWait {
    type Output = (Participant, MessageData);

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.queue.borrow_mut().pop(self.waitpoint) {
            Some(out) => Poll::Ready(out),
            None => Poll::Pending,
        }
    }
}

/// A message the future wants the executor to deliver.
#[derive(Debug, Clone)]
struct Outgoing {
    to: Participant,
    data: MessageData,
}

/// A mailbox is a single item queue, used to handle message outputs.
///
/// The idea is that the future can write a message here, and then the executor
/// can pull it out.
#[derive(Debug)]
struct Mailbox(Option<Outgoing>);

/// A future used to wait until a mailbox is emptied.
struct MailboxWait {
    mailbox: Rc<RefCell<Mailbox>>,
    /// This will always be some, but we need to be able to take it
    message: Option<Outgoing>,
}

impl Future for MailboxWait {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.mailbox.borrow().0.is_some() {
            return Poll::Pending;
        }
        let message = self.message.take();
        self.mailbox.borrow_mut().0 = message;
        Poll::Ready(())
    }
}

/// Represents the communications between the executor and the participant.
///
/// This allows the participant to read messages from the queue, possibly
/// waiting until a message for the waitpoint they're interested in arrives.
/// The participant can also push outgoing messages into a mailbox, allowing
/// the executor to pick them up.
#[derive(Debug, Clone)]
pub struct Communication {
    queue: Rc<RefCell<MessageQueue>>,
    mailbox: Rc<RefCell<Mailbox>>,
}

impl Communication {
    /// Create new communications, given a number of waitpoints.
    ///
    /// Messages have a tag encoded into them, indicating the waitpoint they're sent
    /// for. If a message gets sent to a waitpoint beyond the number of expected waitpoints,
    /// that message is dropped. Thus, it's important for the number of waitpoints
    /// to be correct.
    pub fn new(waitpoints: usize) -> Self {
        Self {
            queue: Rc::new(RefCell::new(MessageQueue::new(waitpoints))),
            mailbox: Rc::new(RefCell::new(Mailbox(None))),
        }
    }

    fn push_message(&self, from: Participant, message: MessageData) {
        self.queue.borrow_mut().push(from, message);
    }

    fn outgoing(&self) -> Option<Outgoing> {
        self.mailbox.borrow_mut().0.take()
    }

    /// (Indicate that you want to) send a message privately to one participant.
    pub async fn send_private<T: Serialize>(&self, waitpoint: Waitpoint, to: Participant, data: &T) {
        let message = Outgoing {
            to,
            data: encode_with_tag(waitpoint, data),
        };
        MailboxWait {
            mailbox: self.mailbox.clone(),
            message: Some(message),
        }
        .await;
    }

    /// Receive a message for a specific waitpoint.
    pub async fn recv<T: DeserializeOwned>(
        &self,
        waitpoint: Waitpoint,
    ) -> Result<(Participant, T), ProtocolError> {
        let (from, data) = MessageQueueWait {
            queue: self.queue.clone(),
            waitpoint: usize::from(waitpoint),
        }
        .await;
        // We know data will be at least one byte long
        let decoded: T = decode(&data[1..]).map_err(|e| ProtocolError::Other(Box::new(e)))?;
        Ok((from, decoded))
    }
}

fn dummy_raw_waker() -> RawWaker {
    fn no_op(_: *const ()) {}
    fn clone(_: *const ()) -> RawWaker {
        dummy_raw_waker()
    }

    let vtable = &RawWakerVTable::new(clone, no_op, no_op, no_op);
    RawWaker::new(ptr::null(), vtable)
}

/// Just a waker which does nothing, which is fine for our futures, which never use the waker.
fn dummy_waker() -> Waker {
    unsafe { Waker::from_raw(dummy_raw_waker()) }
}

/// An executor which implements our protocol trait.
///
/// You pass it a copy of the communications infrastructure, and then a future,
/// which will also use that same infrastructure. The executor then implements
/// the methods for advancing the protocol, which will end up polling the future
/// and reacting accordingly, based on what's happening on the communications infrastructure.
pub struct Executor<F, O> {
    comms: Communication,
    fut: Pin<Box<F>>,
    output: Option<O>,
    done: bool,
}

impl<O, F: Future<Output = Result<O, ProtocolError>>> Executor<F, O> {
    pub fn new(comms: Communication, fut: F) -> Self {
        Self {
            comms,
            fut: Box::pin(fut),
            output: None,
            done: false,
        }
    }

    fn take_output(&mut self) -> Option<O> {
        let out = self.output.take();
        if out.is_some() {
            self.done = true;
        }
        out
    }

    fn run(&mut self) -> Result<Action<O>, ProtocolError> {
        if self.done {
            return Ok(Action::Wait);
        }
        if let Some(out) = self.take_output() {
            return Ok(Action::Return(out));
        }

        let waker = dummy_waker();
        let mut ctx = Context::from_waker(&waker);
        match self.fut.as_mut().poll(&mut ctx) {
            Poll::Ready(Ok(out)) => self.output = Some(out),
            Poll::Ready(Err(e)) => {
                // A finished future must never be polled again.
                self.done = true;
                return Err(e);
            }
            Poll::Pending => {}
        }

        match self.comms.outgoing() {
            Some(Outgoing { to, data }) => Ok(Action::SendPrivate(to, data)),
            None => {
                if let Some(out) = self.take_output() {
                    Ok(Action::Return(out))
                } else {
                    Ok(Action::Wait)
                }
            }
        }
    }
}

impl<O, F: Future<Output = Result<O, ProtocolError>>> Protocol for Executor<F, O> {
    type Output = O;

    fn poke(&mut self) -> Result<Action<Self::Output>, ProtocolError> {
        self.run()
    }

    fn message(&mut self, from: Participant, data: MessageData) {
        self.comms.push_message(from, data);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_queue_routes_by_waitpoint() {
        let mut queue = MessageQueue::new(2);
        let p = Participant::from(7u32);
        queue.push(p, vec![1, 0xAA]);
        queue.push(p, vec![0, 0xBB]);
        queue.push(p, vec![1, 0xCC]);
        queue.push(p, vec![5, 0xDD]);
        queue.push(p, vec![]);

        assert_eq!(queue.pop(0), Some((p, vec![0, 0xBB])));
        assert_eq!(queue.pop(0), None);
        assert_eq!(queue.pop(1), Some((p, vec![1, 0xAA])));
        assert_eq!(queue.pop(1), Some((p, vec![1, 0xCC])));
        assert_eq!(queue.pop(1), None);
    }

    #[test]
    fn test_executor_forwards_private_messages() {
        let comms = Communication::new(1);
        let to = Participant::from(1u32);
        let fut = {
            let comms = comms.clone();
            async move {
                comms.send_private(0, to, &42u32).await;
                let (from, x): (_, u32) = comms.recv(0).await?;
                Ok::<_, ProtocolError>((from, x))
            }
        };
        let mut prot = Executor::new(comms, fut);

        let sent = match prot.poke().unwrap() {
            Action::SendPrivate(p, data) => {
                assert_eq!(p, to);
                data
            }
            other => panic!("unexpected action {other:?}"),
        };
        assert!(matches!(prot.poke().unwrap(), Action::Wait));

        prot.message(to, sent);
        match prot.poke().unwrap() {
            Action::Return((from, x)) => {
                assert_eq!(from, to);
                assert_eq!(x, 42);
            }
            other => panic!("unexpected action {other:?}"),
        }
        assert!(matches!(prot.poke().unwrap(), Action::Wait));
    }
}
