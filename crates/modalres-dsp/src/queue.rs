//! Lock-free control transport from the UI/MIDI side to the audio thread.
//!
//! A single-producer single-consumer ring of `ControlEvent`s. The sender
//! never blocks: a full queue hands the event back to the caller. The
//! consumer drains it with `SynthEngine::drain` once per control tick, from
//! the control context: applying events may log.

use rtrb::{Consumer, Producer, PushError, RingBuffer};
use thiserror::Error;

use crate::controls::ControlEvent;

#[derive(Debug, Error, PartialEq)]
#[error("control queue is full")]
pub struct QueueFull(pub ControlEvent);

pub struct ControlSender {
    producer: Producer<ControlEvent>,
}

pub struct ControlReceiver {
    consumer: Consumer<ControlEvent>,
}

/// Create a queue holding up to `capacity` pending events.
pub fn control_queue(capacity: usize) -> (ControlSender, ControlReceiver) {
    let (producer, consumer) = RingBuffer::new(capacity);
    (ControlSender { producer }, ControlReceiver { consumer })
}

impl ControlSender {
    pub fn send(&mut self, event: ControlEvent) -> Result<(), QueueFull> {
        self.producer.push(event).map_err(|PushError::Full(event)| QueueFull(event))
    }

    /// Free slots right now.
    pub fn slots(&self) -> usize {
        self.producer.slots()
    }
}

impl ControlReceiver {
    pub fn pop(&mut self) -> Option<ControlEvent> {
        self.consumer.pop().ok()
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let (mut tx, mut rx) = control_queue(4);
        tx.send(ControlEvent::PageEncoder(1)).unwrap();
        tx.send(ControlEvent::ModeButton).unwrap();
        assert_eq!(rx.pop(), Some(ControlEvent::PageEncoder(1)));
        assert_eq!(rx.pop(), Some(ControlEvent::ModeButton));
        assert_eq!(rx.pop(), None);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_full_queue_returns_event() {
        let (mut tx, _rx) = control_queue(1);
        tx.send(ControlEvent::PresetButton).unwrap();
        assert_eq!(tx.slots(), 0);
        assert_eq!(
            tx.send(ControlEvent::ModeButton),
            Err(QueueFull(ControlEvent::ModeButton))
        );
    }

    #[test]
    fn test_cross_thread() {
        let (mut tx, mut rx) = control_queue(64);
        let handle = std::thread::spawn(move || {
            for i in 0..32 {
                tx.send(ControlEvent::PageEncoder(i)).unwrap();
            }
        });
        handle.join().unwrap();
        let received: Vec<_> = std::iter::from_fn(|| rx.pop()).collect();
        assert_eq!(received.len(), 32);
        assert_eq!(received[31], ControlEvent::PageEncoder(31));
    }
}
