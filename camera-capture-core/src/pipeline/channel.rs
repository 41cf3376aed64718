use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::models::buffer::{MediaKind, TimedBuffer};

/// Default channel capacity per media kind.
///
/// Video frames are large and replaceable, so a shallow queue keeps latency
/// low; audio buffers are small and loss-sensitive, so the queue is deeper.
pub fn default_capacity(kind: MediaKind) -> usize {
    match kind {
        MediaKind::Video => 8,
        MediaKind::Audio => 64,
    }
}

/// Producer half of a buffer channel, tagged with the media kind it carries.
///
/// Handed to the capture service; the device's producer thread pushes buffers
/// at its own cadence. A full channel drops the incoming buffer rather than
/// blocking the capture callback thread.
#[derive(Clone)]
pub struct BufferSender {
    kind: MediaKind,
    tx: Sender<TimedBuffer>,
}

impl BufferSender {
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Push a buffer. Returns `false` when the buffer was refused — wrong
    /// kind, full channel, or a disconnected consumer.
    pub fn push(&self, buffer: TimedBuffer) -> bool {
        if buffer.kind != self.kind {
            log::warn!(
                "dropping {:?} buffer pushed into the {:?} channel",
                buffer.kind,
                self.kind
            );
            return false;
        }
        match self.tx.try_send(buffer) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                if self.kind == MediaKind::Audio {
                    log::warn!("audio channel full, dropping buffer");
                }
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Consumer half of a buffer channel.
pub struct BufferReceiver {
    kind: MediaKind,
    rx: Receiver<TimedBuffer>,
}

impl BufferReceiver {
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn inner(&self) -> &Receiver<TimedBuffer> {
        &self.rx
    }
}

/// Create a bounded buffer channel for `kind`.
pub fn buffer_channel(kind: MediaKind, capacity: usize) -> (BufferSender, BufferReceiver) {
    let (tx, rx) = bounded(capacity);
    (BufferSender { kind, tx }, BufferReceiver { kind, rx })
}
