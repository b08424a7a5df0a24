use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};

/// Recycling pool for read buffers.
///
/// The reactor drains every readable connection through a buffer borrowed
/// from here, so steady-state serving allocates nothing. Buffers flow back
/// on drop through the channel; if the pool is empty a fresh buffer is
/// allocated instead of blocking.
#[derive(Clone)]
pub struct BufferPool {
    sender: Sender<Vec<u8>>,
    receiver: Arc<Mutex<Receiver<Vec<u8>>>>,
    buffer_size: usize,
}

impl BufferPool {
    pub fn new(initial_count: usize, buffer_size: usize) -> Self {
        let (sender, receiver) = channel();
        for _ in 0..initial_count {
            sender
                .send(vec![0; buffer_size])
                .expect("receiver held locally");
        }
        BufferPool {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            buffer_size,
        }
    }

    pub fn acquire(&self) -> PooledBuf {
        let mut buf = {
            let receiver = self.receiver.lock().expect("buffer pool lock poisoned");
            match receiver.try_recv() {
                Ok(buf) => buf,
                Err(TryRecvError::Empty) => vec![0; self.buffer_size],
                Err(TryRecvError::Disconnected) => {
                    unreachable!("pool owns both channel halves")
                }
            }
        };
        // Returned buffers keep their capacity; restore the full read window.
        buf.resize(self.buffer_size, 0);

        PooledBuf {
            buf: Some(buf),
            home: self.sender.clone(),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

/// A buffer checked out of a [`BufferPool`]. Returns itself on drop.
pub struct PooledBuf {
    buf: Option<Vec<u8>>,
    home: Sender<Vec<u8>>,
}

impl PooledBuf {
    pub fn as_slice(&self) -> &[u8] {
        self.buf.as_ref().expect("pooled buffer taken")
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.buf.as_mut().expect("pooled buffer taken")
    }
}

impl Drop for PooledBuf {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            // If the pool is gone the buffer is simply freed.
            let _ = self.home.send(buf);
        }
    }
}
