//! Ping-pong buffer pair for iterative filters

use crate::target::pool::TargetHandle;

/// Two same-descriptor scratch targets whose read/write roles swap after
/// each iteration of an iterative filter
///
/// After an odd number of swaps the two handles have exchanged roles;
/// after an even number they are restored. Callers track parity to know
/// which handle holds the final result.
#[derive(Clone, Copy, Debug)]
pub struct PingPongPair {
    read: TargetHandle,
    write: TargetHandle,
    swaps: u32,
}

impl PingPongPair {
    pub fn new(read: TargetHandle, write: TargetHandle) -> Self {
        Self {
            read,
            write,
            swaps: 0,
        }
    }

    /// Handle currently in the read role
    pub fn read(&self) -> TargetHandle {
        self.read
    }

    /// Handle currently in the write role
    pub fn write(&self) -> TargetHandle {
        self.write
    }

    /// Exchange the read and write roles
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.read, &mut self.write);
        self.swaps += 1;
    }

    /// Number of swaps performed so far
    pub fn swaps(&self) -> u32 {
        self.swaps
    }

    /// True after an odd number of swaps, i.e. roles are exchanged
    /// relative to construction
    pub fn parity_odd(&self) -> bool {
        self.swaps % 2 == 1
    }
}
