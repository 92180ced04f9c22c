//! Attach/detach seam between a packet source and the capture hook.
//!
//! `attach` spawns the packet-receive context: a task that pulls frames
//! from the source and runs the hook on each one. The returned handle is
//! the only way to tear the context down; channel storage is released once
//! both halves of the ring are gone.

use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::capture::{Capture, CaptureHook};

/// Receive buffer size; large enough for a standard Ethernet frame.
const RECV_BUF_LEN: usize = 2048;

/// Handle for a running capture attachment.
pub struct CaptureHandle {
    task: JoinHandle<()>,
}

impl CaptureHandle {
    /// Stops the packet-receive context. Frames already published stay in
    /// the channel for the consumer to drain.
    pub async fn detach(self) {
        self.task.abort();
        let _ = self.task.await;
        debug!("capture detached");
    }
}

/// Starts capturing: every frame received from `source` is handed to
/// `hook` until the handle is detached.
pub fn attach<S>(mut source: S, mut hook: CaptureHook) -> CaptureHandle
where
    S: Capture + 'static,
{
    let task = tokio::spawn(async move {
        let mut buf = vec![0u8; RECV_BUF_LEN];
        loop {
            match source.recv(&mut buf).await {
                Ok(len) => {
                    hook.on_frame(&buf[..len], len);
                }
                Err(e) => {
                    // Transient receive errors do not stop the capture.
                    error!("receive error: {}", e);
                }
            }
        }
    });

    CaptureHandle { task }
}

/// Tears down an attachment. Equivalent to `handle.detach()`.
pub async fn detach(handle: CaptureHandle) {
    handle.detach().await;
}
