//! In-process process group: one scoped thread per rank, channels as the wire.

use std::collections::VecDeque;

use crossbeam::channel::{Receiver, Sender, unbounded};
use crossbeam::thread;
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::dist::comm::{Communicator, Payload, SendRequest, Tag};
use crate::error::{Error, Result};

#[derive(Debug)]
enum Body {
    Data(Payload),
    Abort,
}

#[derive(Debug)]
struct Envelope {
    source: usize,
    tag: Tag,
    body: Body,
}

/// One rank's endpoint in a [`LocalGroup`].
pub struct LocalComm {
    rank: usize,
    peers: Vec<Sender<Envelope>>,
    inbox: Receiver<Envelope>,
    // Messages that arrived before a matching receive was issued.
    pending: Mutex<VecDeque<Envelope>>,
}

impl LocalComm {
    /// Take the first pending message matching `(source, tag)`, or any abort notice.
    fn take_pending(&self, source: usize, tag: Tag) -> Option<Envelope> {
        let mut pending = self.pending.lock();
        let pos = pending.iter().position(|e| {
            matches!(e.body, Body::Abort) || (e.source == source && e.tag == tag)
        })?;
        pending.remove(pos)
    }

    fn open(envelope: Envelope) -> Result<Payload> {
        match envelope.body {
            Body::Data(payload) => Ok(payload),
            Body::Abort => Err(Error::Aborted { rank: envelope.source }),
        }
    }

    /// Tell every other rank that this one has failed.
    fn abort(&self) {
        for (dest, peer) in self.peers.iter().enumerate() {
            if dest != self.rank {
                let _ = peer.send(Envelope { source: self.rank, tag: Tag::Barrier, body: Body::Abort });
            }
        }
    }
}

impl Communicator for LocalComm {
    #[inline] fn rank(&self) -> usize { self.rank }

    #[inline] fn size(&self) -> usize { self.peers.len() }

    fn isend(&self, dest: usize, tag: Tag, payload: Payload) -> Result<SendRequest> {
        let peer = self.peers.get(dest)
            .ok_or(Error::ProtocolCoverage { rank: dest, covered: self.size() })?;
        let len = payload.len();
        peer.send(Envelope { source: self.rank, tag, body: Body::Data(payload) })
            .map_err(|_| Error::Disconnected { rank: dest })?;
        Ok(SendRequest { dest, tag, len })
    }

    fn recv_matching(&self, source: usize, tag: Tag) -> Result<Payload> {
        if source >= self.size() {
            return Err(Error::ProtocolCoverage { rank: source, covered: self.size() });
        }
        if let Some(envelope) = self.take_pending(source, tag) {
            return Self::open(envelope);
        }
        loop {
            let envelope = self.inbox.recv().map_err(|_| Error::Disconnected { rank: source })?;
            if matches!(envelope.body, Body::Abort) || (envelope.source == source && envelope.tag == tag) {
                return Self::open(envelope);
            }
            self.pending.lock().push_back(envelope);
        }
    }
}

/// Notifies peers when a rank's closure fails or unwinds.
struct AbortGuard<'a> {
    comm: &'a LocalComm,
    armed: bool,
}

impl Drop for AbortGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.comm.abort();
        }
    }
}

/// A group of ranks running as threads of the current process.
pub struct LocalGroup;

impl LocalGroup {
    fn endpoints(world_size: usize) -> Vec<LocalComm> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..world_size).map(|_| unbounded()).unzip();
        receivers.into_iter().enumerate()
            .map(|(rank, inbox)| LocalComm {
                rank,
                peers: senders.clone(),
                inbox,
                pending: Mutex::new(VecDeque::new()),
            })
            .collect()
    }

    /// Run `f` once per rank and collect the per-rank results in rank order.
    ///
    /// If any rank fails, its peers are aborted and the failing rank's error
    /// is returned (the lowest such rank wins). A panicking rank aborts its
    /// peers and the panic is propagated.
    pub fn run<T, F>(world_size: usize, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(&LocalComm) -> Result<T> + Sync,
    {
        if world_size == 0 {
            return Err(Error::InvalidDistribution("a process group needs at least one rank".into()));
        }
        debug!("[local] starting group of {world_size} ranks");

        let f = &f;
        let joined = thread::scope(|scope| {
            let handles: Vec<_> = Self::endpoints(world_size).into_iter()
                .map(|comm| scope.spawn(move |_| {
                    let mut guard = AbortGuard { comm: &comm, armed: true };
                    let result = f(&comm);
                    if let Err(e) = &result {
                        error!("[local] rank {} failed: {e}", comm.rank);
                    } else {
                        guard.armed = false;
                    }
                    drop(guard);
                    result
                }))
                .collect();
            handles.into_iter().map(|h| h.join()).collect::<Vec<_>>()
        });

        let joined = match joined {
            Ok(joined) => joined,
            Err(panic) => std::panic::resume_unwind(panic),
        };

        let mut results = Vec::with_capacity(world_size);
        let mut aborted = None;
        for outcome in joined {
            match outcome {
                Err(panic) => std::panic::resume_unwind(panic),
                Ok(Ok(value)) => results.push(value),
                Ok(Err(Error::Aborted { rank })) => { aborted.get_or_insert(Error::Aborted { rank }); }
                Ok(Err(e)) => return Err(e),
            }
        }
        match aborted {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}
