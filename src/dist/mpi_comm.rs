//! Communicator over an MPI world, for runs launched with `mpirun`.
//!
//! Payloads travel as byte buffers (see [`Payload::to_bytes`]) with the
//! [`Tag`] as the MPI tag. Sends are blocking standard-mode sends, which the
//! shard protocol tolerates because every receiver posts its receives in the
//! order the sender issues them.

use std::collections::VecDeque;

use mpi::Rank;
use mpi::topology::SimpleCommunicator;
use mpi::traits::{Communicator as _, CommunicatorCollectives, Destination, Source};
use parking_lot::Mutex;
use tracing::trace;

use crate::dist::comm::{Communicator, Payload, SendRequest, Tag};
use crate::error::{Error, Result};

pub struct MpiComm {
    world: SimpleCommunicator,
    rank: usize,
    size: usize,
    /// Messages this rank sent to itself; a blocking self-send would never complete.
    loopback: Mutex<VecDeque<(Tag, Payload)>>,
}

impl MpiComm {
    pub fn new(world: SimpleCommunicator) -> Self {
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        Self { world, rank, size, loopback: Mutex::new(VecDeque::new()) }
    }

    fn check(&self, peer: usize) -> Result<Rank> {
        if peer >= self.size {
            return Err(Error::ProtocolCoverage { rank: peer, covered: self.size });
        }
        Ok(peer as Rank)
    }
}

impl Communicator for MpiComm {
    #[inline] fn rank(&self) -> usize { self.rank }

    #[inline] fn size(&self) -> usize { self.size }

    fn isend(&self, dest: usize, tag: Tag, payload: Payload) -> Result<SendRequest> {
        let peer = self.check(dest)?;
        let len = payload.len();
        if dest == self.rank {
            self.loopback.lock().push_back((tag, payload));
        } else {
            let bytes = payload.to_bytes();
            trace!("[mpi] rank {} -> {dest}: {tag:?}, {} bytes", self.rank, bytes.len());
            self.world.process_at_rank(peer).send_with_tag(&bytes[..], tag as i32);
        }
        Ok(SendRequest { dest, tag, len })
    }

    fn recv_matching(&self, source: usize, tag: Tag) -> Result<Payload> {
        let peer = self.check(source)?;
        if source == self.rank {
            let mut loopback = self.loopback.lock();
            let pos = loopback.iter().position(|(t, _)| *t == tag);
            return pos.and_then(|i| loopback.remove(i))
                .map(|(_, payload)| payload)
                .ok_or(Error::Disconnected { rank: source });
        }
        let (bytes, _status) = self.world.process_at_rank(peer).receive_vec_with_tag::<u8>(tag as i32);
        trace!("[mpi] rank {} <- {source}: {tag:?}, {} bytes", self.rank, bytes.len());
        Payload::from_bytes(&bytes).ok_or(Error::MalformedMessage { rank: self.rank, from: source, tag })
    }

    fn barrier(&self) -> Result<()> {
        self.world.barrier();
        Ok(())
    }
}
