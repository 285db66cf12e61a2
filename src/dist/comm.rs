//! Process-group primitives used by the shard distribution protocol.

use crate::error::{Error, Result};

/// Logical stream a message belongs to. Receives match on `(source, tag)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    Vtxdist,
    Edgedist,
    WeightFlags,
    Indptr,
    Indices,
    NodeWeight,
    EdgeWeight,
    PartitionMap,
    Barrier,
}

/// Typed message body.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    U64(Vec<u64>),
    I64(Vec<i64>),
    U32(Vec<u32>),
}

impl Payload {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Payload::U64(v) => v.len(),
            Payload::I64(v) => v.len(),
            Payload::U32(v) => v.len(),
        }
    }

    #[inline] pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn kind(&self) -> &'static str {
        match self {
            Payload::U64(_) => u64::KIND,
            Payload::I64(_) => i64::KIND,
            Payload::U32(_) => u32::KIND,
        }
    }

    /// Flatten into a kind byte followed by the little-endian elements.
    pub fn to_bytes(&self) -> Vec<u8> {
        fn put<const N: usize, T: Copy>(out: &mut Vec<u8>, kind: u8, values: &[T], f: fn(T) -> [u8; N]) {
            out.reserve(1 + values.len() * N);
            out.push(kind);
            values.iter().for_each(|&v| out.extend_from_slice(&f(v)));
        }
        let mut out = Vec::new();
        match self {
            Payload::U64(v) => put(&mut out, 0, v, u64::to_le_bytes),
            Payload::I64(v) => put(&mut out, 1, v, i64::to_le_bytes),
            Payload::U32(v) => put(&mut out, 2, v, u32::to_le_bytes),
        }
        out
    }

    /// Inverse of [`Payload::to_bytes`]. `None` on an unknown kind byte or a ragged body.
    pub fn from_bytes(bytes: &[u8]) -> Option<Payload> {
        fn take<const N: usize, T>(body: &[u8], f: fn([u8; N]) -> T) -> Option<Vec<T>> {
            if body.len() % N != 0 {
                return None;
            }
            body.chunks_exact(N).map(|c| c.try_into().ok().map(f)).collect()
        }
        let (&kind, body) = bytes.split_first()?;
        match kind {
            0 => take(body, u64::from_le_bytes).map(Payload::U64),
            1 => take(body, i64::from_le_bytes).map(Payload::I64),
            2 => take(body, u32::from_le_bytes).map(Payload::U32),
            _ => None,
        }
    }

    /// Extract the elements, failing if the payload holds another element type.
    pub fn into_vec<T: Element>(self, tag: Tag) -> Result<Vec<T>> {
        let found = self.kind();
        T::unwrap(self).ok_or(Error::ProtocolPayload { tag, expected: T::KIND, found })
    }
}

/// Element types that can travel in a [`Payload`].
pub trait Element: Sized + Send + 'static {
    const KIND: &'static str;
    fn wrap(values: Vec<Self>) -> Payload;
    fn unwrap(payload: Payload) -> Option<Vec<Self>>;
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const KIND: &'static str = stringify!($ty);
            #[inline] fn wrap(values: Vec<Self>) -> Payload { Payload::$variant(values) }
            #[inline]
            fn unwrap(payload: Payload) -> Option<Vec<Self>> {
                match payload {
                    Payload::$variant(values) => Some(values),
                    _ => None,
                }
            }
        }
    };
}

impl_element!(u64, U64);
impl_element!(i64, I64);
impl_element!(u32, U32);

/// A posted send.
#[derive(Debug)]
#[must_use = "sends must be waited on"]
pub struct SendRequest {
    pub dest: usize,
    pub tag: Tag,
    pub len: usize,
}

/// A pre-sized receive that has been posted but not completed.
#[derive(Debug)]
#[must_use = "receives must be waited on"]
pub struct RecvRequest {
    pub source: usize,
    pub tag: Tag,
    pub expected_len: usize,
}

/// A fixed-size group of ranks exchanging point-to-point messages.
///
/// Implementations supply `rank`, `size`, a non-blocking `isend` and a
/// blocking `recv_matching`; the remaining collectives are built on those.
/// No operation has a timeout.
pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Post a send to `dest`. The payload is owned by the transport from here on.
    fn isend(&self, dest: usize, tag: Tag, payload: Payload) -> Result<SendRequest>;

    /// Block until the next message from `source` carrying `tag` arrives.
    fn recv_matching(&self, source: usize, tag: Tag) -> Result<Payload>;

    /// Block until a posted send has been handed off.
    fn wait_send(&self, _request: SendRequest) -> Result<()> {
        Ok(())
    }

    /// Post a receive of exactly `expected_len` elements.
    fn irecv(&self, source: usize, tag: Tag, expected_len: usize) -> RecvRequest {
        RecvRequest { source, tag, expected_len }
    }

    /// Complete a posted receive, checking the received length.
    fn wait_recv(&self, request: RecvRequest) -> Result<Payload> {
        let payload = self.recv_matching(request.source, request.tag)?;
        if payload.len() != request.expected_len {
            return Err(Error::ProtocolSizeMismatch {
                rank: self.rank(),
                from: request.source,
                tag: request.tag,
                expected: request.expected_len,
                actual: payload.len(),
            });
        }
        Ok(payload)
    }

    /// Complete every posted receive, in posting order.
    fn wait_all_recv(&self, requests: Vec<RecvRequest>) -> Result<Vec<Payload>> {
        requests.into_iter().map(|r| self.wait_recv(r)).collect()
    }

    fn wait_all_send(&self, requests: Vec<SendRequest>) -> Result<()> {
        requests.into_iter().try_for_each(|r| self.wait_send(r))
    }

    /// Broadcast `buffer` from `root`. Every rank passes a buffer of the
    /// same length; non-root ranks get the root's contents back.
    fn broadcast(&self, root: usize, tag: Tag, buffer: Payload) -> Result<Payload> {
        if self.rank() == root {
            let sends = (0..self.size())
                .filter(|&r| r != root)
                .map(|r| self.isend(r, tag, buffer.clone()))
                .collect::<Result<Vec<_>>>()?;
            self.wait_all_send(sends)?;
            Ok(buffer)
        } else {
            let request = self.irecv(root, tag, buffer.len());
            self.wait_recv(request)
        }
    }

    /// Block until every rank has entered the barrier. Routed through rank 0.
    fn barrier(&self) -> Result<()> {
        if self.size() <= 1 {
            return Ok(());
        }
        if self.rank() == 0 {
            for r in 1..self.size() {
                self.wait_recv(self.irecv(r, Tag::Barrier, 0))?;
            }
            for r in 1..self.size() {
                let request = self.isend(r, Tag::Barrier, Payload::U64(vec![]))?;
                self.wait_send(request)?;
            }
        } else {
            let request = self.isend(0, Tag::Barrier, Payload::U64(vec![]))?;
            self.wait_send(request)?;
            self.wait_recv(self.irecv(0, Tag::Barrier, 0))?;
        }
        Ok(())
    }
}
