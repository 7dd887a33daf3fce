//! Canonical byte encodings.
//!
//! All integers are big-endian and all group elements are compressed.
//!
//! ```text
//! public key:   epoch (8) | depth (1) | g1 (96)
//! private key:  epoch (8) | depth (1) | g1 (96) | node keys, bottom to top
//!   node key:   a0 (48) | a1 (96) | b_{k+1} .. b_D (48 each)
//! ciphertext:   epoch (8) | ca (96) | cb (48) | nonce (24) | payload + tag (>= 16)
//! ```
//!
//! The node keys of a private key are not self-describing: their number and
//! sizes follow from `(epoch, depth)` through the tree's stack layout.
//! Decoding is strict, so `encode(decode(bytes)) == bytes` for every
//! accepted input.

use ark_bls12_381::{G1Affine, G2Affine};
use zeroize::Zeroizing;

use crate::{
    cipher::{Ciphertext, ENCAPSULATION_BYTES, NONCE_SIZE, TAG_SIZE},
    config::RatchetConfig,
    error::{RatchetError, Result},
    group::{self, G1_BYTES, G2_BYTES},
    hierarchy::{KeyStack, NodeKey, PublicParams},
    keys::{PrivateKey, PublicKey},
    tree::{NodeName, Tree},
};

/// Size of the epoch field
const EPOCH_BYTES: usize = 8;

/// Size of `epoch | depth | g1`
const KEY_HEADER_BYTES: usize = EPOCH_BYTES + 1 + G2_BYTES;

/// Encoded size of a public key.
pub const PUBLIC_KEY_BYTES: usize = KEY_HEADER_BYTES;

/// Smallest valid ciphertext (empty payload).
pub const MIN_CIPHERTEXT_BYTES: usize = EPOCH_BYTES + ENCAPSULATION_BYTES + NONCE_SIZE + TAG_SIZE;

/// Encode a public key.
pub fn encode_public_key(key: &PublicKey) -> Vec<u8> {
    let mut out = Vec::with_capacity(PUBLIC_KEY_BYTES);
    write_header(&mut out, key.epoch(), key.depth(), key.master());
    out
}

/// Decode a public key.
///
/// # Errors
///
/// - `Deserialization` for a wrong length, a depth outside `1..=32`, or an
///   epoch beyond the tree
/// - `InvalidKeyEncoding` if `g1` is not a valid G2 element
pub fn decode_public_key(bytes: &[u8]) -> Result<PublicKey> {
    if bytes.len() != PUBLIC_KEY_BYTES {
        return Err(deserialization(format!(
            "public key must be {PUBLIC_KEY_BYTES} bytes, got {}",
            bytes.len()
        )));
    }

    let mut reader = Reader::new(bytes);
    let (tree, epoch) = read_position(&mut reader)?;
    let master = group::decode_g2(reader.take(G2_BYTES)?, "g1")?;

    PublicKey::new(tree, epoch, master)
}

/// Encode a private key. The returned buffer is zeroized on drop.
pub fn encode_private_key(key: &PrivateKey) -> Zeroizing<Vec<u8>> {
    let stack = key.stack();
    let tree = stack.tree();
    let size = private_key_size(tree, stack.entries().iter().map(NodeKey::node));

    let mut out = Zeroizing::new(Vec::with_capacity(size));
    write_header(&mut out, stack.epoch(), tree.depth(), key.master());
    for node_key in stack.entries() {
        group::encode_g1(node_key.a0(), &mut out);
        group::encode_g2(node_key.a1(), &mut out);
        for b in node_key.delegation() {
            group::encode_g1(b, &mut out);
        }
    }

    debug_assert_eq!(out.len(), size);
    out
}

/// Decode and validate a private key.
///
/// Every node key is checked against the master element with pairing
/// equations, so a decoded key is known to decrypt for its epochs.
///
/// # Errors
///
/// - `Deserialization` for any malformed, inconsistent, or invalid input
pub fn decode_private_key(bytes: &[u8]) -> Result<PrivateKey> {
    decode_private_key_inner(bytes).map_err(|e| {
        let e = match e {
            RatchetError::Deserialization { .. } => e,
            other => deserialization(other.to_string()),
        };
        tracing::debug!(len = bytes.len(), error = %e, "private key rejected");
        e
    })
}

fn decode_private_key_inner(bytes: &[u8]) -> Result<PrivateKey> {
    let mut reader = Reader::new(bytes);
    let (tree, epoch) = read_position(&mut reader)?;

    let Some(node) = tree.node_at(epoch) else {
        unreachable!("read_position checks the epoch range");
    };
    let layout = tree.stack_layout(node);

    let expected = private_key_size(tree, layout.iter().copied());
    if bytes.len() != expected {
        return Err(deserialization(format!(
            "private key at epoch {epoch} depth {} must be {expected} bytes, got {}",
            tree.depth(),
            bytes.len()
        )));
    }

    let master = group::decode_g2(reader.take(G2_BYTES)?, "g1")?;
    let gt_base = group::pairing(PublicParams::get().g2(), master);

    let mut keys = Vec::with_capacity(layout.len());
    for (index, node) in layout.into_iter().enumerate() {
        let start = reader.position();
        let node_key = read_node_key(&mut reader, tree, node)?;
        if !node_key.verify(&gt_base, &bytes[start..reader.position()]) {
            return Err(deserialization(format!("node key {index} fails verification")));
        }
        keys.push(node_key);
    }

    debug_assert!(reader.is_empty());
    Ok(PrivateKey::from_parts(master, gt_base, KeyStack::from_parts(tree, epoch, keys)))
}

/// Encode a ciphertext.
pub fn encode_ciphertext(ciphertext: &Ciphertext) -> Vec<u8> {
    let mut out = Vec::with_capacity(
        EPOCH_BYTES + ENCAPSULATION_BYTES + NONCE_SIZE + ciphertext.payload.len(),
    );
    out.extend_from_slice(&ciphertext.epoch.to_be_bytes());
    out.extend_from_slice(&ciphertext.encapsulation);
    out.extend_from_slice(&ciphertext.nonce);
    out.extend_from_slice(&ciphertext.payload);
    out
}

/// Decode a ciphertext.
///
/// Only the structure is checked here. The encapsulation points are
/// validated during decryption.
///
/// # Errors
///
/// - `MalformedCiphertext` if `bytes` is shorter than
///   [`MIN_CIPHERTEXT_BYTES`]
pub fn decode_ciphertext(bytes: &[u8]) -> Result<Ciphertext> {
    if bytes.len() < MIN_CIPHERTEXT_BYTES {
        return Err(RatchetError::MalformedCiphertext {
            reason: format!(
                "ciphertext must be at least {MIN_CIPHERTEXT_BYTES} bytes, got {}",
                bytes.len()
            ),
        });
    }

    let (epoch, rest) = bytes.split_at(EPOCH_BYTES);
    let (encapsulation, rest) = rest.split_at(ENCAPSULATION_BYTES);
    let (nonce, payload) = rest.split_at(NONCE_SIZE);

    let (Ok(epoch), Ok(encapsulation), Ok(nonce)) =
        (epoch.try_into(), encapsulation.try_into(), nonce.try_into())
    else {
        unreachable!("split_at produced fixed-size fields");
    };

    Ok(Ciphertext {
        epoch: u64::from_be_bytes(epoch),
        encapsulation,
        nonce,
        payload: payload.to_vec(),
    })
}

fn write_header(out: &mut Vec<u8>, epoch: u64, depth: u8, master: &G2Affine) {
    out.extend_from_slice(&epoch.to_be_bytes());
    out.push(depth);
    group::encode_g2(master, out);
}

/// Read `epoch | depth` and check that the epoch exists in the tree.
fn read_position(reader: &mut Reader<'_>) -> Result<(Tree, u64)> {
    let Ok(epoch) = <[u8; EPOCH_BYTES]>::try_from(reader.take(EPOCH_BYTES)?) else {
        unreachable!("take returns exactly the requested length");
    };
    let epoch = u64::from_be_bytes(epoch);
    let depth = reader.take(1)?[0];

    let config =
        RatchetConfig::new(depth).map_err(|e| deserialization(format!("invalid depth: {e}")))?;
    let tree = Tree::new(config);

    if epoch > tree.last_epoch() {
        return Err(deserialization(format!(
            "epoch {epoch} beyond last epoch {} of depth {depth}",
            tree.last_epoch()
        )));
    }

    Ok((tree, epoch))
}

fn read_node_key(reader: &mut Reader<'_>, tree: Tree, node: NodeName) -> Result<NodeKey> {
    let a0 = group::decode_g1(reader.take(G1_BYTES)?, "node_key.a0")?;
    let a1 = group::decode_g2(reader.take(G2_BYTES)?, "node_key.a1")?;

    let count = usize::from(tree.depth() - node.level());
    let b = (0..count)
        .map(|_| group::decode_g1(reader.take(G1_BYTES)?, "node_key.b"))
        .collect::<Result<Vec<G1Affine>>>()?;

    Ok(NodeKey::from_parts(node, a0, a1, b))
}

fn private_key_size(tree: Tree, nodes: impl Iterator<Item = NodeName>) -> usize {
    nodes.fold(KEY_HEADER_BYTES, |size, node| {
        size + G1_BYTES + G2_BYTES + G1_BYTES * usize::from(tree.depth() - node.level())
    })
}

fn deserialization(reason: String) -> RatchetError {
    RatchetError::Deserialization { reason }
}

/// Bounds-checked cursor over an input buffer.
struct Reader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn position(&self) -> usize {
        self.position
    }

    fn is_empty(&self) -> bool {
        self.position == self.bytes.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.position + len;
        let Some(slice) = self.bytes.get(self.position..end) else {
            return Err(deserialization(format!(
                "truncated input: need {end} bytes, got {}",
                self.bytes.len()
            )));
        };
        self.position = end;
        Ok(slice)
    }
}
