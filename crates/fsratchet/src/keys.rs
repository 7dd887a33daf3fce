//! Ratcheting key pairs.
//!
//! A [`PublicKey`] and a [`PrivateKey`] advance through the same sequence of
//! epochs. Encryption targets the public key's current epoch and only a
//! private key at that same epoch can decrypt.
//!
//! # Security
//!
//! Forward Secrecy:
//! - Ratcheting a private key drops every node key for earlier epochs
//! - Dropped node keys are zeroized
//! - Nothing remaining on the key stack derives an earlier epoch's key
//!
//! Public Ratchet:
//! - A public key advances with public parameters only
//! - Moving a public key to any epoch is allowed; it reveals nothing secret

use ark_bls12_381::{G1Affine, G2Affine};
use ark_ec::CurveGroup;
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, Zeroizing};

use crate::{
    cipher::{self, Ciphertext},
    codec,
    config::RatchetConfig,
    error::{RatchetError, Result},
    group::{self, Gt},
    hierarchy::{KeyStack, NodeKey, PublicParams},
    tree::{NodeName, Tree},
};

/// Generate a key pair at epoch 0.
///
/// # Errors
///
/// - `RngFailure` if the RNG fails
pub fn generate_keypair<R: RngCore + CryptoRng>(
    config: RatchetConfig,
    rng: &mut R,
) -> Result<(PublicKey, PrivateKey)> {
    let tree = Tree::new(config);
    let params = PublicParams::get();

    let mut alpha = group::random_scalar(rng)?;
    let root = NodeKey::root(&alpha, tree.depth(), rng);
    let master = (params.g() * alpha).into_affine();
    alpha.zeroize();

    let gt_base = group::pairing(params.g2(), master);
    let private_key = PrivateKey::from_parts(master, gt_base, KeyStack::new(tree, root?));
    let public_key = private_key.public_key();

    tracing::debug!(depth = tree.depth(), "generated key pair");
    Ok((public_key, private_key))
}

/// Public half of a key pair.
///
/// Cheap to clone. Equality compares epoch, depth, and master element.
#[derive(Clone)]
pub struct PublicKey {
    tree: Tree,
    epoch: u64,
    node: NodeName,
    master: G2Affine,
    identity: G1Affine,
    gt_base: Gt,
}

impl PublicKey {
    /// Public key for `epoch`, computing the pairing base.
    pub(crate) fn new(tree: Tree, epoch: u64, master: G2Affine) -> Result<Self> {
        let gt_base = group::pairing(PublicParams::get().g2(), master);
        Self::with_base(tree, epoch, master, gt_base)
    }

    fn with_base(tree: Tree, epoch: u64, master: G2Affine, gt_base: Gt) -> Result<Self> {
        let Some(node) = tree.node_at(epoch) else {
            return Err(RatchetError::RatchetExhausted { epoch, last: tree.last_epoch() });
        };

        let identity = PublicParams::get().identity(node);
        Ok(Self { tree, epoch, node, master, identity, gt_base })
    }

    /// Current epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Depth of the key tree.
    pub fn depth(&self) -> u8 {
        self.tree.depth()
    }

    /// Master element `g1 = alpha * g`.
    pub(crate) fn master(&self) -> &G2Affine {
        &self.master
    }

    /// Advance to the next epoch.
    ///
    /// # Errors
    ///
    /// - `RatchetExhausted` at the last epoch; the key is unchanged
    pub fn ratchet(&mut self) -> Result<()> {
        let Some(next) = self.tree.next(self.node) else {
            return Err(RatchetError::RatchetExhausted {
                epoch: self.epoch,
                last: self.tree.last_epoch(),
            });
        };

        self.node = next;
        self.epoch += 1;
        self.identity = PublicParams::get().identity(next);

        tracing::trace!(epoch = self.epoch, "ratcheted public key");
        Ok(())
    }

    /// The same public key moved to `epoch`, forwards or backwards.
    ///
    /// # Errors
    ///
    /// - `RatchetExhausted` if `epoch` is beyond the last epoch
    pub fn at_epoch(&self, epoch: u64) -> Result<Self> {
        let last = self.tree.last_epoch();
        if epoch > last {
            return Err(RatchetError::RatchetExhausted { epoch: self.epoch, last });
        }

        Self::with_base(self.tree, epoch, self.master, self.gt_base)
    }

    /// Encrypt `plaintext` for the current epoch.
    ///
    /// # Errors
    ///
    /// - `RngFailure` if the RNG fails
    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        plaintext: &[u8],
        rng: &mut R,
    ) -> Result<Ciphertext> {
        let ciphertext = cipher::encrypt(self.epoch, &self.gt_base, self.identity, plaintext, rng)?;

        tracing::trace!(epoch = self.epoch, len = plaintext.len(), "encrypted payload");
        Ok(ciphertext)
    }

    /// Encrypt several payloads for the current epoch.
    ///
    /// Each ciphertext gets its own encapsulation and nonce.
    ///
    /// # Errors
    ///
    /// - `RngFailure` if the RNG fails; no ciphertexts are returned
    pub fn encrypt_batch<R: RngCore + CryptoRng>(
        &self,
        plaintexts: &[&[u8]],
        rng: &mut R,
    ) -> Result<Vec<Ciphertext>> {
        let ciphertexts = plaintexts
            .iter()
            .map(|plaintext| cipher::encrypt(self.epoch, &self.gt_base, self.identity, plaintext, rng))
            .collect::<Result<Vec<_>>>()?;

        tracing::trace!(epoch = self.epoch, count = ciphertexts.len(), "encrypted batch");
        Ok(ciphertexts)
    }

    /// Encode as `epoch || depth || g1`.
    pub fn to_bytes(&self) -> Vec<u8> {
        codec::encode_public_key(self)
    }

    /// Decode a public key.
    ///
    /// Unlike [`PrivateKey::from_bytes`], a bad master element keeps its own
    /// error variant.
    ///
    /// # Errors
    ///
    /// - `Deserialization` for a bad length, depth, or epoch
    /// - `InvalidKeyEncoding` if the master element is invalid
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        codec::decode_public_key(bytes)
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.epoch == other.epoch && self.tree == other.tree && self.master == other.master
    }
}

impl Eq for PublicKey {}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKey")
            .field("epoch", &self.epoch)
            .field("depth", &self.tree.depth())
            .finish_non_exhaustive()
    }
}

/// Private half of a key pair.
///
/// Not `Clone`: a copy would keep the ability to decrypt epochs the original
/// has ratcheted past. All node keys are zeroized on drop.
pub struct PrivateKey {
    master: G2Affine,
    gt_base: Gt,
    stack: KeyStack,
}

impl PrivateKey {
    /// Assemble a key from a validated stack. `gt_base` is `e(g2, master)`.
    pub(crate) fn from_parts(master: G2Affine, gt_base: Gt, stack: KeyStack) -> Self {
        Self { master, gt_base, stack }
    }

    /// Current epoch.
    pub fn epoch(&self) -> u64 {
        self.stack.epoch()
    }

    /// Depth of the key tree.
    pub fn depth(&self) -> u8 {
        self.stack.tree().depth()
    }

    pub(crate) fn master(&self) -> &G2Affine {
        &self.master
    }

    pub(crate) fn stack(&self) -> &KeyStack {
        &self.stack
    }

    /// Advance to the next epoch.
    ///
    /// # Errors
    ///
    /// - `RatchetExhausted` at the last epoch
    /// - `RngFailure` if the RNG fails
    ///
    /// On error the key is unchanged.
    pub fn ratchet<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<()> {
        self.ratchet_to(self.epoch() + 1, rng)
    }

    /// Advance directly to `target`, skipping the epochs in between.
    ///
    /// Costs at most one key derivation per tree level, however far the
    /// jump. Skipped epochs become undecryptable exactly as if ratcheted
    /// through one by one.
    ///
    /// # Errors
    ///
    /// - `EpochRegression` if `target` is before the current epoch
    /// - `RatchetExhausted` if `target` is beyond the last epoch
    /// - `RngFailure` if the RNG fails
    ///
    /// On error the key is unchanged.
    pub fn ratchet_to<R: RngCore + CryptoRng>(&mut self, target: u64, rng: &mut R) -> Result<()> {
        let from = self.epoch();
        let derived = self.stack.advance_to(target, rng).inspect_err(|e| {
            tracing::debug!(from, to = target, error = %e, "private key ratchet rejected");
        })?;

        tracing::debug!(
            from,
            to = target,
            derived,
            entries = self.stack.entries().len(),
            "ratcheted private key"
        );
        Ok(())
    }

    /// Decrypt a ciphertext for the current epoch.
    ///
    /// # Errors
    ///
    /// - `EpochMismatch` if the ciphertext is for another epoch
    /// - `AuthenticationFailure` if the ciphertext was modified or was not
    ///   encrypted to this key pair
    pub fn decrypt(&self, ciphertext: &Ciphertext) -> Result<Vec<u8>> {
        cipher::decrypt(self.stack.current(), self.epoch(), ciphertext).inspect_err(|e| {
            tracing::debug!(epoch = self.epoch(), error = %e, "decryption rejected");
        })
    }

    /// Public key at the same epoch.
    pub fn public_key(&self) -> PublicKey {
        let tree = self.stack.tree();
        let node = self.stack.current().node();
        PublicKey {
            tree,
            epoch: self.epoch(),
            node,
            master: self.master,
            identity: PublicParams::get().identity(node),
            gt_base: self.gt_base,
        }
    }

    /// True if `public_key` is at the same epoch and the current node key is
    /// valid for its master element.
    ///
    /// Checked with public values only.
    pub fn matches(&self, public_key: &PublicKey) -> bool {
        public_key.epoch == self.epoch()
            && public_key.tree == self.stack.tree()
            && self.stack.current().verify(&public_key.gt_base, &public_key.to_bytes())
    }

    /// Encode the full key state. The bytes are secret.
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        codec::encode_private_key(self)
    }

    /// Decode and fully validate a private key.
    ///
    /// Every rejection is reported as `Deserialization`, including invalid
    /// group elements, which [`PublicKey::from_bytes`] reports as
    /// `InvalidKeyEncoding`. The reason string names the failing part.
    ///
    /// # Errors
    ///
    /// - `Deserialization` if the bytes are not a valid key, including any
    ///   invalid point or node key that fails its pairing checks
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        codec::decode_private_key(bytes)
    }

    /// Release the key, zeroizing all node keys.
    pub fn dispose(self) {
        tracing::debug!(epoch = self.epoch(), "disposed private key");
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey").field("stack", &self.stack).finish_non_exhaustive()
    }
}
