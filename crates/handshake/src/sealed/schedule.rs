use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{EngineError, EngineResult};

/// Keys for one direction of traffic.
pub(crate) struct DirectionKeys {
    pub(crate) key: Zeroizing<[u8; 32]>,
    pub(crate) iv: [u8; 12],
    pub(crate) finished: Zeroizing<[u8; 32]>,
}

/// Everything derived from one handshake.
pub(crate) struct KeySchedule {
    pub(crate) client: DirectionKeys,
    pub(crate) server: DirectionKeys,
    pub(crate) exporter: Zeroizing<[u8; 32]>,
}

impl KeySchedule {
    /// Derives traffic keys from the shared secret, salted with the hash of both hellos.
    pub(crate) fn derive(
        shared: &[u8; 32],
        psk: Option<&[u8; 32]>,
        hello_hash: &[u8; 32],
    ) -> EngineResult<Self> {
        let mut ikm = Zeroizing::new(Vec::with_capacity(64));
        ikm.extend_from_slice(shared);
        if let Some(psk) = psk {
            ikm.extend_from_slice(psk);
        }

        let hk = Hkdf::<Sha256>::new(Some(hello_hash.as_slice()), &ikm);
        Ok(Self {
            client: DirectionKeys {
                key: Zeroizing::new(expand(&hk, b"handoff c key")?),
                iv: expand(&hk, b"handoff c iv")?,
                finished: Zeroizing::new(expand(&hk, b"handoff c fin")?),
            },
            server: DirectionKeys {
                key: Zeroizing::new(expand(&hk, b"handoff s key")?),
                iv: expand(&hk, b"handoff s iv")?,
                finished: Zeroizing::new(expand(&hk, b"handoff s fin")?),
            },
            exporter: Zeroizing::new(expand(&hk, b"handoff exporter")?),
        })
    }
}

fn expand<const N: usize>(hk: &Hkdf<Sha256>, label: &[u8]) -> EngineResult<[u8; N]> {
    let mut okm = [0u8; N];
    hk.expand(label, &mut okm)
        .map_err(|_| EngineError::Crypto("HKDF expansion failed"))?;
    Ok(okm)
}

/// SHA-256 over the concatenation of `parts`.
pub(crate) fn transcript_hash(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Verify data binding a finished key to the transcript seen so far.
pub(crate) fn finished_verify(
    finished_key: &[u8; 32],
    transcript_hash: &[u8; 32],
) -> EngineResult<[u8; 32]> {
    let hk = Hkdf::<Sha256>::new(Some(transcript_hash.as_slice()), finished_key);
    expand(&hk, b"handoff finished")
}

/// Keying material exported from an established session.
pub(crate) fn export(exporter: &[u8; 32], label: &[u8], out: &mut [u8]) -> EngineResult<()> {
    Hkdf::<Sha256>::new(None, exporter)
        .expand(label, out)
        .map_err(|_| EngineError::Crypto("exporter output too long"))
}
