/// What a replay tap does when its recorded prefix runs out.
///
/// A transcript that covers the whole handshake is never exhausted, so any
/// fall-through to the live source points at a truncated recording or an
/// engine/version mismatch.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FallbackPolicy {
    /// Read the live source silently.
    Allow,
    /// Read the live source and log a warning on the first fall-through.
    #[default]
    Warn,
    /// Refuse the read with [`std::io::ErrorKind::InvalidData`].
    Deny,
}

impl FallbackPolicy {
    /// Reports whether the live source may be read at all.
    #[must_use]
    pub const fn permits_fallback(self) -> bool {
        !matches!(self, Self::Deny)
    }
}
