//! XOR stream obfuscation keyed by bytes the server hands out at
//! handshake time.
//!
//! The operation is symmetric: the same key deciphers what it
//! enciphered. The key offset restarts at zero for every frame, which
//! matches how the server applies it on its side.

/// Per-session XOR cipher.
///
/// Until a key is installed (the one pre-greet frame of the versioned
/// protocol), traffic passes through untouched.
#[derive(Debug, Clone, Default)]
pub(crate) struct XorCipher {
    key: Option<Vec<u8>>,
}

impl XorCipher {
    /// A cipher with no key — `apply` is the identity.
    pub(crate) fn empty() -> Self {
        Self { key: None }
    }

    /// A cipher over the given key. An empty key behaves like no key.
    pub(crate) fn new(key: Vec<u8>) -> Self {
        let mut c = Self::empty();
        c.set_key(key);
        c
    }

    /// Install the key for all subsequent traffic on this session.
    pub(crate) fn set_key(&mut self, key: Vec<u8>) {
        self.key = if key.is_empty() { None } else { Some(key) };
    }

    pub(crate) fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Encipher or decipher one frame.
    pub(crate) fn apply(&self, data: &[u8]) -> Vec<u8> {
        match &self.key {
            None => data.to_vec(),
            Some(key) => data
                .iter()
                .enumerate()
                .map(|(i, b)| b ^ key[i % key.len()])
                .collect(),
        }
    }
}
