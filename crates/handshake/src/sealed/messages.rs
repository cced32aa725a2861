use crate::error::{EngineError, EngineResult};

/// ClientHello and ServerHello share one layout: version, random, key share.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Hello {
    pub(crate) version: u8,
    pub(crate) random: [u8; 32],
    pub(crate) key_share: [u8; 32],
}

impl Hello {
    const LEN: usize = 1 + 32 + 32;

    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(Self::LEN);
        body.push(self.version);
        body.extend_from_slice(&self.random);
        body.extend_from_slice(&self.key_share);
        body
    }

    pub(crate) fn decode(body: &[u8]) -> EngineResult<Self> {
        if body.len() != Self::LEN {
            return Err(EngineError::Malformed("hello has the wrong length"));
        }
        let mut random = [0u8; 32];
        let mut key_share = [0u8; 32];
        random.copy_from_slice(&body[1..33]);
        key_share.copy_from_slice(&body[33..]);
        Ok(Self {
            version: body[0],
            random,
            key_share,
        })
    }
}

/// Finished carries the verify data proving both sides derived the same keys.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Finished {
    pub(crate) verify: [u8; 32],
}

impl Finished {
    pub(crate) fn encode(&self) -> Vec<u8> {
        self.verify.to_vec()
    }

    pub(crate) fn decode(body: &[u8]) -> EngineResult<Self> {
        let verify = <[u8; 32]>::try_from(body)
            .map_err(|_| EngineError::Malformed("finished has the wrong length"))?;
        Ok(Self { verify })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_layout_is_version_random_share() {
        let hello = Hello {
            version: 1,
            random: [0xaa; 32],
            key_share: [0xbb; 32],
        };
        let body = hello.encode();
        assert_eq!(body.len(), 65);
        assert_eq!(body[0], 1);
        assert_eq!(body[1], 0xaa);
        assert_eq!(body[64], 0xbb);
        assert_eq!(Hello::decode(&body).expect("decodes"), hello);
    }

    #[test]
    fn short_messages_are_malformed() {
        assert!(matches!(
            Hello::decode(&[1, 2, 3]),
            Err(EngineError::Malformed(_))
        ));
        assert!(matches!(
            Finished::decode(&[0u8; 31]),
            Err(EngineError::Malformed(_))
        ));
    }
}
