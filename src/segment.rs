use crate::err::Error;

/// Maximum number of payload bytes carried by a single segment.
pub const MAX_SEG_DATA_SIZE: usize = 1440;

/// Size in bytes of the fixed segment header: seqno(4) + ackno(4) + len(2) +
/// flags(4) + window(2) + cksum(2).
pub const HEADER_LEN: usize = 18;

/// Segment carries an acknowledgment number the receiver should honor.
pub const FLAG_ACK: u32 = 0x10;
/// Segment marks the final sequence-number slot of the sender's stream.
pub const FLAG_FIN: u32 = 0x01;

const OFF_SEQNO: usize = 0;
const OFF_ACKNO: usize = 4;
const OFF_LEN: usize = 8;
const OFF_FLAGS: usize = 10;
const OFF_WINDOW: usize = 14;
const OFF_CKSUM: usize = 16;

/// A single cTCP segment: fixed header plus an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub seqno: u32,
    pub ackno: u32,
    pub flags: u32,
    pub window: u16,
    pub data: Vec<u8>,
}

impl Segment {
    pub fn new(seqno: u32, ackno: u32, flags: u32, window: u16, data: Vec<u8>) -> Self {
        Segment {
            seqno,
            ackno,
            flags,
            window,
            data,
        }
    }

    pub fn ack(&self) -> bool {
        self.flags & FLAG_ACK != 0
    }

    pub fn fin(&self) -> bool {
        self.flags & FLAG_FIN != 0
    }

    pub fn payload_len(&self) -> usize {
        self.data.len()
    }

    /// Number of sequence-number slots this segment occupies: the payload
    /// length, plus one more if it carries a FIN.
    pub fn effective_len(&self) -> u32 {
        self.data.len() as u32 + if self.fin() { 1 } else { 0 }
    }

    /// Sequence number one past the last slot this segment occupies.
    pub fn seq_end(&self) -> u32 {
        self.seqno.wrapping_add(self.effective_len())
    }

    pub fn encode(&self) -> Vec<u8> {
        let len = HEADER_LEN + self.data.len();
        let mut out = vec![0u8; len];

        out[OFF_SEQNO..OFF_SEQNO + 4].copy_from_slice(&self.seqno.to_be_bytes());
        out[OFF_ACKNO..OFF_ACKNO + 4].copy_from_slice(&self.ackno.to_be_bytes());
        out[OFF_LEN..OFF_LEN + 2].copy_from_slice(&(len as u16).to_be_bytes());
        out[OFF_FLAGS..OFF_FLAGS + 4].copy_from_slice(&self.flags.to_be_bytes());
        out[OFF_WINDOW..OFF_WINDOW + 2].copy_from_slice(&self.window.to_be_bytes());
        out[OFF_CKSUM..OFF_CKSUM + 2].copy_from_slice(&[0, 0]);
        out[HEADER_LEN..].copy_from_slice(&self.data);

        let sum = checksum(&out);
        out[OFF_CKSUM..OFF_CKSUM + 2].copy_from_slice(&sum.to_be_bytes());

        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Malformed("frame shorter than header"));
        }

        let len = u16::from_be_bytes([bytes[OFF_LEN], bytes[OFF_LEN + 1]]) as usize;
        if len < HEADER_LEN || len > bytes.len() {
            return Err(Error::Malformed("declared length out of range"));
        }

        if checksum(&bytes[..len]) != 0 {
            return Err(Error::Malformed("checksum mismatch"));
        }

        let seqno = u32::from_be_bytes(bytes[OFF_SEQNO..OFF_SEQNO + 4].try_into().unwrap());
        let ackno = u32::from_be_bytes(bytes[OFF_ACKNO..OFF_ACKNO + 4].try_into().unwrap());
        let flags = u32::from_be_bytes(bytes[OFF_FLAGS..OFF_FLAGS + 4].try_into().unwrap());
        let window = u16::from_be_bytes([bytes[OFF_WINDOW], bytes[OFF_WINDOW + 1]]);
        let data = bytes[HEADER_LEN..len].to_vec();

        Ok(Segment {
            seqno,
            ackno,
            flags,
            window,
            data,
        })
    }
}

/// One's-complement checksum over `bytes`, treating `bytes` as a sequence of
/// 16-bit words (the final odd byte, if any, is padded with a zero byte).
/// Callers must zero the checksum field before computing; `decode` runs this
/// over the frame exactly as received, where a well-formed frame checksums
/// to zero.
pub fn checksum(bytes: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    let mut chunks = bytes.chunks_exact(2);
    for word in &mut chunks {
        sum += u16::from_be_bytes([word[0], word[1]]) as u32;
    }
    if let [last] = chunks.remainder() {
        sum += (*last as u32) << 8;
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let seg = Segment::new(1, 0, FLAG_ACK, 2048, b"hello".to_vec());
        let bytes = seg.encode();
        let decoded = Segment::decode(&bytes).unwrap();
        assert_eq!(seg, decoded);
    }

    #[test]
    fn empty_fin_round_trip() {
        let seg = Segment::new(6, 1, FLAG_ACK | FLAG_FIN, 0, Vec::new());
        let bytes = seg.encode();
        let decoded = Segment::decode(&bytes).unwrap();
        assert_eq!(seg, decoded);
        assert!(decoded.fin());
        assert_eq!(decoded.effective_len(), 1);
    }

    #[test]
    fn checksum_zero_on_well_formed_frame() {
        let seg = Segment::new(42, 7, FLAG_ACK, 512, b"payload bytes".to_vec());
        let bytes = seg.encode();
        assert_eq!(checksum(&bytes), 0);
    }

    #[test]
    fn single_bit_flip_is_detected() {
        let seg = Segment::new(1, 0, FLAG_ACK, 2048, b"some test data".to_vec());
        let mut bytes = seg.encode();
        bytes[HEADER_LEN] ^= 0x01;
        assert!(matches!(Segment::decode(&bytes), Err(Error::Malformed(_))));
    }

    #[test]
    fn decode_rejects_truncated_frame() {
        let seg = Segment::new(1, 0, FLAG_ACK, 2048, b"hello".to_vec());
        let bytes = seg.encode();
        assert!(matches!(
            Segment::decode(&bytes[..HEADER_LEN - 1]),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn decode_rejects_oversized_declared_length() {
        let seg = Segment::new(1, 0, FLAG_ACK, 2048, b"hello".to_vec());
        let mut bytes = seg.encode();
        bytes[OFF_LEN..OFF_LEN + 2].copy_from_slice(&(bytes.len() as u16 + 10).to_be_bytes());
        assert!(matches!(Segment::decode(&bytes), Err(Error::Malformed(_))));
    }
}
