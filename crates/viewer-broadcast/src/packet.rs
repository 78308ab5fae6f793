//! Viewer wire format

/// Header size: seven 32-bit integers
pub const HEADER_BYTES: usize = 28;

/// One diagnostic record.
///
/// Serialized as the seven header integers in declaration order, native byte
/// order, followed by exactly the frame bytes. No length prefix and no
/// versioning; the viewer knows the frame dimensions out of band.
#[derive(Debug, Clone, Default)]
pub struct ViewerPacket {
    pub l_x: i32,
    pub l_y: i32,
    pub u_x: i32,
    pub u_y: i32,
    pub error_lower: i32,
    pub error_upper: i32,
    pub mass: i32,
    pub frame: Vec<u8>,
}

impl ViewerPacket {
    /// A zeroed packet with frame storage preallocated
    pub fn sized(frame_len: usize) -> Self {
        Self {
            frame: vec![0; frame_len],
            ..Self::default()
        }
    }

    /// Copy another packet into this one, reusing the frame allocation
    pub fn clone_from_packet(&mut self, other: &ViewerPacket) {
        self.l_x = other.l_x;
        self.l_y = other.l_y;
        self.u_x = other.u_x;
        self.u_y = other.u_y;
        self.error_lower = other.error_lower;
        self.error_upper = other.error_upper;
        self.mass = other.mass;
        self.frame.clear();
        self.frame.extend_from_slice(&other.frame);
    }

    /// Serialize into `buf` (cleared first)
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.clear();
        buf.reserve(HEADER_BYTES + self.frame.len());
        for field in [
            self.l_x,
            self.l_y,
            self.u_x,
            self.u_y,
            self.error_lower,
            self.error_upper,
            self.mass,
        ] {
            buf.extend_from_slice(&field.to_ne_bytes());
        }
        buf.extend_from_slice(&self.frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let packet = ViewerPacket {
            l_x: 1,
            l_y: 2,
            u_x: 3,
            u_y: 4,
            error_lower: 5,
            error_upper: 6,
            mass: 7,
            frame: vec![0; 16],
        };
        let mut buf = Vec::new();
        packet.encode_into(&mut buf);

        assert_eq!(buf.len(), HEADER_BYTES + 16);
        for (i, expected) in (1..=7).enumerate() {
            let mut word = [0u8; 4];
            word.copy_from_slice(&buf[i * 4..i * 4 + 4]);
            assert_eq!(i32::from_ne_bytes(word), expected);
        }
        assert!(buf[HEADER_BYTES..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_clone_from_reuses_frame_storage() {
        let mut dst = ViewerPacket::sized(4);
        let ptr = dst.frame.as_ptr();
        let src = ViewerPacket {
            mass: 42,
            frame: vec![9, 9, 9, 9],
            ..ViewerPacket::default()
        };
        dst.clone_from_packet(&src);
        assert_eq!(dst.mass, 42);
        assert_eq!(dst.frame, vec![9, 9, 9, 9]);
        assert_eq!(dst.frame.as_ptr(), ptr);
    }
}
