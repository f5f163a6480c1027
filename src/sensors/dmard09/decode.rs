use super::regs::BUF_DATA_LEN;

/// Accelerometer axis, in data-block order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Axis stored in a channel's `address` field
    pub fn from_address(address: usize) -> Option<Axis> {
        Axis::ALL.get(address).copied()
    }

    /// Offset of the axis' low byte; bytes 0 and 1 carry status.
    pub const fn offset(self) -> usize {
        (self as usize + 1) * 2
    }
}

/// Signed sample for `axis` from a block read of the status register.
pub fn decode(buf: &[u8; BUF_DATA_LEN], axis: Axis) -> i16 {
    let lo = axis.offset();
    i16::from_le_bytes([buf[lo], buf[lo + 1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_x() {
        let buf = [0, 0, 0x34, 0x12, 0, 0, 0, 0];
        assert_eq!(decode(&buf, Axis::X), 0x1234);
        assert_eq!(decode(&buf, Axis::X), 4660);
    }

    #[test]
    fn test_decode_sign_extension() {
        let buf = [0, 0, 0xFF, 0xFF, 0x00, 0x80, 0xFF, 0x7F];
        assert_eq!(decode(&buf, Axis::X), -1);
        assert_eq!(decode(&buf, Axis::Y), i16::MIN);
        assert_eq!(decode(&buf, Axis::Z), i16::MAX);
        assert_eq!(i32::from(decode(&buf, Axis::X)), -1);
    }

    #[test]
    fn test_axis_offsets() {
        let buf = [0xAA, 0xBB, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00];
        assert_eq!(decode(&buf, Axis::X), 1);
        assert_eq!(decode(&buf, Axis::Y), 2);
        assert_eq!(decode(&buf, Axis::Z), 3);
    }

    #[test]
    fn test_status_bytes_ignored() {
        let quiet = [0x00, 0x00, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60];
        let noisy = [0xFF, 0xFF, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60];
        for axis in Axis::ALL {
            assert_eq!(decode(&quiet, axis), decode(&noisy, axis));
        }
    }

    #[test]
    fn test_axis_from_address() {
        assert_eq!(Axis::from_address(0), Some(Axis::X));
        assert_eq!(Axis::from_address(2), Some(Axis::Z));
        assert_eq!(Axis::from_address(3), None);
    }
}
