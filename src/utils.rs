use core::fmt;

/// Formats a byte slice as a list of hex bytes.
pub struct HexSlice<T>(pub T)
where
    T: AsRef<[u8]>;

impl<T: AsRef<[u8]>> fmt::Debug for HexSlice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, byte) in self.0.as_ref().iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_slice_formats_bytes() {
        assert_eq!(format!("{:?}", HexSlice([0x01, 0xab, 0x00])), "[01, ab, 00]");
        assert_eq!(format!("{:?}", HexSlice(&[][..])), "[]");
    }
}
