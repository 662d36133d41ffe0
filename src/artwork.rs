use image::RgbaImage;

/// A piece of icon artwork as returned by a source, before rasterization.
///
/// Sources that already hold pixels (the OS icon query, a loaded pack
/// composition) hand over a bitmap; sources that read files or resources
/// hand over the encoded bytes and let the rasterizer pay the decode cost.
#[derive(Debug, Clone)]
pub enum Artwork {
    /// Decoded RGBA pixels.
    Bitmap(RgbaImage),
    /// Still-encoded raster bytes (PNG, JPEG, WebP, ...).
    Encoded(Vec<u8>),
}

impl Artwork {
    /// Decode this artwork into pixels.
    ///
    /// Returns `None` if the encoded bytes are not a readable image; the
    /// caller treats that the same as the source having had no artwork.
    pub fn decode(self) -> Option<RgbaImage> {
        match self {
            Artwork::Bitmap(bitmap) => Some(bitmap),
            Artwork::Encoded(bytes) => match image::load_from_memory(&bytes) {
                Ok(decoded) => Some(decoded.to_rgba8()),
                Err(e) => {
                    log::debug!("artwork bytes failed to decode: {e}");
                    None
                }
            },
        }
    }
}

impl From<RgbaImage> for Artwork {
    fn from(bitmap: RgbaImage) -> Self {
        Artwork::Bitmap(bitmap)
    }
}

impl From<Vec<u8>> for Artwork {
    fn from(bytes: Vec<u8>) -> Self {
        Artwork::Encoded(bytes)
    }
}

#[cfg(test)]
mod test {
    use crate::artwork::Artwork;
    use crate::platform::test::{solid, solid_png};

    #[test]
    fn test_decode_bitmap_is_passthrough() {
        let bitmap = solid([10, 20, 30, 255], 16);
        let decoded = Artwork::Bitmap(bitmap.clone()).decode().unwrap();

        assert_eq!(decoded, bitmap);
    }

    #[test]
    fn test_decode_encoded_bytes() {
        let decoded = Artwork::Encoded(solid_png([1, 2, 3, 255], 8))
            .decode()
            .unwrap();

        assert_eq!(decoded.dimensions(), (8, 8));
        assert_eq!(decoded.get_pixel(4, 4).0, [1, 2, 3, 255]);
    }

    #[test]
    fn test_decode_garbage_is_none() {
        assert!(Artwork::Encoded(b"not an image".to_vec()).decode().is_none());
    }
}
