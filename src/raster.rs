use crate::artwork::Artwork;
use image::RgbaImage;
use image::imageops::FilterType;

/// Side length used when artwork has no usable natural size.
pub const FALLBACK_SIZE: u32 = 128;

// One fixed filter everywhere: the same artwork at the same size must come
// out pixel-identical on every call, or cache coherence tests can't hold.
pub(crate) const FILTER: FilterType = FilterType::Triangle;

/// Convert artwork into a concrete square bitmap.
///
/// - With a `target` size, the result is exactly `target`×`target`. Artwork
///   that already is a bitmap of that size is returned as-is, without a copy.
/// - Without one, square artwork keeps its natural size and non-square
///   artwork is centered on a transparent square canvas of its longer side.
/// - Degenerate (zero-dimension) artwork becomes a transparent
///   [`FALLBACK_SIZE`] square.
///
/// Returns `None` only when the artwork bytes cannot be decoded at all.
pub fn rasterize(artwork: Artwork, target: Option<u32>) -> Option<RgbaImage> {
    let bitmap = artwork.decode()?;

    Some(conform(bitmap, target))
}

fn conform(bitmap: RgbaImage, target: Option<u32>) -> RgbaImage {
    let (width, height) = bitmap.dimensions();

    if width == 0 || height == 0 {
        return RgbaImage::new(
            target.unwrap_or(FALLBACK_SIZE),
            target.unwrap_or(FALLBACK_SIZE),
        );
    }

    match target {
        Some(size) if width == size && height == size => bitmap,
        Some(size) => image::imageops::resize(&bitmap, size, size, FILTER),
        None if width == height => bitmap,
        None => center_on_square(bitmap),
    }
}

fn center_on_square(bitmap: RgbaImage) -> RgbaImage {
    let side = bitmap.width().max(bitmap.height());
    let mut canvas = RgbaImage::new(side, side);

    let x = i64::from((side - bitmap.width()) / 2);
    let y = i64::from((side - bitmap.height()) / 2);
    image::imageops::overlay(&mut canvas, &bitmap, x, y);

    canvas
}

#[cfg(test)]
mod test {
    use crate::artwork::Artwork;
    use crate::platform::test::{solid, solid_png};
    use crate::raster::{FALLBACK_SIZE, rasterize};
    use image::RgbaImage;

    #[test]
    fn test_matching_bitmap_is_unchanged() {
        let bitmap = solid([9, 9, 9, 255], 48);
        let out = rasterize(Artwork::Bitmap(bitmap.clone()), Some(48)).unwrap();

        assert_eq!(out, bitmap);
    }

    #[test]
    fn test_resizes_to_target() {
        let out = rasterize(Artwork::Bitmap(solid([9, 9, 9, 255], 96)), Some(48)).unwrap();

        assert_eq!(out.dimensions(), (48, 48));
        // a solid color survives any resampling filter
        assert_eq!(out.get_pixel(24, 24).0, [9, 9, 9, 255]);
    }

    #[test]
    fn test_deterministic() {
        let bytes = solid_png([120, 30, 60, 255], 100);

        let a = rasterize(Artwork::Encoded(bytes.clone()), Some(48)).unwrap();
        let b = rasterize(Artwork::Encoded(bytes), Some(48)).unwrap();

        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_natural_size_when_unspecified() {
        let out = rasterize(Artwork::Bitmap(solid([1, 1, 1, 255], 64)), None).unwrap();

        assert_eq!(out.dimensions(), (64, 64));
    }

    #[test]
    fn test_non_square_natural_is_squared() {
        let wide = RgbaImage::from_pixel(64, 32, image::Rgba([5, 5, 5, 255]));
        let out = rasterize(Artwork::Bitmap(wide), None).unwrap();

        assert_eq!(out.dimensions(), (64, 64));
        // centered: the top row is canvas, the middle is artwork
        assert_eq!(out.get_pixel(32, 0).0[3], 0);
        assert_eq!(out.get_pixel(32, 32).0, [5, 5, 5, 255]);
    }

    #[test]
    fn test_degenerate_artwork_gets_fallback_canvas() {
        let empty = RgbaImage::new(0, 0);
        let out = rasterize(Artwork::Bitmap(empty), None).unwrap();

        assert_eq!(out.dimensions(), (FALLBACK_SIZE, FALLBACK_SIZE));
    }

    #[test]
    fn test_undecodable_is_none() {
        assert!(rasterize(Artwork::Encoded(vec![0, 1, 2, 3]), Some(48)).is_none());
    }
}
