//! Small helpers shared by the renderer and the platform backends

use gsi_hud_types::Color;

/// Convert an RGBA byte array to a tiny_skia color
#[inline]
pub fn skia_color(rgba: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3])
}

/// Copy an RGBA pixel buffer into a BGRA one, as expected by X11 and GDI
#[inline]
pub fn rgba_to_bgra(src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        d[0] = s[2];
        d[1] = s[1];
        d[2] = s[0];
        d[3] = s[3];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skia_color_preserves_channels() {
        let c = skia_color([255, 0, 0, 128]);
        assert_eq!(c.to_color_u8().red(), 255);
        assert_eq!(c.to_color_u8().alpha(), 128);
    }

    #[test]
    fn bgra_swaps_red_and_blue() {
        let src = [1, 2, 3, 4, 5, 6, 7, 8];
        let mut dst = [0u8; 8];
        rgba_to_bgra(&src, &mut dst);
        assert_eq!(dst, [3, 2, 1, 4, 7, 6, 5, 8]);
    }
}
