//! Tiny 3x5 bitmap font covering printable ASCII.
//!
//! Each glyph is packed into 15 bits, top row first, three bits per row with
//! the leftmost pixel in the high bit.

use super::draw::FrameMut;

const GLYPH_WIDTH: i32 = 3;
const GLYPH_HEIGHT: i32 = 5;
pub const TEXT_SCALE: i32 = 2;
pub const GLYPH_ADVANCE_PX: i32 = (GLYPH_WIDTH + 1) * TEXT_SCALE;
pub const LINE_ADVANCE_PX: i32 = (GLYPH_HEIGHT + 2) * TEXT_SCALE;

const FALLBACK_CHAR: char = '?';

#[rustfmt::skip]
const GLYPHS: [u16; 95] = [
    0x0000, 0x2482, 0x5A00, 0x5F7D, 0x7DDF, 0x52A5, 0x2AAB, 0x2400, //  !"#$%&'
    0x1491, 0x4494, 0x0AA8, 0x05D0, 0x0014, 0x01C0, 0x0002, 0x12A4, // ()*+,-./
    0x7B6F, 0x2C97, 0x73E7, 0x73CF, 0x5BC9, 0x79CF, 0x79EF, 0x7292, // 01234567
    0x7BEF, 0x7BCF, 0x0410, 0x0414, 0x1511, 0x0E38, 0x4454, 0x72C2, // 89:;<=>?
    0x7BE7, 0x2BED, 0x6BAE, 0x7927, 0x6B6E, 0x79A7, 0x79A4, 0x796F, // @ABCDEFG
    0x5BED, 0x7497, 0x726F, 0x5BAD, 0x4927, 0x5FED, 0x5FFD, 0x7B6F, // HIJKLMNO
    0x6BA4, 0x7B79, 0x6BAD, 0x79CF, 0x7492, 0x5B6F, 0x5B6A, 0x5BFD, // PQRSTUVW
    0x5AAD, 0x5A92, 0x72A7, 0x6926, 0x4889, 0x324B, 0x2A00, 0x0007, // XYZ[\]^_
    0x4400, 0x0E7F, 0x49AE, 0x0F27, 0x13EF, 0x0FA7, 0x39A4, 0x0F79, // `abcdefg
    0x49AD, 0x2092, 0x106A, 0x4BAD, 0x4927, 0x0DED, 0x0D6D, 0x0F6F, // hijklmno
    0x0D74, 0x0F79, 0x0D64, 0x0F8F, 0x2E93, 0x0B6F, 0x0B6A, 0x0B7A, // pqrstuvw
    0x0A95, 0x0B79, 0x0E57, 0x3593, 0x2492, 0x64D6, 0x0780, // xyz{|}~
];

fn glyph_for(ch: char) -> Option<u16> {
    match ch {
        ' '..='~' => Some(GLYPHS[ch as usize - ' ' as usize]),
        _ => None,
    }
}

fn glyph_bit(glyph: u16, row: i32, col: i32) -> bool {
    let shift = (GLYPH_HEIGHT - 1 - row) * GLYPH_WIDTH + (GLYPH_WIDTH - 1 - col);
    glyph & (1 << shift) != 0
}

pub fn text_width_px(text: &str) -> i32 {
    text.chars().count() as i32 * GLYPH_ADVANCE_PX
}

/// Draws a single line of text with its top-left at `(x, y)`. Characters
/// outside printable ASCII draw as `?`.
pub fn draw_text_clipped(frame: &mut FrameMut<'_>, x: i32, y: i32, text: &str, color: [u8; 4]) {
    let fallback = glyph_for(FALLBACK_CHAR).unwrap_or(0);
    let mut pen_x = x;
    for ch in text.chars() {
        draw_glyph(frame, pen_x, y, glyph_for(ch).unwrap_or(fallback), color);
        pen_x += GLYPH_ADVANCE_PX;
    }
}

fn draw_glyph(frame: &mut FrameMut<'_>, x: i32, y: i32, glyph: u16, color: [u8; 4]) {
    for row in 0..GLYPH_HEIGHT {
        for col in 0..GLYPH_WIDTH {
            if !glyph_bit(glyph, row, col) {
                continue;
            }
            for sy in 0..TEXT_SCALE {
                for sx in 0..TEXT_SCALE {
                    frame.put_pixel(
                        x + col * TEXT_SCALE + sx,
                        y + row * TEXT_SCALE + sy,
                        color,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn lit_pixels(buffer: &[u8]) -> usize {
        buffer.chunks_exact(4).filter(|px| px[3] != 0).count()
    }

    #[test]
    fn every_printable_ascii_char_has_a_glyph() {
        for code in 32u8..=126u8 {
            assert!(glyph_for(char::from(code)).is_some(), "code {code}");
        }
        assert_eq!(glyph_for(' '), Some(0));
    }

    #[test]
    fn non_ascii_uses_fallback() {
        assert!(glyph_for('\u{7f}').is_none());
        assert!(glyph_for('é').is_none());

        let mut unknown = vec![0u8; 16 * 16 * 4];
        draw_text_clipped(&mut FrameMut::new(&mut unknown, 16, 16), 0, 0, "é", WHITE);
        let mut question = vec![0u8; 16 * 16 * 4];
        draw_text_clipped(&mut FrameMut::new(&mut question, 16, 16), 0, 0, "?", WHITE);
        assert_eq!(unknown, question);
    }

    #[test]
    fn glyph_bits_read_top_left_first() {
        // 'T': full top row, then centre column.
        let t = glyph_for('T').unwrap_or(0);
        assert!(glyph_bit(t, 0, 0) && glyph_bit(t, 0, 1) && glyph_bit(t, 0, 2));
        assert!(!glyph_bit(t, 4, 0) && glyph_bit(t, 4, 1) && !glyph_bit(t, 4, 2));
    }

    #[test]
    fn layout_metrics_follow_text_scale() {
        assert_eq!(GLYPH_ADVANCE_PX, 8);
        assert_eq!(LINE_ADVANCE_PX, 14);
        assert_eq!(text_width_px("Run"), 24);
        assert_eq!(text_width_px(""), 0);
    }

    #[test]
    fn drawing_writes_scaled_pixels() {
        let mut buffer = vec![0u8; 8 * 12 * 4];
        draw_text_clipped(&mut FrameMut::new(&mut buffer, 8, 12), 0, 0, "I", WHITE);
        // 'I' has 3 + 1 + 1 + 1 + 3 = 9 lit cells, each TEXT_SCALE squared.
        assert_eq!(lit_pixels(&buffer), 9 * 4);
    }

    #[test]
    fn clipped_text_never_writes_out_of_bounds() {
        for (w, h) in [(0, 0), (1, 1), (3, 2), (5, 9)] {
            let mut buffer = vec![0u8; (w * h * 4) as usize];
            let mut frame = FrameMut::new(&mut buffer, w, h);
            draw_text_clipped(&mut frame, -5, -3, "Hello, Codemere!", WHITE);
            draw_text_clipped(&mut frame, 2, 1, "~{}|", WHITE);
        }
    }
}
