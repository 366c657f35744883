use crate::app::PixelRect;

/// Mutable view over an RGBA8 frame. All writes are clipped to the frame.
pub struct FrameMut<'a> {
    rgba: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> FrameMut<'a> {
    pub fn new(rgba: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            rgba,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for chunk in self.rgba.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    /// Writes one pixel; alpha below 255 blends over what is already there.
    pub fn put_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        let Some(offset) = self.byte_offset(x, y) else {
            return;
        };
        let dst = &mut self.rgba[offset..offset + 4];
        match color[3] {
            0 => {}
            255 => dst.copy_from_slice(&color),
            alpha => {
                let a = alpha as u16;
                for channel in 0..3 {
                    let blended = (color[channel] as u16 * a + dst[channel] as u16 * (255 - a)) / 255;
                    dst[channel] = blended as u8;
                }
                dst[3] = 255;
            }
        }
    }

    pub fn fill_rect(&mut self, rect: PixelRect, color: [u8; 4]) {
        let start_x = rect.x.max(0);
        let start_y = rect.y.max(0);
        let end_x = rect.x.saturating_add(rect.width).min(self.width as i32);
        let end_y = rect.y.saturating_add(rect.height).min(self.height as i32);
        for y in start_y..end_y {
            for x in start_x..end_x {
                self.put_pixel(x, y, color);
            }
        }
    }

    /// Border drawn inside `rect`, `thickness` pixels wide.
    pub fn stroke_rect(&mut self, rect: PixelRect, color: [u8; 4], thickness: i32) {
        if thickness <= 0 || rect.width <= 0 || rect.height <= 0 {
            return;
        }
        let t = thickness.min(rect.width).min(rect.height);
        let PixelRect {
            x,
            y,
            width,
            height,
        } = rect;
        self.fill_rect(PixelRect::new(x, y, width, t), color);
        self.fill_rect(PixelRect::new(x, y + height - t, width, t), color);
        self.fill_rect(PixelRect::new(x, y + t, t, height - 2 * t), color);
        self.fill_rect(PixelRect::new(x + width - t, y + t, t, height - 2 * t), color);
    }

    /// Copies a `size` block from an RGBA source image at `src_origin` to
    /// `dst` on the frame, skipping fully transparent source pixels.
    pub fn blit_rgba(
        &mut self,
        src: &[u8],
        src_width: u32,
        src_origin: (u32, u32),
        size: (u32, u32),
        dst: (i32, i32),
    ) {
        for row in 0..size.1 {
            let src_y = (src_origin.1 + row) as usize;
            for col in 0..size.0 {
                let src_x = (src_origin.0 + col) as usize;
                let index = (src_y * src_width as usize + src_x) * 4;
                let Some(pixel) = src.get(index..index + 4) else {
                    continue;
                };
                let color = [pixel[0], pixel[1], pixel[2], pixel[3]];
                self.put_pixel(dst.0 + col as i32, dst.1 + row as i32, color);
            }
        }
    }

    fn byte_offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let offset = (y as usize)
            .checked_mul(self.width as usize)?
            .checked_add(x as usize)?
            .checked_mul(4)?;
        (offset + 4 <= self.rgba.len()).then_some(offset)
    }
}
