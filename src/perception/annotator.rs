/// Draw detection boxes, click markers and short labels onto a captured frame.
///
/// Labels use a built-in 5×5 bitmap font (digits, A–Z and a few symbols),
/// so they carry a rule tag and the confidence rather than the recognized
/// text itself.
use image::RgbaImage;

use crate::errors::{AutobuyError, AutobuyResult};
use crate::perception::types::{Detection, Point};

pub const TERMINAL_COLOUR: [u8; 4] = [255, 68, 68, 230];
pub const SPECIAL_COLOUR: [u8; 4] = [255, 170, 0, 230];
pub const TARGET_COLOUR: [u8; 4] = [0, 255, 0, 230];
pub const CLICK_COLOUR: [u8; 4] = [0, 255, 0, 255];
pub const CLICK_RADIUS: i32 = 15;

/// Outline `det` and put `label` above its top-left corner.
///
/// The box is checked before any pixel is touched: a degenerate box or one
/// lying completely outside the frame is an `Annotation` error and leaves
/// `canvas` unchanged.
pub fn draw_detection(
    canvas: &mut RgbaImage,
    det: &Detection,
    label: &str,
    col: [u8; 4],
) -> AutobuyResult<()> {
    let (w, h) = canvas.dimensions();
    let [tl, _, br, _] = det.bbox;
    let (x1, y1, x2, y2) = (tl.x, tl.y, br.x, br.y);

    if x2 <= x1 || y2 <= y1 {
        return Err(AutobuyError::Annotation(format!(
            "degenerate box ({x1},{y1})-({x2},{y2}) for '{}'",
            det.text
        )));
    }
    if x2 < 0 || y2 < 0 || x1 >= w as i32 || y1 >= h as i32 {
        return Err(AutobuyError::Annotation(format!(
            "box ({x1},{y1})-({x2},{y2}) outside {w}x{h} frame"
        )));
    }

    let scale: u32 = if w > 1600 { 2 } else { 1 };
    let thickness: i32 = if w > 1600 { 3 } else { 2 };
    draw_rect(canvas, x1, y1, x2, y2, col, thickness);

    let label_h_px = (5 * scale + 4 * scale) as i32;
    draw_label(canvas, x1.max(0), (y1 - label_h_px).max(0), label, col, scale);
    Ok(())
}

/// Filled circle at `at`. Skipped when the centre is outside the frame;
/// returns whether anything was drawn.
pub fn draw_click_point(canvas: &mut RgbaImage, at: Point, radius: i32, col: [u8; 4]) -> bool {
    let (w, h) = canvas.dimensions();
    let (iw, ih) = (w as i32, h as i32);
    if at.x < 0 || at.y < 0 || at.x >= iw || at.y >= ih {
        return false;
    }
    let r2 = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > r2 {
                continue;
            }
            let (x, y) = (at.x + dx, at.y + dy);
            if x >= 0 && x < iw && y >= 0 && y < ih {
                set_pixel(canvas, x as u32, y as u32, col);
            }
        }
    }
    true
}

/// `"TAP 90"`-style tag: rule kind plus confidence in percent.
pub fn label_for(kind: &str, det: &Detection) -> String {
    format!("{kind} {:.0}", det.confidence * 100.0)
}

// ── Drawing primitives ──────────────────────────────────────────────────────

fn draw_rect(
    canvas: &mut RgbaImage,
    x1: i32, y1: i32, x2: i32, y2: i32,
    col: [u8; 4],
    thickness: i32,
) {
    let (w, h) = canvas.dimensions();
    let (iw, ih) = (w as i32, h as i32);

    // Top & bottom edges
    for t in 0..thickness {
        let ty = y1 + t;
        let by = y2 - t;
        for x in x1.max(0)..=x2.min(iw - 1) {
            if ty >= 0 && ty < ih { set_pixel(canvas, x as u32, ty as u32, col); }
            if by >= 0 && by < ih { set_pixel(canvas, x as u32, by as u32, col); }
        }
    }
    // Left & right edges
    for t in 0..thickness {
        let lx = x1 + t;
        let rx = x2 - t;
        for y in y1.max(0)..=y2.min(ih - 1) {
            if lx >= 0 && lx < iw { set_pixel(canvas, lx as u32, y as u32, col); }
            if rx >= 0 && rx < iw { set_pixel(canvas, rx as u32, y as u32, col); }
        }
    }
}

fn draw_label(
    canvas: &mut RgbaImage,
    x: i32, y: i32,
    text: &str,
    col: [u8; 4],
    scale: u32,
) {
    let (w, h) = canvas.dimensions();
    let step = 5 * scale + 1;
    let pad = 2 * scale;
    let label_w = text.chars().count() as u32 * step + pad * 2;
    let label_h = 5 * scale + pad * 2;
    let (x, y) = (x as u32, y as u32);

    // Darken the area behind the glyphs
    for dy in 0..label_h {
        for dx in 0..label_w {
            let (px, py) = (x + dx, y + dy);
            if px < w && py < h {
                let p = canvas.get_pixel_mut(px, py);
                p[0] = (p[0] as f32 * 0.2) as u8;
                p[1] = (p[1] as f32 * 0.2) as u8;
                p[2] = (p[2] as f32 * 0.2) as u8;
                p[3] = 255;
            }
        }
    }

    for (i, c) in text.to_uppercase().chars().enumerate() {
        let gx = x + pad + i as u32 * step;
        if gx + 5 * scale >= w { break; }
        draw_glyph(canvas, c, gx, y + pad, col, scale);
    }
}

fn draw_glyph(canvas: &mut RgbaImage, c: char, px: u32, py: u32, col: [u8; 4], scale: u32) {
    let glyph = match c {
        '0'..='9' => MINI_FONT[(c as u8 - b'0') as usize],
        'A'..='Z' => MINI_FONT[10 + (c as u8 - b'A') as usize],
        ':' => [0b00000, 0b00100, 0b00000, 0b00100, 0b00000],
        '_' => [0b00000, 0b00000, 0b00000, 0b00000, 0b11111],
        '-' => [0b00000, 0b00000, 0b11111, 0b00000, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00100],
        '%' => [0b11001, 0b11010, 0b00100, 0b01011, 0b10011],
        _   => return,
    };
    let (w, h) = canvas.dimensions();
    for (row, &bits) in glyph.iter().enumerate() {
        for bit in 0..5u32 {
            if (bits >> (4 - bit)) & 1 == 0 { continue; }
            for sy in 0..scale {
                for sx in 0..scale {
                    let x = px + bit * scale + sx;
                    let y = py + row as u32 * scale + sy;
                    if x < w && y < h {
                        set_pixel(canvas, x, y, col);
                    }
                }
            }
        }
    }
}

fn set_pixel(canvas: &mut RgbaImage, x: u32, y: u32, col: [u8; 4]) {
    let p = canvas.get_pixel_mut(x, y);
    let a = col[3] as f32 / 255.0;
    p[0] = (p[0] as f32 * (1.0 - a) + col[0] as f32 * a).round() as u8;
    p[1] = (p[1] as f32 * (1.0 - a) + col[1] as f32 * a).round() as u8;
    p[2] = (p[2] as f32 * (1.0 - a) + col[2] as f32 * a).round() as u8;
    p[3] = 255;
}

/// 5×5 glyphs: digits 0-9 then letters A-Z.
const MINI_FONT: [[u8; 5]; 36] = [
    [0b01110, 0b10001, 0b10001, 0b10001, 0b01110], // 0
    [0b00100, 0b01100, 0b00100, 0b00100, 0b01110], // 1
    [0b01110, 0b10001, 0b00110, 0b01000, 0b11111], // 2
    [0b11110, 0b00001, 0b00110, 0b00001, 0b11110], // 3
    [0b00110, 0b01010, 0b10010, 0b11111, 0b00010], // 4
    [0b11111, 0b10000, 0b11110, 0b00001, 0b11110], // 5
    [0b01110, 0b10000, 0b11110, 0b10001, 0b01110], // 6
    [0b11111, 0b00001, 0b00010, 0b00100, 0b00100], // 7
    [0b01110, 0b10001, 0b01110, 0b10001, 0b01110], // 8
    [0b01110, 0b10001, 0b01111, 0b00001, 0b01110], // 9
    [0b01110, 0b10001, 0b11111, 0b10001, 0b10001], // A
    [0b11110, 0b10001, 0b11110, 0b10001, 0b11110], // B
    [0b01110, 0b10000, 0b10000, 0b10000, 0b01110], // C
    [0b11100, 0b10010, 0b10001, 0b10010, 0b11100], // D
    [0b11111, 0b10000, 0b11110, 0b10000, 0b11111], // E
    [0b11111, 0b10000, 0b11110, 0b10000, 0b10000], // F
    [0b01110, 0b10000, 0b10011, 0b10001, 0b01110], // G
    [0b10001, 0b10001, 0b11111, 0b10001, 0b10001], // H
    [0b01110, 0b00100, 0b00100, 0b00100, 0b01110], // I
    [0b00111, 0b00010, 0b00010, 0b10010, 0b01100], // J
    [0b10001, 0b10010, 0b11100, 0b10010, 0b10001], // K
    [0b10000, 0b10000, 0b10000, 0b10000, 0b11111], // L
    [0b10001, 0b11011, 0b10101, 0b10001, 0b10001], // M
    [0b10001, 0b11001, 0b10101, 0b10011, 0b10001], // N
    [0b01110, 0b10001, 0b10001, 0b10001, 0b01110], // O
    [0b11110, 0b10001, 0b11110, 0b10000, 0b10000], // P
    [0b01110, 0b10001, 0b10101, 0b10010, 0b01101], // Q
    [0b11110, 0b10001, 0b11110, 0b10010, 0b10001], // R
    [0b01111, 0b10000, 0b01110, 0b00001, 0b11110], // S
    [0b11111, 0b00100, 0b00100, 0b00100, 0b00100], // T
    [0b10001, 0b10001, 0b10001, 0b10001, 0b01110], // U
    [0b10001, 0b10001, 0b10001, 0b01010, 0b00100], // V
    [0b10001, 0b10001, 0b10101, 0b11011, 0b10001], // W
    [0b10001, 0b01010, 0b00100, 0b01010, 0b10001], // X
    [0b10001, 0b01010, 0b00100, 0b00100, 0b00100], // Y
    [0b11111, 0b00010, 0b00100, 0b01000, 0b11111], // Z
];

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn blank(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255]))
    }

    #[test]
    fn box_edges_are_coloured() {
        let mut canvas = blank(200, 200);
        let det = Detection::from_rect(40, 60, 120, 100, "购物", 0.8);
        draw_detection(&mut canvas, &det, "TAP 80", [0, 255, 0, 255]).unwrap();

        assert_eq!(canvas.get_pixel(80, 60).0, [0, 255, 0, 255]);
        assert_eq!(canvas.get_pixel(40, 80).0, [0, 255, 0, 255]);
        // Interior untouched.
        assert_eq!(canvas.get_pixel(80, 80).0, [0, 0, 0, 255]);
    }

    #[test]
    fn invalid_boxes_leave_frame_untouched() {
        let mut canvas = blank(100, 100);
        let before = canvas.clone();

        let degenerate = Detection::from_rect(50, 50, 50, 80, "x", 0.5);
        assert!(matches!(
            draw_detection(&mut canvas, &degenerate, "X", TARGET_COLOUR),
            Err(AutobuyError::Annotation(_))
        ));
        let outside = Detection::from_rect(300, 300, 400, 400, "x", 0.5);
        assert!(draw_detection(&mut canvas, &outside, "X", TARGET_COLOUR).is_err());
        assert_eq!(canvas, before);
    }

    #[test]
    fn click_point_only_inside_frame() {
        let mut canvas = blank(50, 50);
        assert!(draw_click_point(&mut canvas, Point::new(25, 25), 5, CLICK_COLOUR));
        assert_eq!(canvas.get_pixel(25, 25).0, CLICK_COLOUR);
        assert_eq!(canvas.get_pixel(25, 31).0, [0, 0, 0, 255]);

        let before = canvas.clone();
        assert!(!draw_click_point(&mut canvas, Point::new(1815, 63), 15, CLICK_COLOUR));
        assert_eq!(canvas, before);
    }

    #[test]
    fn labels_carry_kind_and_percent() {
        let det = Detection::from_rect(0, 0, 1, 1, "已达到购买上限", 0.95);
        assert_eq!(label_for("END", &det), "END 95");
    }
}
