//! Match overlays: a box around each recognised face with a name/score tag.

use crate::font;
use facefind_core::Match;
use image::{Rgb, RgbImage};

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const BOX_THICKNESS: i64 = 2;
const LABEL_PADDING: i64 = 4;
const FONT_SCALE: u32 = 2;

/// `"<identity> <score>"` with the score to two decimals.
///
/// The overlay font only has digits, A-Z, space and `.-_`. Lowercase letters
/// are drawn as capitals and any other character as `?`, so the drawn
/// label can differ from the identity name as written. Reports keep the
/// exact name.
pub fn label(m: &Match) -> String {
    format!("{} {:.2}", m.identity, m.score)
}

/// Draw every match onto a copy of `image`.
pub fn annotate(image: &RgbImage, matches: &[Match]) -> RgbImage {
    let mut out = image.clone();
    for m in matches {
        let (x1, y1, x2, y2) = m.bbox.pixel_rect();
        let (x1, y1, x2, y2) = (x1 as i64, y1 as i64, x2 as i64, y2 as i64);
        draw_hollow_rect(&mut out, x1, y1, x2, y2, BOX_THICKNESS, BOX_COLOR);

        let text = label(m);
        let tw = font::text_width(&text, FONT_SCALE) as i64;
        let th = font::text_height(FONT_SCALE) as i64;
        let tag_y = (y1 - th - 2 * LABEL_PADDING).max(0);
        fill_rect(
            &mut out,
            x1,
            tag_y,
            x1 + tw + 2 * LABEL_PADDING,
            tag_y + th + 2 * LABEL_PADDING,
            BOX_COLOR,
        );
        font::draw_text(
            &mut out,
            x1 + LABEL_PADDING,
            tag_y + LABEL_PADDING,
            &text,
            FONT_SCALE,
            TEXT_COLOR,
        );
    }
    out
}

/// Fill the half-open rectangle `[x1, x2) × [y1, y2)`, clipped to the image.
fn fill_rect(image: &mut RgbImage, x1: i64, y1: i64, x2: i64, y2: i64, color: Rgb<u8>) {
    let x_start = x1.max(0);
    let y_start = y1.max(0);
    let x_end = x2.min(image.width() as i64);
    let y_end = y2.min(image.height() as i64);
    for y in y_start..y_end {
        for x in x_start..x_end {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// Outline the rectangle with corners (`x1`, `y1`) and (`x2`, `y2`), inclusive.
fn draw_hollow_rect(
    image: &mut RgbImage,
    x1: i64,
    y1: i64,
    x2: i64,
    y2: i64,
    thickness: i64,
    color: Rgb<u8>,
) {
    let (x1, x2) = (x1.min(x2), x1.max(x2));
    let (y1, y2) = (y1.min(y2), y1.max(y2));
    let half = thickness / 2;
    let (lo, hi) = (-half, thickness - half);

    fill_rect(image, x1 + lo, y1 + lo, x2 + hi, y1 + hi, color); // top
    fill_rect(image, x1 + lo, y2 + lo, x2 + hi, y2 + hi, color); // bottom
    fill_rect(image, x1 + lo, y1 + lo, x1 + hi, y2 + hi, color); // left
    fill_rect(image, x2 + lo, y1 + lo, x2 + hi, y2 + hi, color); // right
}
