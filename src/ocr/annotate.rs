//! Marks recognised words on a copy of a capture.

use image::{Rgba, RgbaImage};

use super::{Point, TextRecord};
use crate::capture::Bitmap;

pub const MARK_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

const LINE_WIDTH: i32 = 2;
/// Height of the confidence bar drawn above each box.
const BAR_HEIGHT: i32 = 6;

/// Returns a copy of `bitmap` with each record's polygon outlined and a
/// confidence bar above it. The bar spans `confidence` of the box width.
pub fn annotate(bitmap: &Bitmap, records: &[TextRecord]) -> RgbaImage {
    let mut img = bitmap.as_image().clone();
    for record in records {
        draw_polygon(&mut img, &record.polygon, MARK_COLOR);
        draw_confidence_bar(&mut img, record, MARK_COLOR);
    }
    img
}

fn draw_polygon(img: &mut RgbaImage, polygon: &[Point; 4], color: Rgba<u8>) {
    for i in 0..polygon.len() {
        let from = polygon[i];
        let to = polygon[(i + 1) % polygon.len()];
        draw_line(img, from, to, color);
    }
}

/// Bresenham line, `LINE_WIDTH` pixels thick towards +x/+y.
fn draw_line(img: &mut RgbaImage, from: Point, to: Point, color: Rgba<u8>) {
    let (mut x, mut y) = (from.x, from.y);
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        for oy in 0..LINE_WIDTH {
            for ox in 0..LINE_WIDTH {
                put_clipped(img, x + ox, y + oy, color);
            }
        }
        if x == to.x && y == to.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn draw_confidence_bar(img: &mut RgbaImage, record: &TextRecord, color: Rgba<u8>) {
    let left = record.polygon.iter().map(|p| p.x).min().unwrap_or(0);
    let right = record.polygon.iter().map(|p| p.x).max().unwrap_or(0);
    let top = record.polygon.iter().map(|p| p.y).min().unwrap_or(0);

    let width = ((right - left) as f32 * record.confidence.clamp(0.0, 1.0)).round() as i32;
    for y in (top - BAR_HEIGHT)..top {
        for x in left..left + width.max(1) {
            put_clipped(img, x, y, color);
        }
    }
}

fn put_clipped(img: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKGROUND: Rgba<u8> = Rgba([20, 40, 60, 255]);

    fn record(left: i32, top: i32, right: i32, bottom: i32, confidence: f32) -> TextRecord {
        TextRecord {
            text: "word".to_string(),
            confidence,
            polygon: [
                Point { x: left, y: top },
                Point { x: right, y: top },
                Point { x: right, y: bottom },
                Point { x: left, y: bottom },
            ],
        }
    }

    #[test]
    fn test_outline_and_confidence_bar() {
        let bitmap = Bitmap::from_image(RgbaImage::from_pixel(40, 30, BACKGROUND));

        let img = annotate(&bitmap, &[record(10, 12, 30, 22, 0.5)]);

        // Edges, two pixels wide
        assert_eq!(*img.get_pixel(10, 12), MARK_COLOR);
        assert_eq!(*img.get_pixel(20, 13), MARK_COLOR);
        assert_eq!(*img.get_pixel(20, 22), MARK_COLOR);
        assert_eq!(*img.get_pixel(30, 17), MARK_COLOR);
        assert_eq!(*img.get_pixel(11, 17), MARK_COLOR);
        // Interior untouched
        assert_eq!(*img.get_pixel(20, 17), BACKGROUND);
        // Bar covers half the box width
        assert_eq!(*img.get_pixel(12, 8), MARK_COLOR);
        assert_eq!(*img.get_pixel(19, 8), MARK_COLOR);
        assert_eq!(*img.get_pixel(25, 8), BACKGROUND);
        // Source is not modified
        assert_eq!(*bitmap.as_image().get_pixel(10, 12), BACKGROUND);
    }

    #[test]
    fn test_boxes_at_the_border_are_clipped() {
        let bitmap = Bitmap::from_image(RgbaImage::from_pixel(10, 10, BACKGROUND));

        let img = annotate(&bitmap, &[record(-5, 0, 9, 9, 1.0)]);

        assert_eq!(img.dimensions(), (10, 10));
        assert_eq!(*img.get_pixel(0, 0), MARK_COLOR);
        assert_eq!(*img.get_pixel(9, 9), MARK_COLOR);
        assert_eq!(*img.get_pixel(4, 4), BACKGROUND);
    }

    #[test]
    fn test_no_records_is_a_plain_copy() {
        let bitmap = Bitmap::from_image(RgbaImage::from_pixel(8, 8, BACKGROUND));
        assert_eq!(&annotate(&bitmap, &[]), bitmap.as_image());
    }
}
