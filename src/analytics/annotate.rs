use image::{Rgb, RgbImage};

use super::geometry::{Point, Polygon};

const OUTLINE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Draws each polygon as a closed outline. Points outside the image are clipped.
pub fn draw_regions(image: &mut RgbImage, regions: &[Polygon], thickness: u32) {
    for region in regions {
        let points = region.points();
        match points.len() {
            0 => {}
            1 => stamp(image, points[0], thickness),
            _ => {
                let next = points.iter().cycle().skip(1);
                for (&a, &b) in points.iter().zip(next) {
                    if let Some((a, b)) = clip_segment(image, a, b, thickness) {
                        draw_line(image, a, b, thickness);
                    }
                }
            }
        }
    }
}

const INSIDE: u8 = 0;
const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const BOTTOM: u8 = 4;
const TOP: u8 = 8;

/// Cohen-Sutherland clip against the image grown by the stroke width, so the
/// line walk never leaves the area a stamp can reach.
fn clip_segment(
    image: &RgbImage,
    from: Point,
    to: Point,
    thickness: u32,
) -> Option<(Point, Point)> {
    let margin = thickness.max(1) as f64;
    let (xmin, ymin) = (-margin, -margin);
    let xmax = image.width() as f64 - 1.0 + margin;
    let ymax = image.height() as f64 - 1.0 + margin;

    let outcode = |x: f64, y: f64| {
        let mut code = INSIDE;
        if x < xmin {
            code |= LEFT;
        } else if x > xmax {
            code |= RIGHT;
        }
        if y < ymin {
            code |= TOP;
        } else if y > ymax {
            code |= BOTTOM;
        }
        code
    };

    let (mut x0, mut y0) = (from.x as f64, from.y as f64);
    let (mut x1, mut y1) = (to.x as f64, to.y as f64);
    let mut code0 = outcode(x0, y0);
    let mut code1 = outcode(x1, y1);

    loop {
        if code0 | code1 == INSIDE {
            break;
        }
        if code0 & code1 != INSIDE {
            return None;
        }

        let out = if code0 != INSIDE { code0 } else { code1 };
        let (x, y) = if out & TOP != 0 {
            (x0 + (x1 - x0) * (ymin - y0) / (y1 - y0), ymin)
        } else if out & BOTTOM != 0 {
            (x0 + (x1 - x0) * (ymax - y0) / (y1 - y0), ymax)
        } else if out & RIGHT != 0 {
            (xmax, y0 + (y1 - y0) * (xmax - x0) / (x1 - x0))
        } else {
            (xmin, y0 + (y1 - y0) * (xmin - x0) / (x1 - x0))
        };

        if out == code0 {
            (x0, y0) = (x, y);
            code0 = outcode(x0, y0);
        } else {
            (x1, y1) = (x, y);
            code1 = outcode(x1, y1);
        }
    }

    Some((
        Point::new(x0.round() as i32, y0.round() as i32),
        Point::new(x1.round() as i32, y1.round() as i32),
    ))
}

// Bresenham
fn draw_line(image: &mut RgbImage, from: Point, to: Point, thickness: u32) {
    let (mut x, mut y) = (from.x as i64, from.y as i64);
    let (x1, y1) = (to.x as i64, to.y as i64);
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        stamp(image, Point::new(x as i32, y as i32), thickness);
        if x == x1 && y == y1 {
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

fn stamp(image: &mut RgbImage, center: Point, thickness: u32) {
    let radius = (thickness.max(1) as i64 - 1) / 2;
    let extra = (thickness.max(1) as i64 - 1) % 2;
    let (width, height) = (image.width() as i64, image.height() as i64);

    for py in (center.y as i64 - radius)..=(center.y as i64 + radius + extra) {
        if py < 0 || py >= height {
            continue;
        }
        for px in (center.x as i64 - radius)..=(center.x as i64 + radius + extra) {
            if px < 0 || px >= width {
                continue;
            }
            image.put_pixel(px as u32, py as u32, OUTLINE_COLOR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outline_drawn_inside_untouched() {
        let mut image = RgbImage::new(20, 20);
        draw_regions(&mut image, &[Polygon::rectangle(2, 2, 12, 12)], 1);

        assert_eq!(image.get_pixel(2, 2), &OUTLINE_COLOR);
        assert_eq!(image.get_pixel(7, 2), &OUTLINE_COLOR);
        assert_eq!(image.get_pixel(12, 7), &OUTLINE_COLOR);
        assert_eq!(image.get_pixel(2, 12), &OUTLINE_COLOR);
        assert_eq!(image.get_pixel(7, 7), &Rgb([0, 0, 0]));
        assert_eq!(image.get_pixel(15, 15), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_out_of_bounds_regions_are_clipped() {
        let mut image = RgbImage::new(10, 10);
        draw_regions(&mut image, &[Polygon::rectangle(-5, -5, 50, 50)], 3);
        draw_regions(&mut image, &[Polygon::default()], 2);

        assert_eq!(image.get_pixel(5, 5), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_huge_regions_draw_quickly() {
        let mut image = RgbImage::new(64, 48);
        let start = std::time::Instant::now();
        draw_regions(
            &mut image,
            &[
                Polygon::rectangle(-200_000_000, -200_000_000, 200_000_000, 200_000_000),
                Polygon::new(vec![
                    Point::new(i32::MIN, i32::MIN),
                    Point::new(i32::MAX, i32::MAX),
                    Point::new(i32::MIN, i32::MAX),
                ]),
            ],
            2,
        );
        assert!(start.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_crossing_edge_is_clipped_not_dropped() {
        let mut image = RgbImage::new(20, 20);
        // horizontal edge at y = 10 running far past both sides
        draw_regions(
            &mut image,
            &[Polygon::new(vec![
                Point::new(-1_000_000, 10),
                Point::new(1_000_000, 10),
            ])],
            1,
        );

        assert_eq!(image.get_pixel(0, 10), &OUTLINE_COLOR);
        assert_eq!(image.get_pixel(19, 10), &OUTLINE_COLOR);
        assert_eq!(image.get_pixel(10, 5), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_thickness_widens_outline() {
        let mut image = RgbImage::new(20, 20);
        draw_regions(&mut image, &[Polygon::rectangle(5, 5, 15, 15)], 3);

        assert_eq!(image.get_pixel(10, 4), &OUTLINE_COLOR);
        assert_eq!(image.get_pixel(10, 6), &OUTLINE_COLOR);
        assert_eq!(image.get_pixel(10, 8), &Rgb([0, 0, 0]));
    }
}
