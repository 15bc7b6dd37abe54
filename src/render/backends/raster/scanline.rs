//! Scanline conversion for the raster backend.
//!
//! Shapes are sampled at pixel centres and emitted as horizontal spans
//! `(y, x0, x1)`, half-open in `x`. Callers pass the clip box so rows outside
//! of it are never visited.

use super::surface::{edge, PixelBox};
use crate::geometry::{Point, Rect};

/// Fills a polygon using the even-odd rule. Winding order does not matter.
pub fn fill_polygon(points: &[Point], clip: &PixelBox, mut span: impl FnMut(i32, i32, i32)) {
    if points.len() < 3 || points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return;
    }

    let (min_y, max_y) = points
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
    let y0 = edge(min_y).max(clip.y0);
    let y1 = edge(max_y).min(clip.y1);

    let mut xs: Vec<f32> = Vec::with_capacity(points.len());
    for y in y0..y1 {
        let yc = y as f32 + 0.5;

        xs.clear();
        for (i, a) in points.iter().enumerate() {
            let b = points[(i + 1) % points.len()];
            if (a.y <= yc) != (b.y <= yc) {
                let t = (yc - a.y) / (b.y - a.y);
                xs.push(a.x + t * (b.x - a.x));
            }
        }
        xs.sort_by(|a, b| a.total_cmp(b));

        for pair in xs.chunks_exact(2) {
            let x0 = edge(pair[0]).max(clip.x0);
            let x1 = edge(pair[1]).min(clip.x1);
            if x0 < x1 {
                span(y, x0, x1);
            }
        }
    }
}

/// Fills a pie slice of the ellipse inscribed in `rect`.
///
/// Angles are in degrees, counter-clockwise from three o'clock with y pointing
/// up, like X11 arcs. A sweep of 360 degrees or more fills the whole ellipse.
pub fn fill_arc(rect: &Rect, start: f32, sweep: f32, clip: &PixelBox, mut span: impl FnMut(i32, i32, i32)) {
    if rect.is_empty() || sweep == 0.0 || !start.is_finite() || !sweep.is_finite() {
        return;
    }

    let rx = rect.w / 2.0;
    let ry = rect.h / 2.0;
    let cx = rect.x + rx;
    let cy = rect.y + ry;

    let full = sweep.abs() >= 360.0;
    let (from, len) = if sweep < 0.0 { (start + sweep, -sweep) } else { (start, sweep) };

    let y0 = edge(rect.y).max(clip.y0);
    let y1 = edge(rect.bottom()).min(clip.y1);
    for y in y0..y1 {
        let yc = y as f32 + 0.5;
        let dy = (yc - cy) / ry;
        let k = 1.0 - dy * dy;
        if k <= 0.0 {
            continue;
        }

        let half = rx * k.sqrt();
        let xa = edge(cx - half).max(clip.x0);
        let xb = edge(cx + half).min(clip.x1);
        if xa >= xb {
            continue;
        }
        if full {
            span(y, xa, xb);
            continue;
        }

        let mut run: Option<i32> = None;
        for x in xa..xb {
            let angle = (cy - yc).atan2(x as f32 + 0.5 - cx).to_degrees();
            let inside = (angle - from).rem_euclid(360.0) <= len;
            match (inside, run) {
                (true, None) => run = Some(x),
                (false, Some(s)) => {
                    span(y, s, x);
                    run = None;
                }
                _ => {}
            }
        }
        if let Some(s) = run {
            span(y, s, xb);
        }
    }
}

/// Visits the pixels of a one pixel wide line (Bresenham).
///
/// The segment is cut to the clip box first, so the walk never leaves it by
/// more than a pixel however far away the endpoints are.
pub fn line(from: Point, to: Point, clip: &PixelBox, mut plot: impl FnMut(i32, i32)) {
    if !(from.x.is_finite() && from.y.is_finite() && to.x.is_finite() && to.y.is_finite()) {
        return;
    }
    let Some(((ax, ay), (bx, by))) = clip_segment(from, to, clip) else {
        return;
    };

    let (mut x0, mut y0) = (ax.floor() as i32, ay.floor() as i32);
    let (x1, y1) = (bx.floor() as i32, by.floor() as i32);

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if clip.contains(x0, y0) {
            plot(x0, y0);
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Liang-Barsky clip of `from..to` against the closed box `[x0, x1] x [y0, y1]`.
///
/// Works in `f64` so the difference of two far apart `f32` endpoints stays finite.
fn clip_segment(from: Point, to: Point, clip: &PixelBox) -> Option<((f64, f64), (f64, f64))> {
    let (fx, fy) = (from.x as f64, from.y as f64);
    let (dx, dy) = (to.x as f64 - fx, to.y as f64 - fy);

    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    let sides = [
        (-dx, fx - clip.x0 as f64),
        (dx, clip.x1 as f64 - fx),
        (-dy, fy - clip.y0 as f64),
        (dy, clip.y1 as f64 - fy),
    ];
    for (p, q) in sides {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    Some(((fx + t0 * dx, fy + t0 * dy), (fx + t1 * dx, fy + t1 * dy)))
}

/// Approximates a cubic Bézier with a polyline, endpoints included.
pub fn flatten_cubic(from: Point, ctrl: [Point; 2], to: Point) -> Vec<Point> {
    let hull = distance(from, ctrl[0]) + distance(ctrl[0], ctrl[1]) + distance(ctrl[1], to);
    let segments = if hull.is_finite() { ((hull / 8.0).ceil() as usize).clamp(4, 64) } else { 4 };

    (0..=segments)
        .map(|i| {
            let t = i as f32 / segments as f32;
            let u = 1.0 - t;
            let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
            Point::new(
                a * from.x + b * ctrl[0].x + c * ctrl[1].x + d * to.x,
                a * from.y + b * ctrl[0].y + c * ctrl[1].y + d * to.y,
            )
        })
        .collect()
}

fn distance(a: Point, b: Point) -> f32 {
    (b.x - a.x).hypot(b.y - a.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: PixelBox = PixelBox {
        x0: 0,
        y0: 0,
        x1: 64,
        y1: 64,
    };

    fn collect_polygon(points: &[Point], clip: &PixelBox) -> Vec<(i32, i32, i32)> {
        let mut spans = Vec::new();
        fill_polygon(points, clip, |y, a, b| spans.push((y, a, b)));
        spans
    }

    #[test]
    fn axis_aligned_square_covers_exact_pixels() {
        let square = [
            Point::new(2.0, 2.0),
            Point::new(6.0, 2.0),
            Point::new(6.0, 6.0),
            Point::new(2.0, 6.0),
        ];
        let spans = collect_polygon(&square, &ALL);
        assert_eq!(spans, vec![(2, 2, 6), (3, 2, 6), (4, 2, 6), (5, 2, 6)]);
    }

    #[test]
    fn winding_order_does_not_matter() {
        let cw = [Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(0.0, 10.0)];
        let ccw = [cw[0], cw[2], cw[1]];
        assert_eq!(collect_polygon(&cw, &ALL), collect_polygon(&ccw, &ALL));
        assert!(!collect_polygon(&cw, &ALL).is_empty());
    }

    #[test]
    fn polygon_is_clipped() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let clip = PixelBox { x0: 3, y0: 4, x1: 5, y1: 6 };
        assert_eq!(collect_polygon(&square, &clip), vec![(4, 3, 5), (5, 3, 5)]);
    }

    #[test]
    fn full_arc_is_symmetric_ellipse() {
        let mut spans = Vec::new();
        fill_arc(&Rect::new(0.0, 0.0, 10.0, 10.0), 0.0, 360.0, &ALL, |y, a, b| spans.push((y, a, b)));

        assert_eq!(spans.len(), 10);
        for (y, a, b) in &spans {
            assert_eq!(*a, 10 - *b, "row {y} not symmetric");
        }
        assert!(spans.contains(&(5, 0, 10)));
    }

    #[test]
    fn quarter_arc_stays_in_its_quadrant() {
        // Top left quarter of a circle centred at (10, 10).
        let mut spans = Vec::new();
        fill_arc(&Rect::new(0.0, 0.0, 20.0, 20.0), 90.0, 90.0, &ALL, |y, a, b| spans.push((y, a, b)));

        assert!(!spans.is_empty());
        for (y, _, b) in spans {
            assert!(y < 10);
            assert!(b <= 10);
        }
    }

    #[test]
    fn negative_sweep_matches_positive() {
        let rect = Rect::new(0.0, 0.0, 20.0, 20.0);
        let mut a = Vec::new();
        let mut b = Vec::new();
        fill_arc(&rect, 0.0, 90.0, &ALL, |y, x0, x1| a.push((y, x0, x1)));
        fill_arc(&rect, 90.0, -90.0, &ALL, |y, x0, x1| b.push((y, x0, x1)));
        assert_eq!(a, b);
    }

    #[test]
    fn line_includes_both_endpoints() {
        let mut pixels = Vec::new();
        line(Point::new(1.0, 1.0), Point::new(5.0, 3.0), &ALL, |x, y| pixels.push((x, y)));
        assert_eq!(pixels.first(), Some(&(1, 1)));
        assert_eq!(pixels.last(), Some(&(5, 3)));
        assert_eq!(pixels.len(), 5);
    }

    #[test]
    fn line_outside_clip_plots_nothing() {
        let mut pixels = Vec::new();
        let clip = PixelBox { x0: 10, y0: 10, x1: 20, y1: 20 };
        line(Point::new(0.0, 0.0), Point::new(5.0, 5.0), &clip, |x, y| pixels.push((x, y)));
        assert!(pixels.is_empty());
    }

    #[test]
    fn far_away_endpoints_are_cut_to_the_clip() {
        let mut pixels = Vec::new();
        line(Point::new(-3.0e9, 5.0), Point::new(3.0e9, 5.0), &ALL, |x, y| pixels.push((x, y)));
        assert_eq!(pixels.len(), 64);
        assert_eq!(pixels.first(), Some(&(0, 5)));
        assert_eq!(pixels.last(), Some(&(63, 5)));

        pixels.clear();
        line(Point::new(10.0, -3.0e9), Point::new(10.0, 3.0e9), &ALL, |x, y| pixels.push((x, y)));
        assert_eq!(pixels.len(), 64);
        assert!(pixels.iter().all(|(x, _)| *x == 10));

        pixels.clear();
        line(Point::new(3.0e9, 3.0e9), Point::new(4.0e9, -1.0e9), &ALL, |x, y| pixels.push((x, y)));
        assert!(pixels.is_empty());
    }

    #[test]
    fn flattened_curve_keeps_endpoints() {
        let from = Point::new(0.0, 0.0);
        let to = Point::new(30.0, 0.0);
        let points = flatten_cubic(from, [Point::new(10.0, 20.0), Point::new(20.0, 20.0)], to);

        assert_eq!(points.first(), Some(&from));
        assert_eq!(points.last(), Some(&to));
        assert!(points.len() >= 5);
        assert!(points.iter().all(|p| p.y >= 0.0 && p.y <= 20.0));
    }
}
