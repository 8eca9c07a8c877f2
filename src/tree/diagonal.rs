use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use super::layout::LayoutPoint;

/// Converts a parent/child pair of layout points into an SVG path.
///
/// A diagonal is a projection from layout space to drawing space plus a way to
/// join the three projected corner points `source`, elbow and `target`.
pub trait Diagonal: Debug {
    fn project(&self, point: LayoutPoint) -> (f64, f64);

    fn render(&self, src: (f64, f64), mid: (f64, f64), dst: (f64, f64)) -> String;

    /// Offset of the drawing origin inside a `width` x `height` canvas.
    fn origin(&self, _width: f64, _height: f64) -> (f64, f64) {
        (20.0, 20.0)
    }

    fn path(&self, source: LayoutPoint, target: LayoutPoint) -> String {
        let elbow = LayoutPoint::new(target.x, source.y);
        self.render(
            self.project(source),
            self.project(elbow),
            self.project(target),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagonalKind {
    #[default]
    RightAngle,
    Radial,
}

impl DiagonalKind {
    pub fn build(self) -> Box<dyn Diagonal> {
        match self {
            DiagonalKind::RightAngle => Box::new(RightAngleDiagonal),
            DiagonalKind::Radial => Box::new(RadialRightAngleDiagonal),
        }
    }
}

/// Elbow connector on a left-to-right dendrogram: `[y, x]` projection.
#[derive(Debug, Clone, Copy, Default)]
pub struct RightAngleDiagonal;

impl Diagonal for RightAngleDiagonal {
    fn project(&self, point: LayoutPoint) -> (f64, f64) {
        (point.y, point.x)
    }

    fn render(&self, src: (f64, f64), mid: (f64, f64), dst: (f64, f64)) -> String {
        format!("M{} {} {}", fmt_point(src), fmt_point(mid), fmt_point(dst))
    }
}

/// Radial variant: `x` is an angle in degrees (0 at the top), `y` the radius.
/// Draws an arc along the parent's radius followed by a radial line.
#[derive(Debug, Clone, Copy, Default)]
pub struct RadialRightAngleDiagonal;

impl Diagonal for RadialRightAngleDiagonal {
    fn project(&self, point: LayoutPoint) -> (f64, f64) {
        let radius = point.y;
        let angle = (point.x - 90.0) / 180.0 * PI;
        (radius * angle.cos(), radius * angle.sin())
    }

    fn render(&self, src: (f64, f64), mid: (f64, f64), dst: (f64, f64)) -> String {
        let radius = src.0.hypot(src.1);
        let sweep = if arc_is_clockwise(src, mid, radius) { 0 } else { 1 };
        format!(
            "M{} A{},{} 0 0,{} {}L{}",
            fmt_point(src),
            fmt_number(radius),
            fmt_number(radius),
            sweep,
            fmt_point(mid),
            fmt_point(dst)
        )
    }

    fn origin(&self, width: f64, height: f64) -> (f64, f64) {
        (width / 2.0, height / 2.0)
    }
}

/// Direction of the arc from `src` to `mid` around the origin. When the two
/// angles lie more than half a turn apart the arc wraps through 0/2π and the
/// comparison flips.
pub fn arc_is_clockwise(src: (f64, f64), mid: (f64, f64), radius: f64) -> bool {
    let src_angle = coordinate_to_angle(src, radius);
    let mid_angle = coordinate_to_angle(mid, radius);
    if (mid_angle - src_angle).abs() > PI {
        mid_angle <= src_angle
    } else {
        mid_angle > src_angle
    }
}

/// Angle in `[0, 2π)` of a point on a circle of `radius` centred at the origin,
/// increasing clockwise. Zero or non-finite radii yield 0.
pub fn coordinate_to_angle(coord: (f64, f64), radius: f64) -> f64 {
    if radius == 0.0 || !radius.is_finite() {
        return 0.0;
    }

    let base = (coord.1 / radius).clamp(-1.0, 1.0).asin().abs();
    let angle = match (coord.0 >= 0.0, coord.1 >= 0.0) {
        (true, true) => FRAC_PI_2 - base,
        (true, false) => FRAC_PI_2 + base,
        (false, false) => 3.0 * FRAC_PI_2 - base,
        (false, true) => 3.0 * FRAC_PI_2 + base,
    };

    if angle.is_finite() {
        angle
    } else {
        0.0
    }
}

/// Shortest round-trip decimal form; integral values print without a fraction
/// and negative zero prints as `0`.
pub fn fmt_number(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        "0".to_string()
    } else {
        format!("{value}")
    }
}

pub fn fmt_point(point: (f64, f64)) -> String {
    format!("{},{}", fmt_number(point.0), fmt_number(point.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn right_angle_path_turns_at_parent_depth() {
        let path = RightAngleDiagonal.path(LayoutPoint::new(40.0, 0.0), LayoutPoint::new(10.0, 50.5));
        assert_eq!(path, "M0,40 0,10 50.5,10");
    }

    #[test]
    fn zero_length_link_collapses_to_a_point() {
        let p = LayoutPoint::new(12.0, 30.0);
        assert_eq!(RightAngleDiagonal.path(p, p), "M30,12 30,12 30,12");
    }

    #[test]
    fn angles_follow_each_quadrant() {
        let r = 10.0;
        assert!((coordinate_to_angle((0.0, 10.0), r) - 0.0).abs() < 1e-12);
        assert!((coordinate_to_angle((10.0, 0.0), r) - FRAC_PI_2).abs() < 1e-12);
        assert!((coordinate_to_angle((0.0, -10.0), r) - PI).abs() < 1e-12);
        assert!((coordinate_to_angle((-10.0, -0.0001), r) - 3.0 * FRAC_PI_2).abs() < 1e-4);
        let diag = 10.0 / 2f64.sqrt();
        assert!((coordinate_to_angle((-diag, diag), r) - 7.0 * PI / 4.0).abs() < 1e-12);
        assert!((coordinate_to_angle((diag, -diag), r) - 3.0 * PI / 4.0).abs() < 1e-12);
    }

    #[test]
    fn zero_radius_angle_is_zero() {
        assert_eq!(coordinate_to_angle((0.0, 0.0), 0.0), 0.0);
        assert_eq!(coordinate_to_angle((1.0, 1.0), f64::NAN), 0.0);
    }

    #[test]
    fn radial_sweep_flips_across_the_wrap_point() {
        // layout angles 181 and 179 degrees sit on either side of the 0/2π seam
        let src = RadialRightAngleDiagonal.project(LayoutPoint::new(181.0, 100.0));
        let mid = RadialRightAngleDiagonal.project(LayoutPoint::new(179.0, 100.0));
        let src_angle = coordinate_to_angle(src, 100.0);
        let mid_angle = coordinate_to_angle(mid, 100.0);
        assert!(src_angle > 1.5 * PI);
        assert!(mid_angle < 0.5 * PI);
        assert!((mid_angle - src_angle).abs() > PI);
        assert!(arc_is_clockwise(src, mid, 100.0));

        let path = RadialRightAngleDiagonal.path(
            LayoutPoint::new(181.0, 100.0),
            LayoutPoint::new(179.0, 150.0),
        );
        assert!(path.contains(" 0 0,0 "), "{path}");

        // the mirrored pair crosses the seam the other way
        let path = RadialRightAngleDiagonal.path(
            LayoutPoint::new(179.0, 100.0),
            LayoutPoint::new(181.0, 150.0),
        );
        assert!(path.contains(" 0 0,1 "), "{path}");
    }

    #[test]
    fn radial_sweep_without_wrap_compares_directly() {
        let src = RadialRightAngleDiagonal.project(LayoutPoint::new(90.0, 50.0));
        let mid = RadialRightAngleDiagonal.project(LayoutPoint::new(45.0, 50.0));
        assert!(coordinate_to_angle(mid, 50.0) > coordinate_to_angle(src, 50.0));
        assert!(arc_is_clockwise(src, mid, 50.0));
    }

    #[test]
    fn radial_path_from_the_root_has_no_nan() {
        let path = RadialRightAngleDiagonal.path(LayoutPoint::new(0.0, 0.0), LayoutPoint::new(120.0, 30.0));
        assert!(!path.contains("NaN"), "{path}");
        assert!(path.starts_with("M0,0 A0,0 0 0,1 0,0L"), "{path}");
    }

    #[test]
    fn formats_numbers_like_svg_attributes() {
        assert_eq!(fmt_number(-0.0), "0");
        assert_eq!(fmt_number(10.0), "10");
        assert_eq!(fmt_number(2.5), "2.5");
        assert_eq!(fmt_point((1.0, -3.25)), "1,-3.25");
    }
}
