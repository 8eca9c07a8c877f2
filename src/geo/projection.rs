use std::f64::consts::PI;

use super::{LatLng, LatLngBounds};

pub const TILE_SIZE: f64 = 256.0;
pub const MAX_LATITUDE: f64 = 85.051_128_779_8;
pub const MAX_ZOOM: u32 = 18;

/// Default view before the markers' bounds are known.
pub const DEFAULT_CENTER: LatLng = LatLng::new(47.582_660_1, -122.153_373_3);
pub const DEFAULT_ZOOM: f64 = 13.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Geographic to screen mapping owned by the hosting map.
pub trait MapProjection {
    fn lat_lng_to_layer_point(&self, coord: LatLng) -> ScreenPoint;
}

/// Spherical Web Mercator view (EPSG:3857) over 256px tiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    center: LatLng,
    zoom: f64,
    size: (f64, f64),
}

impl MapView {
    pub fn new(center: LatLng, zoom: f64, size: (f64, f64)) -> Self {
        Self { center, zoom, size }
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn size(&self) -> (f64, f64) {
        self.size
    }

    pub fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.center = center;
        self.zoom = zoom.clamp(0.0, MAX_ZOOM as f64);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(0.0, MAX_ZOOM as f64);
    }

    /// Move the view by a screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let center = project(self.center, self.zoom).offset(dx, dy);
        self.center = unproject(center, self.zoom);
    }

    /// Centre on `bounds` at the deepest integer zoom that still shows all of it.
    pub fn fit_bounds(&mut self, bounds: LatLngBounds) {
        let zoom = (0..=MAX_ZOOM)
            .rev()
            .map(f64::from)
            .find(|&zoom| {
                let nw = project(bounds.north_west(), zoom);
                let se = project(bounds.south_east(), zoom);
                se.x - nw.x <= self.size.0 && se.y - nw.y <= self.size.1
            })
            .unwrap_or(0.0);

        let nw = project(bounds.north_west(), zoom);
        let se = project(bounds.south_east(), zoom);
        let middle = ScreenPoint::new((nw.x + se.x) / 2.0, (nw.y + se.y) / 2.0);
        self.center = unproject(middle, zoom);
        self.zoom = zoom;
    }

    /// World pixel of the view's top-left corner.
    pub fn pixel_origin(&self) -> ScreenPoint {
        let center = project(self.center, self.zoom);
        ScreenPoint::new(
            (center.x - self.size.0 / 2.0).round(),
            (center.y - self.size.1 / 2.0).round(),
        )
    }
}

impl MapProjection for MapView {
    fn lat_lng_to_layer_point(&self, coord: LatLng) -> ScreenPoint {
        let point = project(coord, self.zoom);
        let origin = self.pixel_origin();
        ScreenPoint::new(point.x.round() - origin.x, point.y.round() - origin.y)
    }
}

fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Absolute world pixel of `coord` at `zoom`.
pub fn project(coord: LatLng, zoom: f64) -> ScreenPoint {
    let scale = world_size(zoom);
    let lat = coord.lat().clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = scale * (coord.lng() / 360.0 + 0.5);
    let y = scale * (0.5 - (PI / 4.0 + lat / 2.0).tan().ln() / (2.0 * PI));
    ScreenPoint::new(x, y)
}

pub fn unproject(point: ScreenPoint, zoom: f64) -> LatLng {
    let scale = world_size(zoom);
    let lng = (point.x / scale - 0.5) * 360.0;
    let n = PI * (1.0 - 2.0 * point.y / scale);
    let lat = (2.0 * n.exp().atan() - PI / 2.0).to_degrees();
    LatLng::new(lat, lng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equator_and_prime_meridian_sit_mid_world() {
        let point = project(LatLng::new(0.0, 0.0), 0.0);
        assert!((point.x - 128.0).abs() < 1e-9);
        assert!((point.y - 128.0).abs() < 1e-9);
    }

    #[test]
    fn unproject_inverts_project() {
        let coord = LatLng::new(18.54, -72.34);
        let back = unproject(project(coord, 11.0), 11.0);
        assert!((back.lat() - coord.lat()).abs() < 1e-9);
        assert!((back.lng() - coord.lng()).abs() < 1e-9);
    }

    #[test]
    fn center_projects_to_middle_of_view() {
        let view = MapView::new(DEFAULT_CENTER, DEFAULT_ZOOM, (500.0, 400.0));
        let point = view.lat_lng_to_layer_point(DEFAULT_CENTER);
        assert!((point.x - 250.0).abs() <= 1.0);
        assert!((point.y - 200.0).abs() <= 1.0);
    }

    #[test]
    fn panning_shifts_layer_points_against_the_pan() {
        let coord = LatLng::new(47.6, -122.1);
        let mut view = MapView::new(DEFAULT_CENTER, DEFAULT_ZOOM, (500.0, 400.0));
        let before = view.lat_lng_to_layer_point(coord);
        view.pan_by(100.0, -40.0);
        let after = view.lat_lng_to_layer_point(coord);
        assert!((before.x - after.x - 100.0).abs() <= 1.0);
        assert!((before.y - after.y + 40.0).abs() <= 1.0);
    }

    #[test]
    fn fit_bounds_keeps_every_corner_on_screen() {
        let bounds = LatLngBounds::from_points([
            LatLng::new(18.4, -72.5),
            LatLng::new(18.7, -72.1),
        ])
        .unwrap();
        let mut view = MapView::new(DEFAULT_CENTER, DEFAULT_ZOOM, (500.0, 400.0));
        view.fit_bounds(bounds);
        assert_eq!(view.zoom().fract(), 0.0);
        for corner in [bounds.north_west(), bounds.south_east()] {
            let p = view.lat_lng_to_layer_point(corner);
            assert!((0.0..=500.0).contains(&p.x), "{p:?}");
            assert!((0.0..=400.0).contains(&p.y), "{p:?}");
        }
        // one more zoom level would no longer fit
        let zoomed = project(bounds.south_east(), view.zoom() + 1.0).x
            - project(bounds.north_west(), view.zoom() + 1.0).x;
        let zoomed_y = project(bounds.south_east(), view.zoom() + 1.0).y
            - project(bounds.north_west(), view.zoom() + 1.0).y;
        assert!(zoomed > 500.0 || zoomed_y > 400.0);
    }
}
