//! Map rendering surface the engine publishes to.
//!
//! Strictly write-only from the engine's perspective: the engine pushes the
//! rider's path, the optional reference-route overlay and the camera region,
//! and never reads anything back. Long paths are thinned with Douglas-Peucker
//! before publishing so the render payload stays bounded; the session's own
//! path is never touched.

use geo::{algorithm::simplify::Simplify, Coord, LineString};

use crate::{GeoPoint, Region};

/// What the map should currently show for the session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct MapViewState {
    /// The rider's tracked path (possibly thinned for display).
    pub user_path: Vec<GeoPoint>,
    /// Reference route overlay, if the session is following one.
    pub reference_route: Option<Vec<GeoPoint>>,
    /// Camera region; `None` until the first fix arrives, meaning the host
    /// keeps whatever camera it has.
    pub region: Option<Region>,
}

/// Rendering sink implemented by the host map component.
pub trait MapSurface: Send {
    /// Render the current session overlay.
    fn render(&mut self, view: &MapViewState);
}

/// Thin a path for display: Douglas-Peucker, then uniform sampling if the
/// result is still above `max_points`. Endpoints are preserved.
pub fn thin_for_display(points: &[GeoPoint], tolerance: f64, max_points: usize) -> Vec<GeoPoint> {
    if points.len() <= max_points.max(2) {
        return points.to_vec();
    }

    let coords: Vec<Coord> = points
        .iter()
        .map(|p| Coord {
            x: p.longitude,
            y: p.latitude,
        })
        .collect();

    let simplified = LineString::new(coords).simplify(&tolerance);

    let final_coords: Vec<Coord> = if simplified.0.len() > max_points {
        let step = simplified.0.len() as f64 / max_points as f64;
        let mut sampled: Vec<Coord> = (0..max_points.saturating_sub(1))
            .map(|i| simplified.0[(i as f64 * step) as usize])
            .collect();
        if let Some(last) = simplified.0.last() {
            sampled.push(*last);
        }
        sampled
    } else {
        simplified.0
    };

    final_coords
        .iter()
        .map(|c| GeoPoint::new(c.y, c.x))
        .collect()
}
