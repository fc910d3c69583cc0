//! Lambert conformal conic (two standard parallels) on the GRS80 ellipsoid.

use std::f64::consts::FRAC_PI_2;
use std::f64::consts::FRAC_PI_4;

const GRS80_A: f64 = 6_378_137.0;
const GRS80_INV_F: f64 = 298.257_222_101;

/// Convergence tolerance for the inverse latitude iteration, in radians
const PHI_TOLERANCE: f64 = 1e-12;
const MAX_ITERATIONS: usize = 16;

/// Projection constants derived once from the defining parameters.
#[derive(Debug, Clone, Copy)]
pub struct LambertConic {
    e: f64,
    n: f64,
    af: f64,
    rho0: f64,
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl LambertConic {
    /// Build a projection from standard parallels, origin and false origin (degrees, meters).
    pub fn new(lat1: f64, lat2: f64, lat0: f64, lon0: f64, false_easting: f64, false_northing: f64) -> Self {
        let f = 1.0 / GRS80_INV_F;
        let e = (2.0 * f - f * f).sqrt();

        let (phi1, phi2, phi0) = (lat1.to_radians(), lat2.to_radians(), lat0.to_radians());
        let (m1, m2) = (m(e, phi1), m(e, phi2));
        let (t1, t2, t0) = (t(e, phi1), t(e, phi2), t(e, phi0));

        let n = (m1.ln() - m2.ln()) / (t1.ln() - t2.ln());
        let big_f = m1 / (n * t1.powf(n));
        let af = GRS80_A * big_f;

        Self {
            e,
            n,
            af,
            rho0: af * t0.powf(n),
            lon0: lon0.to_radians(),
            false_easting,
            false_northing,
        }
    }

    /// NAD83 / Québec Lambert (EPSG:32198)
    pub fn quebec() -> Self {
        Self::new(60.0, 46.0, 44.0, -68.5, 0.0, 0.0)
    }

    /// Geographic (lon, lat) in degrees to projected (x, y) in meters
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let rho = self.af * t(self.e, lat.to_radians()).powf(self.n);
        let theta = self.n * (lon.to_radians() - self.lon0);
        (
            self.false_easting + rho * theta.sin(),
            self.false_northing + self.rho0 - rho * theta.cos(),
        )
    }

    /// Projected (x, y) in meters to geographic (lon, lat) in degrees
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.false_easting;
        let dy = self.rho0 - (y - self.false_northing);
        let sign = self.n.signum();

        let rho = sign * dx.hypot(dy);
        let theta = (sign * dx).atan2(sign * dy);
        let t_prime = (rho / self.af).powf(1.0 / self.n);

        let half_e = self.e / 2.0;
        let mut phi = FRAC_PI_2 - 2.0 * t_prime.atan();
        for _ in 0..MAX_ITERATIONS {
            let es = self.e * phi.sin();
            let next = FRAC_PI_2 - 2.0 * (t_prime * ((1.0 - es) / (1.0 + es)).powf(half_e)).atan();
            let converged = (next - phi).abs() < PHI_TOLERANCE;
            phi = next;
            if converged {
                break;
            }
        }

        ((theta / self.n + self.lon0).to_degrees(), phi.to_degrees())
    }
}

fn m(e: f64, phi: f64) -> f64 {
    let es = e * phi.sin();
    phi.cos() / (1.0 - es * es).sqrt()
}

fn t(e: f64, phi: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_origin_maps_to_false_origin() {
        let proj = LambertConic::quebec();
        let (x, y) = proj.forward(-68.5, 44.0);
        assert_abs_diff_eq!(x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_quebec_city_round_trip() {
        let proj = LambertConic::quebec();
        let (x, y) = proj.forward(-71.2080, 46.8139);
        // West of the central meridian and north of the origin latitude
        assert!(x < 0.0);
        assert!(y > 300_000.0);

        let (lon, lat) = proj.inverse(x, y);
        assert_abs_diff_eq!(lon, -71.2080, epsilon = 1e-9);
        assert_abs_diff_eq!(lat, 46.8139, epsilon = 1e-9);
    }

    #[test]
    fn test_meridian_distance_is_roughly_one_degree() {
        let proj = LambertConic::quebec();
        let (_, y1) = proj.forward(-68.5, 46.0);
        let (_, y2) = proj.forward(-68.5, 47.0);
        // One degree of latitude is ~111 km; scale factor stays close to 1 between the parallels
        assert_abs_diff_eq!(y2 - y1, 111_000.0, epsilon = 1_500.0);
    }
}
