use crate::types::BBox;

use super::apertures::Aperture;

/// Bounding box of everything drawn during one pass.
#[derive(Debug, Default)]
pub struct Extents {
    bbox: BBox,
}

impl Extents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Widen to include (x, y) padded by the aperture's margin.
    pub fn update(&mut self, x: f64, y: f64, aperture: Option<&Aperture>) {
        let margin = aperture.map(Aperture::margin).unwrap_or(0.0);
        self.bbox.expand_with_margin(x, y, margin);
    }

    pub fn bbox(&self) -> BBox {
        self.bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_empty() {
        let ext = Extents::new();
        assert!(ext.bbox().is_empty());
        assert!(ext.bbox().valid().is_none());
    }

    #[test]
    fn test_circle_margin() {
        let mut ext = Extents::new();
        ext.update(1.0, 2.0, Some(&Aperture::Circle { diameter: 0.5 }));
        let b = ext.bbox();
        assert!((b.minx - 0.75).abs() < 1e-12);
        assert!((b.miny - 1.75).abs() < 1e-12);
        assert!((b.maxx - 1.25).abs() < 1e-12);
        assert!((b.maxy - 2.25).abs() < 1e-12);
    }

    #[test]
    fn test_rectangle_uses_larger_side() {
        let mut ext = Extents::new();
        ext.update(
            0.0,
            0.0,
            Some(&Aperture::Rectangle {
                width: 0.2,
                height: 1.0,
            }),
        );
        let b = ext.bbox();
        assert!((b.minx + 0.5).abs() < 1e-12);
        assert!((b.maxy - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_monotonic_widening() {
        // Pseudo-random walk with a small LCG; every update may only widen.
        let apertures = [
            Aperture::Circle { diameter: 0.3 },
            Aperture::Rectangle {
                width: 1.2,
                height: 0.4,
            },
            Aperture::MacroRef {
                name: "M".into(),
                params: vec![],
                scale: 1.0,
            },
        ];
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 33) as f64 / (1u64 << 31) as f64) * 200.0 - 100.0
        };

        let mut ext = Extents::new();
        let mut prev = ext.bbox();
        for k in 0..500 {
            let ap = if k % 4 == 3 {
                None
            } else {
                Some(&apertures[k % 3])
            };
            ext.update(next(), next(), ap);
            let b = ext.bbox();
            assert!(b.minx <= prev.minx);
            assert!(b.miny <= prev.miny);
            assert!(b.maxx >= prev.maxx);
            assert!(b.maxy >= prev.maxy);
            prev = b;
        }
    }
}
