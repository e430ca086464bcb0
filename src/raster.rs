//! Adaptive subdivision rasterizer for tensor-product Bezier patches
//!
//! Patches are split in half until every boundary curve advances less than a
//! pixel per step, then the top curve of each thin slice is walked and its
//! start point written directly. Corner colors are halved along with the
//! geometry, so color interpolation is bilinear in subdivision space.
use crate::{Color, ImageMut, Mesh, Point, Rgba, Scalar};

/// Largest squared step (in pixels) a curve may take before it is split.
/// Larger values leave holes, smaller take longer to render.
const MAX_BEZIER_STEP: Scalar = 2.0;

/// Hard cap on subdivision depth. Flatness alone terminates for any finite
/// patch; the cap bounds the stack for adversarial geometry.
const MAX_DEPTH: usize = 24;

/// Subdivision step count estimate, see cairo-mesh-pattern-rasterizer.c
fn bezier_steps_squared(points: &[Point; 4]) -> Scalar {
    let tmp0 = points[0].dist_squared(points[1]);
    let tmp1 = points[2].dist_squared(points[3]);
    let tmp2 = points[0].dist_squared(points[2]) * 0.25;
    let tmp3 = points[1].dist_squared(points[3]) * 0.25;
    tmp0.max(tmp1).max(tmp2.max(tmp3)) * 18.0
}

/// Split a cubic Bezier at `t = 1/2` with de Casteljau's method
fn split_bezier(points: &[Point; 4]) -> ([Point; 4], [Point; 4]) {
    let [p0, p1, p2, p3] = *points;
    let mid = (p1 + p2) / 2.0;
    let p01 = (p0 + p1) / 2.0;
    let p23 = (p2 + p3) / 2.0;
    let p02 = (mid + p01) / 2.0;
    let p13 = (mid + p23) / 2.0;
    let p03 = (p02 + p13) / 2.0;
    ([p0, p01, p02, p03], [p03, p13, p23, p3])
}

/// One boundary curve of a thin patch slice with the colors of its endpoints
struct Curve {
    nodes: [Point; 4],
    colors: [Color; 2],
}

impl Curve {
    /// Walk the curve, writing the start color at every subdivision point
    fn paint(&self, img: &mut impl ImageMut<Pixel = Rgba>, depth: usize) {
        if depth > 0 && bezier_steps_squared(&self.nodes) > MAX_BEZIER_STEP {
            let (nodes0, nodes1) = split_bezier(&self.nodes);
            let mid = self.colors[0].mid(self.colors[1]);
            Curve {
                nodes: nodes0,
                colors: [self.colors[0], mid],
            }
            .paint(img, depth - 1);
            Curve {
                nodes: nodes1,
                colors: [mid, self.colors[1]],
            }
            .paint(img, depth - 1);
        } else {
            let col = self.nodes[0].x().round();
            let row = self.nodes[0].y().round();
            if col >= 0.0 && row >= 0.0 {
                if let Some(pixel) = img.get_mut(row as usize, col as usize) {
                    *pixel = self.colors[0].to_rgba();
                }
            }
        }
    }
}

/// Tensor patch: 4x4 control points and 2x2 corner colors
///
/// `nodes[row][col]`, `nodes[0]` is the top edge, `colors[0]` the two top
/// corners.
struct Patch {
    nodes: [[Point; 4]; 4],
    colors: [[Color; 2]; 2],
}

impl Patch {
    /// Split horizontally into a top and a bottom patch
    fn split(&self) -> (Patch, Patch) {
        let mut nodes0 = [[Point::default(); 4]; 4];
        let mut nodes1 = [[Point::default(); 4]; 4];
        for i in 0..4 {
            let column = [
                self.nodes[0][i],
                self.nodes[1][i],
                self.nodes[2][i],
                self.nodes[3][i],
            ];
            let (top, bottom) = split_bezier(&column);
            for j in 0..4 {
                nodes0[j][i] = top[j];
                nodes1[j][i] = bottom[j];
            }
        }
        let mid = [
            self.colors[0][0].mid(self.colors[1][0]),
            self.colors[0][1].mid(self.colors[1][1]),
        ];
        (
            Patch {
                nodes: nodes0,
                colors: [self.colors[0], mid],
            },
            Patch {
                nodes: nodes1,
                colors: [mid, self.colors[1]],
            },
        )
    }

    fn paint(&self, img: &mut impl ImageMut<Pixel = Rgba>, depth: usize) {
        // corner-based rejection: the top-left and bottom-right corners of a
        // well-formed patch bound it closely enough for culling
        let width = img.width() as Scalar;
        let height = img.height() as Scalar;
        if self.nodes[3][3].x() < 0.0
            || self.nodes[0][0].x() > width
            || self.nodes[3][3].y() < 0.0
            || self.nodes[0][0].y() > height
        {
            return;
        }

        let too_coarse = (0..4).any(|i| {
            let column = [
                self.nodes[0][i],
                self.nodes[1][i],
                self.nodes[2][i],
                self.nodes[3][i],
            ];
            bezier_steps_squared(&column) > MAX_BEZIER_STEP
        });

        if too_coarse && depth > 0 {
            let (top, bottom) = self.split();
            top.paint(img, depth - 1);
            bottom.paint(img, depth - 1);
        } else {
            // the slice is at most a pixel tall, its top edge stands in for
            // the whole patch
            Curve {
                nodes: self.nodes[0],
                colors: self.colors[0],
            }
            .paint(img, MAX_DEPTH);
        }
    }
}

impl Mesh {
    /// Rasterize the mesh into an RGBA image
    ///
    /// Pixels covered by the mesh are overwritten, the rest of the buffer is
    /// untouched. Patches with non-finite geometry (already reported by
    /// `build`) are skipped.
    pub fn paint(&self, img: &mut impl ImageMut<Pixel = Rgba>) {
        for i in 0..self.rows() {
            for j in 0..self.cols() {
                if !self.patch_is_finite(i, j) {
                    continue;
                }
                let mut nodes = [[Point::default(); 4]; 4];
                for (row, nodes_row) in nodes.iter_mut().enumerate() {
                    for (col, node) in nodes_row.iter_mut().enumerate() {
                        *node = self.node(3 * i + row, 3 * j + col);
                    }
                }
                let patch = Patch {
                    nodes,
                    colors: [
                        [self.color(i, j), self.color(i, j + 1)],
                        [self.color(i + 1, j), self.color(i + 1, j + 1)],
                    ],
                };
                patch.paint(img, MAX_DEPTH);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::unit_mesh;
    use crate::{assert_approx_eq, BBox, Image, ImageOwned, Units};

    #[test]
    fn test_split_bezier() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(3.0, 0.0),
        ];
        let (left, right) = split_bezier(&points);
        // endpoints are preserved and the halves meet at the curve midpoint
        assert_eq!(left[0], points[0]);
        assert_eq!(right[3], points[3]);
        assert_eq!(left[3], right[0]);
        assert_approx_eq!(left[3].x(), 1.5);
        assert_approx_eq!(left[3].y(), 0.0);
    }

    #[test]
    fn test_steps_shrink_with_split() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(5.0, 10.0),
            Point::new(10.0, -10.0),
            Point::new(15.0, 0.0),
        ];
        let whole = bezier_steps_squared(&points);
        let (left, right) = split_bezier(&points);
        assert!(bezier_steps_squared(&left) < whole);
        assert!(bezier_steps_squared(&right) < whole);

        // sub-pixel segments do not split
        let short = [
            Point::new(0.0, 0.0),
            Point::new(0.1, 0.0),
            Point::new(0.2, 0.0),
            Point::new(0.3, 0.0),
        ];
        assert!(bezier_steps_squared(&short) <= MAX_BEZIER_STEP);
    }

    #[test]
    fn test_curve_paint_writes_start_color() {
        let mut img = ImageOwned::<Rgba>::new_default(4, 4);
        let curve = Curve {
            nodes: [Point::new(1.2, 2.4); 4],
            colors: [
                Color::new(10.0, 20.0, 30.0, 255.0),
                Color::new(200.0, 200.0, 200.0, 255.0),
            ],
        };
        curve.paint(&mut img, MAX_DEPTH);
        assert_eq!(img.get(2, 1), Some(&Rgba([10, 20, 30, 255])));
    }

    #[test]
    fn test_offscreen_patch_rejected() {
        let gradient = unit_mesh(["#ff0000"; 4]);
        let (mut mesh, errors) = gradient.build();
        assert!(errors.is_empty());
        // entirely to the left of the canvas
        mesh.translate(Point::new(-100.0, 0.0));

        let mut img = ImageOwned::<Rgba>::new_default(8, 8);
        mesh.paint(&mut img);
        assert!(img.data().iter().all(|pixel| *pixel == Rgba::default()));
    }

    #[test]
    fn test_paint_fills_solid_patch() {
        let gradient = unit_mesh(["#336699"; 4]);
        let (mut mesh, errors) = gradient.build();
        assert!(errors.is_empty());
        let errors = mesh.to_raster_space(
            Units::ObjectBoundingBox,
            None,
            BBox::new((0.0, 0.0), (10.0, 10.0)),
        );
        assert!(errors.is_empty());

        let mut img = ImageOwned::<Rgba>::new_default(10, 10);
        mesh.paint(&mut img);
        // uniform corner colors leave no seams, every pixel is covered
        for row in 0..10 {
            for col in 0..10 {
                assert_eq!(
                    img.get(row, col),
                    Some(&Rgba([0x33, 0x66, 0x99, 255])),
                    "hole at ({}, {})",
                    row,
                    col
                );
            }
        }
    }

    #[test]
    fn test_paint_gradient_corners() {
        // single patch in user space covering the whole 10x10 buffer
        let gradient = unit_mesh(["#000000", "#ff0000", "#00ff00", "#0000ff"]);
        let (mut mesh, errors) = gradient.build();
        assert!(errors.is_empty());
        mesh.scale(Point::new(10.0, 10.0));

        let mut img = ImageOwned::<Rgba>::new_default(10, 10);
        mesh.paint(&mut img);
        // subdivision stops with terminal steps wider than half a pixel, so
        // the only write landing on the top-left pixel is the exact corner
        // start point
        assert_eq!(img.get(0, 0), Some(&Rgba([0, 0, 0, 255])));
        // red increases left to right along the top edge
        let Rgba([r, ..]) = *img.get(0, 9).unwrap();
        assert!(r > 192, "top-right red channel {}", r);
        // every pixel is covered
        assert!(img.data().iter().all(|pixel| pixel.0[3] == 255));
    }

    #[test]
    fn test_paint_confined_to_mesh_bbox() {
        let gradient = unit_mesh(["#ffffff"; 4]);
        let (mut mesh, _) = gradient.build();
        mesh.scale(Point::new(10.0, 10.0));

        let mut img = ImageOwned::<Rgba>::new_default(20, 20);
        mesh.paint(&mut img);
        // the mesh occupies [0, 10]^2, rounding can reach index 10 but no
        // further
        for row in 0..20 {
            for col in 0..20 {
                if row > 10 || col > 10 {
                    assert_eq!(img.get(row, col), Some(&Rgba::default()));
                }
            }
        }
        assert_eq!(img.get(5, 5), Some(&Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn test_degenerate_patch_skipped() {
        let mut gradient = unit_mesh(["#ff0000"; 4]);
        gradient.rows[0].patches[0].stops[1].path = Some("l 1e400,0".to_string());
        let (mesh, _) = gradient.build();

        let mut img = ImageOwned::<Rgba>::new_default(8, 8);
        mesh.paint(&mut img);
        assert!(img.data().iter().all(|pixel| *pixel == Rgba::default()));
    }
}
