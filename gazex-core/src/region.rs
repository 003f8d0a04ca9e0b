use serde::{Deserialize, Serialize};

/// Screen position in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Point a fraction `t` of the way from `self` to `other`.
    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// Geometry of an area of interest. Membership is inclusive of the border.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Rectangle {
        center: Point,
        half_width: f64,
        half_height: f64,
    },
    Ellipse {
        center: Point,
        radius_x: f64,
        radius_y: f64,
    },
    /// Points of `inner` that are not in `outer`, e.g. a face without the eyes.
    Difference {
        inner: Box<Shape>,
        outer: Box<Shape>,
    },
}

impl Shape {
    pub fn center(&self) -> Point {
        match self {
            Shape::Rectangle { center, .. } | Shape::Ellipse { center, .. } => *center,
            Shape::Difference { inner, .. } => inner.center(),
        }
    }

    /// Half width and half height of the bounding box.
    pub fn half_extents(&self) -> (f64, f64) {
        match self {
            Shape::Rectangle {
                half_width,
                half_height,
                ..
            } => (*half_width, *half_height),
            Shape::Ellipse {
                radius_x, radius_y, ..
            } => (*radius_x, *radius_y),
            Shape::Difference { inner, .. } => inner.half_extents(),
        }
    }

    pub fn contains(&self, p: &Point) -> bool {
        match self {
            Shape::Rectangle {
                center,
                half_width,
                half_height,
            } => (p.x - center.x).abs() <= *half_width && (p.y - center.y).abs() <= *half_height,
            Shape::Ellipse {
                center,
                radius_x,
                radius_y,
            } => {
                if *radius_x <= 0.0 || *radius_y <= 0.0 {
                    return false;
                }
                let dx = (p.x - center.x) / radius_x;
                let dy = (p.y - center.y) / radius_y;
                dx * dx + dy * dy <= 1.0
            }
            Shape::Difference { inner, outer } => inner.contains(p) && !outer.contains(p),
        }
    }

    /// Distance from `p` to the shape's center.
    pub fn distance(&self, p: &Point) -> f64 {
        self.center().distance(p)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    #[serde(flatten)]
    pub shape: Shape,
}

impl Region {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }

    pub fn center(&self) -> Point {
        self.shape.center()
    }

    pub fn contains(&self, p: &Point) -> bool {
        self.shape.contains(p)
    }

    pub fn distance(&self, p: &Point) -> f64 {
        self.shape.distance(p)
    }

    /// Radius around the center within which a fixation outside every region
    /// is still attributed to this one.
    pub fn tolerance(&self) -> f64 {
        let (hw, hh) = self.shape.half_extents();
        (hw * hw + hh * hh + 30.0).sqrt()
    }
}

/// Ordered set of regions for one experiment. Order matters: the first
/// containing region wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionSet {
    regions: Vec<Region>,
}

impl RegionSet {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    /// First region, in set order, whose shape contains `p`.
    pub fn containing(&self, p: &Point) -> Option<&Region> {
        self.regions.iter().find(|r| r.contains(p))
    }

    /// Closest region by center distance, provided `p` lies within that
    /// region's tolerance. Ties go to the earlier region.
    pub fn nearest_within_tolerance(&self, p: &Point) -> Option<&Region> {
        self.regions
            .iter()
            .map(|r| (r, r.distance(p)))
            .filter(|(r, d)| *d <= r.tolerance())
            .fold(None, |best: Option<(&Region, f64)>, (r, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((r, d)),
            })
            .map(|(r, _)| r)
    }

    /// Exact containment first, then the tolerance fallback.
    pub fn locate(&self, p: &Point) -> Option<&Region> {
        self.containing(p)
            .or_else(|| self.nearest_within_tolerance(p))
    }
}

impl<'a> IntoIterator for &'a RegionSet {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}
