use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;

type Link = Option<Arc<Node>>;

/// Inclusive axis-aligned search box in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    pub fn point(lon: f64, lat: f64) -> Self {
        Self::new(lon, lat, lon, lat)
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.min_lon <= lon && lon <= self.max_lon && self.min_lat <= lat && lat <= self.max_lat
    }

    fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }

    fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.min_lon.min(other.min_lon),
            self.min_lat.min(other.min_lat),
            self.max_lon.max(other.max_lon),
            self.max_lat.max(other.max_lat),
        )
    }
}

#[derive(Debug)]
struct Node {
    lon: f64,
    lat: f64,
    id: Arc<str>,
    priority: u64,
    len: usize,
    bounds: BoundingBox,
    left: Link,
    right: Link,
}

impl Node {
    fn leaf(id: Arc<str>, lon: f64, lat: f64) -> Arc<Node> {
        let priority = priority_of(&id);
        Arc::new(Node {
            lon,
            lat,
            id,
            priority,
            len: 1,
            bounds: BoundingBox::point(lon, lat),
            left: None,
            right: None,
        })
    }

    /// Copies `template`'s point onto new children, recomputing the aggregates.
    fn rebuild(template: &Node, left: Link, right: Link) -> Arc<Node> {
        let mut len = 1;
        let mut bounds = BoundingBox::point(template.lon, template.lat);
        for child in [&left, &right].into_iter().flatten() {
            len += child.len;
            bounds = bounds.union(&child.bounds);
        }
        Arc::new(Node {
            lon: template.lon,
            lat: template.lat,
            id: Arc::clone(&template.id),
            priority: template.priority,
            len,
            bounds,
            left,
            right,
        })
    }

    fn cmp_key(&self, lon: f64, lat: f64, id: &str) -> Ordering {
        self.lon
            .total_cmp(&lon)
            .then_with(|| self.lat.total_cmp(&lat))
            .then_with(|| (*self.id).cmp(id))
    }
}

/// Heap priority derived from the id so that tree shape does not depend on insert order.
fn priority_of(id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}

/// Splits into keys strictly below the probe (or at-or-below when `inclusive`) and the rest.
fn split(link: &Link, lon: f64, lat: f64, id: &str, inclusive: bool) -> (Link, Link) {
    let Some(node) = link else {
        return (None, None);
    };
    let goes_left = match node.cmp_key(lon, lat, id) {
        Ordering::Less => true,
        Ordering::Equal => inclusive,
        Ordering::Greater => false,
    };
    if goes_left {
        let (lower, upper) = split(&node.right, lon, lat, id, inclusive);
        (Some(Node::rebuild(node, node.left.clone(), lower)), upper)
    } else {
        let (lower, upper) = split(&node.left, lon, lat, id, inclusive);
        (lower, Some(Node::rebuild(node, upper, node.right.clone())))
    }
}

/// Joins two trees where every key of `left` sorts before every key of `right`.
fn merge(left: Link, right: Link) -> Link {
    match (left, right) {
        (None, right) => right,
        (left, None) => left,
        (Some(l), Some(r)) => {
            if l.priority >= r.priority {
                let right_child = merge(l.right.clone(), Some(r));
                Some(Node::rebuild(&l, l.left.clone(), right_child))
            } else {
                let left_child = merge(Some(l), r.left.clone());
                Some(Node::rebuild(&r, left_child, r.right.clone()))
            }
        }
    }
}

fn contains_key(link: &Link, lon: f64, lat: f64, id: &str) -> bool {
    let mut cursor = link;
    while let Some(node) = cursor {
        match node.cmp_key(lon, lat, id) {
            Ordering::Equal => return true,
            Ordering::Less => cursor = &node.right,
            Ordering::Greater => cursor = &node.left,
        }
    }
    false
}

/// Returns `false` once `visit` asks to stop.
fn search<F>(link: &Link, area: &BoundingBox, visit: &mut F) -> bool
where
    F: FnMut(&str) -> bool,
{
    let Some(node) = link else {
        return true;
    };
    if !node.bounds.intersects(area) {
        return true;
    }
    if !search(&node.left, area, visit) {
        return false;
    }
    if area.contains(node.lon, node.lat) && !visit(&node.id) {
        return false;
    }
    search(&node.right, area, visit)
}

/// Persistent 2-d point set of fort ids, ordered by longitude then latitude.
///
/// Updates copy only the touched path, so `clone()` is O(1) and every clone is an
/// independent snapshot that later writes cannot disturb.
#[derive(Clone, Debug, Default)]
pub struct SpatialTree {
    root: Link,
}

impl SpatialTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.root.as_ref().map_or(0, |node| node.len)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Adds the point. Inserting an identical `(id, lon, lat)` twice keeps one entry.
    pub fn insert(&mut self, id: &str, lon: f64, lat: f64) {
        if contains_key(&self.root, lon, lat, id) {
            return;
        }
        let (lower, upper) = split(&self.root, lon, lat, id, false);
        let leaf = Some(Node::leaf(Arc::from(id), lon, lat));
        self.root = merge(merge(lower, leaf), upper);
    }

    /// Removes the point if present; returns whether it was.
    pub fn remove(&mut self, id: &str, lon: f64, lat: f64) -> bool {
        if !contains_key(&self.root, lon, lat, id) {
            return false;
        }
        let (lower, rest) = split(&self.root, lon, lat, id, false);
        let (_removed, upper) = split(&rest, lon, lat, id, true);
        self.root = merge(lower, upper);
        true
    }

    pub fn contains(&self, id: &str, lon: f64, lat: f64) -> bool {
        contains_key(&self.root, lon, lat, id)
    }

    /// Visits every id inside `area` (bounds inclusive) in ascending longitude order
    /// until `visit` returns `false`.
    pub fn search<F>(&self, area: &BoundingBox, mut visit: F)
    where
        F: FnMut(&str) -> bool,
    {
        if area.min_lon > area.max_lon || area.min_lat > area.max_lat {
            return;
        }
        search(&self.root, area, &mut visit);
    }
}
