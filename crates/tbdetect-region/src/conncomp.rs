//! Connected component analysis
//!
//! This module labels the foreground of a binary [`Mask`] and collects a
//! stats record (bounding box and area) for every region. It uses a
//! two-pass Union-Find (disjoint set) labelling.
//!
//! The stats table follows the usual layout of component analysis tools:
//! record 0 describes the background and records 1.. describe foreground
//! components. Consumers iterate [`ComponentStats::foreground`], which
//! drops the background record.

use crate::error::RegionResult;
use serde::{Deserialize, Serialize};
use tbdetect_core::{BACKGROUND, Mask, Rect};

/// Connectivity type for component analysis
///
/// Serialized as the neighbour count (`4` or `8`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ConnectivityType {
    /// 4-way connectivity (up, down, left, right)
    FourWay,
    /// 8-way connectivity (includes diagonals)
    #[default]
    EightWay,
}

impl TryFrom<u8> for ConnectivityType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(ConnectivityType::FourWay),
            8 => Ok(ConnectivityType::EightWay),
            other => Err(format!("connectivity must be 4 or 8, got {}", other)),
        }
    }
}

impl From<ConnectivityType> for u8 {
    fn from(value: ConnectivityType) -> Self {
        match value {
            ConnectivityType::FourWay => 4,
            ConnectivityType::EightWay => 8,
        }
    }
}

/// Stats record for one connected region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentStat {
    /// Component label (0 = background)
    pub label: u32,
    /// Left edge of the bounding box
    pub x: i32,
    /// Top edge of the bounding box
    pub y: i32,
    /// Bounding box width
    pub w: i32,
    /// Bounding box height
    pub h: i32,
    /// Number of pixels in the component
    pub area: u32,
}

impl ComponentStat {
    /// Bounding box of the component
    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::new_unchecked(self.x, self.y, self.w, self.h)
    }

    /// Integer bounding-box center `(x + w/2, y + h/2)`
    #[inline]
    pub fn centroid(&self) -> (i32, i32) {
        let b = self.bounds();
        (b.center_x(), b.center_y())
    }

    /// Whether this is the background record
    #[inline]
    pub fn is_background(&self) -> bool {
        self.label == 0
    }
}

/// Labelled components of a mask
///
/// Holds the label image (one `u32` per pixel, 0 for background) and the
/// stats table indexed by label.
#[derive(Debug, Clone)]
pub struct ComponentStats {
    width: u32,
    height: u32,
    connectivity: ConnectivityType,
    labels: Vec<u32>,
    stats: Vec<ComponentStat>,
}

impl ComponentStats {
    /// Number of labels, including the background label
    #[inline]
    pub fn num_labels(&self) -> usize {
        self.stats.len()
    }

    /// Number of foreground components
    #[inline]
    pub fn len(&self) -> usize {
        self.stats.len() - 1
    }

    /// Whether there are no foreground components
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The background record (label 0)
    #[inline]
    pub fn background(&self) -> &ComponentStat {
        &self.stats[0]
    }

    /// Foreground records, background dropped
    #[inline]
    pub fn foreground(&self) -> &[ComponentStat] {
        &self.stats[1..]
    }

    /// Full table, background at index 0
    #[inline]
    pub fn all(&self) -> &[ComponentStat] {
        &self.stats
    }

    /// Label of the pixel at (x, y)
    pub fn label_at(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.labels[y as usize * self.width as usize + x as usize])
    }

    /// Label image (row-major)
    #[inline]
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Connectivity used for labelling
    #[inline]
    pub fn connectivity(&self) -> ConnectivityType {
        self.connectivity
    }

    /// Dimensions of the labelled mask
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Total foreground area
    pub fn foreground_area(&self) -> u64 {
        self.foreground().iter().map(|s| s.area as u64).sum()
    }
}

/// Disjoint-set forest over provisional labels
struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    fn new() -> Self {
        // slot 0 is the background and never joins a set
        Self { parent: vec![0] }
    }

    fn make_set(&mut self) -> u32 {
        let id = self.parent.len() as u32;
        self.parent.push(id);
        id
    }

    fn find(&mut self, mut a: u32) -> u32 {
        while self.parent[a as usize] != a {
            let grand = self.parent[self.parent[a as usize] as usize];
            self.parent[a as usize] = grand;
            a = grand;
        }
        a
    }

    fn union(&mut self, a: u32, b: u32) -> u32 {
        let ra = self.find(a);
        let rb = self.find(b);
        let (root, child) = if ra <= rb { (ra, rb) } else { (rb, ra) };
        self.parent[child as usize] = root;
        root
    }
}

#[derive(Clone, Copy)]
struct Accum {
    area: u32,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl Accum {
    fn empty() -> Self {
        Self {
            area: 0,
            min_x: u32::MAX,
            min_y: u32::MAX,
            max_x: 0,
            max_y: 0,
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.area += 1;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn into_stat(self, label: u32) -> ComponentStat {
        if self.area == 0 {
            return ComponentStat {
                label,
                x: 0,
                y: 0,
                w: 0,
                h: 0,
                area: 0,
            };
        }
        ComponentStat {
            label,
            x: self.min_x as i32,
            y: self.min_y as i32,
            w: (self.max_x - self.min_x + 1) as i32,
            h: (self.max_y - self.min_y + 1) as i32,
            area: self.area,
        }
    }
}

/// Label the connected components of a mask and collect their stats.
///
/// Labels are numbered from 1 in raster order of each component's first
/// pixel. Record 0 covers the background pixels (all zeros when the mask
/// is entirely foreground).
///
/// # Examples
///
/// ```
/// use tbdetect_core::Mask;
/// use tbdetect_region::{ConnectivityType, extract_components};
///
/// let mask = Mask::from_data(4, 2, vec![255, 0, 0, 255, 0, 0, 255, 0]).unwrap();
///
/// let eight = extract_components(&mask, ConnectivityType::EightWay).unwrap();
/// assert_eq!(eight.len(), 2);
/// let four = extract_components(&mask, ConnectivityType::FourWay).unwrap();
/// assert_eq!(four.len(), 3);
/// ```
pub fn extract_components(
    mask: &Mask,
    connectivity: ConnectivityType,
) -> RegionResult<ComponentStats> {
    let (width, height) = mask.dimensions();
    let w = width as usize;
    let data = mask.data();
    let mut labels = vec![0u32; data.len()];
    let mut sets = UnionFind::new();

    // First pass: provisional labels, recording equivalences
    for y in 0..height as usize {
        for x in 0..w {
            let idx = y * w + x;
            if data[idx] == BACKGROUND {
                continue;
            }

            let mut neighbors = [0u32; 4];
            let mut n = 0;
            if x > 0 {
                neighbors[n] = labels[idx - 1];
                n += 1;
            }
            if y > 0 {
                neighbors[n] = labels[idx - w];
                n += 1;
                if connectivity == ConnectivityType::EightWay {
                    if x > 0 {
                        neighbors[n] = labels[idx - w - 1];
                        n += 1;
                    }
                    if x + 1 < w {
                        neighbors[n] = labels[idx - w + 1];
                        n += 1;
                    }
                }
            }

            let mut current = 0u32;
            for &label in neighbors[..n].iter().filter(|&&l| l != 0) {
                current = if current == 0 {
                    sets.find(label)
                } else {
                    sets.union(current, label)
                };
            }
            if current == 0 {
                current = sets.make_set();
            }
            labels[idx] = current;
        }
    }

    // Second pass: resolve roots to final labels in raster order
    let mut final_of_root = vec![0u32; sets.parent.len()];
    let mut accums = vec![Accum::empty()];
    for y in 0..height {
        for x in 0..width {
            let idx = y as usize * w + x as usize;
            let provisional = labels[idx];
            if provisional == 0 {
                accums[0].add(x, y);
                continue;
            }
            let root = sets.find(provisional) as usize;
            if final_of_root[root] == 0 {
                final_of_root[root] = accums.len() as u32;
                accums.push(Accum::empty());
            }
            let label = final_of_root[root];
            labels[idx] = label;
            accums[label as usize].add(x, y);
        }
    }

    let stats = accums
        .into_iter()
        .enumerate()
        .map(|(label, acc)| acc.into_stat(label as u32))
        .collect();

    Ok(ComponentStats {
        width,
        height,
        connectivity,
        labels,
        stats,
    })
}

/// Count foreground components
pub fn count_components(mask: &Mask, connectivity: ConnectivityType) -> RegionResult<usize> {
    Ok(extract_components(mask, connectivity)?.len())
}
