//! Vertex welding and compaction of one triangle-list primitive.

use std::collections::{BTreeMap, HashMap};

use crate::simplify::document::AttributeData;

#[derive(Clone, Debug, PartialEq)]
pub struct PrimitiveData {
    /// Vertex attributes by glTF semantic.
    pub attributes: BTreeMap<String, AttributeData>,
    pub indices: Vec<u32>,
}

impl PrimitiveData {
    pub fn vertex_count(&self) -> usize {
        self.attributes
            .get("POSITION")
            .map_or(0, AttributeData::count)
    }

    pub fn positions(&self) -> Vec<[f32; 3]> {
        let Some(position) = self.attributes.get("POSITION") else {
            return Vec::new();
        };
        (0..position.count())
            .map(|idx| [0, 1, 2].map(|c| position.float(idx, c)))
            .collect()
    }

    fn gather(&self, order: &[u32], indices: Vec<u32>) -> Self {
        Self {
            attributes: self
                .attributes
                .iter()
                .map(|(semantic, data)| (semantic.clone(), data.gather(order)))
                .collect(),
            indices,
        }
    }
}

/// Per-component merge distance of one attribute; `None` where only identical values merge.
struct AttributeTolerance {
    min: Vec<f32>,
    cells: Vec<Option<f32>>,
}

impl AttributeTolerance {
    fn new(data: &AttributeData, tolerance: f32) -> Self {
        if !data.is_float() {
            return Self {
                min: Vec::new(),
                cells: Vec::new(),
            };
        }
        let (min, cells) = (0..data.components())
            .map(|c| {
                let (lo, hi) = (0..data.count())
                    .map(|idx| data.float(idx, c))
                    .filter(|value| value.is_finite())
                    .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(v), hi.max(v))
                    });
                let cell = tolerance * (hi - lo);
                (lo, (cell.is_finite() && cell > 0.0).then_some(cell))
            })
            .unzip();
        Self { min, cells }
    }

    fn matches(&self, data: &AttributeData, a: usize, b: usize) -> bool {
        if !data.is_float() {
            return data.element(a) == data.element(b);
        }
        self.cells.iter().enumerate().all(|(c, cell)| {
            let (va, vb) = (data.float(a, c), data.float(b, c));
            match cell {
                Some(cell) if va.is_finite() && vb.is_finite() => (va - vb).abs() <= *cell,
                _ => va.to_bits() == vb.to_bits(),
            }
        })
    }

    /// Grid cell of vertex `idx`. Vertices that match land in the same or an adjacent cell.
    fn cell_of(&self, data: &AttributeData, idx: usize) -> [i64; 3] {
        let mut key = [0i64; 3];
        for (c, slot) in key.iter_mut().enumerate().take(self.cells.len()) {
            let value = data.float(idx, c);
            *slot = match self.cells[c] {
                Some(cell) if value.is_finite() => ((value - self.min[c]) / cell).floor() as i64,
                _ => value.to_bits() as i64,
            };
        }
        key
    }
}

fn neighbours(cell: [i64; 3]) -> impl Iterator<Item = [i64; 3]> {
    (-1i64..=1).flat_map(move |dx| {
        (-1i64..=1).flat_map(move |dy| {
            (-1i64..=1).map(move |dz| {
                [
                    cell[0].saturating_add(dx),
                    cell[1].saturating_add(dy),
                    cell[2].saturating_add(dz),
                ]
            })
        })
    })
}

/**
 * Merges vertices that are equal up to `tolerance`.
 *
 * `tolerance` is relative: a vertex joins a group when each float component
 * differs from the group's first vertex by at most `tolerance` times that
 * component's value range. Integer attributes must match exactly. The first
 * vertex of each group survives, and triangles that collapse to a line or
 * point are dropped.
 */
pub fn weld(primitive: &PrimitiveData, tolerance: f32) -> PrimitiveData {
    let attributes: Vec<(&AttributeData, AttributeTolerance)> = primitive
        .attributes
        .values()
        .map(|data| (data, AttributeTolerance::new(data, tolerance)))
        .collect();
    let position = primitive
        .attributes
        .get("POSITION")
        .map(|data| (data, AttributeTolerance::new(data, tolerance)));

    let vertex_count = primitive.vertex_count();
    // candidate groups are looked up by the position grid cell of their first vertex
    let mut grid: HashMap<[i64; 3], Vec<u32>> = HashMap::new();
    let mut order: Vec<u32> = Vec::new();
    let mut remap = Vec::with_capacity(vertex_count);
    for vertex in 0..vertex_count {
        let cell = position
            .as_ref()
            .map_or([0; 3], |(data, tolerance)| tolerance.cell_of(data, vertex));
        let found = neighbours(cell)
            .filter_map(|key| grid.get(&key))
            .flatten()
            .copied()
            .filter(|&group| {
                let first = order[group as usize] as usize;
                attributes
                    .iter()
                    .all(|(data, tolerance)| tolerance.matches(data, first, vertex))
            })
            .min();
        let target = match found {
            Some(group) => group,
            None => {
                let group = order.len() as u32;
                order.push(vertex as u32);
                grid.entry(cell).or_default().push(group);
                group
            }
        };
        remap.push(target);
    }

    let indices = primitive
        .indices
        .chunks_exact(3)
        .map(|tri| [remap[tri[0] as usize], remap[tri[1] as usize], remap[tri[2] as usize]])
        .filter(|[a, b, c]| a != b && b != c && a != c)
        .flatten()
        .collect();
    primitive.gather(&order, indices)
}

/// Drops vertices `indices` does not reference and renumbers the rest in first-use order.
pub fn compact(primitive: &PrimitiveData, indices: &[u32]) -> PrimitiveData {
    let mut remap = vec![u32::MAX; primitive.vertex_count()];
    let mut order = Vec::new();
    let indices = indices
        .iter()
        .map(|&idx| {
            let slot = &mut remap[idx as usize];
            if *slot == u32::MAX {
                *slot = order.len() as u32;
                order.push(idx);
            }
            *slot
        })
        .collect();
    primitive.gather(&order, indices)
}
