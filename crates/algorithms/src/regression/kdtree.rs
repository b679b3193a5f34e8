//! k-d tree over n-dimensional feature vectors
//!
//! Exact k-nearest-neighbour queries in O(k log n) average time for
//! low-dimensional data. Split dimensions cycle through the features.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use ndarray::ArrayView2;

/// A k-d tree storing row indices of a feature matrix.
#[derive(Debug, Clone)]
pub(crate) struct KdTree {
    nodes: Vec<KdNode>,
    /// Row-major copy of the indexed points
    points: Vec<f64>,
    dim: usize,
}

#[derive(Debug, Clone)]
struct KdNode {
    /// Row index of the point stored at this node
    point_idx: usize,
    split_dim: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// One neighbour returned by [`KdTree::k_nearest`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Neighbour {
    pub index: usize,
    pub distance_sq: f64,
}

impl KdTree {
    /// Build a tree over the rows of `points`.
    pub fn build(points: ArrayView2<'_, f64>) -> Self {
        let dim = points.ncols();
        let stored: Vec<f64> = points.iter().copied().collect();
        let mut nodes = Vec::with_capacity(points.nrows());

        if points.nrows() > 0 && dim > 0 {
            let mut indices: Vec<usize> = (0..points.nrows()).collect();
            build_recursive(&stored, dim, &mut indices, 0, &mut nodes);
        }

        Self {
            nodes,
            points: stored,
            dim,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    fn point(&self, idx: usize) -> &[f64] {
        &self.points[idx * self.dim..(idx + 1) * self.dim]
    }

    /// The k points nearest to `query`, sorted by ascending distance.
    pub fn k_nearest(&self, query: &[f64], k: usize) -> Vec<Neighbour> {
        if self.nodes.is_empty() || k == 0 {
            return Vec::new();
        }

        // Sorted descending by distance: heap[0] is the farthest kept
        let mut heap: Vec<(f64, usize)> = Vec::with_capacity(k + 1);
        self.knn_recursive(0, query, k, &mut heap);

        heap.iter()
            .rev()
            .map(|&(distance_sq, index)| Neighbour { index, distance_sq })
            .collect()
    }

    fn knn_recursive(&self, node_idx: usize, query: &[f64], k: usize, heap: &mut Vec<(f64, usize)>) {
        let node = &self.nodes[node_idx];
        let p = self.point(node.point_idx);
        let dist_sq: f64 = query.iter().zip(p).map(|(a, b)| (a - b) * (a - b)).sum();

        if heap.len() < k || dist_sq < heap[0].0 {
            if heap.len() >= k {
                heap.remove(0);
            }
            let pos = heap
                .binary_search_by(|probe| probe.0.total_cmp(&dist_sq).reverse())
                .unwrap_or_else(|e| e);
            heap.insert(pos, (dist_sq, node.point_idx));
        }

        let diff = query[node.split_dim] - p[node.split_dim];
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(child) = first {
            self.knn_recursive(child, query, k, heap);
        }

        let threshold = if heap.len() >= k { heap[0].0 } else { f64::MAX };
        if diff * diff < threshold {
            if let Some(child) = second {
                self.knn_recursive(child, query, k, heap);
            }
        }
    }
}

fn build_recursive(
    points: &[f64],
    dim: usize,
    indices: &mut [usize],
    depth: usize,
    nodes: &mut Vec<KdNode>,
) -> usize {
    let n = indices.len();
    let split_dim = depth % dim;

    indices.sort_by(|&a, &b| points[a * dim + split_dim].total_cmp(&points[b * dim + split_dim]));

    let median = n / 2;
    let node_idx = nodes.len();
    nodes.push(KdNode {
        point_idx: indices[median],
        split_dim,
        left: None,
        right: None,
    });

    let (left, rest) = indices.split_at_mut(median);
    let right = &mut rest[1..];

    if !left.is_empty() {
        let left_idx = build_recursive(points, dim, left, depth + 1, nodes);
        nodes[node_idx].left = Some(left_idx);
    }
    if !right.is_empty() {
        let right_idx = build_recursive(points, dim, right, depth + 1, nodes);
        nodes[node_idx].right = Some(right_idx);
    }

    node_idx
}
