// Maximum-weight perfect matching on a complete bipartite graph,
// better known as the assignment problem.

// The algorithm is the "Hungarian method" of H.W. Kuhn, "The Hungarian
// Method for the Assignment Problem", Naval Research Logistics Quarterly,
// 1955, as revised by J. Munkres, "Algorithms for the Assignment and
// Transportation Problems", SIAM Journal, 1957.
// Like the blossom method for general graphs it is a primal-dual method:
// a feasible vertex labeling (the dual) is kept throughout, and the matching
// (the primal) only ever uses edges that are tight under that labeling.
// Keeping a slack value per column makes every stage O(n ** 2).

//! Compute a maximum-weight perfect matching in the complete bipartite
//! graph given by the square matrix "weights".  weights[i][j] is the
//! weight of the edge between row i and column j.
//!
//! Rows and columns share one vertex numbering: row i is vertex i and
//! column j is vertex n + j, so rows are 0 .. (n-1) and columns are
//! n .. (2n-1).
//!
//! Return (assignment, total) such that assignment[i] is the column given
//! to row i and total is the sum of weights[i][assignment[i]].
//!
//! This function takes time O(n ** 3).

#[macro_use]
extern crate log;

mod error;

pub use error::AssignmentError;

pub type Vertex   = usize;
pub type Vertices = Vec<Vertex>;
pub type Weight   = f64;
pub type Weights  = Vec<Weight>;
pub type Matrix   = Vec<Weights>;

pub const SENTINEL:Vertex = <Vertex>::max_value();

/// Tolerance for tight-edge tests, relative to the largest absolute weight
/// (or to 1, whichever is larger).
/// Inputs of large magnitude whose entries are exact (e.g. integers near
/// 1e12) should lower this, down to 0, or near-tight edges count as tight.
pub const DEFAULT_EPSILON:Weight = 1e-9;

/// Largest supported absolute weight. Labels and slacks are sums of a few
/// weights, so larger entries could overflow to infinity.
pub const MAX_WEIGHT:Weight = Weight::MAX / 8.0;

const CHECK_OPTIMUM:bool = cfg!(debug_assertions);

/// Solve the assignment problem for "weights" in one call.
pub fn solve(weights: &[Weights]) -> Result<(Vertices, Weight), AssignmentError> {
    Ok(KuhnMunkres::new(weights.to_vec())?.solve())
}

#[derive(Debug, Default)]
pub struct KuhnMunkres {
    n:        usize,
    weights:  Matrix,
    scale:    Weight,
    epsilon:  Weight,
    label:    Weights,
    mate:     Vertices,
    parent:   Vertices,
    slack:    Weights,
    in_s:     Vec<bool>,
    in_t:     Vec<bool>,
    reached:  Vec<bool>,
    relabels: usize,
}

impl KuhnMunkres {
    /// Take ownership of a square, non-empty matrix of finite weights.
    pub fn new(weights: Matrix) -> Result<KuhnMunkres, AssignmentError> {
        let n = weights.len();
        if n == 0 {
            return Err(AssignmentError::Empty);
        }
        for (row, w) in weights.iter().enumerate() {
            if w.len() != n {
                return Err(AssignmentError::NotSquare { row, len: w.len(), expected: n });
            }
        }
        for (row, w) in weights.iter().enumerate() {
            if let Some(col) = w.iter().position(|x| !x.is_finite()) {
                return Err(AssignmentError::NonFinite { row, col });
            }
        }
        for (row, w) in weights.iter().enumerate() {
            if let Some(col) = w.iter().position(|x| x.abs() > MAX_WEIGHT) {
                return Err(AssignmentError::OutOfRange { row, col, max: MAX_WEIGHT });
            }
        }
        let scale = weights.iter().flatten().fold(1.0, |m: Weight, w| m.max(w.abs()));

        Ok(KuhnMunkres {
            n,
            weights,
            scale,
            epsilon: DEFAULT_EPSILON,
            ..KuhnMunkres::default()
        })
    }

    /// Override the relative tolerance used to decide whether an edge is tight.
    pub fn epsilon(&mut self, epsilon: Weight) -> Result<&mut Self, AssignmentError> {
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(AssignmentError::InvalidEpsilon(epsilon));
        }
        self.epsilon = epsilon;
        Ok(self)
    }

    /// Number of rows (and of columns).
    pub fn size(&self) -> usize {
        self.n
    }

    /// Vertex labels left by the last call to solve(), rows first, then
    /// columns. They form a feasible dual whose sum equals the total.
    pub fn labels(&self) -> &[Weight] {
        &self.label
    }

    fn initialize(&mut self) {
        let n = self.n;

        // label[v] is the dual variable of vertex v. Every edge satisfies
        // label[i] + label[j] >= weights[i][j - n].
        // Start with the row maximum on each row and zero on each column.
        self.label = vec![0.0; 2*n];
        for i in 0..n {
            self.label[i] = self.weights[i].iter().cloned().fold(Weight::NEG_INFINITY, Weight::max);
        }

        // mate[v] is the vertex matched to v, or SENTINEL if v is single.
        self.mate = vec![SENTINEL; 2*n];

        // Per-stage state, reset by begin_stage():
        // in_s[i] for rows in the alternating tree (S),
        // in_t[j] for columns in the alternating tree (T),
        // reached[j] for columns reached through a tight edge (N, a superset of T),
        // parent[v] is the tree predecessor of v,
        // slack[j] is the least slack of any edge from S to unreached column j.
        self.in_s     = vec![false; 2*n];
        self.in_t     = vec![false; 2*n];
        self.reached  = vec![false; 2*n];
        self.parent   = vec![SENTINEL; 2*n];
        self.slack    = vec![0.0; 2*n];
        self.relabels = 0;

        self.greedy_match();
    }

    #[inline]
    fn tolerance(&self) -> Weight {
        self.epsilon * self.scale
    }

    // Return the slack of the edge between row i and column j.
    #[inline]
    fn edge_slack(&self, i: Vertex, j: Vertex) -> Weight {
        self.label[i] + self.label[j] - self.weights[i][j - self.n]
    }

    /// Match rows to columns over tight edges, scanning row-major and
    /// taking the first free column that fits.
    fn greedy_match(&mut self) {
        let n = self.n;
        let tol = self.tolerance();
        for i in 0..n {
            for j in n..2*n {
                if self.mate[i] != SENTINEL {
                    break;
                }
                if self.mate[j] != SENTINEL {
                    continue;
                }
                if self.edge_slack(i, j).abs() <= tol {
                    self.mate[i] = j;
                    self.mate[j] = i;
                }
            }
        }
    }

    /// Plant a fresh alternating tree at the single row u.
    fn begin_stage(&mut self, u: Vertex) {
        self.in_s.iter_mut().for_each(|x| *x = false);
        self.in_t.iter_mut().for_each(|x| *x = false);
        self.reached.iter_mut().for_each(|x| *x = false);
        self.parent.iter_mut().for_each(|x| *x = SENTINEL);

        self.in_s[u] = true;
        for j in self.n..2*self.n {
            self.slack[j] = self.edge_slack(u, j);
        }
    }

    /// Least slack over unreached columns; the lowest column wins ties.
    fn min_slack(&self) -> (Vertex, Weight) {
        let mut best = (SENTINEL, Weight::INFINITY);
        for j in self.n..2*self.n {
            if !self.reached[j] && self.slack[j] < best.1 {
                best = (j, self.slack[j]);
            }
        }
        best
    }

    /// Lower S labels and raise T labels by alpha. Edges inside the tree
    /// stay tight and the slack towards unreached columns shrinks by alpha.
    fn relabel(&mut self, alpha: Weight) {
        let n = self.n;
        for v in 0..2*n {
            if self.in_s[v] {
                self.label[v] -= alpha;
            } else if self.in_t[v] {
                self.label[v] += alpha;
            } else if v >= n && !self.reached[v] {
                self.slack[v] -= alpha;
            }
        }
        self.relabels += 1;
    }

    /// Find the row in S through which column y is reached.
    /// Rounding can leave several candidates near zero slack, so take the
    /// one closest to tight; the lowest row wins ties.
    fn predecessor(&self, y: Vertex) -> Vertex {
        let mut best = (SENTINEL, Weight::INFINITY);
        for i in 0..self.n {
            if self.in_s[i] {
                let d = self.edge_slack(i, y).abs();
                if d < best.1 {
                    best = (i, d);
                }
            }
        }
        best.0
    }

    /// Flip matched and unmatched edges along the tree path from the
    /// single column y back to the root.
    fn augment(&mut self, root: Vertex, mut y: Vertex) {
        let mut length = 1;
        loop {
            let x = self.parent[y];
            assert!(x != SENTINEL && self.in_s[x]);
            self.mate[x] = y;
            self.mate[y] = x;
            if x == root {
                break;
            }
            // x entered the tree through its old mate.
            y = self.parent[x];
            length += 2;
        }
        trace!("augmented from row {} along a path of {} edges", root, length);
    }

    /// Grow an alternating tree from the single row u until an augmenting
    /// path is found, then augment. Afterwards u is matched and every
    /// vertex matched before is still matched.
    fn stage(&mut self, u: Vertex) {
        let n = self.n;
        let tol = self.tolerance();
        self.begin_stage(u);

        loop {
            // Every reached column is in the tree here, so reach one more:
            // the column with least slack, pumping alpha out of the labels
            // first if its edge is not yet tight.
            let (y, alpha) = self.min_slack();
            assert!(y != SENTINEL, "no column left to reach from row {}", u);
            if alpha > tol {
                trace!("relabel by {} to reach column {}", alpha, y - n);
                self.relabel(alpha);
            }
            self.reached[y] = true;
            self.parent[y] = self.predecessor(y);

            let z = self.mate[y];
            if z == SENTINEL {
                // y is single; the tree path to it augments the matching.
                self.augment(u, y);
                return;
            }

            // y is matched to z; both join the tree.
            self.in_t[y] = true;
            self.in_s[z] = true;
            self.parent[z] = y;
            for j in n..2*n {
                if !self.reached[j] {
                    let s = self.edge_slack(z, j);
                    if s < self.slack[j] {
                        self.slack[j] = s;
                    }
                }
            }
        }
    }

    /// Verify that the optimum solution has been reached.
    fn verify_optimum(&self) {
        let n = self.n;
        // Allow for rounding on every label update, on top of the tightness tolerance.
        let tol = self.tolerance() + 4.0 * Weight::EPSILON * self.scale * (n * n) as Weight;
        for i in 0..n {
            // 0. the matching is perfect and symmetric;
            let j = self.mate[i];
            assert!(j >= n && j < 2*n);
            assert!(self.mate[j] == i);
            // 1. all matched edges have zero slack;
            assert!(self.edge_slack(i, j).abs() <= tol);
            // 2. all edges have non-negative slack.
            for k in n..2*n {
                assert!(self.edge_slack(i, k) >= -tol);
            }
        }
        // Optimum verified
    }

    pub fn solve(&mut self) -> (Vertices, Weight) {
        self.initialize();
        let n = self.n;

        let single = (0..n).filter(|&i| self.mate[i] == SENTINEL).count();
        debug!("equality subgraph matches {} of {} rows", n - single, n);

        // Main loop: one stage per single row, lowest row first.
        // Augmenting never unmatches a row, so one pass suffices.
        for u in 0..n {
            if self.mate[u] == SENTINEL {
                self.stage(u);
            }
        }

        // Verify that we reached the optimum solution.
        if CHECK_OPTIMUM {
            self.verify_optimum();
        }

        let assignment: Vertices = (0..n).map(|i| self.mate[i] - n).collect();
        let total: Weight = assignment.iter().enumerate().map(|(i, &j)| self.weights[i][j]).sum();
        debug!("solved {}x{} in {} stages and {} relabels, total {}", n, n, single, self.relabels, total);

        (assignment, total)
    }
}
