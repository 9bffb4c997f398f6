use serde::{Deserialize, Serialize};

/// Degree `n` and order `m` of a vector spherical wave, `n >= 1` and `|m| <= n`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModeIndex {
    pub n: u32,
    pub m: i32,
}

impl ModeIndex {
    pub fn new(n: u32, m: i32) -> Self {
        assert!(n >= 1 && m.unsigned_abs() <= n, "invalid mode n = {n}, m = {m}");

        Self { n, m }
    }

    /// Combined index `n(n+1) + m`, starting from 1 for `(1, -1)`.
    pub fn combined(&self) -> usize {
        combined_index(self.n, self.m)
    }

    /// Storage offset of the mode in a coefficient vector.
    pub fn row(&self) -> usize {
        self.combined() - 1
    }

    pub fn from_combined(ci: usize) -> Self {
        assert!(ci >= 1, "combined index starts from 1");
        let mut n = (ci as f64).sqrt() as usize;
        while n * n > ci {
            n -= 1;
        }
        while (n + 1) * (n + 1) <= ci {
            n += 1;
        }

        Self {
            n: n as u32,
            m: ci as i32 - (n * (n + 1)) as i32,
        }
    }

    pub fn from_row(row: usize) -> Self {
        Self::from_combined(row + 1)
    }

    /// Returns the mode `(n + dn, m + dm)` if it is a valid mode not exceeding `nmax`.
    pub fn shifted(&self, dn: i32, dm: i32, nmax: u32) -> Option<Self> {
        let n = self.n as i32 + dn;
        let m = self.m + dm;

        if n < 1 || n as u32 > nmax || m.abs() > n {
            return None;
        }

        Some(Self { n: n as u32, m })
    }
}

pub fn combined_index(n: u32, m: i32) -> usize {
    ((n * (n + 1)) as i64 + m as i64) as usize
}

/// Inverse of [`combined_index`] for many indices at once,
/// returned as parallel degree and order arrays.
pub fn mode_indices(ci: &[usize]) -> (Vec<u32>, Vec<i32>) {
    ci.iter()
        .map(|&ci| {
            let mode = ModeIndex::from_combined(ci);
            (mode.n, mode.m)
        })
        .unzip()
}

pub fn max_linear_index(nmax: u32) -> usize {
    (nmax * (nmax + 2)) as usize
}

/// Truncation order for a coefficient vector of length `len`,
/// `None` if the length is not of the form `nmax(nmax + 2)`.
pub fn nmax_from_len(len: usize) -> Option<u32> {
    let mut root = ((len + 1) as f64).sqrt() as usize;
    while root * root > len + 1 {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= len + 1 {
        root += 1;
    }

    (root * root == len + 1).then(|| root as u32 - 1)
}

/// Iterates over all modes up to `nmax` in storage order.
pub fn modes(nmax: u32) -> impl Iterator<Item = ModeIndex> {
    (1..=nmax).flat_map(|n| (-(n as i32)..=n as i32).map(move |m| ModeIndex { n, m }))
}
