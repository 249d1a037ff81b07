// Line buckets - the spatial index over selectable runs. Built from the
// text rects of one layout pass, which the block/inline walk emits in
// non-decreasing Y order; an append-only vector with binary search is all
// the structure that ordering needs.

use crate::layout::{DocPoint, DocRect, TextRect};

/// Runs whose tops lie within this distance share a bucket
pub const BUCKET_TOLERANCE: f64 = 5.0;

/// One horizontal band of selectable runs
#[derive(Debug, Clone)]
pub struct LineBucket {
    pub top: f64,
    pub bottom: f64,
    pub min_x: f64,
    pub max_x: f64,
    /// Indices into the generation's `text_rects`, in emit order
    pub runs: Vec<usize>,
}

impl LineBucket {
    /// Aggregate rectangle of the visual line
    pub fn rect(&self) -> DocRect {
        DocRect::new(
            self.min_x,
            self.top,
            self.max_x - self.min_x,
            self.bottom - self.top,
        )
    }

    pub fn center_y(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }
}

/// Sorted, non-overlapping bucket vector for one layout generation
#[derive(Debug, Clone, Default)]
pub struct LineBuckets {
    buckets: Vec<LineBucket>,
}

impl LineBuckets {
    pub fn new() -> Self {
        LineBuckets {
            buckets: Vec::new(),
        }
    }

    /// Group the pass's text rects into buckets. A rect joins the last
    /// bucket iff its top lies within the tolerance of that bucket's top;
    /// otherwise it seeds a new bucket.
    pub fn build(text_rects: &[TextRect]) -> Self {
        let mut index = LineBuckets::new();
        for (i, tr) in text_rects.iter().enumerate() {
            index.push(i, &tr.rect);
        }
        index
    }

    fn push(&mut self, run_index: usize, rect: &DocRect) {
        if let Some(last) = self.buckets.last_mut() {
            if (rect.y - last.top).abs() <= BUCKET_TOLERANCE {
                last.top = last.top.min(rect.y);
                last.bottom = last.bottom.max(rect.bottom());
                last.min_x = last.min_x.min(rect.x);
                last.max_x = last.max_x.max(rect.right());
                last.runs.push(run_index);
                return;
            }
        }
        self.buckets.push(LineBucket {
            top: rect.y,
            bottom: rect.bottom(),
            min_x: rect.x,
            max_x: rect.right(),
            runs: vec![run_index],
        });
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LineBucket> {
        self.buckets.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineBucket> {
        self.buckets.iter()
    }

    /// Binary search for the bucket whose band contains `y`
    pub fn bucket_index_at(&self, y: f64) -> Option<usize> {
        let idx = self.buckets.partition_point(|b| b.top <= y);
        if idx == 0 {
            return None;
        }
        let candidate = idx - 1;
        let bucket = &self.buckets[candidate];
        (y <= bucket.bottom).then_some(candidate)
    }

    pub fn bucket_at(&self, y: f64) -> Option<&LineBucket> {
        self.bucket_index_at(y).map(|i| &self.buckets[i])
    }

    /// Point hit-test: the selectable run whose rectangle contains `p`.
    /// Returns an index into the generation's `text_rects`.
    pub fn run_at(&self, p: DocPoint, text_rects: &[TextRect]) -> Option<usize> {
        let bucket = self.bucket_at(p.y)?;
        bucket
            .runs
            .iter()
            .copied()
            .find(|&i| text_rects.get(i).is_some_and(|tr| tr.rect.contains(p)))
    }
}
