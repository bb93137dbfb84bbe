pub const GRID_SEARCH_SPAN: i32 = 2;
pub const GRID_SCORE_COUNT: f32 = 1.0;
pub const GRID_SCORE_GRID: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridChoice {
    pub nx: u32,
    pub ny: u32,
    pub target: u32,
    pub actual: u32,
}

/// Pick integer grid dimensions for a requested piece count on an image of
/// the given aspect ratio (width / height). The target is approximate: the
/// search walks a small neighborhood around the square-root estimate and
/// scores count deviation against grid-to-image aspect deviation. Stable for
/// a given (aspect, target) pair.
pub fn best_grid_for_count(target: u32, aspect: f32) -> GridChoice {
    let target = target.max(1);
    let aspect = if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    };
    let nx0 = (target as f32 * aspect).sqrt().round().max(1.0) as i32;
    let ny0 = (target as f32 / nx0 as f32).round().max(1.0) as i32;

    let mut best = GridChoice {
        nx: nx0 as u32,
        ny: ny0 as u32,
        target,
        actual: (nx0 * ny0) as u32,
    };
    let mut best_score = f32::INFINITY;
    for nx in nx0 - GRID_SEARCH_SPAN..=nx0 + GRID_SEARCH_SPAN {
        for ny in ny0 - GRID_SEARCH_SPAN..=ny0 + GRID_SEARCH_SPAN {
            if nx < 1 || ny < 1 {
                continue;
            }
            let actual = (nx * ny) as u32;
            let count_term = ((actual as f32 - target as f32) / target as f32).powi(2);
            let grid_ratio = nx as f32 / ny as f32;
            let grid_term = (grid_ratio / aspect).ln().powi(2);
            let score = GRID_SCORE_COUNT * count_term + GRID_SCORE_GRID * grid_term;
            if score < best_score {
                best_score = score;
                best = GridChoice {
                    nx: nx as u32,
                    ny: ny as u32,
                    target,
                    actual,
                };
            }
        }
    }
    best
}
