use draw_types::Prize;
use rand::Rng;

/// Full turns added to every spin before it settles on the target.
pub const WHOLE_TURNS: u32 = 6;

/// Width of the random landing window, as a fraction of one segment.
pub const JITTER_SPAN: f64 = 0.15;

/// Placeholders shown when the backend has no prizes left to put on the wheel.
pub fn fallback_segments() -> Vec<Prize> {
    vec![
        Prize::new(-1, "Wheel ready"),
        Prize::new(-2, "Waiting"),
        Prize::new(-3, "Loading prizes"),
        Prize::new(-4, "Live raffle"),
    ]
}

/// The wheel face for a prize list: the prizes themselves, or the fallback set.
pub fn wheel_segments(prizes: &[Prize]) -> Vec<Prize> {
    if prizes.is_empty() {
        fallback_segments()
    } else {
        prizes.to_vec()
    }
}

/// Index of the first segment carrying the target's id, or 0 when the target
/// is not on the wheel.
pub fn segment_index(segments: &[Prize], target: &Prize) -> usize {
    segments
        .iter()
        .position(|segment| segment.id == target.id)
        .unwrap_or(0)
}

/// Which segment sits under the pointer (at 0 degrees) after the wheel has
/// turned by `rotation` degrees.
pub fn segment_at(rotation: f64, segment_count: usize) -> usize {
    if segment_count == 0 {
        return 0;
    }
    let step = 360.0 / segment_count as f64;
    let wheel_angle = (360.0 - rotation.rem_euclid(360.0)).rem_euclid(360.0);
    ((wheel_angle / step).floor() as usize).min(segment_count - 1)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpinTarget {
    pub segment_index: usize,
    pub segment_count: usize,
    /// The segment the wheel will stop on.
    pub prize: Prize,
    /// Absolute rotation in degrees; only ever grows.
    pub rotation: f64,
}

#[derive(Debug, Clone)]
pub struct TargetResolver {
    rotation: f64,
    whole_turns: u32,
}

impl TargetResolver {
    pub fn new(whole_turns: u32) -> Self {
        Self {
            rotation: 0.0,
            whole_turns: whole_turns.max(1),
        }
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn resolve(&mut self, segments: &[Prize], target: &Prize) -> SpinTarget {
        let jitter = rand::thread_rng().gen_range(-0.5..=0.5);
        self.resolve_with_jitter(segments, target, jitter)
    }

    /// `jitter` is a position inside the landing window, from -0.5 to 0.5.
    ///
    /// The result is strictly greater than the previous rotation and
    /// `segment_at(rotation, segment_count) == segment_index` always holds.
    pub fn resolve_with_jitter(
        &mut self,
        segments: &[Prize],
        target: &Prize,
        jitter: f64,
    ) -> SpinTarget {
        let fallback;
        let segments = if segments.is_empty() {
            fallback = fallback_segments();
            &fallback[..]
        } else {
            segments
        };

        let segment_count = segments.len();
        let segment_index = segment_index(segments, target);
        let step = 360.0 / segment_count as f64;
        let center = segment_index as f64 * step + step / 2.0;
        let offset = jitter.clamp(-0.5, 0.5) * step * JITTER_SPAN;

        // Start from the last whole turn so that `rotation mod 360` lands on the
        // segment no matter where the previous spin stopped.
        let base = self.rotation - self.rotation.rem_euclid(360.0);
        let rotation = base + f64::from(self.whole_turns) * 360.0 + (360.0 - center) + offset;

        self.rotation = rotation;

        SpinTarget {
            segment_index,
            segment_count,
            prize: segments[segment_index].clone(),
            rotation,
        }
    }
}

impl Default for TargetResolver {
    fn default() -> Self {
        Self::new(WHOLE_TURNS)
    }
}
