use cgmath::{InnerSpace, VectorSpace};

#[derive(Clone, Debug)]
pub enum Keyframes {
    Translation(Vec<cgmath::Vector3<f32>>),
    Rotation(Vec<cgmath::Quaternion<f32>>),
    Scale(Vec<cgmath::Vector3<f32>>),
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
    /// Only the spline values are kept at import; sampling falls back to linear.
    CubicSpline,
}

/// One animated property of one node, addressed by the node's (sanitized) name.
#[derive(Clone, Debug)]
pub struct AnimationTrack {
    pub target: String,
    pub keyframes: Keyframes,
    pub timestamps: Vec<f32>,
    pub interpolation: Interpolation,
}

/// A sampled track value ready to be written into a node's local transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TrackValue {
    Translation(cgmath::Vector3<f32>),
    Rotation(cgmath::Quaternion<f32>),
    Scale(cgmath::Vector3<f32>),
}

impl AnimationTrack {
    /**
     * Samples the track at `time` seconds.
     *
     * Times outside the keyframe range clamp to the first or last key. Returns
     * `None` for empty or unsupported tracks.
     */
    pub fn sample(&self, time: f32) -> Option<TrackValue> {
        let len = match &self.keyframes {
            Keyframes::Translation(v) | Keyframes::Scale(v) => v.len(),
            Keyframes::Rotation(v) => v.len(),
            Keyframes::Other => return None,
        }
        .min(self.timestamps.len());
        if len == 0 {
            return None;
        }
        let next = self.timestamps[..len].partition_point(|&t| t <= time);
        let (a, b, t) = if next == 0 {
            (0, 0, 0.0)
        } else if next >= len {
            (len - 1, len - 1, 0.0)
        } else {
            let (t0, t1) = (self.timestamps[next - 1], self.timestamps[next]);
            let span = t1 - t0;
            let t = if span > 0.0 { (time - t0) / span } else { 0.0 };
            match self.interpolation {
                Interpolation::Step => (next - 1, next - 1, 0.0),
                _ => (next - 1, next, t),
            }
        };
        Some(match &self.keyframes {
            Keyframes::Translation(v) => TrackValue::Translation(v[a].lerp(v[b], t)),
            Keyframes::Scale(v) => TrackValue::Scale(v[a].lerp(v[b], t)),
            Keyframes::Rotation(v) => {
                let (qa, mut qb) = (v[a], v[b]);
                // take the short way around
                if qa.dot(qb) < 0.0 {
                    qb = -qb;
                }
                TrackValue::Rotation(qa.nlerp(qb, t).normalize())
            }
            Keyframes::Other => return None,
        })
    }
}

/// An animation clip: a named set of tracks and its length in seconds.
#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<AnimationTrack>,
}

impl AnimationClip {
    pub fn new(name: String, tracks: Vec<AnimationTrack>) -> Self {
        let duration = tracks
            .iter()
            .filter_map(|track| track.timestamps.last().copied())
            .fold(0.0, f32::max);
        Self {
            name,
            duration,
            tracks,
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Quaternion, Rotation3, Vector3};

    use super::*;

    fn translation_track(interpolation: Interpolation) -> AnimationTrack {
        AnimationTrack {
            target: "hand".to_string(),
            keyframes: Keyframes::Translation(vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(2.0, 0.0, 0.0),
            ]),
            timestamps: vec![0.0, 1.0],
            interpolation,
        }
    }

    #[test]
    fn linear_tracks_interpolate_and_clamp() {
        let track = translation_track(Interpolation::Linear);
        assert_eq!(track.sample(0.5), Some(TrackValue::Translation(Vector3::new(1.0, 0.0, 0.0))));
        assert_eq!(track.sample(-1.0), Some(TrackValue::Translation(Vector3::new(0.0, 0.0, 0.0))));
        assert_eq!(track.sample(3.0), Some(TrackValue::Translation(Vector3::new(2.0, 0.0, 0.0))));
    }

    #[test]
    fn step_tracks_hold_previous_key() {
        let track = translation_track(Interpolation::Step);
        assert_eq!(track.sample(0.9), Some(TrackValue::Translation(Vector3::new(0.0, 0.0, 0.0))));
    }

    #[test]
    fn rotation_halfway_is_normalized() {
        let track = AnimationTrack {
            target: "hand".to_string(),
            keyframes: Keyframes::Rotation(vec![
                Quaternion::from_angle_z(Deg(0.0)),
                Quaternion::from_angle_z(Deg(90.0)),
            ]),
            timestamps: vec![0.0, 2.0],
            interpolation: Interpolation::Linear,
        };
        let Some(TrackValue::Rotation(q)) = track.sample(1.0) else {
            panic!("expected a rotation");
        };
        assert!((q.magnitude() - 1.0).abs() < 1e-5);
        let expected = Quaternion::from_angle_z(Deg(45.0));
        assert!(q.dot(expected) > 0.9999);
    }

    #[test]
    fn clip_duration_is_longest_track() {
        let mut long = translation_track(Interpolation::Linear);
        long.timestamps = vec![0.0, 2.5];
        let clip = AnimationClip::new("swing".into(), vec![translation_track(Interpolation::Linear), long]);
        assert_eq!(clip.duration, 2.5);
    }
}
