//! Clip playback for imported scenes.
//!
//! An [`AnimationMixer`] is bound to one scene root. It owns [`ClipAction`]s and,
//! on every [`AnimationMixer::update`], writes the sampled track values into the
//! local transforms of the nodes the tracks are named after. World transforms
//! are left to the caller (`SceneNode::update_world_transform_all`).

use std::{collections::HashMap, sync::Arc};

use crate::{
    data_structures::scene_graph::{NodePath, SceneNode, find_path, node_at_mut},
    resources::animation::{AnimationClip, TrackValue},
};

/// Playback state of one clip.
#[derive(Clone, Debug)]
pub struct ClipAction {
    clip: Arc<AnimationClip>,
    time: f32,
    time_scale: f32,
    running: bool,
}

impl ClipAction {
    fn new(clip: Arc<AnimationClip>) -> Self {
        Self {
            clip,
            time: 0.0,
            time_scale: 1.0,
            running: false,
        }
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    /// Stretches or squeezes playback so that one loop takes `duration` seconds.
    pub fn set_duration(&mut self, duration: f32) -> &mut Self {
        if duration > 0.0 {
            self.time_scale = self.clip.duration / duration;
        } else {
            log::warn!("ignoring non-positive duration {} for clip {}", duration, self.clip.name);
        }
        self
    }

    /// Wall-clock seconds one loop of the clip takes at the current time scale.
    pub fn get_duration(&self) -> f32 {
        if self.time_scale == 0.0 {
            f32::INFINITY
        } else {
            self.clip.duration / self.time_scale
        }
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Position inside the clip, in clip seconds.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn play(&mut self) -> &mut Self {
        self.running = true;
        self
    }

    /// Stops playback and rewinds to the start.
    pub fn stop(&mut self) -> &mut Self {
        self.running = false;
        self.time = 0.0;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn advance(&mut self, dt: f32) {
        if !self.running {
            return;
        }
        self.time += dt * self.time_scale;
        let duration = self.clip.duration;
        if duration > 0.0 {
            self.time = self.time.rem_euclid(duration);
        } else {
            self.time = 0.0;
        }
    }
}

/// Identifies an action owned by a mixer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActionId(usize);

pub struct AnimationMixer {
    root_name: Option<String>,
    actions: Vec<ClipAction>,
    bindings: HashMap<String, Option<NodePath>>,
}

impl AnimationMixer {
    pub fn new(root: &dyn SceneNode) -> Self {
        Self {
            root_name: root.name().map(str::to_string),
            actions: Vec::new(),
            bindings: HashMap::new(),
        }
    }

    /// Returns the action for `clip`, creating it on first use.
    pub fn clip_action(&mut self, clip: Arc<AnimationClip>) -> ActionId {
        if let Some(idx) = self
            .actions
            .iter()
            .position(|action| Arc::ptr_eq(&action.clip, &clip))
        {
            return ActionId(idx);
        }
        self.actions.push(ClipAction::new(clip));
        ActionId(self.actions.len() - 1)
    }

    pub fn action(&self, id: ActionId) -> &ClipAction {
        &self.actions[id.0]
    }

    pub fn action_mut(&mut self, id: ActionId) -> &mut ClipAction {
        &mut self.actions[id.0]
    }

    pub fn stop_all_actions(&mut self) {
        self.actions.iter_mut().for_each(|action| {
            action.stop();
        });
    }

    /**
     * Advances all running actions by `dt` seconds and applies them to `root`.
     *
     * Tracks whose target node does not exist are skipped; the miss is logged
     * once per target.
     */
    pub fn update(&mut self, dt: f32, root: &mut dyn SceneNode) {
        for action in self.actions.iter_mut() {
            action.advance(dt);
        }
        for action in self.actions.iter().filter(|action| action.running) {
            for track in &action.clip.tracks {
                let Some(value) = track.sample(action.time) else {
                    continue;
                };
                let path = self
                    .bindings
                    .entry(track.target.clone())
                    .or_insert_with(|| {
                        let path = find_path(&*root, &track.target);
                        if path.is_none() {
                            log::warn!(
                                "animation track targets unknown node {} below {:?}",
                                track.target,
                                self.root_name
                            );
                        }
                        path
                    });
                let node = match path.as_ref() {
                    Some(path) => node_at_mut(root, path),
                    None => None,
                };
                let Some(node) = node else {
                    continue;
                };
                let local = node.local_transform_mut();
                match value {
                    TrackValue::Translation(position) => local.position = position,
                    TrackValue::Rotation(rotation) => local.rotation = rotation,
                    TrackValue::Scale(scale) => local.scale = scale,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;
    use crate::{
        data_structures::scene_graph::{ContainerNode, find_by_name},
        resources::animation::{AnimationTrack, Interpolation, Keyframes},
    };

    fn clip() -> Arc<AnimationClip> {
        Arc::new(AnimationClip::new(
            "swing".to_string(),
            vec![AnimationTrack {
                target: "hand".to_string(),
                keyframes: Keyframes::Translation(vec![
                    Vector3::new(0.0, 0.0, 0.0),
                    Vector3::new(4.0, 0.0, 0.0),
                ]),
                timestamps: vec![0.0, 2.0],
                interpolation: Interpolation::Linear,
            }],
        ))
    }

    fn root() -> ContainerNode {
        let mut root = ContainerNode::new(Some("boy"));
        root.add_child(Box::new(ContainerNode::bone(Some("hand"))));
        root
    }

    #[test]
    fn set_duration_rescales_time() {
        let mut root = root();
        let mut mixer = AnimationMixer::new(&root);
        let swing = mixer.clip_action(clip());
        mixer.action_mut(swing).set_duration(10.0).play();
        assert!((mixer.action(swing).get_duration() - 10.0).abs() < 1e-4);

        // a quarter of the stretched duration is a quarter of the clip
        mixer.update(2.5, &mut root);
        assert!((mixer.action(swing).time() - 0.5).abs() < 1e-6);
        let hand = find_by_name(&root, "hand").unwrap();
        assert!((hand.get_local_transform().position.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn stopped_actions_do_not_touch_the_scene() {
        let mut root = root();
        let mut mixer = AnimationMixer::new(&root);
        let swing = mixer.clip_action(clip());
        mixer.update(1.0, &mut root);
        assert!(!mixer.action(swing).is_running());
        let hand = find_by_name(&root, "hand").unwrap();
        assert_eq!(hand.get_local_transform().position, Vector3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn same_clip_yields_same_action() {
        let root = root();
        let mut mixer = AnimationMixer::new(&root);
        let clip = clip();
        assert_eq!(mixer.clip_action(clip.clone()), mixer.clip_action(clip));
    }

    #[test]
    fn playback_loops() {
        let mut root = root();
        let mut mixer = AnimationMixer::new(&root);
        let swing = mixer.clip_action(clip());
        mixer.action_mut(swing).play();
        mixer.update(2.5, &mut root);
        assert!((mixer.action(swing).time() - 0.5).abs() < 1e-6);
    }
}
