//! The golfer: a rigged character holding a club, with its swing animation.

use std::sync::Arc;

use cgmath::{Deg, Vector3};

use crate::{
    animation::{ActionId, AnimationMixer},
    config::BoyAssets,
    data_structures::{
        instance::EulerOrder,
        scene_graph::{ContainerNode, NodePath, SceneNode, find_path, node_at, node_at_mut},
    },
    error::LoadError,
    resources::LoaderRegistry,
};

/// Wall-clock length of one swing loop in seconds.
pub const SWING_DURATION: f32 = 10.0;
pub const CLUB_WRAPPER_NAME: &str = "club_wrapper";

pub struct BoyMeshes {
    pub boy: Box<dyn SceneNode>,
    /// Path inside `boy` to the wrapper group holding the club.
    pub club: NodePath,
}

pub struct BoyAnimation {
    pub mixer: AnimationMixer,
    pub swing: ActionId,
}

pub struct MeshBoy {
    pub mesh: BoyMeshes,
    pub animation: BoyAnimation,
}

impl MeshBoy {
    /// The club wrapper attached to the hand joint.
    pub fn club(&self) -> Option<&dyn SceneNode> {
        node_at(self.mesh.boy.as_ref(), &self.mesh.club)
    }

    pub fn club_mut(&mut self) -> Option<&mut dyn SceneNode> {
        node_at_mut(self.mesh.boy.as_mut(), &self.mesh.club)
    }

    /// Advances the mixer by `dt` seconds and refreshes world transforms.
    pub fn update(&mut self, dt: f32) {
        self.animation.mixer.update(dt, self.mesh.boy.as_mut());
        self.mesh.boy.update_world_transform_all();
    }
}

/**
 * Loads the character and the club concurrently and puts the club in the
 * character's hand.
 *
 * The club sits below a wrapper group that is attached to the hand joint, so it
 * follows the joint whenever the swing animation moves it. The swing action is
 * prepared (stretched to [`SWING_DURATION`]) but not started.
 */
pub async fn create_mesh_boy(registry: &LoaderRegistry, assets: &BoyAssets) -> anyhow::Result<MeshBoy> {
    let (mut boy, mut club) = futures::try_join!(
        registry.load_scene(&assets.character),
        registry.load_scene(&assets.club)
    )?;

    let transform = boy.local_transform_mut();
    transform.set_scalar_scale(0.01);
    transform.rotate_y(Deg(180.0));
    transform.position.x = -0.5;

    let transform = club.local_transform_mut();
    transform.position = Vector3::new(0.3, 0.05, 0.0);
    transform.rotate_z(Deg(6.0));

    let mut wrapper = ContainerNode::new(Some(CLUB_WRAPPER_NAME));
    let transform = wrapper.local_transform_mut();
    transform.set_scalar_scale(130.0);
    transform.set_rotation_from_euler(Deg(180.0), Deg(180.0), Deg(40.0), EulerOrder::YZX);
    transform.position.y = 10.0;
    wrapper.add_child(club);

    let not_found = || LoadError::NodeNotFound {
        name: assets.hand_joint.clone(),
        root: assets.character.clone(),
    };
    let hand_path = find_path(boy.as_ref(), &assets.hand_joint).ok_or_else(not_found)?;
    let hand = node_at_mut(boy.as_mut(), &hand_path).ok_or_else(not_found)?;
    let wrapper_path = hand_path.child(hand.get_children().len());
    hand.add_child(Box::new(wrapper));

    let clip = boy
        .get_animation()
        .first()
        .map(Arc::clone)
        .ok_or_else(|| LoadError::NoAnimation {
            url: assets.character.clone(),
        })?;
    let mut mixer = AnimationMixer::new(boy.as_ref());
    let swing = mixer.clip_action(clip);
    mixer.action_mut(swing).set_duration(SWING_DURATION);

    boy.update_world_transform_all();
    Ok(MeshBoy {
        mesh: BoyMeshes {
            boy,
            club: wrapper_path,
        },
        animation: BoyAnimation { mixer, swing },
    })
}
