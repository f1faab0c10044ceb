//! glTF 2.0 import (`.gltf` and binary `.glb`).
//!
//! The whole asset is turned into a CPU scene graph: one [`ContainerNode`] for
//! the scene, nodes below it with sanitized names, geometry and base-colour
//! materials on [`ModelNode`]s and the animations as [`AnimationClip`]s attached
//! to the root.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use base64::Engine;
use serde_json::Value;

use crate::{
    data_structures::{
        instance::Instance,
        model::{Material, Mesh, Model, Side},
        scene_graph::{ContainerNode, ModelNode, SceneNode},
        texture::Texture,
    },
    error::LoadError,
    resources::{
        LoaderRegistry, SceneImporter,
        animation::{AnimationClip, AnimationTrack, Interpolation, Keyframes},
        draco::{DRACO_EXTENSION, DecodedPrimitive, DecoderModule, DracoBackend, DracoPrimitive},
        manager::{LoadFuture, boxed_load, join_relative},
        texture::format_from_mime,
    },
};

/// Characters the web animation system reserves in node names.
const RESERVED_NAME_CHARS: [char; 5] = ['[', ']', '.', ':', '/'];

/**
 * Makes a node name usable as an animation track target: whitespace becomes
 * `_` and the reserved characters `[ ] . : /` are dropped, so Mixamo's
 * `mixamorig:LeftHand` turns into `mixamorigLeftHand`.
 */
pub fn sanitize_node_name(name: &str) -> String {
    name.chars()
        .filter(|c| !RESERVED_NAME_CHARS.contains(c))
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

pub struct GltfImporter;

impl SceneImporter for GltfImporter {
    fn import<'a>(
        &'a self,
        registry: &'a LoaderRegistry,
        url: &'a str,
    ) -> LoadFuture<'a, Box<dyn SceneNode>> {
        boxed_load(load_model_gltf(registry, url))
    }
}

enum ImageSource {
    View {
        buffer: usize,
        offset: usize,
        length: usize,
        mime_type: String,
    },
    Uri {
        uri: String,
        mime_type: Option<String>,
    },
}

struct MaterialSource {
    name: String,
    double_sided: bool,
    base_color: Option<(usize, ImageSource)>,
}

pub async fn load_model_gltf(
    registry: &LoaderRegistry,
    url: &str,
) -> anyhow::Result<Box<dyn SceneNode>> {
    let bytes = registry.manager().fetch(url).await?;
    let raw = raw_json(&bytes, url)?;

    let uses_draco = required_extensions(&raw).any(|ext| ext == DRACO_EXTENSION);
    let draco = if uses_draco {
        let Some(backend) = registry.draco().backend().cloned() else {
            return Err(LoadError::UnsupportedExtension {
                extension: DRACO_EXTENSION.to_string(),
                url: url.to_string(),
            }
            .into());
        };
        let module = registry.draco().decoder_module(registry.manager()).await?;
        Some((module, backend))
    } else {
        None
    };
    // gltf rejects documents that require extensions it cannot decode itself
    let gltf = if uses_draco {
        gltf::Gltf::from_slice_without_validation(&bytes)?
    } else {
        gltf::Gltf::from_slice(&bytes)?
    };

    // Load buffers
    let buffer_sources: Vec<Option<String>> = gltf
        .buffers()
        .map(|buffer| match buffer.source() {
            gltf::buffer::Source::Bin => None,
            gltf::buffer::Source::Uri(uri) => Some(uri.to_string()),
        })
        .collect();
    let mut buffer_data = Vec::with_capacity(buffer_sources.len());
    for source in buffer_sources {
        let data = match source {
            None => gltf.blob.clone().ok_or_else(|| LoadError::InvalidAsset {
                url: url.to_string(),
                reason: "buffer refers to a missing binary chunk".to_string(),
            })?,
            Some(uri) => load_uri(registry, url, &uri).await?,
        };
        buffer_data.push(data);
    }

    let animations = load_animations(&gltf, &buffer_data);

    // Load materials, sharing decoded images between materials
    let material_sources = collect_materials(&gltf);
    let mut images: HashMap<usize, Arc<Texture>> = HashMap::new();
    let mut materials = Vec::with_capacity(material_sources.len() + 1);
    for source in material_sources {
        let map = match source.base_color {
            Some((image_idx, _)) if images.contains_key(&image_idx) => images.get(&image_idx).cloned(),
            Some((image_idx, image)) => {
                let texture = load_image(registry, url, &buffer_data, image).await?;
                images.insert(image_idx, texture.clone());
                Some(texture)
            }
            None => None,
        };
        materials.push(Material {
            name: source.name,
            map,
            side: if source.double_sided { Side::Double } else { Side::Front },
        });
    }
    // primitives without a material use the trailing default
    materials.push(Material::untextured("default"));

    let joints: HashSet<usize> = gltf
        .skins()
        .flat_map(|skin| skin.joints().map(|joint| joint.index()).collect::<Vec<_>>())
        .collect();

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .ok_or_else(|| LoadError::InvalidAsset {
            url: url.to_string(),
            reason: "no scene".to_string(),
        })?;

    let ctx = NodeContext {
        url,
        raw: &raw,
        buffers: &buffer_data,
        materials: &materials,
        joints: &joints,
        draco: draco
            .as_ref()
            .map(|(module, backend)| (module.as_ref(), backend.as_ref())),
    };
    let scene_name = scene.name().map(sanitize_node_name);
    let mut root = ContainerNode::new(scene_name.as_deref()).with_animations(animations);
    for node in scene.nodes() {
        root.add_child(to_scene_node(node, &ctx)?);
    }
    log::debug!(
        "imported {url}: {} top-level nodes, {} clips",
        root.get_children().len(),
        root.get_animation().len()
    );
    Ok(Box::new(root))
}

fn raw_json(bytes: &[u8], url: &str) -> anyhow::Result<Value> {
    let json = if bytes.starts_with(b"glTF") {
        gltf::Glb::from_slice(bytes)?.json.into_owned()
    } else {
        bytes.to_vec()
    };
    serde_json::from_slice(&json).map_err(|e| {
        LoadError::InvalidAsset {
            url: url.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

pub(crate) fn required_extensions(raw: &Value) -> impl Iterator<Item = &str> {
    raw.get("extensionsRequired")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

async fn load_uri(registry: &LoaderRegistry, base: &str, uri: &str) -> anyhow::Result<Vec<u8>> {
    match decode_data_uri(uri) {
        Some(decoded) => decoded,
        None => registry.manager().fetch(&join_relative(base, uri)).await,
    }
}

/// Decodes a base64 `data:` URI. Returns `None` for anything else.
fn decode_data_uri(uri: &str) -> Option<anyhow::Result<Vec<u8>>> {
    let rest = uri.strip_prefix("data:")?;
    let Some((_, payload)) = rest.split_once(";base64,") else {
        return Some(Err(anyhow::anyhow!("only base64 data URIs are supported")));
    };
    Some(
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(anyhow::Error::from),
    )
}

fn collect_materials(gltf: &gltf::Gltf) -> Vec<MaterialSource> {
    gltf.materials()
        .map(|material| {
            let base_color = material
                .pbr_metallic_roughness()
                .base_color_texture()
                .map(|info| {
                    let image = info.texture().source();
                    let source = match image.source() {
                        gltf::image::Source::View { view, mime_type } => ImageSource::View {
                            buffer: view.buffer().index(),
                            offset: view.offset(),
                            length: view.length(),
                            mime_type: mime_type.to_string(),
                        },
                        gltf::image::Source::Uri { uri, mime_type } => ImageSource::Uri {
                            uri: uri.to_string(),
                            mime_type: mime_type.map(str::to_string),
                        },
                    };
                    (image.index(), source)
                });
            MaterialSource {
                name: material.name().unwrap_or("material").to_string(),
                double_sided: material.double_sided(),
                base_color,
            }
        })
        .collect()
}

async fn load_image(
    registry: &LoaderRegistry,
    url: &str,
    buffers: &[Vec<u8>],
    image: ImageSource,
) -> anyhow::Result<Arc<Texture>> {
    match image {
        ImageSource::View {
            buffer,
            offset,
            length,
            mime_type,
        } => {
            let bytes = offset
                .checked_add(length)
                .and_then(|end| buffers.get(buffer)?.get(offset..end))
                .ok_or_else(|| LoadError::InvalidAsset {
                    url: url.to_string(),
                    reason: format!("image view out of bounds of buffer {buffer}"),
                })?;
            let label = format!("{url}#image");
            let texture = Texture::from_bytes(bytes, &label, format_from_mime(&mime_type))?;
            Ok(Arc::new(texture))
        }
        ImageSource::Uri { uri, mime_type } => {
            let format = mime_type.as_deref().and_then(format_from_mime);
            if let Some(decoded) = decode_data_uri(&uri) {
                let texture = Texture::from_bytes(&decoded?, &format!("{url}#image"), format)?;
                return Ok(Arc::new(texture));
            }
            let image_url = join_relative(url, &uri);
            match format {
                Some(format) => registry.textures().load_with_format(&image_url, Some(format)).await,
                None => registry.textures().load(&image_url).await,
            }
        }
    }
}

fn load_animations(gltf: &gltf::Gltf, buffer_data: &[Vec<u8>]) -> Vec<Arc<AnimationClip>> {
    let node_names: Vec<Option<String>> = gltf
        .nodes()
        .map(|node| node.name().map(sanitize_node_name))
        .collect();
    let mut clips = Vec::new();
    for animation in gltf.animations() {
        let name = animation
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("animation_{}", animation.index()));
        let mut tracks = Vec::new();
        for channel in animation.channels() {
            let target_idx = channel.target().node().index();
            let Some(target) = node_names[target_idx].clone() else {
                log::warn!("{name}: channel {} targets unnamed node {target_idx}, skipped", channel.index());
                continue;
            };
            let interpolation = match channel.sampler().interpolation() {
                gltf::animation::Interpolation::Linear => Interpolation::Linear,
                gltf::animation::Interpolation::Step => Interpolation::Step,
                gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
            };
            let reader = channel.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));
            let Some(inputs) = reader.read_inputs() else {
                log::warn!("{name}: no keyframe times in channel {}", channel.index());
                continue;
            };
            let timestamps: Vec<f32> = inputs.collect();
            // cubic spline outputs are (in-tangent, value, out-tangent) triples
            let keep = |idx: usize| interpolation != Interpolation::CubicSpline || idx % 3 == 1;
            let keyframes = match reader.read_outputs() {
                Some(gltf::animation::util::ReadOutputs::Translations(translations)) => {
                    Keyframes::Translation(
                        translations
                            .enumerate()
                            .filter(|(idx, _)| keep(*idx))
                            .map(|(_, tr)| tr.into())
                            .collect(),
                    )
                }
                Some(gltf::animation::util::ReadOutputs::Rotations(rotations)) => {
                    Keyframes::Rotation(
                        rotations
                            .into_f32()
                            .enumerate()
                            .filter(|(idx, _)| keep(*idx))
                            .map(|(_, [x, y, z, w])| cgmath::Quaternion::new(w, x, y, z))
                            .collect(),
                    )
                }
                Some(gltf::animation::util::ReadOutputs::Scales(scales)) => Keyframes::Scale(
                    scales
                        .enumerate()
                        .filter(|(idx, _)| keep(*idx))
                        .map(|(_, sc)| sc.into())
                        .collect(),
                ),
                // TODO: morph target weights need per-mesh weight storage on ModelNode
                Some(gltf::animation::util::ReadOutputs::MorphTargetWeights(_)) => Keyframes::Other,
                None => {
                    log::warn!("{name}: no keyframes in channel {}", channel.index());
                    Keyframes::Other
                }
            };
            tracks.push(AnimationTrack {
                target,
                keyframes,
                timestamps,
                interpolation,
            });
        }
        clips.push(Arc::new(AnimationClip::new(name, tracks)));
    }
    clips
}

struct NodeContext<'a> {
    url: &'a str,
    raw: &'a Value,
    buffers: &'a [Vec<u8>],
    materials: &'a [Material],
    joints: &'a HashSet<usize>,
    draco: Option<(&'a DecoderModule, &'a dyn DracoBackend)>,
}

fn to_scene_node(node: gltf::Node, ctx: &NodeContext) -> anyhow::Result<Box<dyn SceneNode>> {
    let name = node.name().map(sanitize_node_name);
    let mut scene_node: Box<dyn SceneNode> = match node.mesh() {
        Some(mesh) => {
            let mut meshes = Vec::new();
            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    log::warn!(
                        "{}: primitive {} of mesh {:?} is not a triangle list, skipped",
                        ctx.url,
                        primitive.index(),
                        mesh.name()
                    );
                    continue;
                }
                let data = match draco_extension(ctx.raw, mesh.index(), primitive.index()) {
                    Some(extension) => decode_draco(ctx, extension)?,
                    None => read_primitive(&primitive, ctx.buffers),
                };
                let material = primitive
                    .material()
                    .index()
                    .unwrap_or(ctx.materials.len() - 1);
                meshes.push(Mesh {
                    name: mesh.name().unwrap_or("unknown_mesh").to_string(),
                    positions: data.positions,
                    normals: data.normals,
                    tex_coords: data.tex_coords,
                    indices: data.indices,
                    groups: Vec::new(),
                    material,
                });
            }
            let model = Model {
                meshes,
                materials: ctx.materials.to_vec(),
            };
            Box::new(ModelNode::from_model(name.as_deref(), model))
        }
        None => Box::new(ContainerNode::new(name.as_deref())),
    };
    scene_node.core_mut().is_bone = ctx.joints.contains(&node.index());

    let (translation, rotation, scale) = node.transform().decomposed();
    *scene_node.local_transform_mut() = Instance {
        position: translation.into(),
        rotation: cgmath::Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: scale.into(),
    };
    for child in node.children() {
        scene_node.add_child(to_scene_node(child, ctx)?);
    }
    Ok(scene_node)
}

fn read_primitive(primitive: &gltf::Primitive, buffers: &[Vec<u8>]) -> DecodedPrimitive {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .map(|positions| positions.collect())
        .unwrap_or_default();
    let normals = reader
        .read_normals()
        .map(|normals| normals.collect())
        .unwrap_or_default();
    let tex_coords = reader
        .read_tex_coords(0)
        .map(|tex_coords| tex_coords.into_f32().collect())
        .unwrap_or_default();
    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    DecodedPrimitive {
        positions,
        normals,
        tex_coords,
        indices,
    }
}

fn draco_extension(raw: &Value, mesh: usize, primitive: usize) -> Option<&Value> {
    raw.pointer(&format!(
        "/meshes/{mesh}/primitives/{primitive}/extensions/{DRACO_EXTENSION}"
    ))
}

fn decode_draco(ctx: &NodeContext, extension: &Value) -> anyhow::Result<DecodedPrimitive> {
    let invalid = |reason: &str| LoadError::InvalidAsset {
        url: ctx.url.to_string(),
        reason: format!("{DRACO_EXTENSION}: {reason}"),
    };
    let Some((module, backend)) = ctx.draco else {
        return Err(LoadError::UnsupportedExtension {
            extension: DRACO_EXTENSION.to_string(),
            url: ctx.url.to_string(),
        }
        .into());
    };
    let view_idx = extension
        .get("bufferView")
        .and_then(Value::as_u64)
        .ok_or_else(|| invalid("missing bufferView"))? as usize;
    let attributes: BTreeMap<String, u32> = extension
        .get("attributes")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("missing attributes"))?
        .iter()
        .filter_map(|(semantic, id)| Some((semantic.clone(), id.as_u64()? as u32)))
        .collect();
    let data = buffer_view_bytes(ctx.raw, ctx.buffers, view_idx)
        .ok_or_else(|| invalid("bufferView out of bounds"))?;
    backend.decode(module, &DracoPrimitive { data, attributes })
}

fn buffer_view_bytes<'a>(raw: &Value, buffers: &'a [Vec<u8>], view_idx: usize) -> Option<&'a [u8]> {
    let view = raw.get("bufferViews")?.get(view_idx)?;
    let buffer = view.get("buffer")?.as_u64()? as usize;
    let offset = view.get("byteOffset").and_then(Value::as_u64).unwrap_or(0) as usize;
    let length = view.get("byteLength")?.as_u64()? as usize;
    buffers.get(buffer)?.get(offset..offset.checked_add(length)?)
}
