use std::{
    collections::HashMap,
    io::Cursor,
    sync::{Arc, Mutex},
};

use golf_scene::{
    LoaderRegistry, SceneConfig,
    meshes::sky::{ALL_SKY_THEMES, SKY_FACES, theme_urls},
    resources::manager::{AssetManager, AssetSource, FetchFuture, boxed_load},
};
use serde_json::{Value, json};

const FLOAT: u64 = 5126;
const UNSIGNED_SHORT: u64 = 5123;

/// Serves assets from memory and remembers every URL it was asked for.
#[derive(Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
    fetched: Mutex<Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(url.to_string(), bytes);
        self
    }

    pub fn without(mut self, url: &str) -> Self {
        self.files.remove(url);
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl AssetSource for MemorySource {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        boxed_load(async move {
            self.fetched.lock().unwrap().push(url.to_string());
            match self.files.get(url) {
                Some(bytes) => Ok(bytes.clone()),
                None => anyhow::bail!("404 Not Found: {url}"),
            }
        })
    }
}

/// A registry over `source` with the default DRACO file overrides.
pub fn registry(source: MemorySource) -> (Arc<LoaderRegistry>, Arc<MemorySource>) {
    let source = Arc::new(source);
    let draco = SceneConfig::default().draco;
    let manager = AssetManager::new(source.clone())
        .with_url_override("draco_wasm_wrapper.js", draco.wrapper_url)
        .with_url_override("draco_decoder.wasm", draco.decoder_url);
    (Arc::new(LoaderRegistry::new(Arc::new(manager))), source)
}

/// Every sky face of every theme, each theme in its own colour.
pub fn with_sky_textures(mut source: MemorySource, texture_dir: &str) -> MemorySource {
    for (idx, theme) in ALL_SKY_THEMES.iter().enumerate() {
        for url in theme_urls(texture_dir, theme) {
            source = source.with(&url, png([idx as u8 * 20, 0, 0, 255]));
        }
    }
    assert_eq!(SKY_FACES.len(), 6);
    source
}

pub fn png(rgba: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("failed to encode png");
    bytes.into_inner()
}

/// Assembles small GLB files accessor by accessor.
pub struct GlbBuilder {
    json: Value,
    bin: Vec<u8>,
}

impl GlbBuilder {
    pub fn new() -> Self {
        Self {
            json: json!({
                "asset": { "version": "2.0" },
                "scene": 0,
                "scenes": [{ "nodes": [] }],
            }),
            bin: Vec::new(),
        }
    }

    pub fn push(&mut self, key: &str, item: Value) -> usize {
        let list = self.json[key].as_array_mut();
        match list {
            Some(list) => {
                list.push(item);
                list.len() - 1
            }
            None => {
                self.json[key] = json!([item]);
                0
            }
        }
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.json[key] = value;
    }

    fn view(&mut self, bytes: &[u8]) -> usize {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        let offset = self.bin.len();
        self.bin.extend_from_slice(bytes);
        self.push(
            "bufferViews",
            json!({ "buffer": 0, "byteOffset": offset, "byteLength": bytes.len() }),
        )
    }

    /// Float accessor of `type_name` elements; `min`/`max` are always written.
    pub fn floats(&mut self, values: &[f32], type_name: &str) -> usize {
        let components = match type_name {
            "SCALAR" => 1,
            "VEC2" => 2,
            "VEC3" => 3,
            "VEC4" => 4,
            other => panic!("unsupported accessor type {other}"),
        };
        let mut min = vec![f32::INFINITY; components];
        let mut max = vec![f32::NEG_INFINITY; components];
        for element in values.chunks_exact(components) {
            for (c, value) in element.iter().enumerate() {
                min[c] = min[c].min(*value);
                max[c] = max[c].max(*value);
            }
        }
        let view = self.view(bytemuck::cast_slice(values));
        self.push(
            "accessors",
            json!({
                "bufferView": view,
                "componentType": FLOAT,
                "count": values.len() / components,
                "type": type_name,
                "min": min,
                "max": max,
            }),
        )
    }

    pub fn indices(&mut self, values: &[u16]) -> usize {
        let view = self.view(bytemuck::cast_slice(values));
        self.push(
            "accessors",
            json!({
                "bufferView": view,
                "componentType": UNSIGNED_SHORT,
                "count": values.len(),
                "type": "SCALAR",
            }),
        )
    }

    /// A mesh with one triangle-list primitive.
    pub fn mesh(&mut self, name: &str, positions: &[[f32; 3]], indices: Option<&[u16]>) -> usize {
        let position = self.floats(bytemuck::cast_slice(positions), "VEC3");
        let mut primitive = json!({ "attributes": { "POSITION": position } });
        if let Some(indices) = indices {
            primitive["indices"] = json!(self.indices(indices));
        }
        self.push("meshes", json!({ "name": name, "primitives": [primitive] }))
    }

    pub fn node(&mut self, node: Value) -> usize {
        self.push("nodes", node)
    }

    pub fn root(&mut self, node: usize) {
        self.json["scenes"][0]["nodes"]
            .as_array_mut()
            .expect("scene without node list")
            .push(json!(node));
    }

    pub fn build(mut self) -> Vec<u8> {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        if !self.bin.is_empty() {
            self.json["buffers"] = json!([{ "byteLength": self.bin.len() }]);
        }
        let json = serde_json::to_vec(&self.json).expect("failed to serialize glTF JSON");
        let length = 12 + 8 + json.len().next_multiple_of(4) + 8 + self.bin.len();
        gltf::Glb {
            header: gltf::binary::Header {
                magic: *b"glTF",
                version: 2,
                length: length as u32,
            },
            json: json.into(),
            bin: (!self.bin.is_empty()).then(|| self.bin.into()),
        }
        .to_vec()
        .expect("failed to write GLB")
    }
}

const TRIANGLE: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];

/// One node called `name` holding a single triangle.
pub fn mesh_glb(name: &str) -> Vec<u8> {
    let mut glb = GlbBuilder::new();
    let mesh = glb.mesh(name, &TRIANGLE, Some(&[0, 1, 2]));
    let node = glb.node(json!({ "name": name, "mesh": mesh }));
    glb.root(node);
    glb.build()
}

/**
 * A tiny Mixamo-style rig: `Armature > mixamorig:Hips > mixamorig:LeftHand`
 * next to a `Body` mesh. With `animated`, the clip `golf_drive` lifts the
 * hand by 10 units and turns it 90 degrees about Z over one second.
 */
pub fn character_glb(animated: bool) -> Vec<u8> {
    let mut glb = GlbBuilder::new();
    let hand = glb.node(json!({ "name": "mixamorig:LeftHand", "translation": [20.0, 0.0, 0.0] }));
    let hips = glb.node(json!({
        "name": "mixamorig:Hips",
        "translation": [0.0, 100.0, 0.0],
        "children": [hand],
    }));
    let armature = glb.node(json!({ "name": "Armature", "children": [hips] }));
    let mesh = glb.mesh("Body", &TRIANGLE, Some(&[0, 1, 2]));
    let body = glb.node(json!({ "name": "Body", "mesh": mesh }));
    glb.root(armature);
    glb.root(body);
    glb.push("skins", json!({ "joints": [hips, hand] }));

    if animated {
        let times = glb.floats(&[0.0, 1.0], "SCALAR");
        let translations = glb.floats(&[20.0, 0.0, 0.0, 20.0, 10.0, 0.0], "VEC3");
        let half = std::f32::consts::FRAC_1_SQRT_2;
        let rotations = glb.floats(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, half, half], "VEC4");
        glb.push(
            "animations",
            json!({
                "name": "golf_drive",
                "samplers": [
                    { "input": times, "output": translations, "interpolation": "LINEAR" },
                    { "input": times, "output": rotations, "interpolation": "LINEAR" },
                ],
                "channels": [
                    { "sampler": 0, "target": { "node": hand, "path": "translation" } },
                    { "sampler": 1, "target": { "node": hand, "path": "rotation" } },
                ],
            }),
        );
    }
    glb.build()
}

/// A flat `cells` x `cells` grid of unit squares as a non-indexed triangle soup.
pub fn grid_glb(cells: usize) -> Vec<u8> {
    let mut positions = Vec::new();
    for x in 0..cells {
        for z in 0..cells {
            let (x0, z0, x1, z1) = (x as f32, z as f32, x as f32 + 1.0, z as f32 + 1.0);
            positions.extend_from_slice(&[
                [x0, 0.0, z0],
                [x0, 0.0, z1],
                [x1, 0.0, z0],
                [x1, 0.0, z0],
                [x0, 0.0, z1],
                [x1, 0.0, z1],
            ]);
        }
    }
    let mut glb = GlbBuilder::new();
    let mesh = glb.mesh("course", &positions, None);
    let node = glb.node(json!({ "name": "course", "mesh": mesh }));
    glb.root(node);
    glb.build()
}

/// A triangle whose geometry is stored DRACO-compressed.
pub fn draco_glb() -> Vec<u8> {
    let mut glb = GlbBuilder::new();
    let view = glb.view(&[0xd5, 0x1c, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05]);
    let position = glb.push(
        "accessors",
        json!({
            "componentType": FLOAT,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [1.0, 1.0, 0.0],
        }),
    );
    let mesh = glb.push(
        "meshes",
        json!({
            "name": "compressed",
            "primitives": [{
                "attributes": { "POSITION": position },
                "extensions": {
                    "KHR_draco_mesh_compression": {
                        "bufferView": view,
                        "attributes": { "POSITION": 0 },
                    },
                },
            }],
        }),
    );
    let node = glb.node(json!({ "name": "compressed", "mesh": mesh }));
    glb.root(node);
    glb.set("extensionsUsed", json!(["KHR_draco_mesh_compression"]));
    glb.set("extensionsRequired", json!(["KHR_draco_mesh_compression"]));
    glb.build()
}
