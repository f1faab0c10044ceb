//! Read/write access to the JSON and binary chunk of a self-contained GLB.
//!
//! Only what the simplifier needs: reading vertex attributes and indices,
//! appending replacement accessors and writing the file back with every
//! accessor and buffer view nobody references any more removed.

use std::{
    borrow::Cow,
    collections::{BTreeSet, HashMap},
};

use anyhow::{Context, anyhow, bail};
use serde_json::{Map, Value, json};

pub const BYTE: u64 = 5120;
pub const UNSIGNED_BYTE: u64 = 5121;
pub const SHORT: u64 = 5122;
pub const UNSIGNED_SHORT: u64 = 5123;
pub const UNSIGNED_INT: u64 = 5125;
pub const FLOAT: u64 = 5126;

const ARRAY_BUFFER: u64 = 34962;
const ELEMENT_ARRAY_BUFFER: u64 = 34963;

pub fn component_size(component_type: u64) -> Option<usize> {
    match component_type {
        BYTE | UNSIGNED_BYTE => Some(1),
        SHORT | UNSIGNED_SHORT => Some(2),
        UNSIGNED_INT | FLOAT => Some(4),
        _ => None,
    }
}

pub fn component_count(type_name: &str) -> Option<usize> {
    match type_name {
        "SCALAR" => Some(1),
        "VEC2" => Some(2),
        "VEC3" => Some(3),
        "VEC4" | "MAT2" => Some(4),
        "MAT3" => Some(9),
        "MAT4" => Some(16),
        _ => None,
    }
}

/// Tightly packed elements of one accessor.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeData {
    pub component_type: u64,
    pub type_name: String,
    pub normalized: bool,
    pub element_size: usize,
    pub data: Vec<u8>,
}

impl AttributeData {
    pub fn count(&self) -> usize {
        if self.element_size == 0 {
            0
        } else {
            self.data.len() / self.element_size
        }
    }

    pub fn components(&self) -> usize {
        component_count(&self.type_name).unwrap_or(0)
    }

    pub fn is_float(&self) -> bool {
        self.component_type == FLOAT
    }

    pub fn element(&self, idx: usize) -> &[u8] {
        &self.data[idx * self.element_size..(idx + 1) * self.element_size]
    }

    /// Component `component` of element `idx`. Only meaningful for float data.
    pub fn float(&self, idx: usize, component: usize) -> f32 {
        let start = idx * self.element_size + component * 4;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[start..start + 4]);
        f32::from_le_bytes(bytes)
    }

    /// A new attribute holding the elements at `order`, in that order.
    pub fn gather(&self, order: &[u32]) -> Self {
        let mut data = Vec::with_capacity(order.len() * self.element_size);
        for &idx in order {
            data.extend_from_slice(self.element(idx as usize));
        }
        Self {
            data,
            type_name: self.type_name.clone(),
            ..*self
        }
    }

    fn bounds(&self) -> (Vec<f32>, Vec<f32>) {
        let components = self.components();
        let mut min = vec![f32::INFINITY; components];
        let mut max = vec![f32::NEG_INFINITY; components];
        for idx in 0..self.count() {
            for c in 0..components {
                let value = self.float(idx, c);
                min[c] = min[c].min(value);
                max[c] = max[c].max(value);
            }
        }
        (min, max)
    }
}

pub struct GlbDocument {
    pub json: Value,
    bin: Vec<u8>,
    /// Data of buffer views appended since loading, by view index.
    appended: HashMap<usize, Vec<u8>>,
}

impl GlbDocument {
    pub fn from_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        let glb = gltf::Glb::from_slice(bytes).context("not a binary glTF file")?;
        let json: Value = serde_json::from_slice(&glb.json).context("malformed glTF JSON")?;
        let buffers = json.get("buffers").and_then(Value::as_array).map_or(&[][..], Vec::as_slice);
        if buffers.len() > 1 || buffers.iter().any(|buffer| buffer.get("uri").is_some()) {
            bail!("only GLB files with a single embedded buffer are supported");
        }
        Ok(Self {
            json,
            bin: glb.bin.map(Cow::into_owned).unwrap_or_default(),
            appended: HashMap::new(),
        })
    }

    /// The first of `names` the file declares as used or required.
    pub fn uses_any_extension(&self, names: &[&str]) -> Option<String> {
        ["extensionsUsed", "extensionsRequired"]
            .iter()
            .filter_map(|key| self.json.get(*key).and_then(Value::as_array))
            .flatten()
            .filter_map(Value::as_str)
            .find(|ext| names.contains(ext))
            .map(str::to_string)
    }

    pub fn accessor(&self, idx: u64) -> anyhow::Result<&Value> {
        self.json
            .get("accessors")
            .and_then(|accessors| accessors.get(idx as usize))
            .ok_or_else(|| anyhow!("accessor {idx} does not exist"))
    }

    pub fn read_attribute(&self, idx: u64) -> anyhow::Result<AttributeData> {
        let accessor = self.accessor(idx)?;
        if accessor.get("sparse").is_some() {
            bail!("accessor {idx} is sparse");
        }
        let component_type = accessor
            .get("componentType")
            .and_then(Value::as_u64)
            .ok_or_else(|| anyhow!("accessor {idx} has no componentType"))?;
        let type_name = accessor
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("accessor {idx} has no type"))?;
        let element_size = component_size(component_type)
            .zip(component_count(type_name))
            .map(|(size, count)| size * count)
            .ok_or_else(|| anyhow!("accessor {idx} has an unknown layout"))?;
        let count = accessor.get("count").and_then(Value::as_u64).unwrap_or(0) as usize;

        let Some(size) = count.checked_mul(element_size) else {
            bail!("accessor {idx} with {count} elements does not fit in memory");
        };
        if let Some(view_idx) = accessor.get("bufferView").and_then(Value::as_u64) {
            // the view must hold every element before anything is allocated
            let available = self.view_bytes(view_idx as usize)?.len();
            if size > available {
                bail!("accessor {idx} overruns buffer view {view_idx}");
            }
        }

        // accessors without a buffer view are all zeros
        let mut data = vec![0u8; size];
        if let Some(view_idx) = accessor.get("bufferView").and_then(Value::as_u64) {
            let view = self.view(view_idx as usize)?;
            let bytes = self.view_bytes(view_idx as usize)?;
            let stride = view
                .get("byteStride")
                .and_then(Value::as_u64)
                .map_or(element_size, |stride| stride as usize);
            let offset = accessor.get("byteOffset").and_then(Value::as_u64).unwrap_or(0) as usize;
            for (i, element) in data.chunks_exact_mut(element_size).enumerate() {
                let src = i
                    .checked_mul(stride)
                    .and_then(|step| step.checked_add(offset))
                    .and_then(|start| bytes.get(start..start.checked_add(element_size)?))
                    .ok_or_else(|| anyhow!("accessor {idx} overruns buffer view {view_idx}"))?;
                element.copy_from_slice(src);
            }
        }
        Ok(AttributeData {
            component_type,
            type_name: type_name.to_string(),
            normalized: accessor
                .get("normalized")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            element_size,
            data,
        })
    }

    pub fn read_indices(&self, idx: u64) -> anyhow::Result<Vec<u32>> {
        let data = self.read_attribute(idx)?;
        if data.type_name != "SCALAR" {
            bail!("index accessor {idx} is not SCALAR");
        }
        let indices = match data.component_type {
            UNSIGNED_BYTE => data.data.iter().map(|&i| i as u32).collect(),
            UNSIGNED_SHORT => data
                .data
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as u32)
                .collect(),
            UNSIGNED_INT => data
                .data
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
            other => bail!("index accessor {idx} has component type {other}"),
        };
        Ok(indices)
    }

    /// Appends `data` as a new vertex attribute accessor and returns its index.
    pub fn push_attribute(&mut self, data: &AttributeData, with_bounds: bool) -> anyhow::Result<u64> {
        let view = self.push_view(data.data.clone(), ARRAY_BUFFER)?;
        let mut accessor = json!({
            "bufferView": view,
            "componentType": data.component_type,
            "count": data.count(),
            "type": data.type_name,
        });
        if data.normalized {
            accessor["normalized"] = Value::Bool(true);
        }
        if with_bounds && data.is_float() && data.count() > 0 {
            let (min, max) = data.bounds();
            accessor["min"] = json!(min);
            accessor["max"] = json!(max);
        }
        push(&mut self.json, "accessors", accessor)
    }

    /// Appends an index accessor, 16 bit when every index fits.
    pub fn push_indices(&mut self, indices: &[u32]) -> anyhow::Result<u64> {
        let narrow = indices.iter().all(|&i| i < u16::MAX as u32);
        let (component_type, bytes) = if narrow {
            let narrowed: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
            (UNSIGNED_SHORT, bytemuck::cast_slice::<u16, u8>(&narrowed).to_vec())
        } else {
            (UNSIGNED_INT, bytemuck::cast_slice::<u32, u8>(indices).to_vec())
        };
        let view = self.push_view(bytes, ELEMENT_ARRAY_BUFFER)?;
        push(
            &mut self.json,
            "accessors",
            json!({
                "bufferView": view,
                "componentType": component_type,
                "count": indices.len(),
                "type": "SCALAR",
            }),
        )
    }

    fn push_view(&mut self, data: Vec<u8>, target: u64) -> anyhow::Result<u64> {
        let view = json!({ "buffer": 0, "byteLength": data.len(), "target": target });
        let idx = push(&mut self.json, "bufferViews", view)?;
        self.appended.insert(idx as usize, data);
        Ok(idx)
    }

    fn view(&self, idx: usize) -> anyhow::Result<&Value> {
        self.json
            .get("bufferViews")
            .and_then(|views| views.get(idx))
            .ok_or_else(|| anyhow!("buffer view {idx} does not exist"))
    }

    fn view_bytes(&self, idx: usize) -> anyhow::Result<&[u8]> {
        match self.appended.get(&idx) {
            Some(data) => Ok(data),
            None => stored_view_bytes(self.view(idx)?, &self.bin)
                .ok_or_else(|| anyhow!("buffer view {idx} lies outside the binary chunk")),
        }
    }

    /**
     * Serializes the document as GLB.
     *
     * Accessors and buffer views that are no longer referenced are dropped,
     * the rest are renumbered and the binary chunk is rebuilt from the
     * surviving views.
     */
    pub fn to_glb(self) -> anyhow::Result<Vec<u8>> {
        let Self {
            mut json,
            bin,
            appended,
        } = self;

        let mut used_accessors = BTreeSet::new();
        for_each_accessor_ref(&mut json, &mut |slot: &mut Value| {
            if let Some(idx) = slot.as_u64() {
                used_accessors.insert(idx);
            }
        });
        let accessor_map = retain_indexed(&mut json, "accessors", &used_accessors);
        for_each_accessor_ref(&mut json, &mut |slot: &mut Value| renumber(slot, &accessor_map));

        let mut used_views = BTreeSet::new();
        for_each_view_ref(&mut json, &mut |slot: &mut Value| {
            if let Some(idx) = slot.as_u64() {
                used_views.insert(idx);
            }
        });
        let old_views: Vec<Value> = json
            .get("bufferViews")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let view_map = retain_indexed(&mut json, "bufferViews", &used_views);
        for_each_view_ref(&mut json, &mut |slot: &mut Value| renumber(slot, &view_map));

        let mut out = Vec::new();
        let mut views = Vec::new();
        for (old_idx, mut view) in old_views.into_iter().enumerate() {
            if !used_views.contains(&(old_idx as u64)) {
                continue;
            }
            let bytes = match appended.get(&old_idx) {
                Some(data) => data.as_slice(),
                None => stored_view_bytes(&view, &bin)
                    .ok_or_else(|| anyhow!("buffer view {old_idx} lies outside the binary chunk"))?,
            };
            pad_to_four(&mut out);
            let offset = out.len();
            out.extend_from_slice(bytes);
            let fields = view
                .as_object_mut()
                .ok_or_else(|| anyhow!("buffer view {old_idx} is not an object"))?;
            fields.insert("buffer".into(), json!(0));
            fields.insert("byteOffset".into(), json!(offset));
            fields.insert("byteLength".into(), json!(bytes.len()));
            views.push(view);
        }
        pad_to_four(&mut out);

        let root = json
            .as_object_mut()
            .ok_or_else(|| anyhow!("glTF JSON root is not an object"))?;
        let bin = if views.is_empty() {
            root.remove("bufferViews");
            root.remove("buffers");
            None
        } else {
            root.insert("bufferViews".into(), Value::Array(views));
            root.insert("buffers".into(), json!([{ "byteLength": out.len() }]));
            Some(out)
        };

        let json_bytes = serde_json::to_vec(&json)?;
        let length = 12
            + 8
            + json_bytes.len().next_multiple_of(4)
            + bin.as_ref().map_or(0, |bin| 8 + bin.len().next_multiple_of(4));
        let glb = gltf::Glb {
            header: gltf::binary::Header {
                magic: *b"glTF",
                version: 2,
                length: length as u32,
            },
            json: Cow::Owned(json_bytes),
            bin: bin.map(Cow::Owned),
        };
        Ok(glb.to_vec()?)
    }
}

fn push(json: &mut Value, key: &str, item: Value) -> anyhow::Result<u64> {
    let list = json
        .as_object_mut()
        .ok_or_else(|| anyhow!("glTF JSON root is not an object"))?
        .entry(key)
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| anyhow!("`{key}` is not an array"))?;
    list.push(item);
    Ok(list.len() as u64 - 1)
}

fn stored_view_bytes<'a>(view: &Value, bin: &'a [u8]) -> Option<&'a [u8]> {
    let offset = view.get("byteOffset").and_then(Value::as_u64).unwrap_or(0) as usize;
    let length = view.get("byteLength")?.as_u64()? as usize;
    bin.get(offset..offset.checked_add(length)?)
}

fn pad_to_four(data: &mut Vec<u8>) {
    data.resize(data.len().next_multiple_of(4), 0);
}

/// Keeps the entries of `json[key]` whose index is in `used`; returns old index to new index.
fn retain_indexed(json: &mut Value, key: &str, used: &BTreeSet<u64>) -> HashMap<u64, u64> {
    let mut map = HashMap::new();
    let Some(root) = json.as_object_mut() else {
        return map;
    };
    let Some(items) = root.get_mut(key).and_then(Value::as_array_mut) else {
        return map;
    };
    let kept: Vec<Value> = std::mem::take(items)
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| used.contains(&(*idx as u64)))
        .map(|(idx, item)| {
            map.insert(idx as u64, map.len() as u64);
            item
        })
        .collect();
    if kept.is_empty() {
        root.remove(key);
    } else {
        *items = kept;
    }
    map
}

fn renumber(slot: &mut Value, map: &HashMap<u64, u64>) {
    if let Some(new_idx) = slot.as_u64().and_then(|idx| map.get(&idx)) {
        *slot = json!(new_idx);
    }
}

fn items_mut<'a>(value: &'a mut Value, key: &str) -> impl Iterator<Item = &'a mut Value> {
    value
        .get_mut(key)
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
}

fn values_mut(value: Option<&mut Value>) -> impl Iterator<Item = &mut Value> {
    value
        .and_then(Value::as_object_mut)
        .into_iter()
        .flat_map(Map::values_mut)
}

/// Every place in a glTF document that holds an accessor index.
fn for_each_accessor_ref(json: &mut Value, visit: &mut dyn FnMut(&mut Value)) {
    for mesh in items_mut(json, "meshes") {
        for primitive in items_mut(mesh, "primitives") {
            values_mut(primitive.get_mut("attributes")).for_each(&mut *visit);
            if let Some(indices) = primitive.get_mut("indices") {
                visit(indices);
            }
            for target in items_mut(primitive, "targets") {
                values_mut(Some(target)).for_each(&mut *visit);
            }
        }
    }
    for skin in items_mut(json, "skins") {
        if let Some(matrices) = skin.get_mut("inverseBindMatrices") {
            visit(matrices);
        }
    }
    for animation in items_mut(json, "animations") {
        for sampler in items_mut(animation, "samplers") {
            for key in ["input", "output"] {
                if let Some(slot) = sampler.get_mut(key) {
                    visit(slot);
                }
            }
        }
    }
    for node in items_mut(json, "nodes") {
        values_mut(node.pointer_mut("/extensions/EXT_mesh_gpu_instancing/attributes"))
            .for_each(&mut *visit);
    }
}

/// Every place in a glTF document that holds a buffer view index.
fn for_each_view_ref(json: &mut Value, visit: &mut dyn FnMut(&mut Value)) {
    for accessor in items_mut(json, "accessors") {
        for pointer in ["/bufferView", "/sparse/indices/bufferView", "/sparse/values/bufferView"] {
            if let Some(slot) = accessor.pointer_mut(pointer) {
                visit(slot);
            }
        }
    }
    for image in items_mut(json, "images") {
        if let Some(slot) = image.get_mut("bufferView") {
            visit(slot);
        }
    }
}
