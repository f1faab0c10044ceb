//! Offline mesh reduction for GLB files.
//!
//! Every triangle primitive is welded and then simplified with meshoptimizer;
//! everything else in the file (images, skins, animations, node hierarchy) is
//! written back unchanged.

use std::{collections::BTreeMap, fmt, path::Path};

use anyhow::{Context, anyhow};
use serde_json::Value;

use crate::{error::LoadError, simplify::document::GlbDocument};

pub mod document;
pub mod weld;

use document::FLOAT;
use weld::PrimitiveData;

pub const DEFAULT_GLB_PATH: &str = "static/models/world-golfplatz-big-cp.glb";

/// Compressed geometry cannot be rewritten without its decoder.
const UNSUPPORTED_EXTENSIONS: [&str; 2] = ["KHR_draco_mesh_compression", "EXT_meshopt_compression"];
const TRIANGLES: u64 = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimplifyOptions {
    /// Weld tolerance as a fraction of each attribute's value range.
    pub weld_tolerance: f32,
    /// Fraction of triangles to keep.
    pub ratio: f32,
    /// Maximum relative error meshoptimizer may introduce.
    pub error: f32,
}

impl Default for SimplifyOptions {
    fn default() -> Self {
        Self {
            weld_tolerance: 0.1,
            ratio: 1.0,
            error: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OptimizeReport {
    pub primitives: usize,
    pub skipped: usize,
    pub vertices_before: usize,
    pub vertices_after: usize,
    pub indices_before: usize,
    pub indices_after: usize,
}

impl fmt::Display for OptimizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} primitives ({} skipped): vertices {} -> {}, indices {} -> {}",
            self.primitives,
            self.skipped,
            self.vertices_before,
            self.vertices_after,
            self.indices_before,
            self.indices_after
        )
    }
}

/// Reads the GLB at `path`, optimizes it and overwrites it. The file is only written once everything else succeeded.
pub fn optimize_file(path: impl AsRef<Path>, options: &SimplifyOptions) -> anyhow::Result<OptimizeReport> {
    let path = path.as_ref();
    let input = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let (output, report) =
        optimize_glb(&input, options).with_context(|| format!("failed to optimize {}", path.display()))?;
    std::fs::write(path, output).with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("{}: {report}", path.display());
    Ok(report)
}

pub fn optimize_glb(bytes: &[u8], options: &SimplifyOptions) -> anyhow::Result<(Vec<u8>, OptimizeReport)> {
    let mut document = GlbDocument::from_slice(bytes)?;
    if let Some(extension) = document.uses_any_extension(&UNSUPPORTED_EXTENSIONS) {
        return Err(LoadError::UnsupportedExtension {
            extension,
            url: "<glb>".to_string(),
        }
        .into());
    }

    let mut report = OptimizeReport::default();
    let primitive_counts: Vec<usize> = list(&document.json, "meshes")
        .iter()
        .map(|mesh| list(mesh, "primitives").len())
        .collect();
    for (mesh, count) in primitive_counts.into_iter().enumerate() {
        for primitive in 0..count {
            report.primitives += 1;
            let pointer = format!("/meshes/{mesh}/primitives/{primitive}");
            match optimize_primitive(&mut document, &pointer, options)? {
                Some((before, after)) => {
                    report.vertices_before += before.0;
                    report.indices_before += before.1;
                    report.vertices_after += after.0;
                    report.indices_after += after.1;
                }
                None => report.skipped += 1,
            }
        }
    }
    Ok((document.to_glb()?, report))
}

fn list<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice)
}

/// Why a primitive cannot be processed, if it cannot.
fn skip_reason(document: &GlbDocument, primitive: &Value) -> anyhow::Result<Option<&'static str>> {
    if primitive.get("mode").and_then(Value::as_u64).unwrap_or(TRIANGLES) != TRIANGLES {
        return Ok(Some("not a triangle list"));
    }
    if !list(primitive, "targets").is_empty() {
        return Ok(Some("has morph targets"));
    }
    let Some(position) = primitive.pointer("/attributes/POSITION").and_then(Value::as_u64) else {
        return Ok(Some("has no POSITION"));
    };
    let position = document.accessor(position)?;
    if position.get("componentType").and_then(Value::as_u64) != Some(FLOAT)
        || position.get("type").and_then(Value::as_str) != Some("VEC3")
    {
        return Ok(Some("POSITION is not float VEC3"));
    }
    let attributes = primitive
        .get("attributes")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|attributes| attributes.values());
    for accessor in attributes.chain(primitive.get("indices")) {
        let idx = accessor
            .as_u64()
            .ok_or_else(|| anyhow!("accessor reference {accessor} is not an index"))?;
        if document.accessor(idx)?.get("sparse").is_some() {
            return Ok(Some("uses sparse accessors"));
        }
    }
    Ok(None)
}

type Counts = (usize, usize);

/// Welds, simplifies and compacts one primitive in place. Returns `None` when it was left untouched.
fn optimize_primitive(
    document: &mut GlbDocument,
    pointer: &str,
    options: &SimplifyOptions,
) -> anyhow::Result<Option<(Counts, Counts)>> {
    let primitive = document
        .json
        .pointer(pointer)
        .cloned()
        .ok_or_else(|| anyhow!("{pointer} does not exist"))?;
    if let Some(reason) = skip_reason(document, &primitive)? {
        log::warn!("{pointer}: {reason}, left untouched");
        return Ok(None);
    }

    let mut attributes = BTreeMap::new();
    if let Some(map) = primitive.get("attributes").and_then(Value::as_object) {
        for (semantic, accessor) in map {
            let idx = accessor.as_u64().unwrap_or_default();
            attributes.insert(semantic.clone(), document.read_attribute(idx)?);
        }
    }
    let input = PrimitiveData {
        indices: Vec::new(),
        attributes,
    };
    let vertex_count = input.vertex_count();
    if let Some((semantic, _)) = input.attributes.iter().find(|(_, data)| data.count() != vertex_count) {
        return Err(anyhow!("{pointer}: {semantic} count differs from POSITION"));
    }
    let indices = match primitive.get("indices").and_then(Value::as_u64) {
        Some(idx) => document.read_indices(idx)?,
        None => (0..vertex_count as u32).collect(),
    };
    if indices.len() % 3 != 0 {
        log::warn!("{pointer}: index count {} is not a multiple of 3, left untouched", indices.len());
        return Ok(None);
    }
    if let Some(bad) = indices.iter().find(|&&idx| idx as usize >= vertex_count) {
        return Err(anyhow!("{pointer}: index {bad} out of range for {vertex_count} vertices"));
    }
    let input = PrimitiveData { indices, ..input };
    let before = (vertex_count, input.indices.len());

    let welded = weld::weld(&input, options.weld_tolerance);
    let simplified = simplify_indices(&welded, options.ratio, options.error)?;
    let output = weld::compact(&welded, &simplified);
    if output.indices.is_empty() {
        log::warn!("{pointer}: nothing left after simplification, left untouched");
        return Ok(None);
    }

    let mut new_attributes = serde_json::Map::new();
    for (semantic, data) in &output.attributes {
        let idx = document.push_attribute(data, semantic == "POSITION")?;
        new_attributes.insert(semantic.clone(), idx.into());
    }
    let indices = document.push_indices(&output.indices)?;
    let target = document
        .json
        .pointer_mut(pointer)
        .and_then(Value::as_object_mut)
        .ok_or_else(|| anyhow!("{pointer} is not an object"))?;
    target.insert("attributes".into(), Value::Object(new_attributes));
    target.insert("indices".into(), indices.into());

    let after = (output.vertex_count(), output.indices.len());
    log::debug!("{pointer}: vertices {} -> {}, indices {} -> {}", before.0, after.0, before.1, after.1);
    Ok(Some((before, after)))
}

/// Runs meshoptimizer's simplifier towards `ratio` of the triangles, never exceeding `error`.
fn simplify_indices(primitive: &PrimitiveData, ratio: f32, error: f32) -> anyhow::Result<Vec<u32>> {
    if primitive.indices.is_empty() {
        return Ok(Vec::new());
    }
    let positions = primitive.positions();
    let target_count = (ratio * primitive.indices.len() as f32 / 3.0).floor() as usize * 3;
    let vertices = meshopt::VertexDataAdapter::new(
        bytemuck::cast_slice(&positions),
        std::mem::size_of::<[f32; 3]>(),
        0,
    )
    .map_err(|e| anyhow!("invalid vertex data: {e:?}"))?;
    Ok(meshopt::simplify(
        &primitive.indices,
        &vertices,
        target_count,
        error,
        meshopt::SimplifyOptions::empty(),
        None,
    ))
}
