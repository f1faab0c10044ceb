//! A minimal binary FBX 7.4 writer for fixtures.

pub const TICKS_PER_SECOND: i64 = 46_186_158_000;

const FOOTER_MAGIC: [u8; 16] = [
    0xf8, 0x5a, 0x8c, 0x6a, 0xde, 0xf5, 0xd9, 0x7e, 0xec, 0xe9, 0x0c, 0xe3, 0x75, 0x8f, 0x29, 0x0b,
];

pub enum Prop {
    I32(i32),
    I64(i64),
    F64(f64),
    Str(String),
    Raw(Vec<u8>),
    F32s(Vec<f32>),
    F64s(Vec<f64>),
    I32s(Vec<i32>),
    I64s(Vec<i64>),
}

impl From<i32> for Prop {
    fn from(value: i32) -> Self {
        Prop::I32(value)
    }
}

impl From<i64> for Prop {
    fn from(value: i64) -> Self {
        Prop::I64(value)
    }
}

impl From<f64> for Prop {
    fn from(value: f64) -> Self {
        Prop::F64(value)
    }
}

impl From<&str> for Prop {
    fn from(value: &str) -> Self {
        Prop::Str(value.to_string())
    }
}

impl From<String> for Prop {
    fn from(value: String) -> Self {
        Prop::Str(value)
    }
}

fn array<T: Copy>(out: &mut Vec<u8>, code: u8, values: &[T], bytes: impl Fn(T) -> Vec<u8>) {
    out.push(code);
    let data: Vec<u8> = values.iter().flat_map(|&v| bytes(v)).collect();
    out.extend((values.len() as u32).to_le_bytes());
    // uncompressed
    out.extend(0u32.to_le_bytes());
    out.extend((data.len() as u32).to_le_bytes());
    out.extend(data);
}

impl Prop {
    fn write(&self, out: &mut Vec<u8>) {
        match self {
            Prop::I32(v) => {
                out.push(b'I');
                out.extend(v.to_le_bytes());
            }
            Prop::I64(v) => {
                out.push(b'L');
                out.extend(v.to_le_bytes());
            }
            Prop::F64(v) => {
                out.push(b'D');
                out.extend(v.to_le_bytes());
            }
            Prop::Str(s) => {
                out.push(b'S');
                out.extend((s.len() as u32).to_le_bytes());
                out.extend(s.as_bytes());
            }
            Prop::Raw(bytes) => {
                out.push(b'R');
                out.extend((bytes.len() as u32).to_le_bytes());
                out.extend(bytes);
            }
            Prop::F32s(values) => array(out, b'f', values, |v| v.to_le_bytes().to_vec()),
            Prop::F64s(values) => array(out, b'd', values, |v| v.to_le_bytes().to_vec()),
            Prop::I32s(values) => array(out, b'i', values, |v| v.to_le_bytes().to_vec()),
            Prop::I64s(values) => array(out, b'l', values, |v| v.to_le_bytes().to_vec()),
        }
    }
}

pub struct FbxNode {
    name: String,
    props: Vec<Prop>,
    children: Vec<FbxNode>,
}

impl FbxNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            props: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn prop(mut self, prop: impl Into<Prop>) -> Self {
        self.props.push(prop.into());
        self
    }

    pub fn child(mut self, child: FbxNode) -> Self {
        self.children.push(child);
        self
    }

    fn write(&self, out: &mut Vec<u8>) {
        let header = out.len();
        // end offset, property count and property length are patched below
        out.extend([0u8; 12]);
        out.push(self.name.len() as u8);
        out.extend(self.name.as_bytes());
        let props_start = out.len();
        for prop in &self.props {
            prop.write(out);
        }
        let props_len = out.len() - props_start;
        for child in &self.children {
            child.write(out);
        }
        if !self.children.is_empty() || self.props.is_empty() {
            out.extend([0u8; 13]);
        }
        let end = out.len() as u32;
        out[header..header + 4].copy_from_slice(&end.to_le_bytes());
        out[header + 4..header + 8].copy_from_slice(&(self.props.len() as u32).to_le_bytes());
        out[header + 8..header + 12].copy_from_slice(&(props_len as u32).to_le_bytes());
    }
}

/// `Objects` plus a `Connections` table of `(child, parent, property)`.
pub fn fbx_file(objects: Vec<FbxNode>, connections: &[(i64, i64, Option<&str>)]) -> Vec<u8> {
    let mut out = b"Kaydara FBX Binary  \0".to_vec();
    out.extend([0x1a, 0x00]);
    out.extend(7400u32.to_le_bytes());

    let mut object_list = FbxNode::new("Objects");
    object_list.children = objects;
    object_list.write(&mut out);

    let mut connection_list = FbxNode::new("Connections");
    for &(child, parent, property) in connections {
        let node = match property {
            Some(property) => FbxNode::new("C").prop("OP").prop(child).prop(parent).prop(property),
            None => FbxNode::new("C").prop("OO").prop(child).prop(parent),
        };
        connection_list = connection_list.child(node);
    }
    connection_list.write(&mut out);
    out.extend([0u8; 13]);

    out.extend([0u8; 16]);
    out.resize(out.len().next_multiple_of(16), 0);
    out.extend([0u8; 4]);
    out.extend(7400u32.to_le_bytes());
    out.extend([0u8; 120]);
    out.extend(FOOTER_MAGIC);
    out
}

/// An object name as binary files store it: `Name\0\x01Class`.
pub fn object_name(name: &str, class: &str) -> String {
    format!("{name}\u{0}\u{1}{class}")
}

fn properties(entries: Vec<FbxNode>) -> FbxNode {
    let mut list = FbxNode::new("Properties70");
    list.children = entries;
    list
}

pub fn vec3_property(name: &str, [x, y, z]: [f64; 3]) -> FbxNode {
    FbxNode::new("P")
        .prop(name)
        .prop("Lcl Translation")
        .prop("")
        .prop("A")
        .prop(x)
        .prop(y)
        .prop(z)
}

pub fn number_property(name: &str, value: f64) -> FbxNode {
    FbxNode::new("P").prop(name).prop("Number").prop("").prop("A").prop(value)
}

pub fn model(id: i64, name: &str, class: &str, props: Vec<FbxNode>) -> FbxNode {
    FbxNode::new("Model")
        .prop(id)
        .prop(object_name(name, "Model"))
        .prop(class)
        .child(properties(props))
}

/// A polygon mesh; the last corner of each polygon in `polygons` is negated as FBX stores it.
pub fn geometry(id: i64, name: &str, points: &[[f64; 3]], polygons: &[&[i32]]) -> FbxNode {
    let vertices = points.iter().flatten().copied().collect::<Vec<f64>>();
    let indices = polygons
        .iter()
        .flat_map(|polygon| {
            let last = polygon.len() - 1;
            polygon
                .iter()
                .enumerate()
                .map(move |(i, &idx)| if i == last { !idx } else { idx })
        })
        .collect::<Vec<i32>>();
    FbxNode::new("Geometry")
        .prop(id)
        .prop(object_name(name, "Geometry"))
        .prop("Mesh")
        .child(FbxNode::new("Vertices").prop(Prop::F64s(vertices)))
        .child(FbxNode::new("PolygonVertexIndex").prop(Prop::I32s(indices)))
}

pub fn material(id: i64, name: &str) -> FbxNode {
    FbxNode::new("Material")
        .prop(id)
        .prop(object_name(name, "Material"))
        .prop("")
}

/// Every polygon uses material slot `slot`.
pub fn same_material_layer(slot: i32) -> FbxNode {
    FbxNode::new("LayerElementMaterial")
        .prop(0i32)
        .child(FbxNode::new("MappingInformationType").prop("AllSame"))
        .child(FbxNode::new("ReferenceInformationType").prop("IndexToDirect"))
        .child(FbxNode::new("Materials").prop(Prop::I32s(vec![slot])))
}

/// Keys of one axis, `times` in seconds.
pub fn curve(id: i64, times: &[f64], values: &[f32]) -> FbxNode {
    let ticks = times
        .iter()
        .map(|t| (t * TICKS_PER_SECOND as f64) as i64)
        .collect::<Vec<i64>>();
    FbxNode::new("AnimationCurve")
        .prop(id)
        .prop(object_name("", "AnimCurve"))
        .prop("")
        .child(FbxNode::new("KeyTime").prop(Prop::I64s(ticks)))
        .child(FbxNode::new("KeyValueFloat").prop(Prop::F32s(values.to_vec())))
}

pub fn curve_node(id: i64, name: &str, defaults: [f64; 3]) -> FbxNode {
    FbxNode::new("AnimationCurveNode")
        .prop(id)
        .prop(object_name(name, "AnimCurveNode"))
        .prop("")
        .child(properties(vec![
            number_property("d|X", defaults[0]),
            number_property("d|Y", defaults[1]),
            number_property("d|Z", defaults[2]),
        ]))
}

const QUAD: [[f64; 3]; 4] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];

/// One mesh model called `name` holding a single triangle.
pub fn mesh_fbx(name: &str) -> Vec<u8> {
    fbx_file(
        vec![
            model(1, name, "Mesh", Vec::new()),
            geometry(2, name, &QUAD[..3], &[&[0, 1, 2]]),
        ],
        &[(1, 0, None), (2, 1, None)],
    )
}

/**
 * A Mixamo-style rig: `Armature > mixamorig:Hips > mixamorig:LeftHand` next
 * to a `Body` quad using the material `skin`. With `animated`, the stack
 * `mixamo.com` lifts the hand by 10 units and turns it 90 degrees about Z
 * over one second.
 */
pub fn character_fbx(animated: bool) -> Vec<u8> {
    let mut objects = vec![
        model(1, "Armature", "Null", Vec::new()),
        model(2, "mixamorig:Hips", "LimbNode", vec![vec3_property("Lcl Translation", [0.0, 100.0, 0.0])]),
        model(3, "mixamorig:LeftHand", "LimbNode", vec![vec3_property("Lcl Translation", [20.0, 0.0, 0.0])]),
        model(4, "Body", "Mesh", Vec::new()),
        geometry(5, "Body", &QUAD, &[&[0, 1, 2, 3]]).child(same_material_layer(0)),
        material(6, "skin"),
    ];
    let mut connections = vec![
        (1, 0, None),
        (2, 1, None),
        (3, 2, None),
        (4, 0, None),
        (5, 4, None),
        (6, 4, None),
    ];

    if animated {
        objects.extend([
            FbxNode::new("AnimationStack")
                .prop(10i64)
                .prop(object_name("mixamo.com", "AnimStack"))
                .prop(""),
            FbxNode::new("AnimationLayer")
                .prop(11i64)
                .prop(object_name("BaseLayer", "AnimLayer"))
                .prop(""),
            curve_node(12, "T", [20.0, 0.0, 0.0]),
            curve(13, &[0.0, 1.0], &[0.0, 10.0]),
            curve_node(14, "R", [0.0, 0.0, 0.0]),
            curve(15, &[0.0, 1.0], &[0.0, 90.0]),
        ]);
        connections.extend([
            (11, 10, None),
            (12, 11, None),
            (14, 11, None),
            (12, 3, Some("Lcl Translation")),
            (14, 3, Some("Lcl Rotation")),
            (13, 12, Some("d|Y")),
            (15, 14, Some("d|Z")),
        ]);
    }
    fbx_file(objects, &connections)
}
