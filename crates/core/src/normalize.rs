//! Payload normalization: arbitrary [`Value`] graphs to plain JSON.
//!
//! ## Rules
//!
//! - Scalars pass through; non-finite floats become `null`.
//! - Dates become ISO-8601 strings with millisecond precision (`2020-03-01T10:00:00.000Z`).
//! - Objects become maps of their own data properties followed by their class getters,
//!   each getter invoked once and its result normalized like any other value.
//! - `Undefined` and functions are dropped from objects and become `null` in arrays.
//! - An object or array met again while it is still being normalized (an ancestor of
//!   the current position) becomes `"[circular *<path>]"`, where `<path>` is the
//!   position of the back-reference. References shared between sibling branches are
//!   not cycles and are normalized at each position.
//!
//! The walk keeps its own frame stack on the heap, so depth is bounded by memory,
//! not by the thread stack.

use std::collections::HashMap;

use chrono::SecondsFormat;
use serde_json::{Map, Value as Json};
use tracing::{debug, trace};

use crate::path::PropertyPath;
use crate::value::{ArrayRef, Getter, NodeId, ObjectRef, Value};

/// Emitted in place of compound values beyond [`NormalizerConfig::max_depth`].
pub const MAX_DEPTH_MARKER: &str = "[max depth reached]";

/// Marker substituted for a back-reference to an ancestor at `path`.
pub fn circular_marker(path: &PropertyPath) -> String {
    format!("[circular *{path}]")
}

/// Normalize with the default configuration.
pub fn normalize(value: &Value) -> Json {
    Normalizer::default().normalize(value)
}

/// Output key order for objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyOrder {
    /// Own data properties in insertion order, then getters in declaration order.
    #[default]
    Declaration,
    /// Lexicographic by key.
    Sorted,
}

/// Normalizer configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizerConfig {
    pub key_order: KeyOrder,
    /// Compound values nested deeper than this become [`MAX_DEPTH_MARKER`].
    /// The root is at depth 0. `None` means unlimited.
    pub max_depth: Option<usize>,
}

impl NormalizerConfig {
    pub fn with_key_order(mut self, order: KeyOrder) -> Self {
        self.key_order = order;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

/// Converts payload values to plain JSON.
///
/// Holds only configuration; every call uses its own ancestor registry, so a
/// single `Normalizer` can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize `root` into a plain JSON value. Never fails.
    ///
    /// An unrepresentable root (`Undefined` or a function) yields `null`.
    pub fn normalize(&self, root: &Value) -> Json {
        let mut walk = Walk::new(&self.config);
        let out = match walk.enter(root, PropertyPath::root(), Slot::Root) {
            Entered::Leaf(_, v) => v.unwrap_or(Json::Null),
            Entered::Compound(frame) => {
                walk.stack.push(frame);
                walk.run()
            }
        };
        trace!(
            nodes = walk.nodes,
            cycles = walk.cycles,
            truncated = walk.truncated,
            "payload normalized"
        );
        out
    }
}

/// Where a child's output goes in its parent.
enum Slot {
    Root,
    Index,
    Key(String),
}

/// A pending object property: stored data or an accessor not yet invoked.
enum Property {
    Data(Value),
    Getter(Getter),
}

enum FrameKind {
    Array {
        handle: ArrayRef,
        items: std::vec::IntoIter<Value>,
        next_index: usize,
        out: Vec<Json>,
    },
    Object {
        handle: ObjectRef,
        properties: std::vec::IntoIter<(String, Property)>,
        out: Map<String, Json>,
    },
}

/// A compound value currently being normalized. Frames on the stack are exactly
/// the registered ancestors of the position being visited.
///
/// Each frame owns a handle to its value, so the allocation behind a registered
/// `NodeId` stays alive (and cannot be reused) until the frame is popped.
struct Frame {
    path: PropertyPath,
    slot: Slot,
    kind: FrameKind,
}

struct Child {
    value: Value,
    path: PropertyPath,
    slot: Slot,
}

impl Frame {
    fn id(&self) -> NodeId {
        match &self.kind {
            FrameKind::Array { handle, .. } => handle.node_id(),
            FrameKind::Object { handle, .. } => handle.node_id(),
        }
    }

    fn next_child(&mut self) -> Option<Child> {
        match &mut self.kind {
            FrameKind::Array {
                items, next_index, ..
            } => {
                let value = items.next()?;
                let path = self.path.index(*next_index);
                *next_index += 1;
                Some(Child {
                    value,
                    path,
                    slot: Slot::Index,
                })
            }
            FrameKind::Object {
                handle, properties, ..
            } => {
                let (key, property) = properties.next()?;
                let value = match property {
                    Property::Data(v) => v,
                    Property::Getter(g) => g(&*handle),
                };
                Some(Child {
                    value,
                    path: self.path.key(&key),
                    slot: Slot::Key(key),
                })
            }
        }
    }

    fn accept(&mut self, slot: Slot, value: Option<Json>) {
        match (&mut self.kind, slot) {
            (FrameKind::Array { out, .. }, _) => out.push(value.unwrap_or(Json::Null)),
            (FrameKind::Object { out, .. }, Slot::Key(key)) => {
                if let Some(v) = value {
                    out.insert(key, v);
                }
            }
            // Object children always carry their key.
            (FrameKind::Object { .. }, Slot::Root | Slot::Index) => {}
        }
    }

    fn finish(self) -> (Slot, Json) {
        let json = match self.kind {
            FrameKind::Array { out, .. } => Json::Array(out),
            FrameKind::Object { out, .. } => Json::Object(out),
        };
        (self.slot, json)
    }
}

enum Entered {
    /// Fully normalized; `None` means "omit from objects".
    Leaf(Slot, Option<Json>),
    Compound(Frame),
}

/// State for a single normalization call.
struct Walk<'a> {
    config: &'a NormalizerConfig,
    stack: Vec<Frame>,
    /// Ancestor registry: identity and entry path of every frame on the stack.
    ancestors: HashMap<NodeId, PropertyPath>,
    nodes: usize,
    cycles: usize,
    truncated: usize,
}

impl<'a> Walk<'a> {
    fn new(config: &'a NormalizerConfig) -> Self {
        Self {
            config,
            stack: Vec::new(),
            ancestors: HashMap::new(),
            nodes: 0,
            cycles: 0,
            truncated: 0,
        }
    }

    /// Drive the stack until the root frame completes.
    fn run(&mut self) -> Json {
        loop {
            let next = match self.stack.last_mut() {
                Some(top) => top.next_child(),
                None => return Json::Null,
            };

            let (slot, json) = match next {
                Some(child) => match self.enter(&child.value, child.path, child.slot) {
                    Entered::Leaf(slot, json) => (slot, json),
                    Entered::Compound(frame) => {
                        self.stack.push(frame);
                        continue;
                    }
                },
                None => {
                    let Some(frame) = self.stack.pop() else {
                        return Json::Null;
                    };
                    self.ancestors.remove(&frame.id());
                    let (slot, json) = frame.finish();
                    (slot, Some(json))
                }
            };

            match self.stack.last_mut() {
                Some(parent) => parent.accept(slot, json),
                None => return json.unwrap_or(Json::Null),
            }
        }
    }

    fn enter(&mut self, value: &Value, path: PropertyPath, slot: Slot) -> Entered {
        self.nodes += 1;
        let json = match value {
            Value::Undefined | Value::Function(_) => None,
            Value::Null => Some(Json::Null),
            Value::Bool(b) => Some(Json::Bool(*b)),
            Value::Int(i) => Some(Json::from(*i)),
            Value::UInt(u) => Some(Json::from(*u)),
            Value::Float(f) => Some(
                serde_json::Number::from_f64(*f)
                    .map(Json::Number)
                    .unwrap_or(Json::Null),
            ),
            Value::String(s) => Some(Json::String(s.clone())),
            Value::Date(d) => Some(Json::String(d.to_rfc3339_opts(SecondsFormat::Millis, true))),
            Value::Array(array) => return self.enter_array(array, path, slot),
            Value::Object(object) => return self.enter_object(object, path, slot),
        };
        Entered::Leaf(slot, json)
    }

    /// Marker for `id` if it is an ancestor or too deep, `None` if the walk may descend.
    fn guard(&mut self, id: NodeId, path: &PropertyPath) -> Option<Json> {
        if let Some(ancestor) = self.ancestors.get(&id) {
            self.cycles += 1;
            debug!(path = %path, ancestor = %ancestor, "circular reference replaced with marker");
            return Some(Json::String(circular_marker(path)));
        }
        if let Some(max) = self.config.max_depth {
            if self.stack.len() > max {
                self.truncated += 1;
                debug!(path = %path, max_depth = max, "payload truncated at max depth");
                return Some(Json::String(MAX_DEPTH_MARKER.to_string()));
            }
        }
        None
    }

    fn enter_array(&mut self, array: &ArrayRef, path: PropertyPath, slot: Slot) -> Entered {
        let id = array.node_id();
        if let Some(marker) = self.guard(id, &path) {
            return Entered::Leaf(slot, Some(marker));
        }

        let items = array.snapshot();
        self.ancestors.insert(id, path.clone());
        Entered::Compound(Frame {
            path,
            slot,
            kind: FrameKind::Array {
                handle: array.clone(),
                out: Vec::with_capacity(items.len()),
                items: items.into_iter(),
                next_index: 0,
            },
        })
    }

    fn enter_object(&mut self, object: &ObjectRef, path: PropertyPath, slot: Slot) -> Entered {
        let id = object.node_id();
        if let Some(marker) = self.guard(id, &path) {
            return Entered::Leaf(slot, Some(marker));
        }

        let properties = self.properties(object);
        self.ancestors.insert(id, path.clone());
        Entered::Compound(Frame {
            path,
            slot,
            kind: FrameKind::Object {
                handle: object.clone(),
                out: Map::with_capacity(properties.len()),
                properties: properties.into_iter(),
            },
        })
    }

    /// Own data properties, then getters not shadowed by them, in configured order.
    fn properties(&self, object: &ObjectRef) -> Vec<(String, Property)> {
        let (own, class) = object.snapshot();
        let mut properties: Vec<(String, Property)> = own
            .into_iter()
            .map(|(k, v)| (k, Property::Data(v)))
            .collect();

        if let Some(class) = class {
            for (name, getter) in class.getters() {
                if !properties.iter().any(|(k, _)| *k == name) {
                    properties.push((name, Property::Getter(getter)));
                }
            }
        }

        if self.config.key_order == KeyOrder::Sorted {
            properties.sort_by(|a, b| a.0.cmp(&b.0));
        }
        properties
    }
}
