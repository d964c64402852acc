// Asset loading: OBJ parsing + the background load with its state machine.
//
//   Idle → Loading → {Loaded, Failed}
//
// One attempt per viewer, no retries. The worker thread sends exactly one
// result over an mpsc channel; the frame loop polls it with try_recv and
// never blocks.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use glam::Vec3;

use super::builder::PartKind;
use super::mesh::{triangulate_smooth, Aabb, PolyMesh, RenderMesh};
use crate::error::{Result, ViewerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// One OBJ group, normalized and triangulated.
#[derive(Debug, Clone)]
pub struct SubMesh {
    pub name: String,
    pub kind: PartKind,
    pub mesh: RenderMesh,
}

/// A normalized asset: centered on the origin, scaled so its X extent equals
/// the requested width.
#[derive(Debug, Clone)]
pub struct LoadedMesh {
    pub sub_meshes: Vec<SubMesh>,
    pub bounds: Aabb,
}

impl LoadedMesh {
    pub fn triangle_count(&self) -> usize {
        self.sub_meshes.iter().map(|s| s.mesh.triangle_count()).sum()
    }
}

/// Load an OBJ file from disk. Anything but `.obj` is rejected up front.
pub fn load_obj(path: &Path, target_width: f32) -> Result<LoadedMesh> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if ext != "obj" {
        return Err(ViewerError::UnsupportedFormat(path.display().to_string()));
    }
    let file = File::open(path)?;
    parse_obj(BufReader::new(file), target_width)
}

/// Parse OBJ text into normalized per-group sub-meshes.
pub fn parse_obj<R: Read>(reader: R, target_width: f32) -> Result<LoadedMesh> {
    let data = obj::ObjData::load_buf(reader).map_err(|e| ViewerError::AssetParse(e.to_string()))?;

    let points: Vec<Vec3> = data.position.iter().copied().map(Vec3::from_array).collect();
    let bounds = Aabb::from_points(&points).ok_or(ViewerError::EmptyAsset)?;
    let size = bounds.size();
    let extent = if size.x > f32::EPSILON { size.x } else { size.max_element() };
    if !(extent > f32::EPSILON) || !extent.is_finite() {
        return Err(ViewerError::EmptyAsset);
    }
    let center = bounds.center();
    let scale = target_width / extent;

    let mut sub_meshes = Vec::new();
    for object in &data.objects {
        for group in &object.groups {
            let mut poly = PolyMesh::new();
            // OBJ index → local vertex index.
            let mut remap = std::collections::HashMap::new();
            for polygon in &group.polys {
                if polygon.0.len() < 3 {
                    continue;
                }
                let mut face = Vec::with_capacity(polygon.0.len());
                for tuple in &polygon.0 {
                    let idx = tuple.0;
                    let pos = data.position.get(idx).ok_or_else(|| {
                        ViewerError::AssetParse(format!("vertex index {} out of range", idx + 1))
                    })?;
                    let local = *remap
                        .entry(idx)
                        .or_insert_with(|| poly.add_vertex((Vec3::from_array(*pos) - center) * scale));
                    face.push(local);
                }
                poly.add_face(face);
            }
            if poly.faces.is_empty() {
                continue;
            }
            let name = if group.name == "default" { object.name.clone() } else { group.name.clone() };
            let kind = PartKind::from_name(&name)
                .or_else(|| PartKind::from_name(&object.name))
                .unwrap_or(PartKind::Whole);
            sub_meshes.push(SubMesh { name, kind, mesh: triangulate_smooth(&poly) });
        }
    }

    if sub_meshes.is_empty() {
        return Err(ViewerError::EmptyAsset);
    }
    let normalized = Aabb {
        min: (bounds.min - center) * scale,
        max: (bounds.max - center) * scale,
    };
    let loaded = LoadedMesh { sub_meshes, bounds: normalized };
    log::debug!(
        "Parsed OBJ: {} sub-meshes, {} triangles",
        loaded.sub_meshes.len(),
        loaded.triangle_count()
    );
    Ok(loaded)
}

/// Outcome of a finished load, handed to the viewer once.
pub type LoadResult = Result<LoadedMesh>;

/// Owns the single background load attempt.
pub struct AssetLoader {
    state: LoadState,
    receiver: Option<Receiver<LoadResult>>,
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetLoader {
    pub fn new() -> Self {
        Self { state: LoadState::Idle, receiver: None }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Start loading `path` on a worker thread. Ignored unless Idle.
    pub fn start(&mut self, path: PathBuf, target_width: f32) {
        let (tx, rx) = mpsc::channel();
        self.start_with(rx, move || {
            let result = load_obj(&path, target_width);
            // The receiver may already be gone when the viewer shut down first.
            let _ = tx.send(result);
        });
    }

    fn start_with(&mut self, receiver: Receiver<LoadResult>, job: impl FnOnce() + Send + 'static) {
        if self.state != LoadState::Idle {
            log::debug!("Asset load already attempted; ignoring start");
            return;
        }
        let spawned = thread::Builder::new().name("asset-loader".into()).spawn(job);
        match spawned {
            Ok(_) => {
                self.receiver = Some(receiver);
                self.state = LoadState::Loading;
            }
            Err(e) => {
                log::warn!("Could not spawn asset loader: {}", e);
                self.state = LoadState::Failed;
            }
        }
    }

    /// Check for a finished load without blocking. Returns the result exactly once.
    pub fn poll(&mut self) -> Option<LoadResult> {
        let receiver = self.receiver.as_ref()?;
        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(ViewerError::LoaderDisconnected),
        };
        self.receiver = None;
        self.state = if result.is_ok() { LoadState::Loaded } else { LoadState::Failed };
        Some(result)
    }

    /// Mark the attempt as failed without spawning anything, e.g. when no
    /// asset path is configured.
    pub fn skip(&mut self) {
        if self.state == LoadState::Idle {
            self.state = LoadState::Failed;
        }
    }
}
