use crate::octree::{InvalidRegion, NodePath, SpatialRegion};
use crate::resource::ResourceError;
use glam::DVec3;
use thiserror::Error;
use tracing::{debug, warn};

/// Trees with a shallower folder layout cannot be served node-per-file.
pub const MIN_SUBFOLDER_DEPTH: u32 = 30;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Invalid value for `{key}` on line {line}: {value:?}")]
    InvalidValue {
        key: String,
        value: String,
        line: usize,
    },

    #[error("Metadata does not define `tree_size`")]
    MissingTreeSize,

    #[error("Invalid root region: {0}")]
    InvalidRegion(#[from] InvalidRegion),
}

/// Suggested initial camera stored with a tree. Orbit parameters around `center`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewpoint {
    pub center: DVec3,
    pub distance: f64,
    pub yaw: f64,
    pub pitch: f64,
}

/// Contents of a tree's `metadata.ini` (`key = value` per line).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TreeMetadata {
    pub version: f64,
    pub subtree_width: u32,
    pub subfolder_depth: u32,
    pub min_cell_size: f64,
    pub root_center: DVec3,
    pub root_size: f64,
    /// Set when any `default_camera_*` key is present.
    pub viewpoint: Option<Viewpoint>,
}

impl TreeMetadata {
    pub fn parse(text: &str) -> Result<Self, MetadataError> {
        let mut metadata = TreeMetadata::default();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                debug!(line, "Skipping metadata line without `=`");
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            let number = || {
                value
                    .parse::<f64>()
                    .map_err(|_| MetadataError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                        line: index + 1,
                    })
            };

            match key {
                "version" => metadata.version = number()?,
                "min_cell_size" => metadata.min_cell_size = number()?,
                "subtree_width" => metadata.subtree_width = number()? as u32,
                "subfolder_depth" => metadata.subfolder_depth = number()? as u32,
                "tree_center_x" => metadata.root_center.x = number()?,
                "tree_center_y" => metadata.root_center.y = number()?,
                "tree_center_z" => metadata.root_center.z = number()?,
                "tree_size" => metadata.root_size = number()?,
                "default_camera_center_x" => metadata.viewpoint_mut().center.x = number()?,
                "default_camera_center_y" => metadata.viewpoint_mut().center.y = number()?,
                "default_camera_center_z" => metadata.viewpoint_mut().center.z = number()?,
                "default_camera_distance" => metadata.viewpoint_mut().distance = number()?,
                "default_camera_yaw" => metadata.viewpoint_mut().yaw = number()?,
                "default_camera_pitch" => metadata.viewpoint_mut().pitch = number()?,
                _ => debug!(key, "Unknown key while parsing metadata"),
            }
        }

        if metadata.subfolder_depth < MIN_SUBFOLDER_DEPTH {
            warn!(
                subfolder_depth = metadata.subfolder_depth,
                "Tree subfolder depth is below {MIN_SUBFOLDER_DEPTH}, node paths may not resolve"
            );
        }

        Ok(metadata)
    }

    fn viewpoint_mut(&mut self) -> &mut Viewpoint {
        self.viewpoint.get_or_insert_with(Viewpoint::default)
    }

    /// Cube of edge `tree_size` centred on the tree centre.
    pub fn root_region(&self) -> Result<SpatialRegion, MetadataError> {
        if self.root_size <= 0.0 {
            return Err(MetadataError::MissingTreeSize);
        }
        Ok(SpatialRegion::cube(self.root_center, self.root_size)?)
    }
}

/// A tree taking part in frustum queries.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeInfo {
    pub name: String,
    pub root: NodePath,
    pub region: SpatialRegion,
    pub enabled: bool,
    /// Colour every node of this tree is drawn with instead of its own.
    pub override_color: Option<[u8; 3]>,
}

impl TreeInfo {
    pub fn new(name: impl Into<String>, region: SpatialRegion) -> Self {
        let name = name.into();
        Self {
            root: NodePath::root(&name),
            name,
            region,
            enabled: true,
            override_color: None,
        }
    }

    pub fn from_metadata(
        name: impl Into<String>,
        metadata: &TreeMetadata,
    ) -> Result<Self, MetadataError> {
        Ok(Self::new(name, metadata.root_region()?))
    }

    pub fn with_override_color(mut self, color: [u8; 3]) -> Self {
        self.override_color = Some(color);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
