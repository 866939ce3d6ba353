pub mod camera;
pub mod deform;
pub mod graph;
pub mod light;
pub mod loader;
pub mod material;
pub mod mesh;
pub mod modifier;
pub mod placement;
pub mod room;
pub mod scene_object;
pub mod texture;
pub mod utils;
