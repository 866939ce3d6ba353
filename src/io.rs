pub mod background;
pub mod category_map;
pub mod config;
pub mod manifest;
pub mod material_set;
pub mod obj_loader;
