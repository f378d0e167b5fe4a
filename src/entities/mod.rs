//! Entity types - catalog records and curriculum state.

pub mod catalog;
pub mod curriculum;

pub use catalog::{
    Catalog, CatalogError, Course, CourseId, JsonCatalog, Module, ModuleId, Video, VideoId,
    demo_course,
};
pub use curriculum::{Curriculum, ModuleProgress, VideoLocation};
