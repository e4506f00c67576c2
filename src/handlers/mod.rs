// handlers/mod.rs
//
// public    - no authentication (/, /health)
// resource  - generic CRUD handlers, run behind the request pipeline
// resources - the registry of mounted resources
pub mod public;
pub mod resource;
pub mod resources;

pub use resource::ResourceState;
pub use resources::{registry, Resource};
