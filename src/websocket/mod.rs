pub mod handler;
pub mod host_actor;

pub use handler::ws_index;
pub use host_actor::HostActor;
