// Adapters layer: concrete implementations of the domain ports.
// http: collaborator services over reqwest; memory: repositories and an offline inventory.

pub mod http;
pub mod memory;
