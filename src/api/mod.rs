mod clients;
mod dispatch;
mod ingress;
mod server;

pub use clients::ClientRegistry;
pub use dispatch::ResultDispatcher;
pub use server::{start_server, AppState};
