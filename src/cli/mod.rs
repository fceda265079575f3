use std::sync::Arc;

use crate::{
    config::Config,
    error,
    management::{JsonSessionStore, SessionStore},
};

mod serve;
mod sync;
mod users;

pub use serve::serve;
pub use sync::sync;
pub use users::list_users;
pub use users::set_enabled;

fn load_config() -> Config {
    match Config::from_env() {
        Ok(config) => config,
        Err(e) => error!("Invalid configuration: {}", e),
    }
}

async fn open_store(config: &Config) -> Arc<dyn SessionStore> {
    match JsonSessionStore::open(config.sessions_path.clone()).await {
        Ok(store) => Arc::new(store),
        Err(e) => error!(
            "Cannot open session store at {}: {}",
            config.sessions_path.display(),
            e
        ),
    }
}
