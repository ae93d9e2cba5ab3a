pub mod cancel;
pub mod persistence;

#[allow(unused_imports)]
pub use cancel::{CancelToken, Cancelled};
#[allow(unused_imports)]
pub use persistence::{
    default_settings_path, load_settings, save_settings, PersistSaveError, RouteStore,
};
