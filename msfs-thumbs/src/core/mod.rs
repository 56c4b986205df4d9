pub mod app_dirs;
pub mod clock;
pub mod path_utils;
